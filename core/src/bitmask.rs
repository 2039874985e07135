use serde::{Deserialize, Serialize};

use crate::{CellGrid, CellState, GridError, GridPosition};

/// Largest interior side length that fits the 64-bit mask, `floor(sqrt(64))`.
pub const MAX_INNER_SIDE: usize = 8;

/// Border cells skipped on every side when packing a room layout.
pub const DEFAULT_INSET: usize = 1;

/// Packed inner layout of a room.
///
/// One bit per interior cell, row-major, with set bits marking closed cells.
/// The border ring is excluded because walls and doors can be rebuilt from
/// the door positions alone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InnerRoomBitmask(u64);

impl InnerRoomBitmask {
    /// Wraps a raw mask.
    #[must_use]
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw mask value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Packs the interior of `grid`, skipping `inset` cells on each side.
    pub fn from_grid(grid: &CellGrid, inset: usize) -> Result<Self, GridError> {
        let interior = interior_side(grid.side(), inset)?;
        let mut bits = 0u64;
        for x in 0..interior {
            for y in 0..interior {
                let state = grid.get(inner_position(x, y, inset)?)?;
                if state != CellState::Open {
                    bits |= 1u64 << (x * interior + y);
                }
            }
        }
        Ok(Self(bits))
    }

    /// Checks the mask against a room of `side` cells and returns the
    /// interior side. Bits past the last interior cell are rejected.
    pub fn fit(self, side: usize, inset: usize) -> Result<usize, GridError> {
        let interior = interior_side(side, inset)?;
        let cells = interior * interior;
        if cells < 64 && self.0 >> cells != 0 {
            return Err(GridError::InvalidArgument(format!(
                "mask {:#x} sets bits past the {cells} interior cells",
                self.0
            )));
        }
        Ok(interior)
    }

    /// Unpacks the mask into the interior of a caller-sized `grid`.
    ///
    /// Border cells are left untouched.
    pub fn write_into(self, grid: &mut CellGrid, inset: usize) -> Result<(), GridError> {
        let interior = self.fit(grid.side(), inset)?;
        for x in 0..interior {
            for y in 0..interior {
                let state = if self.0 & (1u64 << (x * interior + y)) != 0 {
                    CellState::Closed
                } else {
                    CellState::Open
                };
                grid.set(inner_position(x, y, inset)?, state)?;
            }
        }
        Ok(())
    }
}

/// Side length of the packed interior for a room of `side` cells.
///
/// Fails when the inset swallows the grid or the interior exceeds the mask.
pub fn interior_side(side: usize, inset: usize) -> Result<usize, GridError> {
    let interior = inset
        .checked_mul(2)
        .and_then(|border| side.checked_sub(border))
        .ok_or_else(|| {
            GridError::InvalidArgument(format!("inset {inset} leaves no interior in side {side}"))
        })?;
    if interior > MAX_INNER_SIDE {
        return Err(GridError::CapacityExceeded {
            required: interior,
            capacity: MAX_INNER_SIDE,
        });
    }
    Ok(interior)
}

fn inner_position(x: usize, y: usize, inset: usize) -> Result<GridPosition, GridError> {
    let to_coord = |value: usize| {
        i32::try_from(value + inset)
            .map_err(|_| GridError::InvalidArgument(format!("coordinate {value} overflows")))
    };
    Ok(GridPosition::new(to_coord(x)?, to_coord(y)?))
}
