use serde::{Deserialize, Serialize};

use crate::{Direction, GridError};

/// Position of a cell inside a single room's inner grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    x: i32,
    y: i32,
}

impl GridPosition {
    /// Creates a grid-local position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate along the North/South axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Coordinate along the East/West axis.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Position one cell away in the provided direction.
    #[must_use]
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
        }
    }

    /// Position `distance` cells away in the provided direction.
    #[must_use]
    pub const fn step_by(self, direction: Direction, distance: i32) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x.wrapping_add(dx.wrapping_mul(distance)),
            y: self.y.wrapping_add(dy.wrapping_mul(distance)),
        }
    }
}

/// Border cell holding the door that sits `offset` cells along the wall
/// facing `direction`, in a room of `side` cells.
#[must_use]
pub const fn door_cell(direction: Direction, offset: i32, side: i32) -> GridPosition {
    let last = side - 1;
    match direction {
        Direction::North => GridPosition::new(last, offset),
        Direction::East => GridPosition::new(offset, last),
        Direction::South => GridPosition::new(0, offset),
        Direction::West => GridPosition::new(offset, 0),
    }
}

/// Coordinate of a room in the world lattice, centred on the origin room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomCoord {
    x: i32,
    y: i32,
}

impl RoomCoord {
    /// The centre room of the world.
    pub const ORIGIN: RoomCoord = RoomCoord::new(0, 0);

    /// Creates a centred room coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Coordinate along the North/South axis.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Coordinate along the East/West axis.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Room adjacent to this one in the provided direction.
    ///
    /// No lattice bounds are applied; callers validate the result.
    #[must_use]
    pub const fn neighbour(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x.wrapping_add(dx),
            y: self.y.wrapping_add(dy),
        }
    }

    /// Chebyshev distance from the centre room, i.e. the perimeter ring index.
    #[must_use]
    pub const fn ring(self) -> u32 {
        let x = self.x.unsigned_abs();
        let y = self.y.unsigned_abs();
        if x > y {
            x
        } else {
            y
        }
    }
}

/// State of a single inner-grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// Walkable floor.
    #[default]
    Open,
    /// Wall cell.
    Closed,
    /// Door cell on the room border.
    Door,
}

impl CellState {
    /// Integer code used by level files.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            CellState::Open => 0,
            CellState::Closed => 1,
            CellState::Door => 2,
        }
    }

    /// Resolves a cell state from its level file code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(CellState::Open),
            1 => Some(CellState::Closed),
            2 => Some(CellState::Door),
            _ => None,
        }
    }
}

/// Square grid of cell states describing one room's layout.
///
/// Cells are stored row-major with `x` selecting the row.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellGrid {
    side: usize,
    cells: Vec<CellState>,
}

impl CellGrid {
    /// Creates a grid filled with open cells.
    #[must_use]
    pub fn new(side: usize) -> Self {
        Self::filled(side, CellState::Open)
    }

    /// Creates a grid filled with the provided state.
    #[must_use]
    pub fn filled(side: usize, state: CellState) -> Self {
        Self {
            side,
            cells: vec![state; side.saturating_mul(side)],
        }
    }

    /// Builds a grid from rows, rejecting non-square input.
    pub fn from_rows(rows: Vec<Vec<CellState>>) -> Result<Self, GridError> {
        let side = rows.len();
        let mut cells = Vec::with_capacity(side.saturating_mul(side));
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != side {
                return Err(GridError::InvalidArgument(format!(
                    "row {index} holds {} cells but the grid is {side} rows tall",
                    row.len()
                )));
            }
            cells.extend(row);
        }
        Ok(Self { side, cells })
    }

    /// Number of cells along each edge.
    #[must_use]
    pub const fn side(&self) -> usize {
        self.side
    }

    /// Reports whether the position lies inside the grid.
    #[must_use]
    pub fn contains(&self, position: GridPosition) -> bool {
        self.index(position).is_some()
    }

    /// State of the cell at `position`.
    pub fn get(&self, position: GridPosition) -> Result<CellState, GridError> {
        self.index(position)
            .and_then(|index| self.cells.get(index).copied())
            .ok_or(GridError::OutOfBounds {
                x: position.x(),
                y: position.y(),
                side: self.side,
            })
    }

    /// Overwrites the cell at `position`.
    pub fn set(&mut self, position: GridPosition, state: CellState) -> Result<(), GridError> {
        let side = self.side;
        let slot = self
            .index(position)
            .and_then(|index| self.cells.get_mut(index))
            .ok_or(GridError::OutOfBounds {
                x: position.x(),
                y: position.y(),
                side,
            })?;
        *slot = state;
        Ok(())
    }

    /// Iterates the grid one row at a time.
    pub fn rows(&self) -> impl Iterator<Item = &[CellState]> {
        self.cells.chunks(self.side.max(1))
    }

    /// Counts cells holding the provided state.
    #[must_use]
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|cell| **cell == state).count()
    }

    fn index(&self, position: GridPosition) -> Option<usize> {
        let x = usize::try_from(position.x()).ok()?;
        let y = usize::try_from(position.y()).ok()?;
        if x < self.side && y < self.side {
            Some(x * self.side + y)
        } else {
            None
        }
    }
}

/// Side of a room that owns its wall record.
///
/// Every room stores only its South and West walls; its North and East walls
/// are the South and West walls of the neighbouring rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WallSide {
    /// Wall shared with the southern neighbour.
    South,
    /// Wall shared with the western neighbour.
    West,
}

impl WallSide {
    /// Direction the wall faces from its owning room.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            WallSide::South => Direction::South,
            WallSide::West => Direction::West,
        }
    }
}

/// Canonical identifier of the wall between two adjacent rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallKey {
    room: RoomCoord,
    side: WallSide,
}

impl WallKey {
    /// Creates a key for the wall owned by `room` on the provided side.
    #[must_use]
    pub const fn new(room: RoomCoord, side: WallSide) -> Self {
        Self { room, side }
    }

    /// Key of the wall crossed when leaving `room` in `direction`.
    #[must_use]
    pub const fn between(room: RoomCoord, direction: Direction) -> Self {
        match direction {
            Direction::North => Self::new(room.neighbour(Direction::North), WallSide::South),
            Direction::East => Self::new(room.neighbour(Direction::East), WallSide::West),
            Direction::South => Self::new(room, WallSide::South),
            Direction::West => Self::new(room, WallSide::West),
        }
    }

    /// Room that owns the wall record.
    #[must_use]
    pub const fn room(&self) -> RoomCoord {
        self.room
    }

    /// Side of the owning room the wall sits on.
    #[must_use]
    pub const fn side(&self) -> WallSide {
        self.side
    }

    /// Room on the far side of the wall from its owner.
    #[must_use]
    pub const fn neighbour(&self) -> RoomCoord {
        self.room.neighbour(self.side.direction())
    }
}

/// Lifecycle stage of a room.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Room slot is allocated but holds no live room.
    #[default]
    Dead,
    /// Room exists and its policy is being trained.
    Training,
    /// Room policy converged.
    Trained,
    /// Room joined the player's connected network.
    Connected,
}

impl RoomStatus {
    /// A room exists in every stage except [`RoomStatus::Dead`].
    #[must_use]
    pub const fn exists(self) -> bool {
        !matches!(self, RoomStatus::Dead)
    }

    /// Trained rooms include connected ones.
    #[must_use]
    pub const fn is_trained(self) -> bool {
        matches!(self, RoomStatus::Trained | RoomStatus::Connected)
    }
}

/// State of the door carried by a wall.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DoorState {
    /// Door is open.
    Open,
    /// Door is closed but passable once opened.
    #[default]
    Closed,
    /// Door refuses to open.
    Locked,
    /// Door is animating open.
    Opening,
    /// Door is animating closed.
    Closing,
}

/// Quadrant of the world lattice a room belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    /// North-east quadrant.
    NorthEast,
    /// North-west quadrant.
    NorthWest,
    /// South-west quadrant.
    SouthWest,
    /// South-east quadrant.
    SouthEast,
}
