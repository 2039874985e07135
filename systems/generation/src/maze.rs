use maze_rooms_core::{
    check_unit_interval, door_cell, interior_side, CellGrid, CellState, Direction, GridError,
    GridPosition, InnerRoomBitmask, DEFAULT_INSET,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Straight run of closed cells produced by one island walk.
///
/// Renderers build one wall mesh per segment instead of one per cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallSegment {
    /// First closed cell of the run.
    pub start: GridPosition,
    /// Last closed cell of the run.
    pub end: GridPosition,
    /// Direction the walk travelled from `start` to `end`.
    pub direction: Direction,
}

/// A generated room layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedLevel {
    grid: CellGrid,
    bitmask: InnerRoomBitmask,
    segments: Vec<WallSegment>,
    door_positions: [u32; 4],
}

impl GeneratedLevel {
    /// Full cell grid, border and doors included.
    #[must_use]
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Packed interior of the grid.
    #[must_use]
    pub const fn bitmask(&self) -> InnerRoomBitmask {
        self.bitmask
    }

    /// Wall runs in the order the walks produced them.
    #[must_use]
    pub fn segments(&self) -> &[WallSegment] {
        &self.segments
    }

    /// Door offsets along the North, East, South and West walls.
    #[must_use]
    pub const fn door_positions(&self) -> [u32; 4] {
        self.door_positions
    }

    /// Door offset on one wall.
    #[must_use]
    pub const fn door_position(&self, direction: Direction) -> u32 {
        self.door_positions[direction.index() as usize]
    }
}

/// Generates a room of `side` cells with one door per wall and random
/// inner walls.
///
/// `existing_doors` holds door offsets inherited from neighbouring rooms in
/// North, East, South, West order. An offset strictly inside its wall is
/// kept, anything else is replaced by a fresh draw from `[1, side - 2]`.
///
/// `density` scales the number of islands and `complexity` the length of
/// each island's walk. Both must lie in `[0, 1]`.
pub fn generate_level<R: Rng + ?Sized>(
    side: usize,
    density: f32,
    complexity: f32,
    existing_doors: [Option<u32>; 4],
    rng: &mut R,
) -> Result<GeneratedLevel, GridError> {
    check_unit_interval("density", density)?;
    check_unit_interval("complexity", complexity)?;
    if side < 3 {
        return Err(GridError::InvalidArgument(format!(
            "a room needs at least 3 cells per side, got {side}"
        )));
    }
    let _ = interior_side(side, DEFAULT_INSET)?;
    let side_i32 = i32::try_from(side)
        .map_err(|_| GridError::InvalidArgument(format!("side {side} overflows i32")))?;
    let last = side_i32 - 1;

    let mut door_positions = [0u32; 4];
    for direction in Direction::ALL {
        let slot = usize::from(direction.index());
        door_positions[slot] = match existing_doors[slot] {
            Some(offset) if offset > 0 && i64::from(offset) < i64::from(last) => offset,
            _ => rng.gen_range(1..=last.unsigned_abs() - 1),
        };
    }

    let mut grid = CellGrid::new(side);
    for x in 0..side_i32 {
        for y in 0..side_i32 {
            if x == 0 || x == last || y == 0 || y == last {
                grid.set(GridPosition::new(x, y), CellState::Closed)?;
            }
        }
    }
    for direction in Direction::ALL {
        let offset = door_positions[usize::from(direction.index())];
        let offset = i32::try_from(offset)
            .map_err(|_| GridError::InvalidArgument(format!("door offset {offset} overflows i32")))?;
        grid.set(door_cell(direction, offset, side_i32), CellState::Door)?;
    }

    let segments = grow_islands(&mut grid, density, complexity, rng)?;
    let bitmask = InnerRoomBitmask::from_grid(&grid, DEFAULT_INSET)?;
    debug!(
        side,
        density,
        complexity,
        segments = segments.len(),
        closed = grid.count(CellState::Closed),
        "generated room layout"
    );

    Ok(GeneratedLevel {
        grid,
        bitmask,
        segments,
        door_positions,
    })
}

/// Generates a room from a dedicated ChaCha stream seeded with `seed`.
///
/// Identical arguments always yield an identical level.
pub fn generate_level_of_size(
    side: usize,
    density: f32,
    complexity: f32,
    existing_doors: [Option<u32>; 4],
    seed: u64,
) -> Result<GeneratedLevel, GridError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    generate_level(side, density, complexity, existing_doors, &mut rng)
}

fn grow_islands<R: Rng + ?Sized>(
    grid: &mut CellGrid,
    density: f32,
    complexity: f32,
    rng: &mut R,
) -> Result<Vec<WallSegment>, GridError> {
    let side = grid.side() as f32;
    let islands = (density * (side / 2.0).powi(2)).floor() as usize;
    let steps = (complexity * 10.0 * side).floor() as usize;
    let even_slots = i32::try_from((grid.side() - 1) / 2).unwrap_or(0);

    let mut segments = Vec::new();
    for _ in 0..islands {
        let origin = GridPosition::new(
            rng.gen_range(0..=even_slots) * 2,
            rng.gen_range(0..=even_slots) * 2,
        );
        if grid.get(origin)? != CellState::Open || touches_door(grid, origin) {
            continue;
        }

        let mut current = origin;
        let mut open_segment: Option<WallSegment> = None;
        for _ in 0..steps {
            let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
            let middle = current.step(direction);
            let target = current.step_by(direction, 2);
            if !is_free(grid, middle) || !is_free(grid, target) {
                break;
            }
            for cell in [current, middle, target] {
                grid.set(cell, CellState::Closed)?;
            }

            match open_segment.as_mut() {
                Some(segment) if segment.direction == direction => segment.end = target,
                _ => {
                    let turned = open_segment.replace(WallSegment {
                        start: current,
                        end: target,
                        direction,
                    });
                    segments.extend(turned);
                }
            }
            current = target;
        }
        segments.extend(open_segment);
    }
    Ok(segments)
}

fn is_free(grid: &CellGrid, cell: GridPosition) -> bool {
    matches!(grid.get(cell), Ok(CellState::Open)) && !touches_door(grid, cell)
}

fn touches_door(grid: &CellGrid, cell: GridPosition) -> bool {
    Direction::ALL
        .into_iter()
        .any(|direction| matches!(grid.get(cell.step(direction)), Ok(CellState::Door)))
}
