//! Geometry helpers mapping between rooms, grid cells and world space.
//!
//! Adjacent rooms share their border cells, so the last cell of one room is
//! the first cell of the next and room strides are `side - 1` cells long.

use maze_rooms_core::{Direction, GridPosition, RoomCoord};

/// Normalises a position that may have left its room into the room that
/// actually contains it.
#[must_use]
pub fn wrap_room_position(
    room: RoomCoord,
    position: GridPosition,
    side: u32,
) -> (RoomCoord, GridPosition) {
    let stride = stride(side);
    let room = RoomCoord::new(
        room.x().saturating_add(position.x().div_euclid(stride)),
        room.y().saturating_add(position.y().div_euclid(stride)),
    );
    let position = GridPosition::new(
        position.x().rem_euclid(stride),
        position.y().rem_euclid(stride),
    );
    (room, position)
}

/// Reports whether the position lies on the room's border ring.
#[must_use]
pub fn is_on_grid_edge(position: GridPosition, side: u32) -> bool {
    edge_wall(position, side).is_some()
}

/// Wall a border position belongs to, checking the North/South axis first.
#[must_use]
pub fn edge_wall(position: GridPosition, side: u32) -> Option<Direction> {
    let last = stride(side);
    if position.x() == 0 {
        Some(Direction::South)
    } else if position.x() == last {
        Some(Direction::North)
    } else if position.y() == 0 {
        Some(Direction::West)
    } else if position.y() == last {
        Some(Direction::East)
    } else {
        None
    }
}

/// World-space centre of a cell.
///
/// The centre room's middle cell sits on the world origin.
#[must_use]
pub fn cell_world_position(
    room: RoomCoord,
    position: GridPosition,
    side: u32,
    unit_length: f32,
) -> (f32, f32) {
    let half = half(side);
    let stride = stride(side);
    let axis = |room: i32, cell: i32| {
        let global = room.saturating_mul(stride).saturating_add(cell - half);
        (global as f32 + 0.5) * unit_length
    };
    (axis(room.x(), position.x()), axis(room.y(), position.y()))
}

/// Room and cell containing a world-space point.
#[must_use]
pub fn room_and_position_for_world(
    world_x: f32,
    world_y: f32,
    side: u32,
    unit_length: f32,
) -> (RoomCoord, GridPosition) {
    let half = half(side);
    let axis = |value: f32| ((value / unit_length).floor() as i32).saturating_add(half);
    wrap_room_position(
        RoomCoord::ORIGIN,
        GridPosition::new(axis(world_x), axis(world_y)),
        side,
    )
}

fn stride(side: u32) -> i32 {
    i32::try_from(side).unwrap_or(i32::MAX).saturating_sub(1).max(1)
}

fn half(side: u32) -> i32 {
    i32::try_from(side / 2).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_moves_shared_border_into_next_room() {
        let (room, cell) = wrap_room_position(RoomCoord::ORIGIN, GridPosition::new(9, 4), 10);
        assert_eq!(room, RoomCoord::new(1, 0));
        assert_eq!(cell, GridPosition::new(0, 4));

        let (room, cell) = wrap_room_position(RoomCoord::ORIGIN, GridPosition::new(3, -1), 10);
        assert_eq!(room, RoomCoord::new(0, -1));
        assert_eq!(cell, GridPosition::new(3, 8));
    }

    #[test]
    fn edge_cells_map_to_walls() {
        assert_eq!(edge_wall(GridPosition::new(0, 4), 10), Some(Direction::South));
        assert_eq!(edge_wall(GridPosition::new(9, 4), 10), Some(Direction::North));
        assert_eq!(edge_wall(GridPosition::new(4, 0), 10), Some(Direction::West));
        assert_eq!(edge_wall(GridPosition::new(4, 9), 10), Some(Direction::East));
        assert!(!is_on_grid_edge(GridPosition::new(4, 4), 10));
    }

    #[test]
    fn world_positions_invert() {
        let room = RoomCoord::new(-2, 3);
        let cell = GridPosition::new(4, 7);
        let (x, y) = cell_world_position(room, cell, 10, 200.0);
        assert_eq!(room_and_position_for_world(x, y, 10, 200.0), (room, cell));
    }

    #[test]
    fn origin_cell_straddles_world_origin() {
        let (x, y) = cell_world_position(RoomCoord::ORIGIN, GridPosition::new(5, 5), 10, 200.0);
        assert_eq!((x, y), (100.0, 100.0));
    }
}
