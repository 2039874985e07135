use std::collections::BTreeSet;

use maze_rooms_core::{Direction, RoomCoord};
use tracing::debug;

/// Ring-by-ring progression state.
///
/// Perimeter `P` is the ring of rooms at Chebyshev distance `P` from the
/// centre. Its outward doors stay locked until all `8P` of its rooms connect.
#[derive(Debug)]
pub(crate) struct Perimeter {
    current: u32,
    connected: BTreeSet<RoomCoord>,
    doors_need_unlock: bool,
}

impl Perimeter {
    pub(crate) fn new() -> Self {
        Self {
            current: 1,
            connected: BTreeSet::new(),
            doors_need_unlock: false,
        }
    }

    pub(crate) const fn current(&self) -> u32 {
        self.current
    }

    pub(crate) fn connected_count(&self) -> usize {
        self.connected.len()
    }

    pub(crate) const fn doors_need_unlock(&self) -> bool {
        self.doors_need_unlock
    }

    pub(crate) const fn rooms_on_perimeter(&self) -> u32 {
        self.current.saturating_mul(8)
    }

    /// Counts a connection towards the current ring.
    ///
    /// Rooms off the ring, or already counted, leave the tally unchanged.
    pub(crate) fn record_connection(&mut self, room: RoomCoord) {
        if room.ring() != self.current {
            debug!(?room, perimeter = self.current, "connection outside the active ring");
            return;
        }
        if !self.connected.insert(room) {
            return;
        }
        let required = usize::try_from(self.rooms_on_perimeter()).unwrap_or(usize::MAX);
        if self.connected.len() >= required {
            self.doors_need_unlock = true;
        }
    }

    /// Moves to the next ring, returning the ring that completed.
    pub(crate) fn advance(&mut self) -> u32 {
        let completed = self.current;
        self.current = self.current.saturating_add(1);
        self.connected.clear();
        self.doors_need_unlock = false;
        completed
    }

    pub(crate) fn contains(&self, room: RoomCoord) -> bool {
        room.ring() < self.current
    }

    /// Reports whether the door of `room` facing `direction` lies on the
    /// boundary between the active ring and the ring beyond it.
    pub(crate) fn door_is_on_perimeter(&self, room: RoomCoord, direction: Direction) -> bool {
        let inner = signed(self.current);
        let outer = inner.saturating_add(1);
        match direction {
            Direction::North => room.x() == inner || room.x() == -outer,
            Direction::South => room.x() == outer || room.x() == -inner,
            Direction::East => room.y() == inner || room.y() == -outer,
            Direction::West => room.y() == outer || room.y() == -inner,
        }
    }

    /// Outward-facing doors of `room` when it sits on the active ring.
    pub(crate) fn outward_doors(&self, room: RoomCoord) -> impl Iterator<Item = Direction> {
        let ring = signed(self.current);
        Direction::ALL.into_iter().filter(move |direction| match direction {
            Direction::North => room.x() == ring,
            Direction::East => room.y() == ring,
            Direction::South => room.x() == -ring,
            Direction::West => room.y() == -ring,
        })
    }
}

/// Rooms of ring `ring`, walking each side once without repeating corners.
pub(crate) fn ring_rooms(ring: u32) -> Vec<RoomCoord> {
    let ring = signed(ring);
    if ring == 0 {
        return vec![RoomCoord::ORIGIN];
    }
    let mut rooms = Vec::new();
    for i in -ring..ring {
        rooms.push(RoomCoord::new(i, -ring));
    }
    for i in -ring..ring {
        rooms.push(RoomCoord::new(ring, i));
    }
    for i in (-ring + 1..=ring).rev() {
        rooms.push(RoomCoord::new(i, ring));
    }
    for i in (-ring + 1..=ring).rev() {
        rooms.push(RoomCoord::new(-ring, i));
    }
    rooms
}

pub(crate) fn signed(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
