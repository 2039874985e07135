use std::sync::atomic::{AtomicU32, Ordering};

use maze_rooms_core::{DirectionSet, GridPosition, InnerRoomBitmask, RoomCoord, RoomStatus};

/// Per-room record; every lattice slot is allocated up front in the dead stage.
#[derive(Debug)]
pub(crate) struct RoomState {
    pub(crate) status: RoomStatus,
    pub(crate) health: f32,
    pub(crate) training_progress: f32,
    pub(crate) signal_point: Option<GridPosition>,
    pub(crate) inner_structure: Option<InnerRoomBitmask>,
    pub(crate) buildables: Vec<DirectionSet>,
    occupancy: Vec<AtomicU32>,
}

impl RoomState {
    fn new(cells: usize) -> Self {
        Self {
            status: RoomStatus::Dead,
            health: 0.0,
            training_progress: 0.0,
            signal_point: None,
            inner_structure: None,
            buildables: vec![DirectionSet::EMPTY; cells],
            occupancy: (0..cells).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    pub(crate) fn initialize(&mut self, health: f32) {
        self.status = RoomStatus::Training;
        self.health = health;
        self.training_progress = 0.0;
    }

    /// Occupancy counters survive; actors may still stand in a dead room.
    pub(crate) fn reset(&mut self) {
        self.status = RoomStatus::Dead;
        self.health = 0.0;
        self.training_progress = 0.0;
        self.inner_structure = None;
    }

    pub(crate) fn occupancy(&self, cell: usize) -> Option<u32> {
        self.occupancy
            .get(cell)
            .map(|counter| counter.load(Ordering::Acquire))
    }

    pub(crate) fn enter(&self, cell: usize) -> Option<u32> {
        self.occupancy
            .get(cell)
            .map(|counter| counter.fetch_add(1, Ordering::AcqRel).saturating_add(1))
    }

    /// Yields `Some(Err(()))` when the tile was already empty.
    pub(crate) fn exit(&self, cell: usize) -> Option<Result<u32, ()>> {
        let counter = self.occupancy.get(cell)?;
        let result = counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            })
            .map(|previous| previous - 1)
            .map_err(|_| ());
        Some(result)
    }
}

/// Dense room store indexed by centred coordinates.
#[derive(Debug)]
pub(crate) struct RoomLattice {
    side: usize,
    half: i32,
    rooms: Vec<RoomState>,
}

impl RoomLattice {
    pub(crate) fn new(side: usize, half: i32, cells_per_room: usize) -> Self {
        Self {
            side,
            half,
            rooms: (0..side * side)
                .map(|_| RoomState::new(cells_per_room))
                .collect(),
        }
    }

    pub(crate) fn get(&self, room: RoomCoord) -> Option<&RoomState> {
        self.index(room).and_then(|index| self.rooms.get(index))
    }

    pub(crate) fn get_mut(&mut self, room: RoomCoord) -> Option<&mut RoomState> {
        self.index(room).and_then(|index| self.rooms.get_mut(index))
    }

    /// Rooms outside the lattice never exist.
    pub(crate) fn status(&self, room: RoomCoord) -> RoomStatus {
        self.get(room).map_or(RoomStatus::Dead, |state| state.status)
    }

    pub(crate) fn exists(&self, room: RoomCoord) -> bool {
        self.status(room).exists()
    }

    pub(crate) fn coords(&self) -> impl Iterator<Item = RoomCoord> + '_ {
        let side = i32::try_from(self.side).unwrap_or(0);
        (0..side).flat_map(move |x| {
            (0..side).map(move |y| RoomCoord::new(x - self.half, y - self.half))
        })
    }

    fn index(&self, room: RoomCoord) -> Option<usize> {
        let x = usize::try_from(room.x().checked_add(self.half)?).ok()?;
        let y = usize::try_from(room.y().checked_add(self.half)?).ok()?;
        if x < self.side && y < self.side {
            Some(x * self.side + y)
        } else {
            None
        }
    }
}
