//! Edge-indexed storage for the walls shared between adjacent rooms.

use maze_rooms_core::{DoorState, WallKey, WallSide};

/// Existence and door state of a single wall.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WallState {
    door_state: DoorState,
    door_position: Option<u32>,
    wall_exists: bool,
    door_exists: bool,
}

impl WallState {
    /// Current state of the door carried by the wall.
    #[must_use]
    pub const fn door_state(&self) -> DoorState {
        self.door_state
    }

    /// Offset of the door along the wall, once one was assigned.
    #[must_use]
    pub const fn door_position(&self) -> Option<u32> {
        self.door_position
    }

    /// Reports whether the wall is standing.
    #[must_use]
    pub const fn wall_exists(&self) -> bool {
        self.wall_exists
    }

    /// A door only exists inside a standing wall.
    #[must_use]
    pub const fn door_exists(&self) -> bool {
        self.wall_exists && self.door_exists
    }

    /// Reports whether the door refuses to open.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.door_state == DoorState::Locked
    }

    pub(crate) fn assign_door_position(&mut self, position: u32) {
        self.door_position = Some(position);
    }

    /// Returns `true` when the wall was not standing before.
    pub(crate) fn enable_wall(&mut self) -> bool {
        let changed = !self.wall_exists;
        self.wall_exists = true;
        changed
    }

    /// Returns the pair `(wall_removed, door_removed)`.
    pub(crate) fn disable_wall(&mut self) -> (bool, bool) {
        let door_removed = self.door_exists();
        let wall_removed = self.wall_exists;
        self.wall_exists = false;
        self.door_exists = false;
        (wall_removed, door_removed)
    }

    /// Spawns the door when the wall has a door position.
    pub(crate) fn enable_door(&mut self) -> bool {
        if self.door_position.is_none() || self.door_exists {
            return false;
        }
        self.door_exists = true;
        true
    }

    /// Locked doors stay in place.
    pub(crate) fn disable_door(&mut self) -> bool {
        if self.is_locked() || !self.door_exists {
            return false;
        }
        self.door_exists = false;
        true
    }

    pub(crate) fn lock(&mut self) -> bool {
        if self.is_locked() {
            return false;
        }
        self.door_state = DoorState::Locked;
        true
    }

    pub(crate) fn unlock(&mut self) -> bool {
        if !self.is_locked() {
            return false;
        }
        self.door_state = DoorState::Closed;
        true
    }
}

/// Dense wall store covering the room lattice plus one extra row and column.
///
/// The extra row and column hold the North and East walls of the last rooms,
/// which have no neighbour to own them.
#[derive(Debug)]
pub(crate) struct WallLattice {
    span: usize,
    half: i32,
    walls: Vec<WallState>,
}

impl WallLattice {
    pub(crate) fn new(rooms_per_side: usize, half: i32) -> Self {
        let span = rooms_per_side + 1;
        Self {
            span,
            half,
            walls: vec![WallState::default(); span * span * 2],
        }
    }

    pub(crate) fn get(&self, key: WallKey) -> Option<&WallState> {
        self.index(key).and_then(|index| self.walls.get(index))
    }

    pub(crate) fn get_mut(&mut self, key: WallKey) -> Option<&mut WallState> {
        self.index(key).and_then(|index| self.walls.get_mut(index))
    }

    fn index(&self, key: WallKey) -> Option<usize> {
        let x = usize::try_from(key.room().x().checked_add(self.half)?).ok()?;
        let y = usize::try_from(key.room().y().checked_add(self.half)?).ok()?;
        if x >= self.span || y >= self.span {
            return None;
        }
        let side = match key.side() {
            WallSide::South => 0,
            WallSide::West => 1,
        };
        Some((x * self.span + y) * 2 + side)
    }
}
