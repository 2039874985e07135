#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative room and wall state for the maze rooms engine.
//!
//! The world owns a lattice of rooms and the walls they share. Rooms own
//! only their South and West walls; wall changes caused by room transitions
//! are queued and reconciled once per [`Command::Tick`].

pub mod layout;
mod perimeter;
mod rooms;
mod update_queue;
mod walls;

use maze_rooms_core::{
    check_unit_interval, Command, Direction, DirectionSet, Event, GridError, GridPosition,
    InnerRoomBitmask, RoomCoord, RoomStatus, WallKey, WorldConfig, DEFAULT_INSET,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use perimeter::{ring_rooms, signed, Perimeter};
use rooms::RoomLattice;
use update_queue::WallUpdateQueue;
use walls::WallLattice;

pub use walls::WallState;

/// Failures raised while mutating or querying the world.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum WorldError {
    /// A room coordinate fell outside the lattice.
    #[error("room {room:?} lies outside the {side}x{side} room lattice")]
    RoomOutOfBounds {
        /// Offending room coordinate.
        room: RoomCoord,
        /// Number of rooms along each lattice edge.
        side: u32,
    },
    /// A wall key fell outside the wall lattice.
    #[error("wall {wall:?} lies outside the wall lattice")]
    WallOutOfBounds {
        /// Offending wall key.
        wall: WallKey,
    },
    /// A tile position fell outside its room.
    #[error("tile {position:?} lies outside rooms of side {side}")]
    TileOutOfBounds {
        /// Offending tile position.
        position: GridPosition,
        /// Number of cells along each room edge.
        side: u32,
    },
    /// An actor left a tile that held no actors.
    #[error("tile {position:?} of room {room:?} has no occupant to remove")]
    OccupancyUnderflow {
        /// Room containing the tile.
        room: RoomCoord,
        /// Tile that was already empty.
        position: GridPosition,
    },
    /// A grid primitive or parameter check failed.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Represents the authoritative room and wall state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    rooms: RoomLattice,
    walls: WallLattice,
    wall_updates: WallUpdateQueue,
    perimeter: Perimeter,
    signal_strength: f32,
    enemy_movement_paused: bool,
    rng: ChaCha8Rng,
    tick_index: u64,
}

impl World {
    /// Creates a world with every room dead and every wall down.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let rooms_per_side = usize::try_from(config.rooms_per_side)
            .map_err(|_| GridError::InvalidArgument("room lattice overflows usize".to_owned()))?;
        let half = signed(config.rooms_per_side / 2);
        let cells = config.room_side() * config.room_side();
        Ok(Self {
            rooms: RoomLattice::new(rooms_per_side, half, cells),
            walls: WallLattice::new(rooms_per_side, half),
            wall_updates: WallUpdateQueue::default(),
            perimeter: Perimeter::new(),
            signal_strength: config.max_signal_strength,
            enemy_movement_paused: false,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            tick_index: 0,
            config,
        })
    }

    /// Records an actor stepping onto a tile, returning the new occupant count.
    ///
    /// Counters are atomic, so actors may report from any thread.
    pub fn actor_entered_tile(
        &self,
        room: RoomCoord,
        position: GridPosition,
    ) -> Result<u32, WorldError> {
        let cell = self.tile_index(position)?;
        self.rooms
            .get(room)
            .and_then(|state| state.enter(cell))
            .ok_or_else(|| self.room_out_of_bounds(room))
    }

    /// Records an actor leaving a tile, returning the remaining occupant count.
    ///
    /// Leaving an empty tile is reported as [`WorldError::OccupancyUnderflow`]
    /// and leaves the counter at zero.
    pub fn actor_exited_tile(
        &self,
        room: RoomCoord,
        position: GridPosition,
    ) -> Result<u32, WorldError> {
        let cell = self.tile_index(position)?;
        let state = self
            .rooms
            .get(room)
            .ok_or_else(|| self.room_out_of_bounds(room))?;
        match state.exit(cell) {
            Some(Ok(remaining)) => Ok(remaining),
            Some(Err(())) => Err(WorldError::OccupancyUnderflow { room, position }),
            None => Err(WorldError::TileOutOfBounds {
                position,
                side: self.config.grid_units_per_room,
            }),
        }
    }

    fn room_out_of_bounds(&self, room: RoomCoord) -> WorldError {
        WorldError::RoomOutOfBounds {
            room,
            side: self.config.rooms_per_side,
        }
    }

    fn check_room(&self, room: RoomCoord) -> Result<(), WorldError> {
        match self.rooms.get(room) {
            Some(_) => Ok(()),
            None => Err(self.room_out_of_bounds(room)),
        }
    }

    fn tile_index(&self, position: GridPosition) -> Result<usize, WorldError> {
        let side = self.config.room_side();
        let out_of_bounds = || WorldError::TileOutOfBounds {
            position,
            side: self.config.grid_units_per_room,
        };
        let x = usize::try_from(position.x()).map_err(|_| out_of_bounds())?;
        let y = usize::try_from(position.y()).map_err(|_| out_of_bounds())?;
        if x >= side || y >= side {
            return Err(out_of_bounds());
        }
        Ok(x * side + y)
    }

    fn wall(&self, key: WallKey) -> Result<&WallState, WorldError> {
        self.walls
            .get(key)
            .ok_or(WorldError::WallOutOfBounds { wall: key })
    }

    fn wall_mut(&mut self, key: WallKey) -> Result<&mut WallState, WorldError> {
        self.walls
            .get_mut(key)
            .ok_or(WorldError::WallOutOfBounds { wall: key })
    }

    /// Queues the room's four walls for reconciliation on the next tick.
    fn flag_walls_for_update(&mut self, room: RoomCoord) {
        for direction in Direction::ALL {
            if self.wall_updates.flag(WallKey::between(room, direction)) {
                debug!(?room, ?direction, "wall flagged for update");
            }
        }
    }

    fn enable_room(
        &mut self,
        room: RoomCoord,
        complexity: f32,
        density: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        check_unit_interval("complexity", complexity)?;
        check_unit_interval("density", density)?;
        let Some(existing) = self.rooms.get(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        if existing.status.exists() {
            return Ok(());
        }

        let max_position = self.config.grid_units_per_room.saturating_sub(2).max(1);
        let mut door_positions = [0u32; 4];
        for direction in Direction::ALL {
            let wall = self
                .walls
                .get_mut(WallKey::between(room, direction))
                .ok_or(WorldError::WallOutOfBounds {
                    wall: WallKey::between(room, direction),
                })?;
            let position = match wall.door_position() {
                Some(position) => position,
                None => {
                    let position = self.rng.gen_range(1..=max_position);
                    wall.assign_door_position(position);
                    position
                }
            };
            door_positions[usize::from(direction.index())] = position;
        }

        let health = self.config.max_room_health;
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        state.initialize(health);
        info!(?room, complexity, density, "room enabled");
        out_events.push(Event::RoomBuildRequested {
            room,
            door_positions,
            complexity,
            density,
        });
        self.flag_walls_for_update(room);
        Ok(())
    }

    fn disable_room(
        &mut self,
        room: RoomCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        if !state.status.exists() {
            return Ok(());
        }
        state.reset();
        info!(?room, "room disabled");
        out_events.push(Event::RoomDestroyed { room });
        self.flag_walls_for_update(room);
        Ok(())
    }

    fn set_room_trained(
        &mut self,
        room: RoomCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        if !state.status.exists() {
            return Ok(());
        }
        if state.status == RoomStatus::Training {
            state.status = RoomStatus::Trained;
            info!(?room, "room trained");
            out_events.push(Event::RoomTrained { room });
        }
        self.flag_walls_for_update(room);
        Ok(())
    }

    fn set_room_connected(
        &mut self,
        room: RoomCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        if !state.status.exists() || state.status == RoomStatus::Connected {
            return Ok(());
        }
        state.status = RoomStatus::Connected;
        info!(?room, "room connected");
        out_events.push(Event::RoomConnected { room });
        self.perimeter.record_connection(room);
        self.flag_walls_for_update(room);
        Ok(())
    }

    /// Rooms of the active ring; fails before any change when part of the
    /// ring falls off the lattice.
    fn active_ring(&self) -> Result<Vec<RoomCoord>, WorldError> {
        let rooms = ring_rooms(self.perimeter.current());
        for room in &rooms {
            self.check_room(*room)?;
        }
        Ok(rooms)
    }

    fn connect_perimeter_rooms(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        for room in self.active_ring()? {
            self.set_room_connected(room, out_events)?;
        }
        Ok(())
    }

    /// Opens the inward doors of every room on the current ring.
    fn generate_perimeter_rooms(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        let _ = self.active_ring()?;
        self.unlock_perimeter_doors(out_events)?;
        let complexity = self.config.perimeter_room_complexity;
        let density = self.config.perimeter_room_density;
        let corner = signed(self.perimeter.current());
        for i in -corner..=corner {
            for (room, direction) in [
                (RoomCoord::new(i, -corner), Direction::East),
                (RoomCoord::new(i, corner), Direction::West),
                (RoomCoord::new(-corner, i), Direction::North),
                (RoomCoord::new(corner, i), Direction::South),
            ] {
                self.open_door(room, direction, complexity, density, out_events)?;
            }
        }
        Ok(())
    }

    fn open_door(
        &mut self,
        room: RoomCoord,
        direction: Direction,
        complexity: f32,
        density: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let neighbour = room.neighbour(direction);
        self.check_room(room)?;
        self.check_room(neighbour)?;
        if self.wall(WallKey::between(room, direction))?.is_locked() {
            debug!(?room, ?direction, "locked door stays shut");
            return Ok(());
        }
        if !self.rooms.exists(room) {
            self.enable_room(room, complexity, density, out_events)?;
        }
        if !self.rooms.exists(neighbour) {
            self.enable_room(neighbour, complexity, density, out_events)?;
        }
        self.flag_walls_for_update(room);
        Ok(())
    }

    fn lock_wall(&mut self, key: WallKey, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        if self.wall_mut(key)?.lock() {
            debug!(wall = ?key, "door locked");
            out_events.push(Event::DoorLocked { wall: key });
        }
        Ok(())
    }

    fn unlock_wall(&mut self, key: WallKey, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        if self.wall_mut(key)?.unlock() {
            debug!(wall = ?key, "door unlocked");
            out_events.push(Event::DoorUnlocked { wall: key });
        }
        Ok(())
    }

    fn unlock_perimeter_doors(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        for room in ring_rooms(self.perimeter.current()) {
            let outward: Vec<Direction> = self.perimeter.outward_doors(room).collect();
            for direction in outward {
                self.unlock_wall(WallKey::between(room, direction), out_events)?;
            }
        }
        Ok(())
    }

    fn lock_door_if_on_perimeter(
        &mut self,
        room: RoomCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if self.rooms.get(room).is_none() {
            return Ok(());
        }
        let outward: Vec<Direction> = self.perimeter.outward_doors(room).collect();
        for direction in outward {
            self.lock_wall(WallKey::between(room, direction), out_events)?;
        }
        Ok(())
    }

    fn destroy_neighbouring_doors(
        &mut self,
        room: RoomCoord,
        directions: DirectionSet,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        self.check_room(room)?;
        for direction in directions.iter() {
            if !self.rooms.exists(room.neighbour(direction)) {
                continue;
            }
            let key = WallKey::between(room, direction);
            if self.wall_mut(key)?.disable_door() {
                out_events.push(Event::DoorDestroyed { wall: key });
            }
        }
        Ok(())
    }

    fn set_room_health(
        &mut self,
        room: RoomCoord,
        health: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if health.is_nan() {
            return Err(GridError::InvalidArgument("room health is NaN".to_owned()).into());
        }
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        state.health = health;
        let exists = state.status.exists();
        out_events.push(Event::RoomHealthChanged { room, health });
        if health <= 0.0 && exists {
            self.disable_room(room, out_events)?;
        }
        Ok(())
    }

    fn set_training_progress(
        &mut self,
        room: RoomCoord,
        progress: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        state.training_progress = progress;
        out_events.push(Event::TrainingProgressUpdated { room, progress });
        for direction in Direction::ALL {
            if self.rooms.exists(room.neighbour(direction)) {
                out_events.push(Event::DoorTrainingProgressUpdated {
                    wall: WallKey::between(room, direction),
                    progress,
                });
            }
        }
        Ok(())
    }

    fn update_signal_strength(
        &mut self,
        delta: f32,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        if delta.is_nan() {
            return Err(GridError::InvalidArgument("signal delta is NaN".to_owned()).into());
        }
        let previous = self.signal_strength;
        self.signal_strength = (previous + delta).clamp(0.0, self.config.max_signal_strength);
        out_events.push(Event::SignalStrengthChanged {
            strength: self.signal_strength,
        });
        if self.signal_strength <= 0.0 && previous > 0.0 {
            warn!("signal lost");
            out_events.push(Event::SignalLost);
        }
        Ok(())
    }

    fn set_inner_structure(
        &mut self,
        room: RoomCoord,
        bitmask: InnerRoomBitmask,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let _ = bitmask.fit(self.config.room_side(), DEFAULT_INSET)?;
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        if !state.status.exists() {
            warn!(?room, "ignoring inner structure for a dead room");
            return Ok(());
        }
        state.inner_structure = Some(bitmask);
        out_events.push(Event::InnerStructureChanged { room, bitmask });
        Ok(())
    }

    fn set_buildable_placed(
        &mut self,
        room: RoomCoord,
        position: GridPosition,
        direction: Direction,
        placed: bool,
    ) -> Result<(), WorldError> {
        let cell = self.tile_index(position)?;
        let Some(state) = self.rooms.get_mut(room) else {
            return Err(self.room_out_of_bounds(room));
        };
        if let Some(slot) = state.buildables.get_mut(cell) {
            if placed {
                slot.insert(direction);
            } else {
                slot.remove(direction);
            }
        }
        Ok(())
    }

    fn tick(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.tick_index = self.tick_index.saturating_add(1);
        if self.perimeter.doors_need_unlock() {
            self.complete_perimeter(out_events)?;
        }
        let batch = self.wall_updates.drain();
        debug!(tick = self.tick_index, walls = batch.len(), "reconciling walls");
        for key in batch {
            self.reconcile_wall(key, out_events)?;
        }
        Ok(())
    }

    fn complete_perimeter(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.unlock_perimeter_doors(out_events)?;
        let completed = self.perimeter.advance();
        info!(perimeter = completed, "perimeter complete");
        self.update_signal_strength(self.config.perimeter_signal_restore, out_events)?;
        out_events.push(Event::PerimeterComplete {
            perimeter: completed,
        });
        Ok(())
    }

    /// Walls stand wherever at least one side is alive; doors stand until
    /// both sides are trained.
    fn reconcile_wall(&mut self, key: WallKey, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        let room = key.room();
        let neighbour = key.neighbour();
        let room_status = self.rooms.status(room);
        let neighbour_status = self.rooms.status(neighbour);
        let wall = self.wall_mut(key)?;

        if !room_status.exists() && !neighbour_status.exists() {
            let (wall_removed, door_removed) = wall.disable_wall();
            if door_removed {
                out_events.push(Event::DoorDestroyed { wall: key });
            }
            if wall_removed {
                out_events.push(Event::WallDestroyed { wall: key });
            }
            return Ok(());
        }

        if wall.enable_wall() {
            out_events.push(Event::WallBuilt { wall: key });
        }
        if room_status.is_trained() && neighbour_status.is_trained() {
            if wall.disable_door() {
                out_events.push(Event::DoorDestroyed { wall: key });
            }
        } else if wall.enable_door() {
            out_events.push(Event::DoorSpawned {
                wall: key,
                position: wall.door_position().unwrap_or_default(),
            });
        }

        self.update_door_lock(key, room_status, neighbour_status, out_events)?;
        self.lock_door_if_on_perimeter(room, out_events)
    }

    /// Doors into dead space stay locked until one side connects; connected
    /// rooms release them unless they guard the active perimeter.
    fn update_door_lock(
        &mut self,
        key: WallKey,
        room_status: RoomStatus,
        neighbour_status: RoomStatus,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let room_connected = room_status == RoomStatus::Connected;
        let neighbour_connected = neighbour_status == RoomStatus::Connected;
        let locked = self.wall(key)?.is_locked();

        if room_connected || neighbour_connected {
            let guards_perimeter = self
                .perimeter
                .door_is_on_perimeter(key.room(), key.side().direction());
            if locked && !guards_perimeter {
                self.unlock_wall(key, out_events)?;
            }
        } else {
            let faces_void = room_status.exists() != neighbour_status.exists();
            if faces_void && !locked {
                self.lock_wall(key, out_events)?;
            }
        }
        Ok(())
    }
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Every coordinate is validated; an out-of-bounds room, wall or tile yields
/// an error instead of touching state.
pub fn apply(
    world: &mut World,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), WorldError> {
    match command {
        Command::EnableRoom {
            room,
            complexity,
            density,
        } => world.enable_room(room, complexity, density, out_events),
        Command::DisableRoom { room } => world.disable_room(room, out_events),
        Command::SetRoomTrained { room } => world.set_room_trained(room, out_events),
        Command::SetRoomConnected { room } => world.set_room_connected(room, out_events),
        Command::ConnectPerimeterRooms => world.connect_perimeter_rooms(out_events),
        Command::GeneratePerimeterRooms => world.generate_perimeter_rooms(out_events),
        Command::OpenDoor {
            room,
            direction,
            complexity,
            density,
        } => world.open_door(room, direction, complexity, density, out_events),
        Command::LockDoor { room, direction } => {
            world.check_room(room)?;
            world.lock_wall(WallKey::between(room, direction), out_events)
        }
        Command::UnlockDoor { room, direction } => {
            world.check_room(room)?;
            world.unlock_wall(WallKey::between(room, direction), out_events)
        }
        Command::DestroyNeighbouringDoors { room, directions } => {
            world.destroy_neighbouring_doors(room, directions, out_events)
        }
        Command::SetRoomHealth { room, health } => world.set_room_health(room, health, out_events),
        Command::UpdateRoomHealth { room, delta } => {
            let current = query::room_health(world, room)?;
            world.set_room_health(room, current + delta, out_events)
        }
        Command::SetTrainingProgress { room, progress } => {
            world.set_training_progress(room, progress, out_events)
        }
        Command::SetSignalPoint { room, position } => {
            let _ = world.tile_index(position)?;
            let Some(state) = world.rooms.get_mut(room) else {
                return Err(world.room_out_of_bounds(room));
            };
            state.signal_point = Some(position);
            Ok(())
        }
        Command::UpdateSignalStrength { delta } => world.update_signal_strength(delta, out_events),
        Command::SetRoomInnerStructure { room, bitmask } => {
            world.set_inner_structure(room, bitmask, out_events)
        }
        Command::SetBuildablePlaced {
            room,
            position,
            direction,
            placed,
        } => world.set_buildable_placed(room, position, direction, placed),
        Command::SetEnemyMovementPaused { paused } => {
            if world.enemy_movement_paused != paused {
                world.enemy_movement_paused = paused;
                out_events.push(Event::EnemyMovementPausedChanged { paused });
            }
            Ok(())
        }
        Command::Tick => world.tick(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use maze_rooms_core::{
        door_cell, CellGrid, CellState, Direction, DirectionSet, DoorState, GridPosition,
        InnerRoomBitmask, Quadrant, RoomCoord, RoomStatus, WallKey, WorldConfig, DEFAULT_INSET,
    };

    use super::{layout, perimeter::signed, rooms::RoomState, World, WorldError, WallState};

    fn room_state(world: &World, room: RoomCoord) -> Result<&RoomState, WorldError> {
        world
            .rooms
            .get(room)
            .ok_or_else(|| world.room_out_of_bounds(room))
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Lifecycle stage of a room.
    pub fn room_status(world: &World, room: RoomCoord) -> Result<RoomStatus, WorldError> {
        room_state(world, room).map(|state| state.status)
    }

    /// Reports whether a room is alive.
    pub fn room_exists(world: &World, room: RoomCoord) -> Result<bool, WorldError> {
        room_status(world, room).map(RoomStatus::exists)
    }

    /// Reports whether a room is trained; connected rooms count as trained.
    pub fn is_room_trained(world: &World, room: RoomCoord) -> Result<bool, WorldError> {
        room_status(world, room).map(RoomStatus::is_trained)
    }

    /// Reports whether a room joined the connected network.
    pub fn is_room_connected(world: &World, room: RoomCoord) -> Result<bool, WorldError> {
        room_status(world, room).map(|status| status == RoomStatus::Connected)
    }

    /// Current health of a room.
    pub fn room_health(world: &World, room: RoomCoord) -> Result<f32, WorldError> {
        room_state(world, room).map(|state| state.health)
    }

    /// Training progress last reported for a room.
    pub fn training_progress(world: &World, room: RoomCoord) -> Result<f32, WorldError> {
        room_state(world, room).map(|state| state.training_progress)
    }

    /// Signal source position recorded for a room.
    pub fn signal_point(world: &World, room: RoomCoord) -> Result<Option<GridPosition>, WorldError> {
        room_state(world, room).map(|state| state.signal_point)
    }

    /// Packed inner layout stored for a room.
    pub fn inner_structure(
        world: &World,
        room: RoomCoord,
    ) -> Result<Option<InnerRoomBitmask>, WorldError> {
        room_state(world, room).map(|state| state.inner_structure)
    }

    /// Every live room in lattice order.
    #[must_use]
    pub fn live_rooms(world: &World) -> Vec<RoomCoord> {
        world
            .rooms
            .coords()
            .filter(|room| world.rooms.exists(*room))
            .collect()
    }

    /// Room adjacent to `room` in `direction`.
    ///
    /// Only `room` is validated; the neighbour may fall off the lattice.
    pub fn neighbouring_room(
        world: &World,
        room: RoomCoord,
        direction: Direction,
    ) -> Result<RoomCoord, WorldError> {
        let _ = room_state(world, room)?;
        Ok(room.neighbour(direction))
    }

    /// Existence of the four neighbours in North, East, South, West order.
    pub fn neighbouring_room_states(world: &World, room: RoomCoord) -> Result<[bool; 4], WorldError> {
        let _ = room_state(world, room)?;
        Ok(Direction::ALL.map(|direction| world.rooms.exists(room.neighbour(direction))))
    }

    /// State of the wall on one side of a room.
    pub fn wall_state(
        world: &World,
        room: RoomCoord,
        direction: Direction,
    ) -> Result<WallState, WorldError> {
        let _ = room_state(world, room)?;
        world.wall(WallKey::between(room, direction)).copied()
    }

    /// Reports whether the wall on one side of a room is standing.
    pub fn wall_exists(world: &World, room: RoomCoord, direction: Direction) -> Result<bool, WorldError> {
        wall_state(world, room, direction).map(|wall| wall.wall_exists())
    }

    /// Reports whether a standing wall carries a door.
    pub fn door_exists(world: &World, room: RoomCoord, direction: Direction) -> Result<bool, WorldError> {
        wall_state(world, room, direction).map(|wall| wall.door_exists())
    }

    /// State of the door on one side of a room.
    pub fn door_state(
        world: &World,
        room: RoomCoord,
        direction: Direction,
    ) -> Result<DoorState, WorldError> {
        wall_state(world, room, direction).map(|wall| wall.door_state())
    }

    /// Reports whether the door on one side of a room can be opened.
    pub fn is_door_unlocked(
        world: &World,
        room: RoomCoord,
        direction: Direction,
    ) -> Result<bool, WorldError> {
        wall_state(world, room, direction).map(|wall| !wall.is_locked())
    }

    /// Grid cell of a door, normalised into the room that owns the cell.
    pub fn door_position(
        world: &World,
        room: RoomCoord,
        direction: Direction,
    ) -> Result<Option<(RoomCoord, GridPosition)>, WorldError> {
        let side = world.config.grid_units_per_room;
        let wall = wall_state(world, room, direction)?;
        Ok(wall.door_position().map(|offset| {
            let cell = door_cell(direction, signed(offset), signed(side));
            layout::wrap_room_position(room, cell, side)
        }))
    }

    /// Door offsets towards each live neighbour, North, East, South, West;
    /// `None` where no neighbour exists.
    pub fn door_positions_for_existing_neighbours(
        world: &World,
        room: RoomCoord,
    ) -> Result<[Option<u32>; 4], WorldError> {
        let neighbours = neighbouring_room_states(world, room)?;
        let mut positions = [None; 4];
        for direction in Direction::ALL {
            let index = usize::from(direction.index());
            if neighbours[index] {
                positions[index] = wall_state(world, room, direction)?.door_position();
            }
        }
        Ok(positions)
    }

    /// Rebuilds a room's full cell grid from its packed layout and doors.
    ///
    /// Rooms without a stored layout report an open interior.
    pub fn room_cell_grid(world: &World, room: RoomCoord) -> Result<CellGrid, WorldError> {
        let state = room_state(world, room)?;
        let side = world.config.room_side();
        let mut grid = CellGrid::filled(side, CellState::Closed);
        state
            .inner_structure
            .unwrap_or_default()
            .write_into(&mut grid, DEFAULT_INSET)?;
        for direction in Direction::ALL {
            let wall = wall_state(world, room, direction)?;
            if let (true, Some(offset)) = (wall.door_exists(), wall.door_position()) {
                let cell = door_cell(direction, signed(offset), signed(world.config.grid_units_per_room));
                grid.set(cell, CellState::Door)?;
            }
        }
        Ok(grid)
    }

    /// Moves an actor standing on `position` can make right now.
    ///
    /// A move must land on an open cell or on an unlocked door with a live
    /// room behind it. Standing on such a door, stepping through it leads
    /// into the neighbour.
    pub fn valid_actions(
        world: &World,
        room: RoomCoord,
        position: GridPosition,
    ) -> Result<DirectionSet, WorldError> {
        let _ = world.tile_index(position)?;
        let grid = room_cell_grid(world, room)?;
        let side = world.config.grid_units_per_room;
        let mut actions = DirectionSet::EMPTY;
        for direction in Direction::ALL {
            let target = DirectionSet::target_for(position, direction);
            let passable = if grid.contains(target) {
                match grid.get(target)? {
                    CellState::Open => true,
                    CellState::Closed => false,
                    CellState::Door => match layout::edge_wall(target, side) {
                        Some(wall) => door_is_passable(world, room, wall)?,
                        None => true,
                    },
                }
            } else {
                leads_into_neighbour(world, room, &grid, position, direction)?
            };
            if passable {
                actions.insert(direction);
            }
        }
        Ok(actions)
    }

    fn door_is_passable(world: &World, room: RoomCoord, wall: Direction) -> Result<bool, WorldError> {
        if !world.rooms.exists(room.neighbour(wall)) {
            return Ok(false);
        }
        let state = wall_state(world, room, wall)?;
        Ok(state.door_exists() && !state.is_locked())
    }

    fn leads_into_neighbour(
        world: &World,
        room: RoomCoord,
        grid: &CellGrid,
        position: GridPosition,
        direction: Direction,
    ) -> Result<bool, WorldError> {
        let side = world.config.grid_units_per_room;
        if !layout::is_on_grid_edge(position, side) || grid.get(position)? != CellState::Door {
            return Ok(false);
        }
        if layout::edge_wall(position, side) != Some(direction)
            || !door_is_passable(world, room, direction)?
        {
            return Ok(false);
        }
        let (neighbour, landing) =
            layout::wrap_room_position(room, DirectionSet::target_for(position, direction), side);
        let cells = room_cell_grid(world, neighbour)?;
        Ok(matches!(cells.get(landing)?, CellState::Open | CellState::Door))
    }

    /// Number of actors standing on a tile.
    pub fn tile_occupancy(
        world: &World,
        room: RoomCoord,
        position: GridPosition,
    ) -> Result<u32, WorldError> {
        let cell = world.tile_index(position)?;
        room_state(world, room).map(|state| state.occupancy(cell).unwrap_or_default())
    }

    /// A tile with no actors on it is empty.
    pub fn tile_is_empty(
        world: &World,
        room: RoomCoord,
        position: GridPosition,
    ) -> Result<bool, WorldError> {
        tile_occupancy(world, room, position).map(|count| count == 0)
    }

    /// Nearest open, unoccupied cell to `from`, searched in a clockwise
    /// square spiral that starts heading North.
    pub fn closest_empty_tile(
        world: &World,
        room: RoomCoord,
        from: GridPosition,
    ) -> Result<Option<GridPosition>, WorldError> {
        let grid = room_cell_grid(world, room)?;
        let _ = world.tile_index(from)?;
        let is_free = |position: GridPosition| -> Result<bool, WorldError> {
            if grid.get(position)? != CellState::Open {
                return Ok(false);
            }
            tile_is_empty(world, room, position)
        };
        if is_free(from)? {
            return Ok(Some(from));
        }

        let limit = signed(world.config.grid_units_per_room).saturating_mul(2);
        let mut position = from;
        let mut direction = Direction::North;
        let mut leg = 1;
        while leg <= limit {
            for _ in 0..leg {
                position = position.step(direction);
                if grid.contains(position) && is_free(position)? {
                    return Ok(Some(position));
                }
            }
            direction = direction.clockwise();
            if matches!(direction, Direction::North | Direction::South) {
                leg += 1;
            }
        }
        Ok(None)
    }

    /// Reports whether a buildable item occupies one side of a cell.
    pub fn is_buildable_placed(
        world: &World,
        room: RoomCoord,
        position: GridPosition,
        direction: Direction,
    ) -> Result<bool, WorldError> {
        let cell = world.tile_index(position)?;
        room_state(world, room).map(|state| {
            state
                .buildables
                .get(cell)
                .is_some_and(|set| set.contains(direction))
        })
    }

    /// Index of the active perimeter ring.
    #[must_use]
    pub fn current_perimeter(world: &World) -> u32 {
        world.perimeter.current()
    }

    /// Rooms of the active ring that connected so far.
    #[must_use]
    pub fn perimeter_rooms_connected(world: &World) -> usize {
        world.perimeter.connected_count()
    }

    /// Number of rooms on the active ring.
    #[must_use]
    pub fn rooms_on_perimeter(world: &World) -> u32 {
        world.perimeter.rooms_on_perimeter()
    }

    /// Number of rooms along one side of the active ring.
    #[must_use]
    pub fn rooms_on_perimeter_side(world: &World) -> u32 {
        world.perimeter.current().saturating_mul(2).saturating_add(1)
    }

    /// Side length, in rooms, of the square enclosed by the active ring's
    /// inner boundary plus one ring.
    #[must_use]
    pub fn perimeter_side_length(world: &World) -> u32 {
        3 + world.perimeter.current().saturating_sub(1).saturating_mul(2)
    }

    /// Reports whether a room lies strictly inside the active ring.
    #[must_use]
    pub fn room_is_within_perimeter(world: &World, room: RoomCoord) -> bool {
        world.perimeter.contains(room)
    }

    /// Reports whether the door of `room` facing `direction` guards the
    /// boundary of the active ring.
    #[must_use]
    pub fn door_is_on_perimeter(world: &World, room: RoomCoord, direction: Direction) -> bool {
        world.perimeter.door_is_on_perimeter(room, direction)
    }

    /// Session signal strength.
    #[must_use]
    pub fn signal_strength(world: &World) -> f32 {
        world.signal_strength
    }

    /// Reports whether enemies are paused.
    #[must_use]
    pub fn enemy_movement_paused(world: &World) -> bool {
        world.enemy_movement_paused
    }

    /// Number of walls awaiting the next tick.
    #[must_use]
    pub fn pending_wall_updates(world: &World) -> usize {
        world.wall_updates.len()
    }

    /// Lattice quadrant containing a room.
    pub fn quadrant(world: &World, room: RoomCoord) -> Result<Quadrant, WorldError> {
        let _ = room_state(world, room)?;
        let quadrant = match (room.x() >= 0, room.y() >= 0) {
            (true, true) => Quadrant::NorthEast,
            (true, false) => Quadrant::NorthWest,
            (false, false) => Quadrant::SouthWest,
            (false, true) => Quadrant::SouthEast,
        };
        Ok(quadrant)
    }

    /// World-space centre of a cell.
    #[must_use]
    pub fn cell_world_position(world: &World, room: RoomCoord, position: GridPosition) -> (f32, f32) {
        layout::cell_world_position(
            room,
            position,
            world.config.grid_units_per_room,
            world.config.grid_unit_length,
        )
    }

    /// Room and cell containing a world-space point.
    #[must_use]
    pub fn room_and_position_for_world(world: &World, x: f32, y: f32) -> (RoomCoord, GridPosition) {
        layout::room_and_position_for_world(
            x,
            y,
            world.config.grid_units_per_room,
            world.config.grid_unit_length,
        )
    }
}
