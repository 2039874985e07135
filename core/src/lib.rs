#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the maze rooms engine.
//!
//! This crate defines the message surface that connects hosts, the
//! authoritative world, and pure systems. Hosts submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then appends [`Event`] values that hosts and
//! systems poll. The event stream replaces engine callbacks: a host builds or
//! tears down wall and door meshes by reacting to the events it drains.

mod bitmask;
mod config;
mod direction;
mod grid;

pub use bitmask::{interior_side, InnerRoomBitmask, DEFAULT_INSET, MAX_INNER_SIDE};
pub use config::{check_unit_interval, WorldConfig};
pub use direction::{Direction, DirectionSet, DIRECTION_DELIMITER, EMPTY_DIRECTION_SET_TOKEN};
pub use grid::{
    door_cell, CellGrid, CellState, DoorState, GridPosition, Quadrant, RoomCoord, RoomStatus, WallKey,
    WallSide,
};

/// Failures raised by grid primitives and the bitmask codec.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// A cell position fell outside its grid.
    #[error("position ({x}, {y}) lies outside a grid of side {side}")]
    OutOfBounds {
        /// Requested coordinate along the North/South axis.
        x: i32,
        /// Requested coordinate along the East/West axis.
        y: i32,
        /// Side length of the grid that was accessed.
        side: usize,
    },
    /// A parameter was outside its permitted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A room interior does not fit the packed bitmask.
    #[error("interior side {required} exceeds the bitmask capacity of {capacity}")]
    CapacityExceeded {
        /// Interior side length that was requested.
        required: usize,
        /// Largest interior side length the mask can hold.
        capacity: usize,
    },
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Brings a dead room to life in the training stage.
    EnableRoom {
        /// Room to enable.
        room: RoomCoord,
        /// Random walk length factor for the room's inner walls, in `[0, 1]`.
        complexity: f32,
        /// Island count factor for the room's inner walls, in `[0, 1]`.
        density: f32,
    },
    /// Returns a room to the dead stage.
    DisableRoom {
        /// Room to disable.
        room: RoomCoord,
    },
    /// Marks a room's policy as converged.
    SetRoomTrained {
        /// Room whose training finished.
        room: RoomCoord,
    },
    /// Joins a room to the connected network.
    SetRoomConnected {
        /// Room to connect.
        room: RoomCoord,
    },
    /// Connects every room on the current perimeter ring.
    ConnectPerimeterRooms,
    /// Opens the doors into the current perimeter ring, enabling its rooms.
    GeneratePerimeterRooms,
    /// Reports that an actor opened the door on one side of a room.
    OpenDoor {
        /// Room the door belongs to.
        room: RoomCoord,
        /// Side of the room holding the door.
        direction: Direction,
        /// Complexity used for rooms enabled by the opening.
        complexity: f32,
        /// Density used for rooms enabled by the opening.
        density: f32,
    },
    /// Locks the door on one side of a room.
    LockDoor {
        /// Room the door belongs to.
        room: RoomCoord,
        /// Side of the room holding the door.
        direction: Direction,
    },
    /// Unlocks the door on one side of a room.
    UnlockDoor {
        /// Room the door belongs to.
        room: RoomCoord,
        /// Side of the room holding the door.
        direction: Direction,
    },
    /// Removes the doors shared with existing neighbours in the flagged directions.
    DestroyNeighbouringDoors {
        /// Room whose doors are removed.
        room: RoomCoord,
        /// Directions whose doors should go.
        directions: DirectionSet,
    },
    /// Overwrites a room's health.
    SetRoomHealth {
        /// Room to update.
        room: RoomCoord,
        /// New health value.
        health: f32,
    },
    /// Adjusts a room's health by a signed delta.
    UpdateRoomHealth {
        /// Room to update.
        room: RoomCoord,
        /// Amount added to the current health.
        delta: f32,
    },
    /// Records how far a room's training has progressed.
    SetTrainingProgress {
        /// Room being trained.
        room: RoomCoord,
        /// Fraction of training completed.
        progress: f32,
    },
    /// Records the grid position of a room's signal source.
    SetSignalPoint {
        /// Room holding the signal.
        room: RoomCoord,
        /// Grid position of the signal inside the room.
        position: GridPosition,
    },
    /// Adjusts the session's signal strength by a signed delta.
    UpdateSignalStrength {
        /// Amount added to the current strength.
        delta: f32,
    },
    /// Stores the packed inner layout generated for a room.
    SetRoomInnerStructure {
        /// Room the layout belongs to.
        room: RoomCoord,
        /// Packed interior cells.
        bitmask: InnerRoomBitmask,
    },
    /// Records whether a buildable item occupies one side of a cell.
    SetBuildablePlaced {
        /// Room containing the cell.
        room: RoomCoord,
        /// Cell holding the item.
        position: GridPosition,
        /// Side of the cell the item occupies.
        direction: Direction,
        /// Whether the item is present.
        placed: bool,
    },
    /// Pauses or resumes enemy movement.
    SetEnemyMovementPaused {
        /// Whether enemies should stop moving.
        paused: bool,
    },
    /// Advances the world by one frame, draining deferred wall updates.
    Tick,
}

/// Events appended by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Asks the host to build a room's geometry and generate its layout.
    RoomBuildRequested {
        /// Room that came to life.
        room: RoomCoord,
        /// Door positions along the North, East, South and West walls.
        door_positions: [u32; 4],
        /// Complexity recorded for the room.
        complexity: f32,
        /// Density recorded for the room.
        density: f32,
    },
    /// Announces that a room returned to the dead stage.
    RoomDestroyed {
        /// Room that died.
        room: RoomCoord,
    },
    /// Announces that a room finished training.
    RoomTrained {
        /// Room that converged.
        room: RoomCoord,
    },
    /// Announces that a room joined the connected network.
    RoomConnected {
        /// Room that connected.
        room: RoomCoord,
    },
    /// Reports a new health value for a room.
    RoomHealthChanged {
        /// Room whose health changed.
        room: RoomCoord,
        /// Health after the change.
        health: f32,
    },
    /// Reports a room's training progress.
    TrainingProgressUpdated {
        /// Room being trained.
        room: RoomCoord,
        /// Fraction of training completed.
        progress: f32,
    },
    /// Reports training progress on a door shared with a live neighbour.
    DoorTrainingProgressUpdated {
        /// Wall carrying the door.
        wall: WallKey,
        /// Fraction of training completed.
        progress: f32,
    },
    /// Reports that a room's packed layout was stored.
    InnerStructureChanged {
        /// Room whose layout changed.
        room: RoomCoord,
        /// Packed interior cells.
        bitmask: InnerRoomBitmask,
    },
    /// Asks the host to build a wall.
    WallBuilt {
        /// Wall to build.
        wall: WallKey,
    },
    /// Asks the host to remove a wall.
    WallDestroyed {
        /// Wall to remove.
        wall: WallKey,
    },
    /// Asks the host to spawn a door in a wall.
    DoorSpawned {
        /// Wall receiving the door.
        wall: WallKey,
        /// Offset of the door along the wall.
        position: u32,
    },
    /// Asks the host to remove a door.
    DoorDestroyed {
        /// Wall losing its door.
        wall: WallKey,
    },
    /// Reports that a door became locked.
    DoorLocked {
        /// Wall carrying the door.
        wall: WallKey,
    },
    /// Reports that a door was unlocked.
    DoorUnlocked {
        /// Wall carrying the door.
        wall: WallKey,
    },
    /// Announces that every room of a perimeter ring connected.
    PerimeterComplete {
        /// Ring index that completed.
        perimeter: u32,
    },
    /// Reports the session's signal strength after a change.
    SignalStrengthChanged {
        /// Strength after clamping.
        strength: f32,
    },
    /// Announces that the signal strength dropped to zero.
    SignalLost,
    /// Reports that enemy movement was paused or resumed.
    EnemyMovementPausedChanged {
        /// Whether enemies are paused.
        paused: bool,
    },
}
