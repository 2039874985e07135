#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural room generation.
//!
//! [`generate_level`] carves one room: a closed border with one door per
//! wall and random walks of inner walls ("islands"). The [`Generation`]
//! system reacts to build requests emitted by the world, generates each
//! requested room and answers with the commands that store its layout.

mod maze;

pub use maze::{generate_level, generate_level_of_size, GeneratedLevel, WallSegment};

use maze_rooms_core::{Command, Event, GridError, RoomCoord, WorldConfig};
use sha2::{Digest, Sha256};
use tracing::info;

/// A room layout produced in response to a build request.
///
/// Hosts use it to construct wall meshes from [`GeneratedLevel::segments`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuiltRoom {
    /// Room that was generated.
    pub room: RoomCoord,
    /// Generated layout.
    pub level: GeneratedLevel,
}

/// Pure system that generates rooms when the world asks for them.
#[derive(Clone, Copy, Debug)]
pub struct Generation {
    global_seed: u64,
    side: usize,
}

impl Generation {
    /// Creates a generation system for rooms of `side` cells.
    #[must_use]
    pub const fn new(global_seed: u64, side: usize) -> Self {
        Self { global_seed, side }
    }

    /// Creates a generation system matching a world configuration.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.rng_seed, config.room_side())
    }

    /// Seed feeding every room this system generates.
    #[must_use]
    pub const fn global_seed(&self) -> u64 {
        self.global_seed
    }

    /// Generates every room requested in `events`.
    ///
    /// Pushes one [`Command::SetRoomInnerStructure`] per room to `out` and
    /// hands the full layouts to `built`. Each room draws from its own
    /// stream, so a room's layout does not depend on the order in which
    /// rooms are requested.
    pub fn handle(
        &self,
        events: &[Event],
        out: &mut Vec<Command>,
        built: &mut Vec<BuiltRoom>,
    ) -> Result<(), GridError> {
        for event in events {
            let Event::RoomBuildRequested {
                room,
                door_positions,
                complexity,
                density,
            } = event
            else {
                continue;
            };

            let level = generate_level_of_size(
                self.side,
                *density,
                *complexity,
                door_positions.map(Some),
                derive_room_seed(self.global_seed, *room),
            )?;
            info!(room = ?room, bitmask = level.bitmask().get(), "room generated");
            out.push(Command::SetRoomInnerStructure {
                room: *room,
                bitmask: level.bitmask(),
            });
            built.push(BuiltRoom { room: *room, level });
        }
        Ok(())
    }
}

/// Derives the seed of one room's generation stream.
#[must_use]
pub fn derive_room_seed(global_seed: u64, room: RoomCoord) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(global_seed.to_le_bytes());
    hasher.update(room.x().to_le_bytes());
    hasher.update(room.y().to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
