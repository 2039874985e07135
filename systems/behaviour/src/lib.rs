#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Behaviour policies that steer actors through rooms.
//!
//! A policy maps (room, target cell, current cell) to the set of directions
//! that lead towards the target. Policies are produced by an external
//! trainer; the [`Trainer`] system installs finished policies into a
//! [`BehaviourStore`] and tells the world that the room is trained.

mod store;

use std::collections::BTreeSet;

use maze_rooms_codec::CodecError;
use maze_rooms_core::{Command, Event, GridPosition, RoomCoord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use store::{target_file_name, BehaviourMap, BehaviourStore};

/// Failures raised by the behaviour store.
#[derive(Debug, thiserror::Error)]
pub enum BehaviourError {
    /// The room lies outside the world lattice.
    #[error("room {room:?} lies outside the lattice")]
    RoomOutOfBounds {
        /// Requested room.
        room: RoomCoord,
    },
    /// A target or current position lies outside the room.
    #[error("position {position:?} lies outside a room of side {side}")]
    PositionOutOfBounds {
        /// Requested position.
        position: GridPosition,
        /// Room side length.
        side: usize,
    },
    /// A map does not match the room size.
    #[error("behaviour map has side {found}, expected {expected}")]
    ShapeMismatch {
        /// Expected side length.
        expected: usize,
        /// Side length that was supplied.
        found: usize,
    },
    /// No policy is installed for the room and target.
    #[error("no policy installed for target {target:?} in room {room:?}")]
    MissingPolicy {
        /// Requested room.
        room: RoomCoord,
        /// Requested target.
        target: GridPosition,
    },
    /// Reading or writing policy files failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Limits of the actor walks that follow installed policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParameters {
    /// Walks started from each door cell of a trained room.
    pub episodes_per_start: u32,
    /// Move limit of one walk.
    pub max_moves_per_episode: u32,
}

impl Default for TrainingParameters {
    fn default() -> Self {
        Self {
            episodes_per_start: 50,
            max_moves_per_episode: 100,
        }
    }
}

/// Policy produced by the trainer for every target of one room.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainedPolicy {
    /// Room the policy belongs to.
    pub room: RoomCoord,
    /// One map per trained target.
    pub maps: Vec<(GridPosition, BehaviourMap)>,
}

/// Pure system handing rooms to the trainer and installing its results.
#[derive(Debug, Default)]
pub struct Trainer {
    awaiting: BTreeSet<RoomCoord>,
}

impl Trainer {
    /// Creates a trainer system with no pending rooms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rooms built but not yet trained, sorted.
    #[must_use]
    pub fn awaiting(&self) -> Vec<RoomCoord> {
        self.awaiting.iter().copied().collect()
    }

    /// Tracks room lifecycle events and installs finished policies.
    ///
    /// Each accepted policy replaces the room's maps in `store` and pushes
    /// [`Command::SetRoomTrained`]. Policies for rooms that died or were
    /// never requested are dropped.
    pub fn handle(
        &mut self,
        events: &[Event],
        completed: Vec<TrainedPolicy>,
        store: &mut BehaviourStore,
        out: &mut Vec<Command>,
    ) -> Result<(), BehaviourError> {
        for event in events {
            match event {
                Event::RoomBuildRequested { room, .. } => {
                    let _ = self.awaiting.insert(*room);
                }
                Event::RoomDestroyed { room } => {
                    let _ = self.awaiting.remove(room);
                    let dropped = store.clear_room(*room);
                    if dropped > 0 {
                        info!(room = ?room, dropped, "policy of destroyed room dropped");
                    }
                }
                _ => {}
            }
        }

        for policy in completed {
            if !self.awaiting.contains(&policy.room) {
                warn!(room = ?policy.room, "ignoring policy for a room that is not awaiting training");
                continue;
            }
            let _ = store.replace_room(policy.room, policy.maps)?;
            let _ = self.awaiting.remove(&policy.room);
            out.push(Command::SetRoomTrained { room: policy.room });
        }
        Ok(())
    }
}
