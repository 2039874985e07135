use serde::{Deserialize, Serialize};

use crate::{bitmask::interior_side, GridError, DEFAULT_INSET};

/// Tunable parameters of the room lattice and its game state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of rooms along each edge of the world lattice.
    pub rooms_per_side: u32,
    /// Number of grid cells along each edge of a room, border included.
    pub grid_units_per_room: u32,
    /// Length of one grid cell in world units.
    pub grid_unit_length: f32,
    /// Health assigned to a freshly enabled room.
    pub max_room_health: f32,
    /// Upper bound of the signal strength; the session starts at this value.
    pub max_signal_strength: f32,
    /// Signal restored whenever a perimeter completes.
    pub perimeter_signal_restore: f32,
    /// Complexity used for rooms spawned by perimeter generation.
    pub perimeter_room_complexity: f32,
    /// Density used for rooms spawned by perimeter generation.
    pub perimeter_room_density: f32,
    /// Seed of the world's random stream for door placement.
    pub rng_seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rooms_per_side: 20,
            grid_units_per_room: 10,
            grid_unit_length: 200.0,
            max_room_health: 100.0,
            max_signal_strength: 100.0,
            perimeter_signal_restore: 100.0,
            perimeter_room_complexity: 0.2,
            perimeter_room_density: 0.2,
            rng_seed: 0,
        }
    }
}

impl WorldConfig {
    /// Checks that the configuration describes a usable world.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.rooms_per_side < 3 {
            return Err(GridError::InvalidArgument(format!(
                "a lattice of {} rooms per side cannot hold the first perimeter",
                self.rooms_per_side
            )));
        }
        if self.grid_units_per_room < 3 {
            return Err(GridError::InvalidArgument(format!(
                "rooms need at least 3 grid units per side, got {}",
                self.grid_units_per_room
            )));
        }
        let side = usize::try_from(self.grid_units_per_room)
            .map_err(|_| GridError::InvalidArgument("room side overflows usize".to_owned()))?;
        let _ = interior_side(side, DEFAULT_INSET)?;

        for (name, value) in [
            ("grid_unit_length", self.grid_unit_length),
            ("max_room_health", self.max_room_health),
            ("max_signal_strength", self.max_signal_strength),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(GridError::InvalidArgument(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.perimeter_signal_restore.is_nan() || self.perimeter_signal_restore < 0.0 {
            return Err(GridError::InvalidArgument(format!(
                "perimeter_signal_restore must not be negative, got {}",
                self.perimeter_signal_restore
            )));
        }
        check_unit_interval("perimeter_room_complexity", self.perimeter_room_complexity)?;
        check_unit_interval("perimeter_room_density", self.perimeter_room_density)
    }

    /// Room side length as a `usize`.
    #[must_use]
    pub fn room_side(&self) -> usize {
        usize::try_from(self.grid_units_per_room).unwrap_or(0)
    }
}

/// Rejects values outside `[0, 1]`, NaN included.
pub fn check_unit_interval(name: &str, value: f32) -> Result<(), GridError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GridError::InvalidArgument(format!(
            "{name} must lie in [0, 1], got {value}"
        )))
    }
}
