use std::{collections::HashMap, path::Path};

use maze_rooms_codec::{
    parse_direction_grid, read_direction_grid_file, write_direction_grid_file, CodecError,
};
use maze_rooms_core::{Direction, DirectionSet, GridPosition, RoomCoord, WorldConfig};
use rand::Rng;
use tracing::{debug, info};

use crate::BehaviourError;

/// Viable next-step directions for every cell of a room, towards one target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BehaviourMap {
    side: usize,
    cells: Vec<DirectionSet>,
}

impl BehaviourMap {
    /// Creates a map with no viable direction anywhere.
    #[must_use]
    pub fn new(side: usize) -> Self {
        Self {
            side,
            cells: vec![DirectionSet::EMPTY; side * side],
        }
    }

    /// Builds a map from rows indexed by grid `x`.
    pub fn from_rows(rows: Vec<Vec<DirectionSet>>) -> Result<Self, BehaviourError> {
        let side = rows.len();
        if let Some(row) = rows.iter().find(|row| row.len() != side) {
            return Err(BehaviourError::ShapeMismatch {
                expected: side,
                found: row.len(),
            });
        }
        Ok(Self {
            side,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Parses a map stored in the direction-grid text format.
    pub fn parse(text: &str, invert_x: bool) -> Result<Self, BehaviourError> {
        Self::from_rows(parse_direction_grid(text, invert_x)?)
    }

    /// Number of cells along each edge.
    #[must_use]
    pub const fn side(&self) -> usize {
        self.side
    }

    /// Directions stored for one cell.
    pub fn get(&self, position: GridPosition) -> Result<DirectionSet, BehaviourError> {
        Ok(self.cells[self.index(position)?])
    }

    /// Overwrites the directions stored for one cell.
    pub fn set(&mut self, position: GridPosition, actions: DirectionSet) -> Result<(), BehaviourError> {
        let index = self.index(position)?;
        self.cells[index] = actions;
        Ok(())
    }

    /// Rows indexed by grid `x`, as stored on disk.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<DirectionSet>> {
        if self.side == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.side).map(<[_]>::to_vec).collect()
    }

    fn index(&self, position: GridPosition) -> Result<usize, BehaviourError> {
        let out_of_bounds = || BehaviourError::PositionOutOfBounds {
            position,
            side: self.side,
        };
        let x = usize::try_from(position.x()).map_err(|_| out_of_bounds())?;
        let y = usize::try_from(position.y()).map_err(|_| out_of_bounds())?;
        if x < self.side && y < self.side {
            Ok(x * self.side + y)
        } else {
            Err(out_of_bounds())
        }
    }
}

/// Trained policies of every room, keyed by room and target cell.
#[derive(Clone, Debug)]
pub struct BehaviourStore {
    rooms_per_side: u32,
    room_side: usize,
    maps: HashMap<(RoomCoord, GridPosition), BehaviourMap>,
    explorations: HashMap<(RoomCoord, GridPosition, GridPosition), u32>,
}

impl BehaviourStore {
    /// Creates an empty store for a lattice of `rooms_per_side` rooms of
    /// `room_side` cells each.
    #[must_use]
    pub fn new(rooms_per_side: u32, room_side: usize) -> Self {
        Self {
            rooms_per_side,
            room_side,
            maps: HashMap::new(),
            explorations: HashMap::new(),
        }
    }

    /// Creates an empty store shaped like the configured world.
    #[must_use]
    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.rooms_per_side, config.room_side())
    }

    /// Number of cells along each room edge.
    #[must_use]
    pub const fn room_side(&self) -> usize {
        self.room_side
    }

    /// Number of installed (room, target) maps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.maps.len()
    }

    /// Reports whether no map is installed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Reports whether a map is installed for the room and target.
    #[must_use]
    pub fn has_policy(&self, room: RoomCoord, target: GridPosition) -> bool {
        self.maps.contains_key(&(room, target))
    }

    /// Targets with an installed map in one room, sorted.
    #[must_use]
    pub fn targets(&self, room: RoomCoord) -> Vec<GridPosition> {
        let mut targets: Vec<GridPosition> = self
            .maps
            .keys()
            .filter(|(owner, _)| *owner == room)
            .map(|(_, target)| *target)
            .collect();
        targets.sort_unstable();
        targets
    }

    /// Installs the map steering actors of `room` towards `target`.
    pub fn set_behaviour_map(
        &mut self,
        room: RoomCoord,
        target: GridPosition,
        map: BehaviourMap,
    ) -> Result<(), BehaviourError> {
        self.check_entry(room, target, &map)?;
        let _ = self.maps.insert((room, target), map);
        Ok(())
    }

    /// Replaces every map of `room` at once.
    ///
    /// Nothing changes when any of the new maps is invalid.
    pub fn replace_room<I>(&mut self, room: RoomCoord, maps: I) -> Result<usize, BehaviourError>
    where
        I: IntoIterator<Item = (GridPosition, BehaviourMap)>,
    {
        let maps: Vec<(GridPosition, BehaviourMap)> = maps.into_iter().collect();
        for (target, map) in &maps {
            self.check_entry(room, *target, map)?;
        }
        let _ = self.clear_room(room);
        let installed = maps.len();
        self.maps
            .extend(maps.into_iter().map(|(target, map)| ((room, target), map)));
        info!(room = ?room, targets = installed, "room policy installed");
        Ok(installed)
    }

    /// Drops every map of `room`, returning how many were removed. The
    /// room's explore counts go with them.
    pub fn clear_room(&mut self, room: RoomCoord) -> usize {
        let before = self.maps.len();
        self.maps.retain(|(owner, _), _| *owner != room);
        self.explorations.retain(|(owner, _, _), _| *owner != room);
        before - self.maps.len()
    }

    /// Directions an actor at `current` should consider to reach `target`,
    /// restricted to the moves in `valid`.
    pub fn get_optimal_actions(
        &self,
        room: RoomCoord,
        target: GridPosition,
        current: GridPosition,
        valid: DirectionSet,
    ) -> Result<DirectionSet, BehaviourError> {
        self.check_room(room)?;
        self.check_position(target)?;
        let stored = self
            .maps
            .get(&(room, target))
            .ok_or(BehaviourError::MissingPolicy { room, target })?
            .get(current)?;
        Ok(stored.intersection(valid))
    }

    /// Picks one optimal direction among `valid` uniformly at random.
    ///
    /// Returns `None` when no stored direction for `current` is valid.
    pub fn choose_direction<R: Rng + ?Sized>(
        &self,
        room: RoomCoord,
        target: GridPosition,
        current: GridPosition,
        valid: DirectionSet,
        rng: &mut R,
    ) -> Result<Option<Direction>, BehaviourError> {
        Ok(self.get_optimal_actions(room, target, current, valid)?.choose(rng))
    }

    /// Chance that an actor at `current` heading for `target` takes a
    /// random move instead of following the policy: `1 / (1 + visits)`.
    pub fn explore_probability(
        &self,
        room: RoomCoord,
        target: GridPosition,
        current: GridPosition,
    ) -> Result<f32, BehaviourError> {
        let visits = self.explore_count(room, target, current)?;
        Ok(1.0 / (1.0 + visits as f32))
    }

    /// Records one more visit of `current` on the way to `target` and
    /// returns the new count.
    pub fn increment_explore_count(
        &mut self,
        room: RoomCoord,
        target: GridPosition,
        current: GridPosition,
    ) -> Result<u32, BehaviourError> {
        let _ = self.explore_count(room, target, current)?;
        let count = self.explorations.entry((room, target, current)).or_insert(0);
        *count = count.saturating_add(1);
        Ok(*count)
    }

    fn explore_count(
        &self,
        room: RoomCoord,
        target: GridPosition,
        current: GridPosition,
    ) -> Result<u32, BehaviourError> {
        self.check_room(room)?;
        self.check_position(target)?;
        self.check_position(current)?;
        Ok(self
            .explorations
            .get(&(room, target, current))
            .copied()
            .unwrap_or(0))
    }

    /// Loads a room's policy from `{tx}_{ty}.txt` files in `dir`, one per
    /// target, replacing whatever the room held.
    ///
    /// Targets without a file are left untrained. A missing directory is an
    /// error.
    pub fn load_room_dir(
        &mut self,
        room: RoomCoord,
        dir: &Path,
        invert_x: bool,
    ) -> Result<usize, BehaviourError> {
        if !dir.is_dir() {
            return Err(CodecError::NotFound {
                path: dir.to_path_buf(),
            }
            .into());
        }
        let mut maps = Vec::new();
        for target in self.cells() {
            let path = dir.join(target_file_name(target));
            match read_direction_grid_file(&path, invert_x) {
                Ok(rows) => maps.push((target, BehaviourMap::from_rows(rows)?)),
                Err(CodecError::NotFound { .. }) => {
                    debug!(path = %path.display(), "no policy for target");
                }
                Err(error) => return Err(error.into()),
            }
        }
        self.replace_room(room, maps)
    }

    /// Writes every map of `room` to `{tx}_{ty}.txt` files in `dir`.
    pub fn write_room_dir(
        &self,
        room: RoomCoord,
        dir: &Path,
        invert_x: bool,
    ) -> Result<usize, BehaviourError> {
        self.check_room(room)?;
        let targets = self.targets(room);
        for target in &targets {
            if let Some(map) = self.maps.get(&(room, *target)) {
                let path = dir.join(target_file_name(*target));
                write_direction_grid_file(&path, &map.to_rows(), invert_x)?;
            }
        }
        Ok(targets.len())
    }

    fn cells(&self) -> impl Iterator<Item = GridPosition> {
        let side = i32::try_from(self.room_side).unwrap_or(0);
        (0..side).flat_map(move |x| (0..side).map(move |y| GridPosition::new(x, y)))
    }

    fn check_entry(
        &self,
        room: RoomCoord,
        target: GridPosition,
        map: &BehaviourMap,
    ) -> Result<(), BehaviourError> {
        self.check_room(room)?;
        self.check_position(target)?;
        if map.side() != self.room_side {
            return Err(BehaviourError::ShapeMismatch {
                expected: self.room_side,
                found: map.side(),
            });
        }
        Ok(())
    }

    fn check_room(&self, room: RoomCoord) -> Result<(), BehaviourError> {
        let half = i64::from(self.rooms_per_side / 2);
        let inside = |value: i32| {
            let index = i64::from(value) + half;
            index >= 0 && index < i64::from(self.rooms_per_side)
        };
        if inside(room.x()) && inside(room.y()) {
            Ok(())
        } else {
            Err(BehaviourError::RoomOutOfBounds { room })
        }
    }

    fn check_position(&self, position: GridPosition) -> Result<(), BehaviourError> {
        let side = i32::try_from(self.room_side).unwrap_or(i32::MAX);
        if (0..side).contains(&position.x()) && (0..side).contains(&position.y()) {
            Ok(())
        } else {
            Err(BehaviourError::PositionOutOfBounds {
                position,
                side: self.room_side,
            })
        }
    }
}

/// File name holding the policy towards one target, `{tx}_{ty}.txt`.
#[must_use]
pub fn target_file_name(target: GridPosition) -> String {
    format!("{}_{}.txt", target.x(), target.y())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_map(side: usize, actions: DirectionSet) -> BehaviourMap {
        BehaviourMap::from_rows(vec![vec![actions; side]; side]).expect("square rows")
    }

    #[test]
    fn maps_reject_ragged_rows_and_stray_positions() {
        assert!(matches!(
            BehaviourMap::from_rows(vec![vec![DirectionSet::ALL; 3], vec![DirectionSet::ALL; 2]]),
            Err(BehaviourError::ShapeMismatch {
                expected: 2,
                found: 3
            })
        ));
        let map = BehaviourMap::new(4);
        assert!(matches!(
            map.get(GridPosition::new(4, 0)),
            Err(BehaviourError::PositionOutOfBounds { side: 4, .. })
        ));
        assert!(matches!(
            map.get(GridPosition::new(0, -1)),
            Err(BehaviourError::PositionOutOfBounds { .. })
        ));
    }

    #[test]
    fn rows_follow_grid_x() {
        let mut map = BehaviourMap::new(3);
        let north = DirectionSet::from_iter([Direction::North]);
        map.set(GridPosition::new(2, 0), north).expect("inside");
        assert_eq!(map.to_rows()[2][0], north);
        assert_eq!(map.to_rows()[0][2], DirectionSet::EMPTY);
    }

    #[test]
    fn store_validates_rooms_targets_and_shapes() {
        let mut store = BehaviourStore::new(5, 4);
        let map = uniform_map(4, DirectionSet::ALL);
        assert!(matches!(
            store.set_behaviour_map(RoomCoord::new(3, 0), GridPosition::new(1, 1), map.clone()),
            Err(BehaviourError::RoomOutOfBounds { .. })
        ));
        assert!(matches!(
            store.set_behaviour_map(RoomCoord::new(-2, 2), GridPosition::new(4, 1), map.clone()),
            Err(BehaviourError::PositionOutOfBounds { .. })
        ));
        assert!(matches!(
            store.set_behaviour_map(RoomCoord::ORIGIN, GridPosition::new(1, 1), uniform_map(3, DirectionSet::ALL)),
            Err(BehaviourError::ShapeMismatch {
                expected: 4,
                found: 3
            })
        ));
        store
            .set_behaviour_map(RoomCoord::new(-2, 2), GridPosition::new(1, 1), map)
            .expect("valid entry");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lookups_without_a_policy_fail() {
        let store = BehaviourStore::new(5, 4);
        assert!(matches!(
            store.get_optimal_actions(
                RoomCoord::ORIGIN,
                GridPosition::new(1, 1),
                GridPosition::new(2, 2),
                DirectionSet::ALL
            ),
            Err(BehaviourError::MissingPolicy { .. })
        ));
    }

    #[test]
    fn failed_replacement_keeps_the_previous_policy() {
        let mut store = BehaviourStore::new(5, 4);
        let target = GridPosition::new(1, 2);
        store
            .set_behaviour_map(RoomCoord::ORIGIN, target, uniform_map(4, DirectionSet::ALL))
            .expect("valid entry");

        let replaced = store.replace_room(
            RoomCoord::ORIGIN,
            [
                (GridPosition::new(2, 2), uniform_map(4, DirectionSet::EMPTY)),
                (GridPosition::new(9, 9), uniform_map(4, DirectionSet::EMPTY)),
            ],
        );
        assert!(replaced.is_err());
        assert_eq!(store.targets(RoomCoord::ORIGIN), vec![target]);
        assert_eq!(
            store
                .get_optimal_actions(RoomCoord::ORIGIN, target, GridPosition::new(0, 0), DirectionSet::ALL)
                .expect("installed"),
            DirectionSet::ALL
        );
    }

    #[test]
    fn lookups_keep_only_valid_moves() {
        let mut store = BehaviourStore::new(5, 4);
        let target = GridPosition::new(3, 3);
        let north_east = DirectionSet::from_iter([Direction::North, Direction::East]);
        store
            .set_behaviour_map(RoomCoord::ORIGIN, target, uniform_map(4, north_east))
            .expect("valid entry");
        let current = GridPosition::new(1, 1);

        let only_east = DirectionSet::from_iter([Direction::East, Direction::South]);
        assert_eq!(
            store
                .get_optimal_actions(RoomCoord::ORIGIN, target, current, only_east)
                .expect("installed"),
            DirectionSet::from_iter([Direction::East])
        );
        let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(3);
        assert_eq!(
            store
                .choose_direction(RoomCoord::ORIGIN, target, current, DirectionSet::EMPTY, &mut rng)
                .expect("installed"),
            None
        );
    }

    #[test]
    fn explore_probability_decays_with_visits() {
        let mut store = BehaviourStore::new(5, 4);
        let (room, target, current) = (RoomCoord::ORIGIN, GridPosition::new(3, 3), GridPosition::new(1, 1));
        assert_eq!(store.explore_probability(room, target, current).expect("inside"), 1.0);
        assert_eq!(store.increment_explore_count(room, target, current).expect("inside"), 1);
        assert_eq!(store.increment_explore_count(room, target, current).expect("inside"), 2);
        assert!((store.explore_probability(room, target, current).expect("inside") - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(
            store.explore_probability(room, target, GridPosition::new(0, 0)).expect("inside"),
            1.0
        );
        assert!(matches!(
            store.increment_explore_count(room, target, GridPosition::new(4, 0)),
            Err(BehaviourError::PositionOutOfBounds { .. })
        ));

        let _ = store.clear_room(room);
        assert_eq!(store.explore_probability(room, target, current).expect("inside"), 1.0);
    }

    #[test]
    fn file_names_carry_the_target() {
        assert_eq!(target_file_name(GridPosition::new(3, 7)), "3_7.txt");
    }
}
