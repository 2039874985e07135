use std::{fmt, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{GridError, GridPosition};

/// Token written for a direction set without any enabled member.
pub const EMPTY_DIRECTION_SET_TOKEN: &str = "-1";

/// Delimiter placed between direction indices inside a serialized set.
pub const DIRECTION_DELIMITER: char = '_';

/// Compass direction used for room neighbours, walls and agent moves.
///
/// Directions are ordered clockwise starting from North. North grows the
/// first grid axis and East grows the second.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Towards increasing `x`.
    North,
    /// Towards increasing `y`.
    East,
    /// Towards decreasing `x`.
    South,
    /// Towards decreasing `y`.
    West,
}

impl Direction {
    /// All directions in clockwise order starting from North.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Numeric index of the direction, matching its position in [`Direction::ALL`].
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
        }
    }

    /// Resolves a direction from its numeric index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Direction::North),
            1 => Some(Direction::East),
            2 => Some(Direction::South),
            3 => Some(Direction::West),
            _ => None,
        }
    }

    /// Direction pointing the opposite way, `(d + 2) mod 4`.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// Next direction when turning clockwise.
    #[must_use]
    pub const fn clockwise(self) -> Self {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
        }
    }

    /// Unit step `(dx, dy)` taken when moving in this direction.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (1, 0),
            Direction::East => (0, 1),
            Direction::South => (-1, 0),
            Direction::West => (0, -1),
        }
    }

    const fn bit(self) -> u8 {
        1 << self.index()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.write_str(name)
    }
}

/// Compact set of directions, stored as a four bit mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectionSet {
    mask: u8,
}

impl DirectionSet {
    const FULL_MASK: u8 = 0b1111;

    /// Set without any enabled direction.
    pub const EMPTY: DirectionSet = DirectionSet { mask: 0 };

    /// Set with all four directions enabled.
    pub const ALL: DirectionSet = DirectionSet {
        mask: Self::FULL_MASK,
    };

    /// Builds a set from a raw mask; bits above the fourth are discarded.
    #[must_use]
    pub const fn from_mask(mask: u8) -> Self {
        Self {
            mask: mask & Self::FULL_MASK,
        }
    }

    /// Raw four bit mask backing the set.
    #[must_use]
    pub const fn mask(self) -> u8 {
        self.mask
    }

    /// Reports whether the direction is enabled.
    #[must_use]
    pub const fn contains(self, direction: Direction) -> bool {
        self.mask & direction.bit() != 0
    }

    /// Enables the direction.
    pub fn insert(&mut self, direction: Direction) {
        self.mask |= direction.bit();
    }

    /// Disables the direction.
    pub fn remove(&mut self, direction: Direction) {
        self.mask &= !direction.bit();
    }

    /// A set is valid when at least one direction is enabled.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.mask != 0
    }

    /// Number of enabled directions.
    #[must_use]
    pub const fn len(self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Reports whether no direction is enabled.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.mask == 0
    }

    /// Iterates the enabled directions in clockwise order from North.
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL
            .into_iter()
            .filter(move |direction| self.contains(*direction))
    }

    /// Picks one enabled direction uniformly at random.
    ///
    /// Returns `None` for an empty set.
    pub fn choose<R: Rng + ?Sized>(self, rng: &mut R) -> Option<Direction> {
        let count = self.len();
        if count == 0 {
            return None;
        }
        let pick = rng.gen_range(0..count);
        self.iter().nth(pick)
    }

    /// Complement of the set.
    ///
    /// The full set is its own inverse: inverting all four directions yields
    /// all four directions again, never the empty set.
    #[must_use]
    pub const fn inverse(self) -> Self {
        if self.mask == Self::FULL_MASK {
            return self;
        }
        Self {
            mask: !self.mask & Self::FULL_MASK,
        }
    }

    /// Directions enabled in both sets.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self {
            mask: self.mask & other.mask,
        }
    }

    /// Grid position reached from `position` by stepping in `direction`.
    #[must_use]
    pub const fn target_for(position: GridPosition, direction: Direction) -> GridPosition {
        position.step(direction)
    }
}

impl FromIterator<Direction> for DirectionSet {
    fn from_iter<T: IntoIterator<Item = Direction>>(iter: T) -> Self {
        let mut set = DirectionSet::EMPTY;
        for direction in iter {
            set.insert(direction);
        }
        set
    }
}

impl fmt::Display for DirectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(EMPTY_DIRECTION_SET_TOKEN);
        }
        for (position, direction) in self.iter().enumerate() {
            if position > 0 {
                write!(f, "{DIRECTION_DELIMITER}")?;
            }
            write!(f, "{}", direction.index())?;
        }
        Ok(())
    }
}

impl FromStr for DirectionSet {
    type Err = GridError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token == EMPTY_DIRECTION_SET_TOKEN {
            return Ok(DirectionSet::EMPTY);
        }
        let mut set = DirectionSet::EMPTY;
        for part in token.split(DIRECTION_DELIMITER) {
            let direction = part
                .parse::<u8>()
                .ok()
                .and_then(Direction::from_index)
                .ok_or_else(|| {
                    GridError::InvalidArgument(format!("'{token}' is not a direction set"))
                })?;
            set.insert(direction);
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn intersection_keeps_shared_directions() {
        let north_east = DirectionSet::from_iter([Direction::North, Direction::East]);
        let east_south = DirectionSet::from_iter([Direction::East, Direction::South]);
        assert_eq!(
            north_east.intersection(east_south),
            DirectionSet::from_iter([Direction::East])
        );
        assert!(north_east.intersection(DirectionSet::EMPTY).is_empty());
        assert_eq!(north_east.intersection(DirectionSet::ALL), north_east);
    }

    #[test]
    fn inverse_of_full_set_is_full_set() {
        assert_eq!(DirectionSet::ALL.inverse(), DirectionSet::ALL);
    }

    #[test]
    fn inverse_complements_partial_sets() {
        let set: DirectionSet = [Direction::North, Direction::West].into_iter().collect();
        let inverse = set.inverse();
        assert!(inverse.contains(Direction::East));
        assert!(inverse.contains(Direction::South));
        assert!(!inverse.contains(Direction::North));
        assert_eq!(DirectionSet::EMPTY.inverse(), DirectionSet::ALL);
    }

    #[test]
    fn opposite_is_two_steps_clockwise() {
        for direction in Direction::ALL {
            assert_eq!(direction.opposite(), direction.clockwise().clockwise());
            assert_eq!(
                Direction::from_index((direction.index() + 2) % 4),
                Some(direction.opposite())
            );
        }
    }

    #[test]
    fn choose_only_returns_enabled_members() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let set: DirectionSet = [Direction::East, Direction::South].into_iter().collect();
        for _ in 0..64 {
            let picked = set.choose(&mut rng).expect("set is not empty");
            assert!(set.contains(picked), "picked {picked} outside the set");
        }
        assert_eq!(DirectionSet::EMPTY.choose(&mut rng), None);
    }

    #[test]
    fn choose_reaches_every_member() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut seen = DirectionSet::EMPTY;
        for _ in 0..200 {
            if let Some(direction) = DirectionSet::ALL.choose(&mut rng) {
                seen.insert(direction);
            }
        }
        assert_eq!(seen, DirectionSet::ALL);
    }

    #[test]
    fn text_form_uses_underscores_and_sentinel() {
        let set: DirectionSet = [Direction::North, Direction::South].into_iter().collect();
        assert_eq!(set.to_string(), "0_2");
        assert_eq!(DirectionSet::EMPTY.to_string(), "-1");
        assert_eq!("0_2".parse::<DirectionSet>().expect("parses"), set);
        assert_eq!("-1".parse::<DirectionSet>().expect("parses"), DirectionSet::EMPTY);
        assert!("4".parse::<DirectionSet>().is_err());
        assert!("0__1".parse::<DirectionSet>().is_err());
    }

    #[test]
    fn insert_and_remove_toggle_membership() {
        let mut set = DirectionSet::EMPTY;
        assert!(!set.is_valid());
        set.insert(Direction::West);
        assert!(set.is_valid());
        assert_eq!(set.len(), 1);
        set.remove(Direction::West);
        assert!(set.is_empty());
    }
}
