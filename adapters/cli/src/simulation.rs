use std::{collections::VecDeque, path::Path};

use anyhow::{Context, Result};
use maze_rooms_core::{
    door_cell, CellGrid, CellState, Command, Direction, DirectionSet, Event, GridPosition,
    RoomCoord, WorldConfig,
};
use maze_rooms_system_behaviour::{
    BehaviourMap, BehaviourStore, TrainedPolicy, Trainer, TrainingParameters,
};
use maze_rooms_system_generation::{BuiltRoom, Generation};
use maze_rooms_world::{self as world, query, World};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Headless host driving the world through perimeter progression.
///
/// Rooms are trained with shortest-path policies instead of the external
/// reinforcement learner, which is enough to exercise every hand-off.
pub(crate) struct Simulation {
    world: World,
    generation: Generation,
    trainer: Trainer,
    store: BehaviourStore,
    built: Vec<BuiltRoom>,
    events: Vec<Event>,
    walks: TrainingParameters,
    rng: ChaCha8Rng,
}

/// Outcome of one completed perimeter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PerimeterReport {
    pub(crate) perimeter: u32,
    pub(crate) rooms_built: usize,
    pub(crate) policies: usize,
    pub(crate) signal: f32,
    pub(crate) walks: usize,
    pub(crate) arrivals: usize,
}

/// Where one actor walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WalkEnd {
    Arrived,
    Stuck,
    LeftRoom,
    OutOfMoves,
}

impl Simulation {
    pub(crate) fn new(config: WorldConfig, walks: TrainingParameters) -> Result<Self> {
        let generation = Generation::from_config(&config);
        let store = BehaviourStore::from_config(&config);
        let rng = ChaCha8Rng::seed_from_u64(config.rng_seed);
        let world = World::new(config).context("world configuration is invalid")?;
        Ok(Self {
            world,
            generation,
            trainer: Trainer::new(),
            store,
            built: Vec::new(),
            events: Vec::new(),
            walks,
            rng,
        })
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn store(&self) -> &BehaviourStore {
        &self.store
    }

    /// Events observed since the simulation started.
    pub(crate) fn events(&self) -> &[Event] {
        &self.events
    }

    /// Generates, trains and connects the current perimeter ring.
    pub(crate) fn run_perimeter(&mut self) -> Result<PerimeterReport> {
        let perimeter = query::current_perimeter(&self.world);
        let built_before = self.built.len();
        let policies_before = self.store.len();

        self.submit(vec![Command::GeneratePerimeterRooms, Command::Tick])?;

        let mut completed = Vec::new();
        for room in self.trainer.awaiting() {
            let grid = query::room_cell_grid(&self.world, room)
                .with_context(|| format!("room {room:?} has no layout"))?;
            completed.push(TrainedPolicy {
                room,
                maps: shortest_path_policy(&grid),
            });
        }
        let progress = completed
            .iter()
            .map(|policy| Command::SetTrainingProgress {
                room: policy.room,
                progress: 1.0,
            })
            .collect();
        self.submit(progress)?;
        let mut commands = Vec::new();
        self.trainer
            .handle(&[], completed, &mut self.store, &mut commands)
            .context("trained policy does not fit the world")?;
        commands.push(Command::Tick);
        self.submit(commands)?;

        self.submit(vec![Command::ConnectPerimeterRooms, Command::Tick])?;
        anyhow::ensure!(
            query::current_perimeter(&self.world) > perimeter,
            "perimeter {perimeter} did not complete"
        );

        let rooms: Vec<RoomCoord> = self.built[built_before..]
            .iter()
            .map(|built| built.room)
            .collect();
        let mut walks = 0;
        let mut arrivals = 0;
        for room in rooms {
            for end in self.patrol(room)? {
                walks += 1;
                if end == WalkEnd::Arrived {
                    arrivals += 1;
                }
            }
        }

        Ok(PerimeterReport {
            perimeter,
            rooms_built: self.built.len() - built_before,
            policies: self.store.len() - policies_before,
            signal: query::signal_strength(&self.world),
            walks,
            arrivals,
        })
    }

    /// Sends actors from every door of `room` towards random installed
    /// targets, `episodes_per_start` walks per door.
    fn patrol(&mut self, room: RoomCoord) -> Result<Vec<WalkEnd>> {
        let targets = self.store.targets(room);
        let side = query::config(&self.world).grid_units_per_room;
        let side = i32::try_from(side).context("room side overflows i32")?;
        let mut starts = Vec::new();
        for direction in Direction::ALL {
            let wall = query::wall_state(&self.world, room, direction)?;
            if let (true, Some(offset)) = (wall.door_exists(), wall.door_position()) {
                let offset = i32::try_from(offset).context("door offset overflows i32")?;
                starts.push(door_cell(direction, offset, side));
            }
        }

        let mut ends = Vec::new();
        for start in starts {
            for _ in 0..self.walks.episodes_per_start {
                let Some(target) = targets.choose(&mut self.rng).copied() else {
                    return Ok(ends);
                };
                ends.push(self.walk(room, target, start)?);
            }
        }
        debug!(room = ?room, walks = ends.len(), "room patrolled");
        Ok(ends)
    }

    /// Follows the policy towards `target`, taking a random valid move
    /// with the cell's explore probability.
    fn walk(
        &mut self,
        room: RoomCoord,
        target: GridPosition,
        start: GridPosition,
    ) -> Result<WalkEnd> {
        let side = self.store.room_side();
        let inside = |cell: GridPosition| {
            usize::try_from(cell.x()).is_ok_and(|x| x < side)
                && usize::try_from(cell.y()).is_ok_and(|y| y < side)
        };
        let mut position = start;
        for _ in 0..self.walks.max_moves_per_episode {
            if position == target {
                return Ok(WalkEnd::Arrived);
            }
            let valid = query::valid_actions(&self.world, room, position)?;
            let explore = self.rng.gen::<f32>()
                < self.store.explore_probability(room, target, position)?;
            let direction = if explore {
                valid.choose(&mut self.rng)
            } else {
                self.store
                    .choose_direction(room, target, position, valid, &mut self.rng)?
            };
            let Some(direction) = direction else {
                return Ok(WalkEnd::Stuck);
            };
            let _ = self.store.increment_explore_count(room, target, position)?;
            let next = DirectionSet::target_for(position, direction);
            if !inside(next) {
                return Ok(WalkEnd::LeftRoom);
            }
            position = next;
        }
        Ok(if position == target {
            WalkEnd::Arrived
        } else {
            WalkEnd::OutOfMoves
        })
    }

    /// Writes the policies of every trained room below `dir`, one
    /// `{x}_{y}` directory per room.
    pub(crate) fn write_policies(&self, dir: &Path, invert_x: bool) -> Result<usize> {
        let mut written = 0;
        for built in &self.built {
            let room_dir = dir.join(format!("{}_{}", built.room.x(), built.room.y()));
            std::fs::create_dir_all(&room_dir)
                .with_context(|| format!("failed to create {}", room_dir.display()))?;
            written += self
                .store
                .write_room_dir(built.room, &room_dir, invert_x)
                .with_context(|| format!("failed to write policies of {:?}", built.room))?;
        }
        Ok(written)
    }

    /// Applies commands and everything the systems answer with until the
    /// world falls quiet.
    fn submit(&mut self, commands: Vec<Command>) -> Result<()> {
        let mut queue: VecDeque<Command> = commands.into();
        while let Some(command) = queue.pop_front() {
            let mut events = Vec::new();
            world::apply(&mut self.world, command.clone(), &mut events)
                .with_context(|| format!("world rejected {command:?}"))?;
            for event in &events {
                log_event(event);
            }

            let mut follow_up = Vec::new();
            self.generation
                .handle(&events, &mut follow_up, &mut self.built)
                .context("room generation failed")?;
            self.trainer
                .handle(&events, Vec::new(), &mut self.store, &mut follow_up)
                .context("trainer bookkeeping failed")?;
            queue.extend(follow_up);
            self.events.extend(events);
        }
        Ok(())
    }
}

fn log_event(event: &Event) {
    match event {
        Event::PerimeterComplete { perimeter } => info!(perimeter, "perimeter complete"),
        Event::RoomTrained { room } => info!(room = ?room, "room trained"),
        Event::RoomConnected { room } => info!(room = ?room, "room connected"),
        Event::SignalLost => info!("signal lost"),
        other => debug!(event = ?other, "world event"),
    }
}

/// Direction sets leading one step closer to each reachable target.
///
/// Every open or door cell becomes a target. Cells that cannot reach a
/// target, and the target itself, hold the empty set.
pub(crate) fn shortest_path_policy(grid: &CellGrid) -> Vec<(GridPosition, BehaviourMap)> {
    let cells = passable_cells(grid);
    cells
        .iter()
        .map(|target| (*target, policy_towards(grid, *target)))
        .collect()
}

fn passable_cells(grid: &CellGrid) -> Vec<GridPosition> {
    let side = i32::try_from(grid.side()).unwrap_or(0);
    (0..side)
        .flat_map(|x| (0..side).map(move |y| GridPosition::new(x, y)))
        .filter(|cell| is_passable(grid, *cell))
        .collect()
}

fn is_passable(grid: &CellGrid, cell: GridPosition) -> bool {
    matches!(grid.get(cell), Ok(CellState::Open | CellState::Door))
}

fn policy_towards(grid: &CellGrid, target: GridPosition) -> BehaviourMap {
    let side = grid.side();
    let mut distance = vec![None; side * side];
    let index = |cell: GridPosition| -> Option<usize> {
        let x = usize::try_from(cell.x()).ok()?;
        let y = usize::try_from(cell.y()).ok()?;
        (x < side && y < side).then_some(x * side + y)
    };

    let mut frontier = VecDeque::new();
    if let Some(slot) = index(target) {
        distance[slot] = Some(0u32);
        frontier.push_back(target);
    }
    while let Some(cell) = frontier.pop_front() {
        let Some(current) = index(cell).and_then(|slot| distance[slot]) else {
            continue;
        };
        for direction in Direction::ALL {
            let next = cell.step(direction);
            match index(next) {
                Some(slot) if distance[slot].is_none() && is_passable(grid, next) => {
                    distance[slot] = Some(current + 1);
                    frontier.push_back(next);
                }
                _ => {}
            }
        }
    }

    let mut map = BehaviourMap::new(side);
    for cell in passable_cells(grid) {
        let Some(here) = index(cell).and_then(|slot| distance[slot]) else {
            continue;
        };
        let actions: DirectionSet = Direction::ALL
            .into_iter()
            .filter(|direction| {
                index(cell.step(*direction))
                    .and_then(|slot| distance[slot])
                    .is_some_and(|next| next + 1 == here)
            })
            .collect();
        // Every cell in `passable_cells` lies inside the map.
        let _ = map.set(cell, actions);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> CellGrid {
        let mut grid = CellGrid::filled(5, CellState::Closed);
        for cell in [(1, 1), (1, 2), (1, 3), (2, 3), (3, 3)] {
            grid.set(GridPosition::new(cell.0, cell.1), CellState::Open)
                .expect("inside");
        }
        grid.set(GridPosition::new(0, 1), CellState::Door).expect("inside");
        grid
    }

    #[test]
    fn policies_follow_the_corridor() {
        let policies = shortest_path_policy(&corridor());
        assert_eq!(policies.len(), 6);
        let (_, map) = policies
            .iter()
            .find(|(target, _)| *target == GridPosition::new(3, 3))
            .expect("open cells are targets");

        assert_eq!(
            map.get(GridPosition::new(0, 1)).expect("inside"),
            DirectionSet::from_iter([Direction::North])
        );
        assert_eq!(
            map.get(GridPosition::new(1, 2)).expect("inside"),
            DirectionSet::from_iter([Direction::East])
        );
        assert_eq!(
            map.get(GridPosition::new(2, 3)).expect("inside"),
            DirectionSet::from_iter([Direction::North])
        );
        assert!(map.get(GridPosition::new(3, 3)).expect("inside").is_empty());
        assert!(map.get(GridPosition::new(2, 2)).expect("inside").is_empty());
    }

    #[test]
    fn simulation_completes_two_perimeters() {
        let mut simulation =
            Simulation::new(WorldConfig::default(), short_walks()).expect("default config");

        let first = simulation.run_perimeter().expect("first ring completes");
        assert_eq!(first.perimeter, 1);
        assert_eq!(first.rooms_built, 9);
        assert!(first.policies > 0);

        let second = simulation.run_perimeter().expect("second ring completes");
        assert_eq!(second.perimeter, 2);
        assert_eq!(second.rooms_built, 16);
        assert_eq!(query::current_perimeter(simulation.world()), 3);

        let completions = simulation
            .events()
            .iter()
            .filter(|event| matches!(event, Event::PerimeterComplete { .. }))
            .count();
        assert_eq!(completions, 2);
        assert!(simulation.store().len() >= first.policies + second.policies);
        assert!(first.walks > 0);
        assert_eq!(first.walks % 2, 0);
        assert!(first.arrivals <= first.walks);
    }

    fn short_walks() -> TrainingParameters {
        TrainingParameters {
            episodes_per_start: 2,
            max_moves_per_episode: 40,
        }
    }

    #[test]
    fn walks_never_cross_a_locked_door() {
        let mut simulation =
            Simulation::new(WorldConfig::default(), short_walks()).expect("default config");
        let _ = simulation.run_perimeter().expect("first ring completes");
        let room = RoomCoord::new(1, 0);
        simulation
            .submit(vec![
                Command::GeneratePerimeterRooms,
                Command::Tick,
                Command::LockDoor {
                    room,
                    direction: Direction::North,
                },
            ])
            .expect("second ring is on the lattice");

        let wall = query::wall_state(simulation.world(), room, Direction::North).expect("ring wall");
        assert!(wall.door_exists());
        let offset = i32::try_from(wall.door_position().expect("door placed")).expect("small offset");
        let door = door_cell(Direction::North, offset, 10);
        let target = simulation.store().targets(room)[0];
        for _ in 0..20 {
            let end = simulation.walk(room, target, door).expect("walk stays in bounds");
            assert_ne!(end, WalkEnd::LeftRoom);
        }
        let valid = query::valid_actions(simulation.world(), room, door).expect("door cell");
        assert!(!valid.contains(Direction::North));
    }
}
