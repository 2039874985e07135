use maze_rooms_core::{
    door_cell, CellGrid, CellState, Command, Direction, Event, GridError, GridPosition, RoomCoord,
    WorldConfig,
};
use maze_rooms_system_generation::{
    generate_level, generate_level_of_size, BuiltRoom, GeneratedLevel, Generation,
};
use maze_rooms_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn neighbours(cell: GridPosition) -> impl Iterator<Item = GridPosition> {
    Direction::ALL.into_iter().map(move |direction| cell.step(direction))
}

fn door_cells(grid: &CellGrid) -> Vec<GridPosition> {
    let side = i32::try_from(grid.side()).expect("small grid");
    (0..side)
        .flat_map(|x| (0..side).map(move |y| GridPosition::new(x, y)))
        .filter(|cell| grid.get(*cell) == Ok(CellState::Door))
        .collect()
}

#[test]
fn every_room_has_four_doors_away_from_the_corners() {
    for side in 3..=10usize {
        for seed in 0..40u64 {
            let level = generate_level_of_size(side, 0.75, 0.75, [None; 4], seed)
                .expect("valid parameters");
            let grid = level.grid();
            assert_eq!(grid.count(CellState::Door), 4, "side {side} seed {seed}");

            let last = i32::try_from(side).expect("small side") - 1;
            for direction in Direction::ALL {
                let offset = level.door_position(direction);
                assert!((1..=side as u32 - 2).contains(&offset));
                let cell = door_cell(direction, offset as i32, last + 1);
                assert_eq!(grid.get(cell), Ok(CellState::Door));
            }
            for cell in door_cells(grid) {
                let corner = (cell.x() == 0 || cell.x() == last) && (cell.y() == 0 || cell.y() == last);
                assert!(!corner, "door in corner {cell:?}");
            }
        }
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let first = generate_level_of_size(9, 0.5, 0.3, [None; 4], 42).expect("valid parameters");
    let second = generate_level_of_size(9, 0.5, 0.3, [None; 4], 42).expect("valid parameters");
    assert_eq!(first.bitmask(), second.bitmask());
    assert_eq!(first.segments(), second.segments());
    assert_eq!(first, second);
}

#[test]
fn invalid_parameters_fail_before_generation() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for (density, complexity) in [(1.5, 0.5), (0.5, -0.1), (f32::NAN, 0.5)] {
        assert!(matches!(
            generate_level(9, density, complexity, [None; 4], &mut rng),
            Err(GridError::InvalidArgument(_))
        ));
    }
    assert!(matches!(
        generate_level(2, 0.5, 0.5, [None; 4], &mut rng),
        Err(GridError::InvalidArgument(_))
    ));
    assert_eq!(
        generate_level(11, 0.5, 0.5, [None; 4], &mut rng),
        Err(GridError::CapacityExceeded {
            required: 9,
            capacity: 8
        })
    );
}

#[test]
fn segments_are_straight_runs_of_closed_cells() {
    for seed in 0..60u64 {
        let level = generate_level_of_size(10, 1.0, 1.0, [None; 4], seed).expect("valid");
        for segment in level.segments() {
            let mut cell = segment.start;
            let mut guard = 0;
            loop {
                assert_eq!(level.grid().get(cell), Ok(CellState::Closed), "{segment:?}");
                if cell == segment.end {
                    break;
                }
                cell = cell.step(segment.direction);
                guard += 1;
                assert!(guard < 10, "segment {segment:?} never reaches its end");
            }
            assert_ne!(segment.start, segment.end);
        }
    }
}

#[test]
fn turns_start_the_next_segment_at_the_corner() {
    let mut turns = 0;
    for seed in 0..60u64 {
        let level = generate_level_of_size(10, 1.0, 1.0, [None; 4], seed).expect("valid");
        for segment in level.segments() {
            for cell in [segment.start, segment.end] {
                assert!(cell.x() % 2 == 0 && cell.y() % 2 == 0, "{segment:?}");
            }
        }
        for pair in level.segments().windows(2) {
            let (previous, next) = (&pair[0], &pair[1]);
            if next.start != previous.end {
                continue;
            }
            turns += 1;
            assert_ne!(next.direction, previous.direction, "{pair:?}");
            assert_ne!(next.direction, previous.direction.opposite(), "{pair:?}");
        }
    }
    assert!(turns > 0);
}

#[test]
fn inner_walls_never_block_a_door() {
    for seed in 0..60u64 {
        let level = generate_level_of_size(10, 1.0, 1.0, [None; 4], seed).expect("valid");
        let grid = level.grid();
        for door in door_cells(grid) {
            for cell in neighbours(door) {
                let interior = (1..9).contains(&cell.x()) && (1..9).contains(&cell.y());
                if interior {
                    assert_eq!(grid.get(cell), Ok(CellState::Open), "seed {seed} {cell:?}");
                }
            }
        }
    }
}

#[test]
fn inherited_doors_are_reused() {
    let level = generate_level_of_size(10, 0.4, 0.4, [Some(2), Some(3), Some(7), Some(8)], 1)
        .expect("valid");
    assert_eq!(level.door_positions(), [2, 3, 7, 8]);
    assert_eq!(level.grid().get(GridPosition::new(9, 2)), Ok(CellState::Door));
    assert_eq!(level.grid().get(GridPosition::new(3, 9)), Ok(CellState::Door));
    assert_eq!(level.grid().get(GridPosition::new(0, 7)), Ok(CellState::Door));
    assert_eq!(level.grid().get(GridPosition::new(8, 0)), Ok(CellState::Door));
}

fn build(generation: &Generation, events: &[Event]) -> (Vec<Command>, Vec<BuiltRoom>) {
    let mut commands = Vec::new();
    let mut built = Vec::new();
    generation
        .handle(events, &mut commands, &mut built)
        .expect("world requests valid rooms");
    (commands, built)
}

#[test]
fn room_layouts_do_not_depend_on_request_order() {
    let generation = Generation::new(77, 10);
    let request = |x, y| Event::RoomBuildRequested {
        room: RoomCoord::new(x, y),
        door_positions: [4, 4, 4, 4],
        complexity: 0.5,
        density: 0.5,
    };
    let (_, forward) = build(&generation, &[request(0, 1), request(1, 0)]);
    let (_, backward) = build(&generation, &[request(1, 0), request(0, 1)]);
    let level_of = |rooms: &[BuiltRoom], room: RoomCoord| -> GeneratedLevel {
        rooms
            .iter()
            .find(|built| built.room == room)
            .map(|built| built.level.clone())
            .expect("room was built")
    };
    for room in [RoomCoord::new(0, 1), RoomCoord::new(1, 0)] {
        assert_eq!(level_of(&forward, room), level_of(&backward, room));
    }
}

#[test]
fn generated_layouts_are_stored_in_the_world() {
    let config = WorldConfig::default();
    let mut world = World::new(config.clone()).expect("default config is valid");
    let generation = Generation::from_config(&config);

    let mut events = Vec::new();
    world::apply(&mut world, Command::GeneratePerimeterRooms, &mut events).expect("generate");
    let (commands, built) = build(&generation, &events);
    assert_eq!(built.len(), 9);

    let mut stored = Vec::new();
    for command in commands {
        world::apply(&mut world, command, &mut stored).expect("room is live");
    }
    world::apply(&mut world, Command::Tick, &mut stored).expect("tick");
    assert_eq!(
        stored
            .iter()
            .filter(|event| matches!(event, Event::InnerStructureChanged { .. }))
            .count(),
        9
    );

    for BuiltRoom { room, level } in &built {
        assert_eq!(
            query::room_cell_grid(&world, *room).expect("live room"),
            *level.grid(),
            "room {room:?}"
        );
    }
}
