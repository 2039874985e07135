use std::collections::BTreeSet;

use maze_rooms_codec::CodecError;
use maze_rooms_core::{Command, Direction, DirectionSet, Event, GridPosition, RoomCoord};
use maze_rooms_system_behaviour::{
    target_file_name, BehaviourError, BehaviourMap, BehaviourStore, TrainedPolicy, Trainer,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

/// Policy pointing every cell towards `target` along the North/South axis
/// first, then East/West.
fn towards(target: GridPosition, side: usize) -> BehaviourMap {
    let mut map = BehaviourMap::new(side);
    let side = i32::try_from(side).expect("small side");
    for x in 0..side {
        for y in 0..side {
            let mut actions = DirectionSet::EMPTY;
            if x < target.x() {
                actions.insert(Direction::North);
            } else if x > target.x() {
                actions.insert(Direction::South);
            }
            if y < target.y() {
                actions.insert(Direction::East);
            } else if y > target.y() {
                actions.insert(Direction::West);
            }
            map.set(GridPosition::new(x, y), actions).expect("inside");
        }
    }
    map
}

#[test]
fn optimal_actions_follow_the_installed_map() {
    let mut store = BehaviourStore::new(5, 6);
    let target = GridPosition::new(4, 1);
    store
        .set_behaviour_map(RoomCoord::new(1, 1), target, towards(target, 6))
        .expect("valid entry");

    let actions = store
        .get_optimal_actions(RoomCoord::new(1, 1), target, GridPosition::new(1, 3), DirectionSet::ALL)
        .expect("policy installed");
    assert_eq!(
        actions,
        DirectionSet::from_iter([Direction::North, Direction::West])
    );
    assert!(store
        .get_optimal_actions(RoomCoord::new(1, 1), target, target, DirectionSet::ALL)
        .expect("policy installed")
        .is_empty());
}

#[test]
fn chosen_directions_cover_every_optimal_action() {
    let mut store = BehaviourStore::new(5, 6);
    let target = GridPosition::new(5, 5);
    store
        .set_behaviour_map(RoomCoord::ORIGIN, target, towards(target, 6))
        .expect("valid entry");

    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut seen = BTreeSet::new();
    for _ in 0..64 {
        let direction = store
            .choose_direction(RoomCoord::ORIGIN, target, GridPosition::new(0, 0), DirectionSet::ALL, &mut rng)
            .expect("policy installed")
            .expect("two options");
        let _ = seen.insert(direction);
    }
    assert_eq!(seen, BTreeSet::from([Direction::North, Direction::East]));

    assert_eq!(
        store
            .choose_direction(RoomCoord::ORIGIN, target, target, DirectionSet::ALL, &mut rng)
            .expect("policy installed"),
        None
    );
}

#[test]
fn room_directories_survive_a_write_and_reload() {
    let side = 4;
    let mut store = BehaviourStore::new(5, side);
    let room = RoomCoord::new(-1, 2);
    let targets = [GridPosition::new(1, 1), GridPosition::new(2, 3)];
    let _ = store
        .replace_room(room, targets.map(|target| (target, towards(target, side))))
        .expect("valid maps");

    for invert_x in [false, true] {
        let scratch = tempdir().expect("scratch dir");
        let dir = scratch.path();
        assert_eq!(store.write_room_dir(room, dir, invert_x).expect("write"), 2);
        assert!(dir.join(target_file_name(targets[1])).is_file());

        let mut restored = BehaviourStore::new(5, side);
        assert_eq!(restored.load_room_dir(room, dir, invert_x).expect("load"), 2);
        assert_eq!(restored.targets(room), targets.to_vec());
        for target in targets {
            for x in 0..4 {
                for y in 0..4 {
                    let cell = GridPosition::new(x, y);
                    assert_eq!(
                        restored.get_optimal_actions(room, target, cell, DirectionSet::ALL).expect("loaded"),
                        store.get_optimal_actions(room, target, cell, DirectionSet::ALL).expect("installed"),
                    );
                }
            }
        }
    }
}

#[test]
fn missing_policy_directories_are_reported() {
    let mut store = BehaviourStore::new(5, 4);
    let scratch = tempdir().expect("scratch dir");
    let missing = scratch.path().join("absent");
    assert!(matches!(
        store.load_room_dir(RoomCoord::ORIGIN, &missing, false),
        Err(BehaviourError::Codec(CodecError::NotFound { .. }))
    ));
}

#[test]
fn malformed_policy_files_fail_the_load() {
    let scratch = tempdir().expect("scratch dir");
    let dir = scratch.path();
    std::fs::write(dir.join("0_0.txt"), "0 1 2\n3 9 1\n0 0 0").expect("write file");
    let mut store = BehaviourStore::new(5, 3);
    assert!(matches!(
        store.load_room_dir(RoomCoord::ORIGIN, dir, false),
        Err(BehaviourError::Codec(CodecError::Parse { line: 2, column: 2, .. }))
    ));
    assert!(store.is_empty());
}

#[test]
fn trainer_installs_policies_for_requested_rooms_only() {
    let mut trainer = Trainer::new();
    let mut store = BehaviourStore::new(5, 4);
    let mut commands = Vec::new();
    let room = RoomCoord::new(0, 1);
    let target = GridPosition::new(2, 2);

    trainer
        .handle(
            &[Event::RoomBuildRequested {
                room,
                door_positions: [1, 2, 1, 2],
                complexity: 0.2,
                density: 0.2,
            }],
            Vec::new(),
            &mut store,
            &mut commands,
        )
        .expect("no policies yet");
    assert_eq!(trainer.awaiting(), vec![room]);

    let policy = |room| TrainedPolicy {
        room,
        maps: vec![(target, towards(target, 4))],
    };
    trainer
        .handle(
            &[],
            vec![policy(RoomCoord::new(1, 1)), policy(room)],
            &mut store,
            &mut commands,
        )
        .expect("valid policies");
    assert_eq!(commands, vec![Command::SetRoomTrained { room }]);
    assert!(trainer.awaiting().is_empty());
    assert!(store.has_policy(room, target));
    assert!(!store.has_policy(RoomCoord::new(1, 1), target));

    commands.clear();
    trainer
        .handle(&[Event::RoomDestroyed { room }], Vec::new(), &mut store, &mut commands)
        .expect("nothing to install");
    assert!(commands.is_empty());
    assert!(store.is_empty());
}
