use std::process::{Command, Output};

fn maze_rooms(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_maze-rooms"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to launch the maze-rooms binary")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "maze-rooms failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("utf-8 output")
}

fn grid_block(text: &str) -> &str {
    text.split("\n\n").next().expect("grid precedes the details")
}

fn line_starting<'a>(text: &'a str, prefix: &str) -> &'a str {
    text.lines()
        .find(|line| line.starts_with(prefix))
        .unwrap_or_else(|| panic!("no line starting with {prefix:?} in:\n{text}"))
}

#[test]
fn decoding_a_generated_transfer_string_restores_the_layout() {
    let generated = stdout(&maze_rooms(&[
        "generate", "--side", "9", "--density", "0.5", "--complexity", "0.3", "--seed", "42",
    ]));
    let transfer = line_starting(&generated, "transfer: ")
        .trim_start_matches("transfer: ")
        .to_owned();
    assert!(transfer.starts_with("rooms:v1:9:"));

    let decoded = stdout(&maze_rooms(&["decode", &transfer]));
    assert_eq!(grid_block(&decoded), grid_block(&generated));
    assert_eq!(grid_block(&decoded).lines().count(), 9);
    assert_eq!(
        line_starting(&decoded, "doors"),
        line_starting(&generated, "doors")
    );
}

#[test]
fn inherited_doors_appear_in_the_output() {
    let generated = stdout(&maze_rooms(&[
        "generate", "--side", "8", "--seed", "3", "--doors", "2,-1,5,-1",
    ]));
    let doors = line_starting(&generated, "doors");
    assert!(doors.starts_with("doors (N,E,S,W): [2, "), "{doors}");
    assert!(doors.contains(", 5, "), "{doors}");
}

#[test]
fn foreign_transfer_strings_are_rejected() {
    let output = maze_rooms(&["decode", "maze:v1:9:e30"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("layout prefix 'maze'"));
}
