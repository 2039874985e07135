#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line host for the maze rooms engine.
//!
//! - `maze-rooms generate` carves a single room and prints its layout
//! - `maze-rooms simulate` drives the world through perimeter progression
//! - `maze-rooms policy` queries a stored behaviour map
//! - `maze-rooms decode` expands a layout transfer string

mod layout_transfer;
mod simulation;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use maze_rooms_codec::{format_cell_grid, write_cell_grid_file};
use maze_rooms_core::{GridPosition, WorldConfig};
use maze_rooms_system_behaviour::{BehaviourMap, TrainingParameters};
use maze_rooms_system_generation::generate_level_of_size;
use maze_rooms_world::query;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{layout_transfer::RoomLayoutSnapshot, simulation::Simulation};

#[derive(Parser)]
#[command(name = "maze-rooms")]
#[command(about = "Procedural room graph engine", version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one room layout
    Generate {
        /// Cells along each room edge, border included
        #[arg(long, default_value_t = 10)]
        side: usize,

        /// Island count factor in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        density: f32,

        /// Island walk length factor in [0, 1]
        #[arg(long, default_value_t = 0.5)]
        complexity: f32,

        /// Seed of the generation stream
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Inherited door offsets as N,E,S,W; -1 draws a fresh door
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        doors: Vec<i64>,

        /// Write the level grid to this file
        #[arg(long)]
        out: Option<PathBuf>,

        /// Store the highest grid row on the first line
        #[arg(long)]
        invert_x: bool,
    },

    /// Generate, train and connect perimeter rings
    Simulate {
        /// Simulation configuration file in TOML, with [world] and
        /// [training] tables
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of perimeter rings to complete
        #[arg(long, default_value_t = 2)]
        perimeters: u32,

        /// Write trained policies below this directory
        #[arg(long)]
        policy_dir: Option<PathBuf>,

        /// Store the highest grid row on the first line of policy files
        #[arg(long)]
        invert_x: bool,
    },

    /// Print the optimal actions stored in a behaviour file
    Policy {
        /// Behaviour map file
        file: PathBuf,

        /// Current cell as x,y
        #[arg(long, value_delimiter = ',', num_args = 2, allow_hyphen_values = true)]
        at: Vec<i32>,

        /// Seed used to pick one of the optimal directions
        #[arg(long)]
        seed: Option<u64>,

        /// The file stores the highest grid row first
        #[arg(long)]
        invert_x: bool,
    },

    /// Expand a layout transfer string
    Decode {
        /// String in the form rooms:v1:<side>:<payload>
        layout: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Generate {
            side,
            density,
            complexity,
            seed,
            doors,
            out,
            invert_x,
        } => generate(side, density, complexity, seed, &doors, out.as_deref(), invert_x),
        Commands::Simulate {
            config,
            perimeters,
            policy_dir,
            invert_x,
        } => simulate(config.as_deref(), perimeters, policy_dir.as_deref(), invert_x),
        Commands::Policy {
            file,
            at,
            seed,
            invert_x,
        } => policy(&file, &at, seed, invert_x),
        Commands::Decode { layout } => decode(&layout),
    }
}

fn generate(
    side: usize,
    density: f32,
    complexity: f32,
    seed: u64,
    doors: &[i64],
    out: Option<&Path>,
    invert_x: bool,
) -> Result<()> {
    let existing = parse_doors(doors)?;
    let level = generate_level_of_size(side, density, complexity, existing, seed)
        .context("failed to generate level")?;
    info!(side, seed, segments = level.segments().len(), "level generated");

    println!("{}", format_cell_grid(level.grid(), invert_x));
    println!();
    println!("doors (N,E,S,W): {:?}", level.door_positions());
    println!("bitmask: {:#018x}", level.bitmask().get());
    for segment in level.segments() {
        println!(
            "segment {} ({}, {}) -> ({}, {})",
            segment.direction,
            segment.start.x(),
            segment.start.y(),
            segment.end.x(),
            segment.end.y()
        );
    }
    let snapshot = RoomLayoutSnapshot::from_level(&level)?;
    println!("transfer: {}", snapshot.encode()?);

    if let Some(path) = out {
        write_cell_grid_file(path, level.grid(), invert_x)
            .with_context(|| format!("failed to write level to {}", path.display()))?;
        info!(path = %path.display(), "level written");
    }
    Ok(())
}

fn parse_doors(doors: &[i64]) -> Result<[Option<u32>; 4]> {
    match doors.len() {
        0 => Ok([None; 4]),
        4 => {
            let mut existing = [None; 4];
            for (slot, door) in existing.iter_mut().zip(doors) {
                *slot = u32::try_from(*door).ok();
            }
            Ok(existing)
        }
        count => bail!("expected four door offsets (N,E,S,W), got {count}"),
    }
}

/// Contents of a `simulate --config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulateConfig {
    world: WorldConfig,
    training: TrainingParameters,
}

fn load_config(path: Option<&Path>) -> Result<SimulateConfig> {
    let Some(path) = path else {
        return Ok(SimulateConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: SimulateConfig =
        toml::from_str(&contents).context("failed to parse simulation configuration toml")?;
    config.world.validate().context("world configuration is invalid")?;
    Ok(config)
}

fn simulate(
    config: Option<&Path>,
    perimeters: u32,
    policy_dir: Option<&Path>,
    invert_x: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let mut simulation = Simulation::new(config.world, config.training)?;
    for _ in 0..perimeters {
        let report = simulation.run_perimeter()?;
        println!(
            "perimeter {}: {} rooms built, {} policies, signal {:.1}, {}/{} walks arrived",
            report.perimeter,
            report.rooms_built,
            report.policies,
            report.signal,
            report.arrivals,
            report.walks
        );
    }
    println!(
        "{} live rooms, {} policies, {} events",
        query::live_rooms(simulation.world()).len(),
        simulation.store().len(),
        simulation.events().len()
    );
    if let Some(dir) = policy_dir {
        let written = simulation.write_policies(dir, invert_x)?;
        println!("{written} policy files written to {}", dir.display());
    }
    Ok(())
}

fn policy(file: &Path, at: &[i32], seed: Option<u64>, invert_x: bool) -> Result<()> {
    let [x, y] = at else {
        bail!("--at expects two coordinates, got {}", at.len());
    };
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let map = BehaviourMap::parse(&contents, invert_x)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let actions = map.get(GridPosition::new(*x, *y))?;
    println!("optimal actions at ({x}, {y}): {actions}");

    if let Some(seed) = seed {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        match actions.choose(&mut rng) {
            Some(direction) => println!("chosen: {direction}"),
            None => println!("chosen: none"),
        }
    }
    Ok(())
}

fn decode(layout: &str) -> Result<()> {
    let snapshot = RoomLayoutSnapshot::decode(layout)?;
    let grid = snapshot.to_grid()?;
    println!("{}", format_cell_grid(&grid, false));
    println!();
    println!("doors (N,E,S,W): {:?}", snapshot.door_positions);
    println!("segments: {}", snapshot.segments.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn doors_default_to_fresh_draws() {
        assert_eq!(parse_doors(&[]).expect("empty list"), [None; 4]);
        assert_eq!(
            parse_doors(&[-1, 3, -1, 5]).expect("four doors"),
            [None, Some(3), None, Some(5)]
        );
        assert!(parse_doors(&[1, 2]).is_err());
    }

    #[test]
    fn config_files_fill_missing_fields_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("scratch file");
        file.write_all(b"[world]\nrooms_per_side = 12\nrng_seed = 99\n\n[training]\nepisodes_per_start = 3\n")
            .expect("write config");
        let config = load_config(Some(file.path())).expect("valid config");

        assert_eq!(config.world.rooms_per_side, 12);
        assert_eq!(config.world.rng_seed, 99);
        assert_eq!(config.world.grid_units_per_room, WorldConfig::default().grid_units_per_room);
        assert_eq!(config.training.episodes_per_start, 3);
        assert_eq!(
            config.training.max_moves_per_episode,
            TrainingParameters::default().max_moves_per_episode
        );
    }

    #[test]
    fn invalid_world_tables_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("scratch file");
        file.write_all(b"[world]\nrooms_per_side = 2\n").expect("write config");
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
