//! Offline solver: populate a strategy table and write the snapshot.
//!
//! ```text
//! compute_scores --observable expected_value --output scores.bin.gz
//! compute_scores --observable expected_work --score_to_beat 250 --iter 5
//! ```

use std::path::PathBuf;
use std::process;

use yahtzee::dice_mechanics::RollTables;
use yahtzee::env_config;
use yahtzee::game_mechanics::GameState;
use yahtzee::observables::{ExpectedValue, ExpectedWork, Observable, ScoreDistribution};
use yahtzee::state_computation::{populate_expected_work, populate_into, StrategyTable};
use yahtzee::storage::{load_table, save_table, SnapshotError};

struct Args {
    observable: String,
    output: PathBuf,
    iter: usize,
    score_to_beat: Option<usize>,
    resume: Option<PathBuf>,
}

fn parse_args() -> Args {
    let argv: Vec<String> = std::env::args().collect();
    let mut args = Args {
        observable: "expected_value".to_string(),
        output: PathBuf::from("scores.bin.gz"),
        iter: 1,
        score_to_beat: None,
        resume: None,
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--observable" => {
                i += 1;
                args.observable = expect_value(&argv, i).to_string();
            }
            "--output" => {
                i += 1;
                args.output = PathBuf::from(expect_value(&argv, i));
            }
            "--iter" => {
                i += 1;
                args.iter = parse_number(&argv, i);
            }
            "--score_to_beat" => {
                i += 1;
                args.score_to_beat = Some(parse_number(&argv, i));
            }
            "--resume" => {
                i += 1;
                args.resume = Some(PathBuf::from(expect_value(&argv, i)));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: compute_scores [--observable NAME] [--output PATH] \
                     [--iter N] [--score_to_beat S] [--resume PATH]"
                );
                println!();
                println!("Options:");
                println!("  --observable NAME   expected_value | score_distribution | expected_work");
                println!("  --output PATH       snapshot destination (default: scores.bin.gz)");
                println!("  --iter N            fixed-point iterations (expected_work only)");
                println!("  --score_to_beat S   target score (expected_work only)");
                println!("  --resume PATH       seed the table from an existing snapshot");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    args
}

fn expect_value<'a>(argv: &'a [String], i: usize) -> &'a str {
    argv.get(i).map(String::as_str).unwrap_or_else(|| {
        eprintln!("Missing value for {}", argv[i - 1]);
        process::exit(1);
    })
}

fn parse_number(argv: &[String], i: usize) -> usize {
    expect_value(argv, i).parse().unwrap_or_else(|_| {
        eprintln!("Invalid number for {}: {}", argv[i - 1], argv[i]);
        process::exit(1);
    })
}

/// Populate (optionally from a resumed snapshot) and save one
/// score-independent objective.
fn run<V: Observable>(prototype: V, args: &Args, tables: &RollTables) -> Result<(), SnapshotError> {
    let mut table = match &args.resume {
        Some(path) => load_table::<V>(path)?,
        None => StrategyTable::new(),
    };
    populate_into(tables, &prototype, GameState::new(), &mut table);

    let initial = table.value(GameState::new()).rank_value(None);
    println!("Initial state value: {initial:.4}");

    save_table(&table, &args.output)
}

fn run_expected_work(args: &Args, tables: &RollTables) -> Result<(), SnapshotError> {
    let score_to_beat = args.score_to_beat.unwrap_or_else(|| {
        eprintln!("expected_work requires --score_to_beat");
        process::exit(1);
    });
    let seed = match &args.resume {
        Some(path) => Some(load_table::<ExpectedWork>(path)?),
        None => None,
    };

    let (table, e0) = populate_expected_work(tables, score_to_beat, args.iter, seed);
    println!("Expected games to beat {score_to_beat}: {e0:.4}");

    save_table(&table, &args.output)
}

fn main() {
    env_config::init_base_path();
    env_config::init_rayon_threads();

    let args = parse_args();
    if args.iter != 1 && args.observable != "expected_work" {
        eprintln!("--iter only applies to expected_work");
        process::exit(1);
    }

    println!("Observable: {}", args.observable);
    let tables = RollTables::build();

    let result = match args.observable.as_str() {
        "expected_value" => run(ExpectedValue::new(), &args, &tables),
        "score_distribution" => run(ScoreDistribution::new(), &args, &tables),
        "expected_work" => run_expected_work(&args, &tables),
        other => {
            eprintln!(
                "Unknown observable: {other}, options: \
                 expected_value, score_distribution, expected_work"
            );
            process::exit(1);
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
