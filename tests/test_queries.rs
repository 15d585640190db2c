//! End-to-end tests: populate sub-DAGs, query them through the facade, and
//! round-trip snapshots. The full-table solve is exercised by an `#[ignore]`d
//! test (minutes of work); everything else runs on late-game sub-DAGs.

use std::path::Path;
use std::sync::OnceLock;

use yahtzee::constants::*;
use yahtzee::dice_mechanics::{Roll, RollTables};
use yahtzee::game_mechanics::GameState;
use yahtzee::observables::{ExpectedValue, ExpectedWork, ScoreDistribution};
use yahtzee::queries::{lookup, optimal_turn, Action, QueryError, TurnStep};
use yahtzee::state_computation::{populate, populate_expected_work, populate_from};
use yahtzee::storage::{load_table, save_table};
use yahtzee::turn_solver::{TurnCaches, TurnOptimizer};

static TABLES: OnceLock<RollTables> = OnceLock::new();

fn tables() -> &'static RollTables {
    TABLES.get_or_init(RollTables::build)
}

fn all_filled_except(open: &[usize]) -> GameState {
    let mut bits = BOXES_MASK;
    for &category in open {
        bits &= !(1 << category);
    }
    GameState(bits)
}

#[test]
fn endgame_expected_value_flow() {
    let tables = tables();
    let game = all_filled_except(&[CATEGORY_SIXES, CATEGORY_YAHTZEE]);
    let prototype = ExpectedValue::new();
    let table = populate_from(tables, &prototype, game);

    // The table agrees with a direct turn computation.
    let mut caches = TurnCaches::new(&prototype);
    let direct =
        TurnOptimizer::new(tables, &table, &prototype, game, &mut caches).optimal_turn_outcome();
    let looked_up = lookup(&table, game).unwrap();
    assert!((looked_up.0 - direct.0).abs() < 1e-5);

    // With four sixes showing and one roll left, holding them dominates.
    let roll = Roll::from_dice(&[6, 6, 6, 6, 2]);
    let ranked = optimal_turn(
        tables,
        &table,
        &prototype,
        game,
        TurnStep::Hold2,
        roll,
        None,
    )
    .unwrap();
    let four_sixes = Roll::from_dice(&[6, 6, 6, 6]);
    let hold_all = Action::Hold(roll);
    let hold_four = Action::Hold(four_sixes);
    assert!(ranked[0].action == hold_four || ranked[0].action == hold_all);

    // Filling is ranked by shifted successor value.
    let ranked = optimal_turn(
        tables,
        &table,
        &prototype,
        game,
        TurnStep::FillBox,
        roll,
        None,
    )
    .unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].action, Action::Fill(CATEGORY_SIXES));
}

#[test]
fn score_distribution_flow() {
    let tables = tables();
    let game = all_filled_except(&[CATEGORY_LARGE_STRAIGHT]);
    let prototype = ScoreDistribution::new();
    let table = populate_from(tables, &prototype, game);

    let sd = lookup(&table, game).unwrap();
    // Survival starts at one, ends at zero, never increases.
    assert!((sd.probability(0) - 1.0).abs() < 1e-6);
    assert_eq!(sd.probability(MAX_SCORE + 1), 0.0);
    // Only 0 or 40 can be added, so the survival is flat in between.
    let p40 = sd.probability(40);
    assert!(p40 > 0.0 && p40 < 1.0);
    assert!((sd.probability(1) - p40).abs() < 1e-6);
    assert_eq!(sd.probability(41), 0.0);

    // Ranking with a target prefers the action that secures the straight.
    let roll = Roll::from_dice(&[2, 3, 4, 5, 6]);
    let ranked = optimal_turn(
        tables,
        &table,
        &prototype,
        game,
        TurnStep::Hold2,
        roll,
        Some(40),
    )
    .unwrap();
    assert_eq!(ranked[0].action, Action::Hold(roll));
    assert!((ranked[0].value.probability(40) - 1.0).abs() < 1e-6);
}

#[test]
fn expected_work_flow() {
    let tables = tables();
    let game = all_filled_except(&[CATEGORY_CHANCE]);
    let prototype = ExpectedWork::new(8.0);
    let table = populate_from(tables, &prototype, game);

    // Needing more than the best possible Chance roll always costs a
    // restart; needing five or fewer never does.
    let ew = lookup(&table, game).unwrap();
    assert!(ew.games_needed(5) < 1e-6);
    assert!((ew.games_needed(31) - 8.0).abs() < 1e-3);

    // The facade requires a target for work-minimizing queries.
    let roll = Roll::from_dice(&[6, 6, 6, 6, 6]);
    let err = optimal_turn(
        tables,
        &table,
        &prototype,
        game,
        TurnStep::FillBox,
        roll,
        None,
    )
    .unwrap_err();
    assert_eq!(err, QueryError::MissingScoreToBeat);

    let ranked = optimal_turn(
        tables,
        &table,
        &prototype,
        game,
        TurnStep::FillBox,
        roll,
        Some(20),
    )
    .unwrap();
    assert_eq!(ranked[0].action, Action::Fill(CATEGORY_CHANCE));
    // Thirty points cover a 20-point remaining target: no further games.
    assert!(ranked[0].value.games_needed(21) < 1e-6);
}

#[test]
fn snapshot_round_trip_of_populated_table() {
    let tables = tables();
    let game = all_filled_except(&[CATEGORY_ONES, CATEGORY_TWOS]);
    let prototype = ExpectedValue::new();
    let table = populate_from(tables, &prototype, game);

    let path_a = Path::new("/tmp/yahtzee_test_endgame_a.bin.gz");
    let path_b = Path::new("/tmp/yahtzee_test_endgame_b.bin.gz");
    save_table(&table, path_a).unwrap();
    let reloaded = load_table::<ExpectedValue>(path_a).unwrap();
    assert_eq!(reloaded.count(), table.count());
    for (state, value) in table.iter_set() {
        assert_eq!(value.0, reloaded.value(state).0, "mismatch at {state}");
    }

    // Canonical key order makes a second save byte-identical.
    save_table(&reloaded, path_b).unwrap();
    assert_eq!(
        std::fs::read(path_a).unwrap(),
        std::fs::read(path_b).unwrap()
    );

    let _ = std::fs::remove_file(path_a);
    let _ = std::fs::remove_file(path_b);
}

#[test]
fn resumed_table_answers_queries_without_recompute() {
    let tables = tables();
    let game = all_filled_except(&[CATEGORY_FOUR_OF_A_KIND]);
    let prototype = ExpectedValue::new();
    let table = populate_from(tables, &prototype, game);

    let path = Path::new("/tmp/yahtzee_test_resume.bin.gz");
    save_table(&table, path).unwrap();
    let resumed = load_table::<ExpectedValue>(path).unwrap();

    let ranked = optimal_turn(
        tables,
        &resumed,
        &prototype,
        game,
        TurnStep::FillBox,
        Roll::from_dice(&[5, 5, 5, 5, 2]),
        None,
    )
    .unwrap();
    assert_eq!(ranked[0].action, Action::Fill(CATEGORY_FOUR_OF_A_KIND));

    let _ = std::fs::remove_file(path);
}

// Full-table solves take minutes; run with `cargo test -- --ignored`.

#[test]
#[ignore]
fn full_expected_value_table() {
    let tables = tables();
    let prototype = ExpectedValue::new();
    let table = populate(tables, &prototype);

    // The optimal expected final score of standard Yahtzee with the joker
    // rule is a little above 254.
    let initial = lookup(&table, GameState::new()).unwrap().0;
    assert!(
        initial > 245.0 && initial < 265.0,
        "initial EV = {initial}"
    );

    // Populate → lookup(initial) equals a direct computation on the
    // initial state against the same table.
    let mut caches = TurnCaches::new(&prototype);
    let direct = TurnOptimizer::new(tables, &table, &prototype, GameState::new(), &mut caches)
        .optimal_turn_outcome();
    assert!((initial - direct.0).abs() < 1e-5);
}

#[test]
#[ignore]
fn full_expected_work_fixed_point() {
    let tables = tables();
    let (table, e0) = populate_expected_work(tables, 200, 3, None);

    // Beating 200 takes at least one game, and the needed-points curve of
    // the initial state is monotone.
    assert!(e0 >= 1.0);
    let ew = lookup(&table, GameState::new()).unwrap();
    for s in 1..=MAX_SCORE {
        assert!(ew.games[s] + 1e-6 >= ew.games[s - 1]);
    }
}
