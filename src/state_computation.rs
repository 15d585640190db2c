//! Retrograde sweep: populate the strategy table for every reachable state.
//!
//! States are bucketed by turns remaining and solved from one turn left up
//! to the full game, so every successor (one fewer turn remaining) is in
//! the table before its predecessors are dispatched. Buckets run on the
//! rayon pool with worker-local turn caches; the barrier between buckets is
//! the sequential level loop.
//!
//! ## Unsafe writes
//!
//! Each state maps to a unique slot in the dense table, so parallel workers
//! never write the same location, and reads only touch slots written in
//! earlier levels. The writes go through an `AtomicPtr` raw pointer to skip
//! a collect-and-scatter pass.

use std::sync::atomic::{AtomicPtr, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::constants::*;
use crate::dice_mechanics::RollTables;
use crate::game_mechanics::{reachable_states, GameState};
use crate::observables::{ExpectedWork, Observable};
use crate::turn_solver::{TurnCaches, TurnOptimizer};

/// Starting guess for the expected-work restart cost.
pub const DEFAULT_RESTART_GUESS: f32 = 10.0;

/// Dense strategy table: one optional value per game encoding.
///
/// The `Option` discriminant is the is-set bitmap; unreached states stay
/// `None` and cost nothing.
#[derive(Debug)]
pub struct StrategyTable<V> {
    values: Vec<Option<V>>,
}

impl<V: Observable> StrategyTable<V> {
    pub fn new() -> Self {
        StrategyTable {
            values: vec![None; MAX_GAME],
        }
    }

    #[inline(always)]
    pub fn is_set(&self, game: GameState) -> bool {
        self.values[game.index()].is_some()
    }

    #[inline(always)]
    pub fn get(&self, game: GameState) -> Option<&V> {
        self.values[game.index()].as_ref()
    }

    /// Populated value of a state. Asking for an unpopulated state is a
    /// solver-order bug.
    #[inline(always)]
    pub fn value(&self, game: GameState) -> &V {
        self.values[game.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("state {game} not populated"))
    }

    pub fn set(&mut self, game: GameState, value: V) {
        self.values[game.index()] = Some(value);
    }

    /// Populated entries in ascending state order (the canonical snapshot
    /// order).
    pub fn iter_set(&self) -> impl Iterator<Item = (GameState, &V)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(idx, v)| v.as_ref().map(|v| (GameState(idx as u32), v)))
    }

    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

impl<V: Observable> Default for StrategyTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Populate the table for everything reachable from the initial state.
pub fn populate<V: Observable>(tables: &RollTables, prototype: &V) -> StrategyTable<V> {
    populate_from(tables, prototype, GameState::new())
}

/// Populate a fresh table for the sub-DAG reachable from `root`.
pub fn populate_from<V: Observable>(
    tables: &RollTables,
    prototype: &V,
    root: GameState,
) -> StrategyTable<V> {
    let mut table = StrategyTable::new();
    populate_into(tables, prototype, root, &mut table);
    table
}

/// Solve every state reachable from `root` that `table` does not already
/// hold (states carried over from a resumed snapshot are kept as-is).
pub fn populate_into<V: Observable>(
    tables: &RollTables,
    prototype: &V,
    root: GameState,
    table: &mut StrategyTable<V>,
) {
    let total_start = Instant::now();
    let states = reachable_states(tables, root);

    // Bucket by turns remaining.
    let mut levels: Vec<Vec<GameState>> = vec![Vec::new(); NUM_CATEGORIES + 1];
    for &game in &states {
        levels[game.turns_remaining()].push(game);
    }
    println!(
        "Enumerated {} reachable states from {} in {:.2}s",
        states.len(),
        root,
        total_start.elapsed().as_secs_f64()
    );

    // Base case: finished games.
    for &game in &levels[0] {
        if !table.is_set(game) {
            table.set(game, prototype.terminal());
        }
    }

    // Retrograde order: a state with k turns remaining only reads states
    // with k - 1, all quiesced by the end of the previous level.
    for turns in 1..=NUM_CATEGORIES {
        let bucket: Vec<GameState> = levels[turns]
            .iter()
            .copied()
            .filter(|&game| !table.is_set(game))
            .collect();
        if bucket.is_empty() {
            continue;
        }

        let level_start = Instant::now();
        let values_ptr = AtomicPtr::new(table.values.as_mut_ptr());
        let table_ref = &*table;

        bucket.par_iter().for_each_init(
            || TurnCaches::new(prototype),
            |caches, &game| {
                let value = TurnOptimizer::new(tables, table_ref, prototype, game, caches)
                    .optimal_turn_outcome();
                // Safety: state indices within a bucket are distinct, and
                // reads target earlier levels only.
                let ptr = values_ptr.load(Ordering::Relaxed);
                unsafe {
                    *ptr.add(game.index()) = Some(value);
                }
            },
        );

        let dt = level_start.elapsed().as_secs_f64();
        println!(
            "  level {:2}: {:7} states in {:8.2}s ({:.0} states/s)",
            turns,
            bucket.len(),
            dt,
            bucket.len() as f64 / dt
        );
    }

    println!(
        "Populated {} states in {:.2}s",
        states.len(),
        total_start.elapsed().as_secs_f64()
    );
}

/// Expected-work solve with the restart-cost fixed point.
///
/// The restart cost e0 is itself the value of the initial state, so the
/// solver runs to completion, reads the new cost off the initial state
/// (plus one for the restarted game itself), and re-runs until the
/// configured iteration count. Returns the final table and restart cost.
pub fn populate_expected_work(
    tables: &RollTables,
    score_to_beat: usize,
    iterations: usize,
    mut seed: Option<StrategyTable<ExpectedWork>>,
) -> (StrategyTable<ExpectedWork>, f32) {
    let needed = ExpectedWork::needed_index(score_to_beat, 0);
    let mut e0 = DEFAULT_RESTART_GUESS;
    let mut table = StrategyTable::new();

    for iteration in 0..iterations.max(1) {
        let prototype = ExpectedWork::new(e0);
        table = seed.take().unwrap_or_default();
        populate_into(tables, &prototype, GameState::new(), &mut table);

        let replays = table.value(GameState::new()).games_needed(needed);
        let next_e0 = 1.0 + replays as f32;
        println!(
            "Iteration {}: E0 {:.4} -> {:.4} (expected replays to beat {}: {:.4})",
            iteration, e0, next_e0, score_to_beat, replays
        );
        e0 = next_e0;
    }

    (table, e0)
}
