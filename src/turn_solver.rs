//! Per-turn optimizer: the expectation/maximum DP over roll, hold, roll,
//! hold, roll, fill.
//!
//! The turn value of a state is
//!
//! ```text
//! V(S) = Σ_r1 p(r1) · max_{h1⊆r1} E[ max_{h2⊆r2} E[
//!            max_{c ∉ filled} (V(n(S,c,r3)) shifted by added(S,c,r3))
//!        | h2 ] | h1 ]
//! ```
//!
//! The two inner expectations are memoized in per-worker caches keyed by
//! the compact roll index; the recursion over a held multiset branches on
//! the six sides with weight 1/6 and bottoms out at complete rolls. Once
//! the strategy table holds every successor, a `TurnOptimizer` is safe to
//! run from any thread as long as its caches are not shared.

use crate::constants::*;
use crate::dice_mechanics::{Roll, RollTables};
use crate::game_mechanics::GameState;
use crate::observables::Observable;
use crate::state_computation::StrategyTable;

/// Memo of one expectation level, dense over the 462 valid rolls.
///
/// Values are retained across resets so the dense-vector observables reuse
/// their buffers; only the is-set flags are cleared (an efficient memset).
pub struct RollCache<V> {
    values: Vec<V>,
    is_set: Vec<bool>,
}

impl<V: Observable> RollCache<V> {
    pub fn new(prototype: &V) -> Self {
        RollCache {
            values: vec![prototype.zero(); NUM_VALID_ROLLS],
            is_set: vec![false; NUM_VALID_ROLLS],
        }
    }

    pub fn reset(&mut self) {
        self.is_set.fill(false);
    }

    #[inline(always)]
    fn is_set(&self, idx: usize) -> bool {
        self.is_set[idx]
    }

    #[inline(always)]
    fn get(&self, idx: usize) -> &V {
        debug_assert!(self.is_set[idx]);
        &self.values[idx]
    }

    #[inline(always)]
    fn set(&mut self, idx: usize, value: &V) {
        self.values[idx].clone_from(value);
        self.is_set[idx] = true;
    }
}

/// The pair of hold-expectation caches a worker reuses across states.
pub struct TurnCaches<V> {
    pub held1: RollCache<V>,
    pub held2: RollCache<V>,
}

impl<V: Observable> TurnCaches<V> {
    pub fn new(prototype: &V) -> Self {
        TurnCaches {
            held1: RollCache::new(prototype),
            held2: RollCache::new(prototype),
        }
    }

    pub fn reset(&mut self) {
        self.held1.reset();
        self.held2.reset();
    }
}

/// Optimal-play evaluator for a single turn of one game state.
pub struct TurnOptimizer<'a, V: Observable> {
    tables: &'a RollTables,
    table: &'a StrategyTable<V>,
    prototype: &'a V,
    game: GameState,
    caches: &'a mut TurnCaches<V>,
}

impl<'a, V: Observable> TurnOptimizer<'a, V> {
    /// The caches are reset here; every successor of `game` must already be
    /// populated in `table`.
    pub fn new(
        tables: &'a RollTables,
        table: &'a StrategyTable<V>,
        prototype: &'a V,
        game: GameState,
        caches: &'a mut TurnCaches<V>,
    ) -> Self {
        caches.reset();
        TurnOptimizer {
            tables,
            table,
            prototype,
            game,
            caches,
        }
    }

    /// V(S): expectation over the first roll of the best first hold.
    pub fn optimal_turn_outcome(&mut self) -> V {
        let tables = self.tables;
        let mut result = self.prototype.zero();
        for &roll1 in tables.complete_rolls() {
            let best1 = self.best_hold1(roll1);
            result.add_weighted(&best1, tables.probability(roll1));
        }
        result
    }

    /// Best value over all holds of the first roll.
    pub fn best_hold1(&mut self, roll1: Roll) -> V {
        let (tables, table, prototype, game) = (self.tables, self.table, self.prototype, self.game);
        let TurnCaches { held1, held2 } = &mut *self.caches;
        best_over_holds(tables, roll1, |h1| {
            expectation_over_rolls(tables, prototype, held1, h1, &mut |roll2| {
                best_over_holds(tables, roll2, |h2| {
                    expectation_over_rolls(tables, prototype, held2, h2, &mut |roll3| {
                        best_fill(table, game, roll3)
                    })
                })
            })
        })
    }

    /// Value of each legal first hold.
    pub fn hold1_outcomes(&mut self, roll1: Roll) -> Vec<(Roll, V)> {
        let (tables, table, prototype, game) = (self.tables, self.table, self.prototype, self.game);
        let TurnCaches { held1, held2 } = &mut *self.caches;
        let mut leaf = |roll2: Roll| {
            best_over_holds(tables, roll2, |h2| {
                expectation_over_rolls(tables, prototype, held2, h2, &mut |roll3| {
                    best_fill(table, game, roll3)
                })
            })
        };
        tables
            .possible_holds(roll1)
            .iter()
            .map(|&h1| {
                let value = expectation_over_rolls(tables, prototype, held1, h1, &mut leaf);
                (h1, value)
            })
            .collect()
    }

    /// Best value over all holds of the second roll.
    pub fn best_hold2(&mut self, roll2: Roll) -> V {
        let (tables, table, prototype, game) = (self.tables, self.table, self.prototype, self.game);
        let TurnCaches { held2, .. } = &mut *self.caches;
        best_over_holds(tables, roll2, |h2| {
            expectation_over_rolls(tables, prototype, held2, h2, &mut |roll3| {
                best_fill(table, game, roll3)
            })
        })
    }

    /// Value of each legal second hold.
    pub fn hold2_outcomes(&mut self, roll2: Roll) -> Vec<(Roll, V)> {
        let (tables, table, prototype, game) = (self.tables, self.table, self.prototype, self.game);
        let TurnCaches { held2, .. } = &mut *self.caches;
        tables
            .possible_holds(roll2)
            .iter()
            .map(|&h2| {
                let value = expectation_over_rolls(tables, prototype, held2, h2, &mut |roll3| {
                    best_fill(table, game, roll3)
                });
                (h2, value)
            })
            .collect()
    }

    /// Best value over the open categories for the final roll.
    pub fn best_fill(&self, roll: Roll) -> V {
        best_fill(self.table, self.game, roll)
    }

    /// Value of filling each open category with the final roll.
    pub fn fill_outcomes(&self, roll: Roll) -> Vec<(usize, V)> {
        self.game
            .available_categories()
            .map(|category| {
                let (next, added) = self.game.apply_fill(category, roll);
                let mut value = self.table.value(next).clone();
                value.shift(added);
                (category, value)
            })
            .collect()
    }
}

/// Memoized expectation over completions of a held multiset.
///
/// Branches on the six sides with weight 1/6 until the hold is complete,
/// then defers to `leaf`. Every node is cached, so each valid sub-hold is
/// evaluated once per turn level.
fn expectation_over_rolls<V: Observable, F: FnMut(Roll) -> V>(
    tables: &RollTables,
    prototype: &V,
    cache: &mut RollCache<V>,
    held: Roll,
    leaf: &mut F,
) -> V {
    let idx = tables.compact_index(held);
    if cache.is_set(idx) {
        return cache.get(idx).clone();
    }

    let value = if held.num_dice() == N_DICE {
        leaf(held)
    } else {
        let mut acc = prototype.zero();
        for side in 1..=N_SIDES {
            let sub = expectation_over_rolls(tables, prototype, cache, held.add(side), leaf);
            acc.add_weighted(&sub, 1.0 / N_SIDES as f64);
        }
        acc
    };

    cache.set(idx, &value);
    value
}

/// Best value over the possible holds of a roll.
///
/// Folds from the first hold rather than an identity element so the
/// minimizing algebra works unchanged.
fn best_over_holds<V: Observable>(
    tables: &RollTables,
    roll: Roll,
    mut held_value: impl FnMut(Roll) -> V,
) -> V {
    let mut best: Option<V> = None;
    for &held in tables.possible_holds(roll) {
        let value = held_value(held);
        match &mut best {
            None => best = Some(value),
            Some(b) => b.max_assign(&value),
        }
    }
    best.expect("roll has no holds")
}

/// Best shifted successor value over the open categories.
fn best_fill<V: Observable>(table: &StrategyTable<V>, game: GameState, roll: Roll) -> V {
    let mut best: Option<V> = None;
    for category in game.available_categories() {
        let (next, added) = game.apply_fill(category, roll);
        let value = table.value(next);
        match &mut best {
            None => {
                let mut shifted = value.clone();
                shifted.shift(added);
                best = Some(shifted);
            }
            Some(b) => b.max_assign_shifted(value, added),
        }
    }
    best.expect("no open category to fill")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observables::ExpectedValue;
    use crate::state_computation::populate_from;

    /// State with every box but the given ones filled (zero upper half).
    fn all_filled_except(open: &[usize]) -> GameState {
        let mut bits = BOXES_MASK;
        for &category in open {
            bits &= !(1 << category);
        }
        GameState(bits)
    }

    #[test]
    fn test_best_fill_last_box() {
        let tables = RollTables::build();
        let game = all_filled_except(&[CATEGORY_YAHTZEE]);
        let prototype = ExpectedValue::new();
        let table = populate_from(&tables, &prototype, game);

        let mut caches = TurnCaches::new(&prototype);
        let opt = TurnOptimizer::new(&tables, &table, &prototype, game, &mut caches);
        let yahtzee = Roll::from_dice(&[6, 6, 6, 6, 6]);
        assert!((opt.best_fill(yahtzee).0 - 50.0).abs() < 1e-9);
        let straight = Roll::from_dice(&[1, 2, 3, 4, 5]);
        assert!((opt.best_fill(straight).0 - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_chance_only_turn_value() {
        let tables = RollTables::build();
        let game = all_filled_except(&[CATEGORY_CHANCE]);
        let prototype = ExpectedValue::new();
        let table = populate_from(&tables, &prototype, game);

        // Optimal play of a lone Chance box: reroll low dice twice.
        // The known optimum is a bit over 23 points.
        let value = table.value(game).0;
        assert!(value > 22.0 && value < 25.0, "chance EV = {value}");
    }

    #[test]
    fn test_hold_outcomes_cover_holds_and_best() {
        let tables = RollTables::build();
        let game = all_filled_except(&[CATEGORY_SIXES]);
        let prototype = ExpectedValue::new();
        let table = populate_from(&tables, &prototype, game);

        let roll = Roll::from_dice(&[6, 6, 1, 2, 3]);
        let mut caches = TurnCaches::new(&prototype);
        let mut opt = TurnOptimizer::new(&tables, &table, &prototype, game, &mut caches);

        let outcomes = opt.hold1_outcomes(roll);
        assert_eq!(outcomes.len(), tables.possible_holds(roll).len());

        let best_listed = outcomes
            .iter()
            .map(|(_, v)| v.0)
            .fold(f64::NEG_INFINITY, f64::max);
        let best = opt.best_hold1(roll).0;
        assert!((best - best_listed).abs() < 1e-9);

        // Keeping both sixes must beat keeping nothing.
        let held_sixes = Roll::from_dice(&[6, 6]);
        let v_sixes = outcomes.iter().find(|(h, _)| *h == held_sixes).unwrap().1 .0;
        let v_none = outcomes.iter().find(|(h, _)| *h == Roll::EMPTY).unwrap().1 .0;
        assert!(v_sixes > v_none);
    }

    #[test]
    fn test_fill_outcomes_match_apply_fill() {
        let tables = RollTables::build();
        let game = all_filled_except(&[CATEGORY_ONES, CATEGORY_CHANCE]);
        let prototype = ExpectedValue::new();
        let table = populate_from(&tables, &prototype, game);

        let roll = Roll::from_dice(&[1, 1, 1, 6, 6]);
        let mut caches = TurnCaches::new(&prototype);
        let opt = TurnOptimizer::new(&tables, &table, &prototype, game, &mut caches);

        let outcomes = opt.fill_outcomes(roll);
        assert_eq!(outcomes.len(), 2);
        for (category, value) in outcomes {
            let (next, added) = game.apply_fill(category, roll);
            let expected = table.value(next).0 + added as f64;
            assert!((value.0 - expected).abs() < 1e-9);
        }
    }
}
