//! Yahtzee scoring and the game-state rule engine.
//!
//! A [`GameState`] packs the whole score-independent position into a `u32`
//! (filled mask, bonus flag, capped upper-half sum), so the strategy table
//! is a flat array indexed by the state integer. [`GameState::apply_fill`]
//! is the single transition function: raw category score, upper-half bonus
//! crossing, Yahtzee bonus, and the joker rule all live here.

use std::collections::VecDeque;
use std::fmt;

use crate::constants::*;
use crate::dice_mechanics::{Roll, RollTables};

/// Raw points for placing a complete roll in a category.
///
/// Excludes the upper-half and Yahtzee bonuses; those are applied by
/// [`GameState::apply_fill`].
pub fn category_score(category: usize, roll: Roll) -> i32 {
    if is_upper_half(category) {
        let side = category + 1;
        return (side * roll.count_of(side)) as i32;
    }

    match category {
        CATEGORY_THREE_OF_A_KIND if roll.has_n_of_a_kind(3) => roll.sum_of_faces(),
        CATEGORY_FOUR_OF_A_KIND if roll.has_n_of_a_kind(4) => roll.sum_of_faces(),
        CATEGORY_FULL_HOUSE if roll.is_full_house() => 25,
        CATEGORY_SMALL_STRAIGHT if roll.has_n_in_a_row(4) => 30,
        CATEGORY_LARGE_STRAIGHT if roll.has_n_in_a_row(5) => 40,
        CATEGORY_CHANCE => roll.sum_of_faces(),
        CATEGORY_YAHTZEE if is_yahtzee(roll) => 50,
        _ => 0,
    }
}

#[inline(always)]
pub fn is_yahtzee(roll: Roll) -> bool {
    roll.has_n_of_a_kind(N_DICE)
}

/// The upper-half box a Yahtzee natively belongs in (Ones for five ones, ...).
fn native_upper_half_box(yahtzee_roll: Roll) -> usize {
    yahtzee_roll.one().expect("native box of an empty roll") - 1
}

/// A score-independent Yahtzee position packed into a `u32`.
///
/// Bits 0..12: one per category, set once the box is filled. Bit 13:
/// eligible for Yahtzee bonuses (the Yahtzee box was filled for points;
/// implies bit 12). Bits 14..19: upper-half sum, capped at 63 since all
/// larger sums are equivalent for the bonus.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameState(pub u32);

impl GameState {
    /// The all-zeros starting position.
    pub fn new() -> Self {
        GameState(0)
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline(always)]
    pub fn game_over(self) -> bool {
        self.0 & BOXES_MASK == BOXES_MASK
    }

    #[inline(always)]
    pub fn box_filled(self, category: usize) -> bool {
        self.0 & (1 << category) != 0
    }

    #[inline(always)]
    pub fn bonus_eligible(self) -> bool {
        self.0 & (1 << BONUS_BIT) != 0
    }

    #[inline(always)]
    pub fn upper_half_score(self) -> i32 {
        (self.0 >> UHS_SHIFT) as i32
    }

    #[inline(always)]
    pub fn turns_remaining(self) -> usize {
        NUM_CATEGORIES - (self.0 & BOXES_MASK).count_ones() as usize
    }

    #[inline(always)]
    pub fn turn(self) -> usize {
        NUM_CATEGORIES - self.turns_remaining()
    }

    /// Categories still open, lowest index first. The filled mask is the
    /// precomputed form; this just walks its cleared bits.
    pub fn available_categories(self) -> impl Iterator<Item = usize> {
        let filled = self.0 & BOXES_MASK;
        (0..NUM_CATEGORIES).filter(move |c| filled & (1 << c) == 0)
    }

    /// Successor state bits for filling `category` with raw score `base`.
    ///
    /// Factored out of [`apply_fill`] so reachability enumeration can walk
    /// (category, base) edges without materializing rolls.
    pub(crate) fn successor(self, category: usize, base: i32) -> GameState {
        let mut next = GameState(self.0 | (1 << category));

        if category == CATEGORY_YAHTZEE && base != 0 {
            next.0 |= 1 << BONUS_BIT;
        }

        let prev_uhs = self.upper_half_score();
        if base != 0 && is_upper_half(category) && prev_uhs < UPPER_BONUS_THRESHOLD {
            let capped = (prev_uhs + base).min(UPPER_BONUS_THRESHOLD);
            next.0 = (next.0 & !(0x3F << UHS_SHIFT)) | ((capped as u32) << UHS_SHIFT);
        }

        next
    }

    /// Fill a box with a complete roll, returning the successor state and
    /// the points added (base score plus any bonuses).
    ///
    /// Panics on an already-filled box or a roll of fewer than five dice;
    /// both mean the caller or the enumeration is wrong.
    pub fn apply_fill(self, category: usize, roll: Roll) -> (GameState, i32) {
        if self.box_filled(category) {
            panic!(
                "trying to fill already filled box {} in {}",
                CATEGORY_NAMES[category], self
            );
        }
        if roll.num_dice() != N_DICE {
            panic!(
                "trying to fill a box with incomplete roll {roll} ({} dice)",
                roll.num_dice()
            );
        }

        let base = category_score(category, roll);
        let next = self.successor(category, base);
        let mut added = base;

        // Crossing the upper-half threshold awards the bonus exactly once.
        let prev_uhs = self.upper_half_score();
        if base != 0
            && is_upper_half(category)
            && prev_uhs < UPPER_BONUS_THRESHOLD
            && next.upper_half_score() >= UPPER_BONUS_THRESHOLD
        {
            added += UPPER_BONUS;
        }

        // Joker rule: a Yahtzee rolled while bonus-eligible always earns the
        // extra 100, and may additionally be played in a lower straight or
        // full-house box for its fixed points, but only when its native
        // upper-half box was already filled *before* this transition.
        if self.bonus_eligible() && is_yahtzee(roll) {
            added += YAHTZEE_BONUS;
            if self.box_filled(native_upper_half_box(roll)) {
                added += match category {
                    CATEGORY_FULL_HOUSE => 25,
                    CATEGORY_SMALL_STRAIGHT => 30,
                    CATEGORY_LARGE_STRAIGHT => 40,
                    _ => 0,
                };
            }
        }

        (next, added)
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{id: {}, available: {:?}, bonus_eligible: {}, upper_half: {}}}",
            self.0,
            self.available_categories().collect::<Vec<_>>(),
            self.bonus_eligible(),
            self.upper_half_score()
        )
    }
}

impl fmt::Debug for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Distinct raw scores each category can produce over the 252 complete rolls.
///
/// Successor state bits depend only on (category, base), so these sets drive
/// the reachability walk at a fraction of the per-roll edge count.
pub fn distinct_category_scores(tables: &RollTables) -> [Vec<i32>; NUM_CATEGORIES] {
    let mut distinct: [Vec<i32>; NUM_CATEGORIES] = std::array::from_fn(|_| Vec::new());
    for (category, scores) in distinct.iter_mut().enumerate() {
        for &roll in tables.complete_rolls() {
            let base = category_score(category, roll);
            if !scores.contains(&base) {
                scores.push(base);
            }
        }
        scores.sort_unstable();
    }
    distinct
}

/// Every game state reachable from the starting position.
pub fn all_reachable_states(tables: &RollTables) -> Vec<GameState> {
    reachable_states(tables, GameState::new())
}

/// Every game state reachable from `root` (inclusive), via breadth-first
/// walk over (category, distinct base score) edges.
pub fn reachable_states(tables: &RollTables, root: GameState) -> Vec<GameState> {
    let distinct = distinct_category_scores(tables);
    let mut seen = vec![false; MAX_GAME];
    let mut queue = VecDeque::new();
    let mut result = Vec::new();

    seen[root.index()] = true;
    queue.push_back(root);
    while let Some(game) = queue.pop_front() {
        result.push(game);
        for category in game.available_categories() {
            for &base in &distinct[category] {
                let next = game.successor(category, base);
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    queue.push_back(next);
                }
            }
        }
    }

    result
}
