//! Dice rolls as packed integers, plus the startup lookup tables.
//!
//! A [`Roll`] is a multiset of at most five dice: the count of side i lives
//! in bits 3(i-1)..3i, so merging two disjoint rolls is integer addition and
//! removing a sub-multiset is subtraction. All combinatorial queries the turn
//! solver needs (subsequent complete rolls, possible holds, probabilities)
//! are precomputed once by [`RollTables::build`] and indexed by the roll
//! integer, keeping the inner loops array-indexed.

use std::fmt;

use crate::constants::*;

/// A multiset of 0..=5 six-sided dice packed into a `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Roll(pub u32);

#[inline(always)]
fn field_shift(side: usize) -> u32 {
    ROLL_FIELD_BITS * (side as u32 - 1)
}

impl Roll {
    pub const EMPTY: Roll = Roll(0);

    pub fn new() -> Self {
        Roll(0)
    }

    /// Build a roll from an explicit dice list, e.g. `&[6, 6, 6, 6, 6]`.
    pub fn from_dice(dice: &[usize]) -> Self {
        let mut roll = Roll::new();
        for &die in dice {
            roll = roll.add(die);
        }
        roll
    }

    /// The roll with one more die of the given side.
    #[inline(always)]
    pub fn add(self, side: usize) -> Roll {
        debug_assert!((1..=N_SIDES).contains(&side), "invalid side {side}");
        debug_assert!(self.num_dice() < N_DICE, "adding a sixth die to {}", self);
        Roll(self.0 + (1 << field_shift(side)))
    }

    /// The roll with one die of the given side removed.
    ///
    /// Panics if the side is not present; that is a rule-engine bug, not a
    /// recoverable condition.
    #[inline(always)]
    pub fn remove(self, side: usize) -> Roll {
        if self.count_of(side) == 0 {
            panic!("trying to remove die {} from {}", side, self);
        }
        Roll(self.0 - (1 << field_shift(side)))
    }

    /// Total number of dice in this roll.
    #[inline(always)]
    pub fn num_dice(self) -> usize {
        let mut r = self.0;
        let mut total = 0;
        while r != 0 {
            total += (r & ROLL_FIELD_MASK) as usize;
            r >>= ROLL_FIELD_BITS;
        }
        total
    }

    /// Number of dice showing the given side.
    #[inline(always)]
    pub fn count_of(self, side: usize) -> usize {
        ((self.0 >> field_shift(side)) & ROLL_FIELD_MASK) as usize
    }

    /// Per-side counts, `counts[i]` = number of dice showing side i+1.
    pub fn counts(self) -> [usize; N_SIDES] {
        let mut counts = [0; N_SIDES];
        for (i, c) in counts.iter_mut().enumerate() {
            *c = self.count_of(i + 1);
        }
        counts
    }

    /// Any present side, lowest first; `None` for the empty roll.
    pub fn one(self) -> Option<usize> {
        (1..=N_SIDES).find(|&side| self.count_of(side) > 0)
    }

    /// Sum of the faces of all dice.
    pub fn sum_of_faces(self) -> i32 {
        (1..=N_SIDES)
            .map(|side| (side * self.count_of(side)) as i32)
            .sum()
    }

    /// Whether any side appears at least n times.
    pub fn has_n_of_a_kind(self, n: usize) -> bool {
        (1..=N_SIDES).any(|side| self.count_of(side) >= n)
    }

    /// Whether n consecutive sides are all present.
    pub fn has_n_in_a_row(self, n: usize) -> bool {
        let mut run = 0;
        for side in 1..=N_SIDES {
            if self.count_of(side) > 0 {
                run += 1;
                if run >= n {
                    return true;
                }
            } else {
                run = 0;
            }
        }
        false
    }

    /// Exactly a 2+3 partition of five dice over two distinct sides.
    pub fn is_full_house(self) -> bool {
        let mut has_pair = false;
        let mut has_triple = false;
        for side in 1..=N_SIDES {
            match self.count_of(side) {
                0 => {}
                2 => has_pair = true,
                3 => has_triple = true,
                _ => return false,
            }
        }
        has_pair && has_triple
    }

    /// Canonical ordered listing of the faces, for I/O.
    pub fn dice(self) -> Vec<usize> {
        let mut dice = Vec::with_capacity(self.num_dice());
        for side in 1..=N_SIDES {
            for _ in 0..self.count_of(side) {
                dice.push(side);
            }
        }
        dice
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for Roll {
    fn default() -> Self {
        Roll::new()
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dice())
    }
}

impl fmt::Debug for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Roll{:?}", self.dice())
    }
}

/// Startup lookup tables keyed by the roll integer.
///
/// Built once, then shared immutably across solver workers and query
/// handlers for the life of the process.
pub struct RollTables {
    /// All complete 5-die rolls reachable from each valid roll.
    subsequent: Vec<Vec<Roll>>,
    /// All sub-multisets of each valid roll, by side then ascending kept count.
    holds: Vec<Vec<Roll>>,
    /// P(rolling exactly this multiset from `num_dice` fresh dice).
    probability: Vec<f64>,
    /// Dense index 0..NUM_VALID_ROLLS for each valid roll, -1 otherwise.
    compact: Vec<i32>,
}

impl RollTables {
    /// Enumerate every valid roll and populate all four tables.
    pub fn build() -> Self {
        let mut tables = RollTables {
            subsequent: vec![Vec::new(); MAX_ROLL],
            holds: vec![Vec::new(); MAX_ROLL],
            probability: vec![0.0; MAX_ROLL],
            compact: vec![-1; MAX_ROLL],
        };

        let mut next_compact = 0i32;
        // Nested count-vector enumeration of all multisets of 0..=5 dice.
        for c1 in 0..=5u32 {
            for c2 in 0..=(5 - c1) {
                for c3 in 0..=(5 - c1 - c2) {
                    for c4 in 0..=(5 - c1 - c2 - c3) {
                        for c5 in 0..=(5 - c1 - c2 - c3 - c4) {
                            for c6 in 0..=(5 - c1 - c2 - c3 - c4 - c5) {
                                let roll = Roll(c1
                                    | (c2 << ROLL_FIELD_BITS)
                                    | (c3 << (2 * ROLL_FIELD_BITS))
                                    | (c4 << (3 * ROLL_FIELD_BITS))
                                    | (c5 << (4 * ROLL_FIELD_BITS))
                                    | (c6 << (5 * ROLL_FIELD_BITS)));
                                let idx = roll.index();
                                tables.compact[idx] = next_compact;
                                next_compact += 1;
                                tables.probability[idx] = compute_probability(roll);
                                tables.subsequent[idx] = enumerate_subsequent_rolls(roll);
                                tables.holds[idx] = enumerate_holds(roll, 1);
                            }
                        }
                    }
                }
            }
        }
        debug_assert_eq!(next_compact as usize, NUM_VALID_ROLLS);

        tables
    }

    /// Every complete roll obtainable by rolling the missing dice and merging.
    /// Contains the roll itself when it already has five dice.
    #[inline(always)]
    pub fn subsequent_rolls(&self, roll: Roll) -> &[Roll] {
        &self.subsequent[roll.index()]
    }

    /// All distinct kept sub-multisets of the roll, in the fixed order the
    /// expectation recursion relies on.
    #[inline(always)]
    pub fn possible_holds(&self, roll: Roll) -> &[Roll] {
        &self.holds[roll.index()]
    }

    /// Unconditional probability of rolling this multiset from fresh dice.
    #[inline(always)]
    pub fn probability(&self, roll: Roll) -> f64 {
        self.probability[roll.index()]
    }

    /// Dense index of a valid roll, for the per-turn caches.
    #[inline(always)]
    pub fn compact_index(&self, roll: Roll) -> usize {
        let idx = self.compact[roll.index()];
        debug_assert!(idx >= 0, "invalid roll {roll}");
        idx as usize
    }

    /// The 252 distinct complete rolls.
    #[inline(always)]
    pub fn complete_rolls(&self) -> &[Roll] {
        self.subsequent_rolls(Roll::EMPTY)
    }
}

const FACTORIAL: [u64; N_DICE + 1] = [1, 1, 2, 6, 24, 120];

fn compute_probability(roll: Roll) -> f64 {
    let n = roll.num_dice();
    let mut permutations = FACTORIAL[n];
    for count in roll.counts() {
        permutations /= FACTORIAL[count];
    }
    permutations as f64 / (N_SIDES as f64).powi(n as i32)
}

fn enumerate_subsequent_rolls(roll: Roll) -> Vec<Roll> {
    let needed = N_DICE - roll.num_dice();
    let mut result = enumerate_roll_helper(needed, 1);
    for r in &mut result {
        r.0 += roll.0;
    }
    result
}

fn enumerate_roll_helper(n: usize, from_side: usize) -> Vec<Roll> {
    if n == 0 {
        return vec![Roll::EMPTY];
    }
    let mut result = Vec::new();
    for side in from_side..=N_SIDES {
        for sub in enumerate_roll_helper(n - 1, side) {
            result.push(sub.add(side));
        }
    }
    result
}

fn enumerate_holds(roll: Roll, side: usize) -> Vec<Roll> {
    if side > N_SIDES {
        return vec![Roll::EMPTY];
    }
    let rest = enumerate_holds(roll, side + 1);
    let mut result = Vec::with_capacity((roll.count_of(side) + 1) * rest.len());
    // Ascending kept count per side, so the expectation over held multisets
    // can reuse previously computed sub-holds.
    for kept in 0..=roll.count_of(side) as u32 {
        let kept_bits = kept << field_shift(side);
        for r in &rest {
            result.push(Roll(kept_bits + r.0));
        }
    }
    result
}
