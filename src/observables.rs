//! The three value objectives behind one trait.
//!
//! Each observable supports the same operation set (additive identity,
//! terminal value, weighted accumulation, elementwise best, score shift),
//! so the turn solver and retrograde sweep are written once and
//! monomorphized per objective. The dense-vector observables mutate in
//! place and are copied with `clone_from`, keeping their ~1.5k-float
//! buffers out of the allocator on the hot path.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::constants::MAX_SCORE;

/// A value objective the solver can maximize.
///
/// Methods take `&self` prototypes where configuration (e.g. the
/// expected-work restart cost) must flow into fresh values.
pub trait Observable:
    Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Additive identity used to seed weighted-expectation accumulators.
    fn zero(&self) -> Self;

    /// Value of a completed game.
    fn terminal(&self) -> Self;

    /// `self += weight * other`.
    fn add_weighted(&mut self, other: &Self, weight: f64);

    /// Elementwise best of two values. Expected work minimizes, so its
    /// "max" is a pointwise minimum.
    fn max_assign(&mut self, other: &Self);

    /// Bank `added` points: shift the value by an integer score offset.
    fn shift(&mut self, added: i32);

    /// `self = max(self, other shifted by added)`, fused so the fill step
    /// needs no temporary.
    fn max_assign_shifted(&mut self, other: &Self, added: i32);

    /// Whether queries against this objective need a running total.
    fn score_dependent() -> bool {
        false
    }

    /// Scalar used to rank actions, higher preferred. `score_to_beat` is
    /// the remaining target for the distribution and work objectives.
    fn rank_value(&self, score_to_beat: Option<usize>) -> f64;
}

/// Expected final score: a single number.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpectedValue(pub f64);

impl ExpectedValue {
    pub fn new() -> Self {
        ExpectedValue(0.0)
    }
}

impl Default for ExpectedValue {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for ExpectedValue {
    fn zero(&self) -> Self {
        ExpectedValue(0.0)
    }

    fn terminal(&self) -> Self {
        ExpectedValue(0.0)
    }

    fn add_weighted(&mut self, other: &Self, weight: f64) {
        self.0 += weight * other.0;
    }

    fn max_assign(&mut self, other: &Self) {
        if other.0 > self.0 {
            self.0 = other.0;
        }
    }

    fn shift(&mut self, added: i32) {
        self.0 += added as f64;
    }

    fn max_assign_shifted(&mut self, other: &Self, added: i32) {
        let shifted = other.0 + added as f64;
        if shifted > self.0 {
            self.0 = shifted;
        }
    }

    fn rank_value(&self, _score_to_beat: Option<usize>) -> f64 {
        self.0
    }
}

/// Survival function of the remaining score: `probabilities[s]` =
/// P(remaining final score ≥ s), for s in 0..=MAX_SCORE.
///
/// Storing the survival form makes `shift` a rotate-and-fill and keeps
/// `max` elementwise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    pub probabilities: Vec<f32>,
}

impl ScoreDistribution {
    pub fn new() -> Self {
        ScoreDistribution {
            probabilities: vec![0.0; MAX_SCORE + 1],
        }
    }

    /// P(remaining score ≥ score).
    pub fn probability(&self, score: usize) -> f64 {
        if score > MAX_SCORE {
            0.0
        } else {
            self.probabilities[score] as f64
        }
    }

    /// Mean remaining score, the tail-sum of the survival function.
    pub fn mean(&self) -> f64 {
        self.probabilities[1..].iter().map(|&p| p as f64).sum()
    }
}

impl Default for ScoreDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for ScoreDistribution {
    fn zero(&self) -> Self {
        ScoreDistribution::new()
    }

    fn terminal(&self) -> Self {
        // A finished game adds exactly zero more points.
        let mut sd = ScoreDistribution::new();
        sd.probabilities[0] = 1.0;
        sd
    }

    fn add_weighted(&mut self, other: &Self, weight: f64) {
        let w = weight as f32;
        for (a, b) in self.probabilities.iter_mut().zip(&other.probabilities) {
            *a += w * b;
        }
    }

    fn max_assign(&mut self, other: &Self) {
        for (a, b) in self.probabilities.iter_mut().zip(&other.probabilities) {
            if *b > *a {
                *a = *b;
            }
        }
    }

    fn shift(&mut self, added: i32) {
        let k = added as usize;
        if k == 0 {
            return;
        }
        let n = self.probabilities.len();
        for s in (k..n).rev() {
            self.probabilities[s] = self.probabilities[s - k];
        }
        // Scores at or below the banked amount are certain.
        for s in 0..k.min(n) {
            self.probabilities[s] = 1.0;
        }
    }

    fn max_assign_shifted(&mut self, other: &Self, added: i32) {
        let k = added as usize;
        let n = self.probabilities.len();
        for s in 0..k.min(n) {
            self.probabilities[s] = 1.0;
        }
        for s in k..n {
            let shifted = other.probabilities[s - k];
            if shifted > self.probabilities[s] {
                self.probabilities[s] = shifted;
            }
        }
    }

    fn rank_value(&self, score_to_beat: Option<usize>) -> f64 {
        match score_to_beat {
            Some(s) => self.probability(s),
            None => self.mean(),
        }
    }
}

/// Expected games needed to beat a target, as a function of the points
/// still required: `games[s]` = expected number of games (the in-progress
/// one included) until some game's remaining play adds more than s - 1
/// points beyond what is already banked. `games[0]` = 0: nothing more is
/// needed.
///
/// The algebra minimizes, so `max_assign` takes the pointwise minimum.
/// `restart_cost` (e0) is the cost of scrapping the game and starting
/// over, refined by the solver's fixed-point loop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpectedWork {
    pub games: Vec<f32>,
    pub restart_cost: f32,
}

impl ExpectedWork {
    pub fn new(restart_cost: f32) -> Self {
        ExpectedWork {
            games: vec![0.0; MAX_SCORE + 1],
            restart_cost,
        }
    }

    /// Index of a target that must be strictly exceeded, given points
    /// already banked.
    pub fn needed_index(score_to_beat: usize, banked: usize) -> usize {
        (score_to_beat + 1).saturating_sub(banked).min(MAX_SCORE)
    }

    /// Expected games when `needed` more points are required.
    pub fn games_needed(&self, needed: usize) -> f64 {
        self.games[needed.min(MAX_SCORE)] as f64
    }
}

impl Observable for ExpectedWork {
    fn zero(&self) -> Self {
        ExpectedWork::new(self.restart_cost)
    }

    fn terminal(&self) -> Self {
        // The game just ended. Needing anything further means it failed
        // and the whole process restarts.
        let mut ew = ExpectedWork::new(self.restart_cost);
        for g in ew.games[1..].iter_mut() {
            *g = self.restart_cost;
        }
        ew
    }

    fn add_weighted(&mut self, other: &Self, weight: f64) {
        let w = weight as f32;
        for (a, b) in self.games.iter_mut().zip(&other.games) {
            *a += w * b;
        }
    }

    fn max_assign(&mut self, other: &Self) {
        for (a, b) in self.games.iter_mut().zip(&other.games) {
            if *b < *a {
                *a = *b;
            }
        }
    }

    fn shift(&mut self, added: i32) {
        let k = added as usize;
        if k == 0 {
            return;
        }
        let n = self.games.len();
        for s in (k..n).rev() {
            self.games[s] = self.games[s - k];
        }
        // Banking k points satisfies every requirement of at most k.
        for s in 0..k.min(n) {
            self.games[s] = 0.0;
        }
    }

    fn max_assign_shifted(&mut self, other: &Self, added: i32) {
        let k = added as usize;
        let n = self.games.len();
        for s in 0..k.min(n) {
            self.games[s] = 0.0;
        }
        for s in k..n {
            let shifted = other.games[s - k];
            if shifted < self.games[s] {
                self.games[s] = shifted;
            }
        }
    }

    fn score_dependent() -> bool {
        true
    }

    fn rank_value(&self, score_to_beat: Option<usize>) -> f64 {
        // Less work ranks higher. Callers must supply the remaining target.
        let needed = score_to_beat.expect("expected_work ranking requires a score to beat");
        -self.games_needed(needed)
    }
}
