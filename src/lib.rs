//! # Yahtzee — optimal strategy tables via retrograde analysis
//!
//! Computes, once and offline, the optimal-play value of every reachable
//! single-player Yahtzee position, for three objectives, then answers
//! "what should I do with these dice?" queries from the populated table.
//!
//! ## Pipeline
//!
//! | Phase | Module | Description |
//! |-------|--------|-------------|
//! | 0 | [`dice_mechanics`] | Build static roll tables: the 462 dice multisets, subsequent rolls, holds, probabilities |
//! | 1 | [`game_mechanics`] | Enumerate reachable game states by BFS over fill edges |
//! | 2 | [`state_computation`] | Retrograde sweep: solve level-by-level from game end to game start, one [`turn_solver::TurnOptimizer`] call per state |
//! | 3 | [`storage`] | Persist the table as a gzip record stream |
//! | 4 | [`queries`] | Serve `lookup` / `optimal_turn` to external callers |
//!
//! ## State representation
//!
//! A game is a `u32`: 13 filled-box bits, one Yahtzee-bonus-eligibility
//! bit, and the upper-half sum capped at 63 — under 2^20 encodings, so the
//! strategy table is a flat array indexed by the state integer. Rolls are
//! `u32`s too, three bits of count per die side, composing by integer
//! addition.
//!
//! ## Objectives
//!
//! [`observables::ExpectedValue`] (expected final score),
//! [`observables::ScoreDistribution`] (survival function of the final
//! score), and [`observables::ExpectedWork`] (expected games to beat a
//! target, solved to a fixed point over the restart cost). All three share
//! the [`observables::Observable`] operation set, so the solver is written
//! once and monomorphized.

pub mod constants;
pub mod dice_mechanics;
pub mod env_config;
pub mod game_mechanics;
pub mod observables;
pub mod queries;
pub mod state_computation;
pub mod storage;
pub mod turn_solver;
