//! Read-only query facade over a populated strategy table.
//!
//! External callers (HTTP service, interactive player, robot) see exactly
//! two operations: an O(1) value lookup, and `optimal_turn`, which runs one
//! [`TurnOptimizer`] against the table and returns every legal action with
//! its value, ranked best-first.

use std::fmt;

use crate::constants::*;
use crate::dice_mechanics::{Roll, RollTables};
use crate::game_mechanics::GameState;
use crate::observables::Observable;
use crate::state_computation::StrategyTable;
use crate::turn_solver::{TurnCaches, TurnOptimizer};

/// Where in the three-roll turn the caller is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnStep {
    Begin,
    Hold1,
    Hold2,
    FillBox,
}

/// One legal move at a turn step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    /// Begin the turn by rolling all five dice.
    Roll,
    /// Keep these dice and reroll the rest.
    Hold(Roll),
    /// Fill this category.
    Fill(usize),
    /// Abandon the game and play a fresh one (work minimization only).
    StartOver,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Roll => write!(f, "roll"),
            Action::Hold(roll) => write!(f, "hold {roll}"),
            Action::Fill(category) => write!(f, "fill {}", CATEGORY_NAMES[*category]),
            Action::StartOver => write!(f, "start over"),
        }
    }
}

/// An action paired with the value of taking it.
#[derive(Clone, Debug)]
pub struct ActionValue<V> {
    pub action: Action,
    pub value: V,
}

/// Facade failure modes.
#[derive(Debug, PartialEq, Eq)]
pub enum QueryError {
    /// The state (or its sub-DAG) has not been populated.
    NotPopulated(GameState),
    /// No turn can be played in a finished game.
    GameOver(GameState),
    /// Hold and fill steps need a complete five-die roll.
    IncompleteRoll { roll: Roll, dice: usize },
    /// Work-minimizing queries need a target to beat.
    MissingScoreToBeat,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NotPopulated(game) => write!(f, "state {game} is not populated"),
            QueryError::GameOver(game) => write!(f, "game {game} is already over"),
            QueryError::IncompleteRoll { roll, dice } => {
                write!(f, "roll {roll} has {dice} dice, expected {N_DICE}")
            }
            QueryError::MissingScoreToBeat => {
                write!(f, "this objective requires a score to beat")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// O(1) fetch of a populated state's value.
pub fn lookup<V: Observable>(
    table: &StrategyTable<V>,
    game: GameState,
) -> Result<&V, QueryError> {
    table.get(game).ok_or(QueryError::NotPopulated(game))
}

/// All legal actions at `step` with their values, best first.
///
/// `score_to_beat` is the remaining target used to rank distribution and
/// work values; `Begin` ignores `roll`.
pub fn optimal_turn<V: Observable>(
    tables: &RollTables,
    table: &StrategyTable<V>,
    prototype: &V,
    game: GameState,
    step: TurnStep,
    roll: Roll,
    score_to_beat: Option<usize>,
) -> Result<Vec<ActionValue<V>>, QueryError> {
    if game.game_over() {
        return Err(QueryError::GameOver(game));
    }
    if !table.is_set(game) {
        return Err(QueryError::NotPopulated(game));
    }
    if V::score_dependent() && score_to_beat.is_none() {
        return Err(QueryError::MissingScoreToBeat);
    }
    if step != TurnStep::Begin && roll.num_dice() != N_DICE {
        return Err(QueryError::IncompleteRoll {
            roll,
            dice: roll.num_dice(),
        });
    }

    let mut caches = TurnCaches::new(prototype);
    let mut opt = TurnOptimizer::new(tables, table, prototype, game, &mut caches);

    let mut ranked: Vec<ActionValue<V>> = match step {
        TurnStep::Begin => vec![ActionValue {
            action: Action::Roll,
            value: opt.optimal_turn_outcome(),
        }],
        TurnStep::Hold1 => opt
            .hold1_outcomes(roll)
            .into_iter()
            .map(|(held, value)| ActionValue {
                action: Action::Hold(held),
                value,
            })
            .collect(),
        TurnStep::Hold2 => opt
            .hold2_outcomes(roll)
            .into_iter()
            .map(|(held, value)| ActionValue {
                action: Action::Hold(held),
                value,
            })
            .collect(),
        TurnStep::FillBox => opt
            .fill_outcomes(roll)
            .into_iter()
            .map(|(category, value)| ActionValue {
                action: Action::Fill(category),
                value,
            })
            .collect(),
    };

    // When minimizing work, scrapping the game is always on the table
    // (except mid-fill, where a box must be chosen).
    if V::score_dependent() && step != TurnStep::FillBox {
        if let Some(fresh) = table.get(GameState::new()) {
            ranked.push(ActionValue {
                action: Action::StartOver,
                value: fresh.clone(),
            });
        }
    }

    ranked.sort_by(|a, b| {
        b.value
            .rank_value(score_to_beat)
            .partial_cmp(&a.value.rank_value(score_to_beat))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(ranked)
}
