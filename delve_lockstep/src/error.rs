// Error types for the lockstep core.
//
// Validation failures (`UnknownPlayer`, `DuplicatePlayer`, `RosterMismatch`,
// `TurnLimitExceeded`, `TurnNotOpen`) are raised before any state is touched.
// `ResolverFailure` wraps whatever the injected resolver reported and aborts
// the rest of that turn, as does `ScoreOverflow` when a delta would push a VP
// total out of `i64` range; see `manager.rs` for which score deltas survive.

use delve_protocol::{PlayerId, TurnIndex};
use thiserror::Error;

use crate::turn::TurnPhase;

/// Failure reported by an injected action resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ResolverError {
    pub message: String,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LockstepError {
    /// A command or score entry names a player outside the fixed roster.
    #[error("Unknown player: {player_id}")]
    UnknownPlayer { player_id: PlayerId },

    /// The same id was listed twice when building a roster.
    #[error("Player {player_id} appears more than once in the roster")]
    DuplicatePlayer { player_id: PlayerId },

    /// A pre-built session was ordered by a different roster than the manager.
    #[error("Session roster does not match the game roster")]
    RosterMismatch,

    /// Resolution was requested at or past the configured ceiling.
    #[error("Turn limit reached: turn {turn_index} is not below the limit of {limit}")]
    TurnLimitExceeded { turn_index: TurnIndex, limit: u32 },

    /// The turn has already left the open phase and cannot be collected again.
    #[error("Turn {turn_index} cannot be resolved from phase {phase:?}")]
    TurnNotOpen { turn_index: TurnIndex, phase: TurnPhase },

    /// The resolver failed on one command; the rest of the turn was skipped.
    #[error("Resolver failed on turn {turn_index} for {player_id} '{action}': {source}")]
    ResolverFailure {
        turn_index: TurnIndex,
        player_id: PlayerId,
        action: String,
        #[source]
        source: ResolverError,
    },

    /// Applying a resolver delta would overflow the player's VP total.
    #[error("VP total of {player_id} overflows on turn {turn_index}")]
    ScoreOverflow {
        player_id: PlayerId,
        turn_index: TurnIndex,
    },

    #[error("Invalid lockstep config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl LockstepError {
    pub fn unknown_player(player_id: &PlayerId) -> Self {
        Self::UnknownPlayer {
            player_id: player_id.clone(),
        }
    }
}

pub type LockstepResult<T> = Result<T, LockstepError>;
