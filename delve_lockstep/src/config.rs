// Tunable lockstep behavior.
//
// `LockstepConfig` gathers the few knobs where the lockstep core deliberately
// offers more than one behavior. Every peer in a game must use the same
// config, since the commit and queueing policies change what a turn
// resolves to. Every field has a default, so a JSON document only needs to
// name what it overrides.

use serde::{Deserialize, Serialize};

use crate::error::LockstepResult;

/// Number of turns a game runs when no limit is configured.
pub const DEFAULT_TURN_LIMIT: u32 = 30;

/// When resolver score deltas reach `PlayerState`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Buffer the whole turn; apply deltas only if every resolver call succeeded.
    #[default]
    Atomic,
    /// Apply each delta as soon as its resolver call returns. A mid-turn
    /// failure leaves the deltas of earlier commands applied.
    Incremental,
}

/// How commands from remote peers reach the turn controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteQueueing {
    /// Buffer in the session only; queued into the controller once, when the
    /// turn is collected. Each remote command resolves exactly once.
    #[default]
    Collected,
    /// Also queue into the controller on arrival. Combined with collection
    /// this resolves every remote command twice.
    DirectAndCollected,
}

/// What `NetSession::verify_replay` compares per command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayComparison {
    /// `player_id` concatenated with `action`; payload ignored.
    #[default]
    IdentityOnly,
    /// The whole command, payload included.
    Full,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockstepConfig {
    /// Turns are resolvable while `turn_index < turn_limit`.
    pub turn_limit: u32,
    pub commit_policy: CommitPolicy,
    pub remote_queueing: RemoteQueueing,
    pub replay_comparison: ReplayComparison,
}

impl Default for LockstepConfig {
    fn default() -> Self {
        Self {
            turn_limit: DEFAULT_TURN_LIMIT,
            commit_policy: CommitPolicy::default(),
            remote_queueing: RemoteQueueing::default(),
            replay_comparison: ReplayComparison::default(),
        }
    }
}

impl LockstepConfig {
    pub fn from_json(json: &str) -> LockstepResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LockstepError;

    #[test]
    fn defaults_match_the_standard_game() {
        let config = LockstepConfig::default();
        assert_eq!(config.turn_limit, 30);
        assert_eq!(config.commit_policy, CommitPolicy::Atomic);
        assert_eq!(config.remote_queueing, RemoteQueueing::Collected);
        assert_eq!(config.replay_comparison, ReplayComparison::IdentityOnly);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            LockstepConfig::from_json(r#"{"turn_limit": 12, "commit_policy": "incremental"}"#)
                .unwrap();
        assert_eq!(config.turn_limit, 12);
        assert_eq!(config.commit_policy, CommitPolicy::Incremental);
        assert_eq!(config.remote_queueing, RemoteQueueing::Collected);
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(
            LockstepConfig::from_json("{}").unwrap(),
            LockstepConfig::default()
        );
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = LockstepConfig::from_json(r#"{"remote_queueing": "sometimes"}"#);
        assert!(matches!(result, Err(LockstepError::InvalidConfig(_))));
    }

    #[test]
    fn serialized_form_roundtrips() {
        let config = LockstepConfig {
            turn_limit: 5,
            commit_policy: CommitPolicy::Incremental,
            remote_queueing: RemoteQueueing::DirectAndCollected,
            replay_comparison: ReplayComparison::Full,
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("direct_and_collected"));
        assert_eq!(LockstepConfig::from_json(&json).unwrap(), config);
    }
}
