// Player commands and their resolved outcomes.
//
// A `Command` is opaque to the lockstep core: the core reads `player_id` to
// order it and `action` (together with `player_id`) to compare replay streams,
// but never interprets `action` or `payload`. Both are defined by whatever
// resolver the host plugs in.
//
// An `ActionResult` is what the resolver hands back for one command. The only
// field the core acts on is `vp_delta`, which the game manager folds into the
// player's running victory-point total. `events` is free-form resolver output
// (damage dealt, gold found, ...) carried through to the caller untouched.
//
// Maps are `BTreeMap` so that serialized forms, and therefore checksums, do
// not depend on insertion order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{PlayerId, TurnIndex};

/// Resolver-defined key/value data attached to a command or result.
pub type Payload = BTreeMap<String, Value>;

/// An action request issued by one player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub player_id: PlayerId,
    pub action: String,
    #[serde(default)]
    pub payload: Payload,
}

impl Command {
    pub fn new(player_id: impl Into<PlayerId>, action: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            action: action.into(),
            payload: Payload::new(),
        }
    }

    /// Builder-style payload insertion.
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// The replay identity of this command: `player_id` immediately followed
    /// by `action`, with no separator. Payload does not participate.
    pub fn identity_key(&self) -> String {
        let mut key = String::with_capacity(self.player_id.as_str().len() + self.action.len());
        key.push_str(self.player_id.as_str());
        key.push_str(&self.action);
        key
    }
}

/// Outcome of resolving a single command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub player_id: PlayerId,
    pub turn_index: TurnIndex,
    #[serde(default)]
    pub vp_delta: i64,
    #[serde(default)]
    pub events: Payload,
}

impl ActionResult {
    /// A result with no score change and no events.
    pub fn new(player_id: impl Into<PlayerId>, turn_index: TurnIndex) -> Self {
        Self {
            player_id: player_id.into(),
            turn_index,
            vp_delta: 0,
            events: Payload::new(),
        }
    }

    pub fn with_vp(mut self, vp_delta: i64) -> Self {
        self.vp_delta = vp_delta;
        self
    }

    pub fn with_event(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.events.insert(key.into(), value.into());
        self
    }
}
