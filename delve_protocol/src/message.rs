// Envelope for what one lockstep peer hands another.
//
// Delve does not own a transport. Whatever carries bytes between peers
// (relay, socket, in-process channel in tests) delivers `PeerMessage`s, and
// the receiving side feeds them into its game manager or coordinator. The
// enum is serde-derivable so a transport can pick any encoding.
//
// `TurnCommands` carries the commands a peer staged for a given turn (what
// `NetSession::pop_outgoing` returned after that peer enqueued them).
// `TurnChecksum` carries the peer's checksum of a committed turn's results so
// the receiver can detect divergence.

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::types::{PlayerId, TurnIndex};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// Commands a peer issued for `turn_index`.
    TurnCommands {
        from: PlayerId,
        turn_index: TurnIndex,
        commands: Vec<Command>,
    },
    /// Checksum of the results a peer committed for `turn_index`.
    TurnChecksum {
        from: PlayerId,
        turn_index: TurnIndex,
        hash: u32,
    },
}

impl PeerMessage {
    pub fn sender(&self) -> &PlayerId {
        match self {
            PeerMessage::TurnCommands { from, .. } | PeerMessage::TurnChecksum { from, .. } => from,
        }
    }

    pub fn turn_index(&self) -> TurnIndex {
        match self {
            PeerMessage::TurnCommands { turn_index, .. }
            | PeerMessage::TurnChecksum { turn_index, .. } => *turn_index,
        }
    }
}
