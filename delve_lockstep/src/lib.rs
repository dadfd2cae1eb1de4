// delve_lockstep: deterministic turn-based lockstep core for Delve.
//
// Every peer runs an identical `GameManager`. Each turn, local commands are
// queued and staged for peers, remote commands are buffered as they arrive,
// and resolving the turn feeds every command through the host's
// `ActionResolver` in canonical roster order. Given the same roster, the
// same commands, and a deterministic resolver, every peer ends the turn with
// identical results and standings. Rules live entirely outside this crate.
//
// Module overview:
// - `roster.rs`:     `Roster`, canonical player order and the sort helper.
// - `session.rs`:    `NetSession`, outgoing/incoming buffers and replay log.
// - `controller.rs`: `TurnController` and the `ActionResolver` trait.
// - `manager.rs`:    `GameManager`, scores, turn ceiling, commit policy.
// - `turn.rs`:       `TurnLedger`, per-turn phase tracking.
// - `player.rs`:     `PlayerState`, a player's VP total.
// - `checksum.rs`:   CRC32 digests of turn results and replay logs.
// - `config.rs`:     `LockstepConfig` and its policy enums.
// - `error.rs`:      `LockstepError`, `ResolverError`.
//
// Nothing here performs I/O, spawns threads, or reads clocks. Hosts own the
// transport and drive every step explicitly; see `delve_coordinator` for a
// single-writer wrapper usable from several threads.

pub mod checksum;
pub mod config;
pub mod controller;
pub mod error;
pub mod manager;
pub mod player;
pub mod roster;
pub mod session;
pub mod turn;

pub use checksum::{replay_checksum, turn_checksum};
pub use config::{
    CommitPolicy, DEFAULT_TURN_LIMIT, LockstepConfig, RemoteQueueing, ReplayComparison,
};
pub use controller::{ActionResolver, QueuedCommand, TurnController};
pub use error::{LockstepError, LockstepResult, ResolverError};
pub use manager::GameManager;
pub use player::PlayerState;
pub use roster::Roster;
pub use session::NetSession;
pub use turn::{TurnLedger, TurnPhase};

pub use delve_protocol::{ActionResult, Command, Payload, PeerMessage, PlayerId, TurnIndex};
