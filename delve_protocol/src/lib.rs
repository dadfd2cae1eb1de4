// delve_protocol: value types exchanged between Delve lockstep peers.
//
// This crate is the vocabulary shared by the lockstep core
// (`delve_lockstep`), the coordinator (`delve_coordinator`), rule resolvers,
// and whatever transport a host uses. It has no behavior beyond constructors
// and identity helpers.
//
// Module overview:
// - `types.rs`:    `PlayerId` and `TurnIndex` newtypes.
// - `command.rs`:  `Command`, `ActionResult`, and the `Payload` map type.
// - `message.rs`:  `PeerMessage`, the envelope a transport delivers.
//
// Payload values are `serde_json::Value` so resolvers can attach arbitrary
// structured data without this crate knowing its shape.

pub mod command;
pub mod message;
pub mod types;

pub use command::{ActionResult, Command, Payload};
pub use message::PeerMessage;
pub use types::{PlayerId, TurnIndex};
