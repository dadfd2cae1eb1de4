// delve_coordinator: single-writer coordination around a Delve lockstep game.
//
// The lockstep core is single-threaded and does no I/O. A host whose
// transport reads peers on several threads runs the `GameManager` inside a
// coordinator: one thread owns the manager, and every other thread talks to
// it through a cloneable `CoordinatorClient` over an `mpsc` channel.
//
// Module overview:
// - `coordinator.rs`: the owner thread, its event loop, the client handle,
//                     and `CoordinatorError`.
// - `desync.rs`:      `DesyncMonitor`, which compares per-turn checksums
//                     reported by every peer and flags disagreement.
//
// Dependencies: `delve_lockstep` (the game core) and `delve_protocol`
// (shared value types). No networking; transports live in the host.

pub mod coordinator;
pub mod desync;

pub use coordinator::{
    CoordinatorClient, CoordinatorError, CoordinatorHandle, CoordinatorResult, start_coordinator,
};
pub use desync::{Desync, DesyncMonitor};
