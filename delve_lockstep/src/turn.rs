// Per-turn lifecycle tracking.
//
// Every turn moves through
//
//   Open ──begin──▶ Collecting ──resolving──▶ Resolving ──commit──▶ Committed
//                                                  └──────abort───▶ Aborted
//
// `TurnLedger` records the phase of each turn index (an index with no entry
// is `Open`). Transitions are only reachable through move-only tokens:
// `begin` hands out a `CollectingTurn`, which converts into a
// `ResolvingTurn`, which is consumed by `commit` or `abort`. The tokens have
// private fields and no `Clone`, so a resolution flow cannot collect a turn
// twice or commit it twice, and `begin` refuses any turn that is not `Open`.

use std::collections::BTreeMap;

use delve_protocol::TurnIndex;
use serde::{Deserialize, Serialize};

use crate::error::{LockstepError, LockstepResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Accepting local and remote commands.
    Open,
    /// Incoming buffer is being drained into canonical order.
    Collecting,
    /// Resolver calls are in progress.
    Resolving,
    /// Score deltas applied and the turn index advanced.
    Committed,
    /// The resolver failed; the turn will never commit.
    Aborted,
}

#[derive(Debug, Default)]
pub struct TurnLedger {
    phases: BTreeMap<TurnIndex, TurnPhase>,
}

/// Proof that a turn left `Open` and is being collected.
#[derive(Debug)]
#[must_use = "a collecting turn must be moved on to resolution"]
pub struct CollectingTurn {
    turn_index: TurnIndex,
}

/// Proof that a turn is mid-resolution.
#[derive(Debug)]
#[must_use = "a resolving turn must be committed or aborted"]
pub struct ResolvingTurn {
    turn_index: TurnIndex,
}

impl TurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, turn_index: TurnIndex) -> TurnPhase {
        self.phases
            .get(&turn_index)
            .copied()
            .unwrap_or(TurnPhase::Open)
    }

    /// Leave `Open` for `Collecting`. Fails for any turn already begun.
    pub fn begin(&mut self, turn_index: TurnIndex) -> LockstepResult<CollectingTurn> {
        let phase = self.phase(turn_index);
        if phase != TurnPhase::Open {
            return Err(LockstepError::TurnNotOpen { turn_index, phase });
        }
        self.phases.insert(turn_index, TurnPhase::Collecting);
        Ok(CollectingTurn { turn_index })
    }
}

impl CollectingTurn {
    pub fn turn_index(&self) -> TurnIndex {
        self.turn_index
    }

    pub fn resolving(self, ledger: &mut TurnLedger) -> ResolvingTurn {
        ledger.phases.insert(self.turn_index, TurnPhase::Resolving);
        ResolvingTurn {
            turn_index: self.turn_index,
        }
    }
}

impl ResolvingTurn {
    pub fn turn_index(&self) -> TurnIndex {
        self.turn_index
    }

    pub fn commit(self, ledger: &mut TurnLedger) {
        ledger.phases.insert(self.turn_index, TurnPhase::Committed);
    }

    pub fn abort(self, ledger: &mut TurnLedger) {
        ledger.phases.insert(self.turn_index, TurnPhase::Aborted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_turns_are_open() {
        let ledger = TurnLedger::new();
        assert_eq!(ledger.phase(TurnIndex(17)), TurnPhase::Open);
    }

    #[test]
    fn full_lifecycle_commits() {
        let mut ledger = TurnLedger::new();
        let collecting = ledger.begin(TurnIndex(0)).unwrap();
        assert_eq!(ledger.phase(TurnIndex(0)), TurnPhase::Collecting);
        let resolving = collecting.resolving(&mut ledger);
        assert_eq!(ledger.phase(TurnIndex(0)), TurnPhase::Resolving);
        resolving.commit(&mut ledger);
        assert_eq!(ledger.phase(TurnIndex(0)), TurnPhase::Committed);
        assert_eq!(ledger.phase(TurnIndex(1)), TurnPhase::Open);
    }

    #[test]
    fn committed_turn_cannot_begin_again() {
        let mut ledger = TurnLedger::new();
        ledger
            .begin(TurnIndex(2))
            .unwrap()
            .resolving(&mut ledger)
            .commit(&mut ledger);
        match ledger.begin(TurnIndex(2)) {
            Err(LockstepError::TurnNotOpen { turn_index, phase }) => {
                assert_eq!(turn_index, TurnIndex(2));
                assert_eq!(phase, TurnPhase::Committed);
            }
            other => panic!("expected TurnNotOpen, got {other:?}"),
        }
    }

    #[test]
    fn aborted_turn_stays_closed() {
        let mut ledger = TurnLedger::new();
        ledger
            .begin(TurnIndex(1))
            .unwrap()
            .resolving(&mut ledger)
            .abort(&mut ledger);
        assert_eq!(ledger.phase(TurnIndex(1)), TurnPhase::Aborted);
        assert!(ledger.begin(TurnIndex(1)).is_err());
        assert_eq!(ledger.phase(TurnIndex(0)), TurnPhase::Open);
    }

    #[test]
    fn collecting_turn_blocks_reentry() {
        let mut ledger = TurnLedger::new();
        let _held = ledger.begin(TurnIndex(0)).unwrap();
        assert!(ledger.begin(TurnIndex(0)).is_err());
    }
}
