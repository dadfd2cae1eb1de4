// Checksum-based desync detection across lockstep peers.
//
// Each peer hashes the results of every committed turn
// (`GameManager::checksums()`) and reports the hash. `DesyncMonitor` keeps
// the reports per turn until every expected peer has reported, then compares
// them. Any disagreement means the peers' games have diverged; the monitor
// returns a `Desync` naming the turn and each peer's hash, and the host
// decides what to do (usually tear the game down).
//
// Reports from peers outside the expected set are ignored. Once a turn is
// fully reported, it and every older turn are pruned, so a peer that never
// reports an old turn cannot make the monitor grow without bound once newer
// turns complete.

use std::collections::{BTreeMap, BTreeSet};

use delve_protocol::{PlayerId, TurnIndex};
use log::{debug, warn};

/// Peers disagreed on a turn's checksum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Desync {
    pub turn_index: TurnIndex,
    pub hashes: BTreeMap<PlayerId, u32>,
}

#[derive(Debug)]
pub struct DesyncMonitor {
    peers: BTreeSet<PlayerId>,
    reports: BTreeMap<TurnIndex, BTreeMap<PlayerId, u32>>,
}

impl DesyncMonitor {
    pub fn new<I, P>(peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        Self {
            peers: peers.into_iter().map(Into::into).collect(),
            reports: BTreeMap::new(),
        }
    }

    /// Record `peer`'s hash for `turn_index`. Returns a `Desync` once every
    /// expected peer has reported and the hashes disagree. A repeated report
    /// from the same peer overwrites its earlier one.
    pub fn record(&mut self, peer: &PlayerId, turn_index: TurnIndex, hash: u32) -> Option<Desync> {
        if !self.peers.contains(peer) {
            debug!("ignoring checksum from unexpected peer {peer} for turn {turn_index}");
            return None;
        }

        let turn_reports = self.reports.entry(turn_index).or_default();
        turn_reports.insert(peer.clone(), hash);
        if turn_reports.len() < self.peers.len() {
            return None;
        }

        let all_match = {
            let mut values = turn_reports.values();
            let first = values.next().copied();
            values.all(|v| Some(*v) == first)
        };
        let desync = (!all_match).then(|| Desync {
            turn_index,
            hashes: turn_reports.clone(),
        });
        if let Some(desync) = &desync {
            warn!(
                "desync on turn {turn_index}: peers reported {:?}",
                desync.hashes
            );
        }

        self.reports.retain(|turn, _| *turn > turn_index);
        desync
    }

    /// Turns with at least one report still waiting on other peers.
    pub fn pending_turns(&self) -> usize {
        self.reports.len()
    }
}
