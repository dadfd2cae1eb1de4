// Lockstep command exchange and the replay log.
//
// `NetSession` separates "commands this side wants to send" from "commands
// needed to resolve turn N", and remembers what was actually used for each
// turn. It does no I/O: the host's transport drains `pop_outgoing()` and
// delivers whatever peers sent through `receive_command()`.
//
// Key responsibilities:
// - Outgoing staging: `send_command` appends, `pop_outgoing` hands the batch
//   to the transport and clears it.
// - Incoming buffering: per-turn lists, any number of commands per player,
//   no deduplication.
// - Collection: `collect_turn_commands` removes a turn's buffer, sorts it
//   into canonical roster order (unknown players last, stable), and appends
//   the result to the replay log. This is the single point where "whatever
//   arrived" becomes "what will be resolved".
// - Replay verification: `verify_replay` compares the whole log against an
//   independently transmitted feed, per turn and per position.
//
// Collection is a destructive read. Collecting the same turn again returns
// an empty list (and logs an empty entry). Commands that arrive for a turn
// that was already collected are still buffered, but a warning is logged
// since a resolved turn can never pick them up through the game manager.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use delve_protocol::{Command, TurnIndex};
use log::{debug, warn};

use crate::checksum;
use crate::config::ReplayComparison;
use crate::roster::Roster;

#[derive(Debug)]
pub struct NetSession {
    roster: Arc<Roster>,
    replay_comparison: ReplayComparison,
    outgoing: Vec<Command>,
    incoming: BTreeMap<TurnIndex, Vec<Command>>,
    collected: BTreeSet<TurnIndex>,
    replay_log: Vec<Vec<Command>>,
}

impl NetSession {
    pub fn new(roster: Arc<Roster>) -> Self {
        Self {
            roster,
            replay_comparison: ReplayComparison::default(),
            outgoing: Vec::new(),
            incoming: BTreeMap::new(),
            collected: BTreeSet::new(),
            replay_log: Vec::new(),
        }
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn replay_comparison(&self) -> ReplayComparison {
        self.replay_comparison
    }

    pub fn set_replay_comparison(&mut self, comparison: ReplayComparison) {
        self.replay_comparison = comparison;
    }

    /// Stage a command for peers. No ordering guarantee.
    pub fn send_command(&mut self, command: Command) {
        self.outgoing.push(command);
    }

    /// Commands currently staged, without consuming them.
    pub fn outgoing(&self) -> &[Command] {
        &self.outgoing
    }

    /// Take every staged command, leaving the staging list empty.
    pub fn pop_outgoing(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outgoing)
    }

    /// Buffer a command received from a peer for `turn_index`.
    pub fn receive_command(&mut self, turn_index: TurnIndex, command: Command) {
        if self.collected.contains(&turn_index) {
            warn!(
                "late command for already-collected turn {turn_index}: {} '{}'",
                command.player_id, command.action
            );
        }
        self.incoming.entry(turn_index).or_default().push(command);
    }

    /// Number of commands buffered for `turn_index`.
    pub fn incoming_len(&self, turn_index: TurnIndex) -> usize {
        self.incoming.get(&turn_index).map_or(0, Vec::len)
    }

    /// Drain the buffer for `turn_index` into canonical order and append it
    /// to the replay log.
    pub fn collect_turn_commands(&mut self, turn_index: TurnIndex) -> Vec<Command> {
        let mut commands = self.incoming.remove(&turn_index).unwrap_or_default();
        self.roster.canonical_sort(&mut commands, |cmd| &cmd.player_id);
        self.collected.insert(turn_index);
        self.replay_log.push(commands.clone());
        debug!(
            "collected turn {turn_index}: {} command(s), replay log now {} turn(s)",
            commands.len(),
            self.replay_log.len()
        );
        commands
    }

    /// Committed per-turn orderings, one entry per collection, oldest first.
    pub fn replay_log(&self) -> &[Vec<Command>] {
        &self.replay_log
    }

    /// Compare the replay log against `feed` using the session's configured
    /// comparison. Turn counts, per-turn lengths, and every position must match.
    pub fn verify_replay(&self, feed: &[Vec<Command>]) -> bool {
        match self.replay_comparison {
            ReplayComparison::IdentityOnly => self.verify_replay_identity(feed),
            ReplayComparison::Full => self.verify_replay_full(feed),
        }
    }

    /// Identity-only comparison: `player_id + action` per command, payload
    /// ignored.
    pub fn verify_replay_identity(&self, feed: &[Vec<Command>]) -> bool {
        let recorded = identity_keys(&self.replay_log);
        let replayed = identity_keys(feed);
        recorded == replayed
    }

    /// Exact comparison, payload included.
    pub fn verify_replay_full(&self, feed: &[Vec<Command>]) -> bool {
        self.replay_log.as_slice() == feed
    }

    /// CRC32 over the replay log's identity keys.
    pub fn replay_checksum(&self) -> u32 {
        checksum::replay_checksum(&self.replay_log)
    }
}

fn identity_keys(log: &[Vec<Command>]) -> Vec<Vec<String>> {
    log.iter()
        .map(|turn| turn.iter().map(Command::identity_key).collect())
        .collect()
}
