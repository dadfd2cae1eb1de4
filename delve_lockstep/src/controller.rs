// Rule-agnostic turn queueing and dispatch.
//
// `TurnController` knows nothing about game rules. It holds one input queue
// per turn, sorts a turn's queue into canonical roster order when asked to
// resolve it, and hands each command in that order to the injected
// `ActionResolver`.
//
// Resolving pops the queue: a turn's inputs are write-many/read-once. A
// resolver failure stops the turn at the failing command and is returned to
// the caller; results already handed out for earlier commands are not taken
// back at this layer (the game manager decides what to do with them, see
// `CommitPolicy`). There is no retry and no timeout; resolvers are expected
// to be synchronous and total for well-formed input.

use std::collections::BTreeMap;
use std::sync::Arc;

use delve_protocol::{ActionResult, Command, TurnIndex};
use log::{debug, error};

use crate::error::{LockstepError, LockstepResult, ResolverError};
use crate::roster::Roster;

/// The host-supplied rule boundary: one command in, one result out.
///
/// Implementations see only the command and its turn, never the controller
/// or session. Closures with the matching signature implement this trait.
pub trait ActionResolver {
    fn resolve(
        &mut self,
        command: &Command,
        turn_index: TurnIndex,
    ) -> Result<ActionResult, ResolverError>;
}

impl<F> ActionResolver for F
where
    F: FnMut(&Command, TurnIndex) -> Result<ActionResult, ResolverError>,
{
    fn resolve(
        &mut self,
        command: &Command,
        turn_index: TurnIndex,
    ) -> Result<ActionResult, ResolverError> {
        self(command, turn_index)
    }
}

/// A command waiting in a per-turn queue.
#[derive(Clone, Debug, PartialEq)]
pub struct QueuedCommand {
    pub turn_index: TurnIndex,
    pub command: Command,
}

pub struct TurnController<R> {
    roster: Arc<Roster>,
    resolver: R,
    input_queues: BTreeMap<TurnIndex, Vec<QueuedCommand>>,
}

impl<R: ActionResolver> TurnController<R> {
    pub fn new(roster: Arc<Roster>, resolver: R) -> Self {
        Self {
            roster,
            resolver,
            input_queues: BTreeMap::new(),
        }
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    /// Append `command` to the queue for `turn_index`. No cap, no dedup.
    pub fn queue_input(&mut self, turn_index: TurnIndex, command: Command) {
        debug!(
            "queued {} '{}' for turn {turn_index}",
            command.player_id, command.action
        );
        self.input_queues
            .entry(turn_index)
            .or_default()
            .push(QueuedCommand {
                turn_index,
                command,
            });
    }

    /// Commands currently queued for `turn_index`, in arrival order.
    pub fn queued(&self, turn_index: TurnIndex) -> &[QueuedCommand] {
        self.input_queues
            .get(&turn_index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pop and resolve the queue for `turn_index`, collecting results in
    /// canonical order.
    pub fn resolve_turn(&mut self, turn_index: TurnIndex) -> LockstepResult<Vec<ActionResult>> {
        let mut results = Vec::new();
        self.resolve_turn_each(turn_index, |result| {
            results.push(result);
            Ok(())
        })?;
        Ok(results)
    }

    /// Pop and resolve the queue for `turn_index`, passing each result to
    /// `on_result` as soon as the resolver returns it. Stops at the first
    /// resolver failure or the first error `on_result` returns.
    pub fn resolve_turn_each(
        &mut self,
        turn_index: TurnIndex,
        mut on_result: impl FnMut(ActionResult) -> LockstepResult<()>,
    ) -> LockstepResult<()> {
        let mut queued = self.input_queues.remove(&turn_index).unwrap_or_default();
        self.roster.canonical_sort(&mut queued, |entry| &entry.command.player_id);

        for entry in &queued {
            match self.resolver.resolve(&entry.command, turn_index) {
                Ok(result) => on_result(result)?,
                Err(source) => {
                    error!(
                        "resolver failed on turn {turn_index} for {} '{}': {source}",
                        entry.command.player_id, entry.command.action
                    );
                    return Err(LockstepError::ResolverFailure {
                        turn_index,
                        player_id: entry.command.player_id.clone(),
                        action: entry.command.action.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }
}
