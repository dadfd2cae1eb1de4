// Top-level game orchestration and score bookkeeping.
//
// `GameManager` owns the roster, the per-player `PlayerState`s, a
// `NetSession`, a `TurnController`, and the `TurnLedger`. It is the only
// component that mutates scores.
//
// Per-turn flow:
//   `enqueue_commands`         → validate, queue into the controller for the
//                                current turn, stage in the session outbox.
//   `receive_remote_commands`  → validate, buffer in the session's incoming
//                                store (and, under
//                                `RemoteQueueing::DirectAndCollected`, also
//                                queue straight into the controller).
//   `resolve_current_turn`     → check the turn ceiling, open the turn in the
//                                ledger, collect the session buffer (this
//                                writes the replay log), queue the collected
//                                commands, resolve, apply deltas, commit,
//                                advance the turn index.
//
// Resolution proceeds with whatever has been queued; the manager never waits
// for missing peers. Callers must make sure every peer's commands for a turn
// have been received before resolving it.
//
// Failure semantics: validation errors (`UnknownPlayer`, `TurnLimitExceeded`,
// `TurnNotOpen`) change nothing. A resolver failure, or a delta that would
// overflow a VP total (`ScoreOverflow`), aborts the turn in the ledger and
// leaves the turn index where it was. Under `CommitPolicy::Atomic` no delta
// from the failed turn is applied; under `CommitPolicy::Incremental` deltas
// of the commands resolved before the failure stay applied. Either way the
// turn's inputs have been consumed and it cannot be retried.
//
// Once the ceiling is reached or the current turn is aborted, the game
// accepts no more input: `enqueue_commands` and `receive_remote_commands`
// fail with `TurnLimitExceeded` or `TurnNotOpen` instead of queueing
// commands that could never resolve.

use std::collections::BTreeMap;
use std::sync::Arc;

use delve_protocol::{ActionResult, Command, PlayerId, TurnIndex};
use log::{error, info, warn};

use crate::checksum::turn_checksum;
use crate::config::{CommitPolicy, LockstepConfig, RemoteQueueing};
use crate::controller::{ActionResolver, TurnController};
use crate::error::{LockstepError, LockstepResult};
use crate::player::PlayerState;
use crate::roster::Roster;
use crate::session::NetSession;
use crate::turn::{TurnLedger, TurnPhase};

pub struct GameManager<R> {
    config: LockstepConfig,
    roster: Arc<Roster>,
    /// Indexed by roster position.
    players: Vec<PlayerState>,
    controller: TurnController<R>,
    session: NetSession,
    ledger: TurnLedger,
    turn_index: TurnIndex,
    /// `turn_checksum` of each committed turn, oldest first.
    checksums: Vec<u32>,
}

impl<R: ActionResolver> GameManager<R> {
    /// A game over `player_ids` (in canonical order) with the default config.
    pub fn new<I, P>(player_ids: I, resolver: R) -> LockstepResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        Self::with_config(player_ids, resolver, LockstepConfig::default())
    }

    pub fn with_config<I, P>(
        player_ids: I,
        resolver: R,
        config: LockstepConfig,
    ) -> LockstepResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        let roster = Arc::new(Roster::new(player_ids)?);
        let session = NetSession::new(Arc::clone(&roster));
        Ok(Self::assemble(resolver, session, config))
    }

    /// Use a pre-built session. Its roster must list the same players in the
    /// same order as `player_ids`.
    pub fn with_session<I, P>(
        player_ids: I,
        resolver: R,
        session: NetSession,
        config: LockstepConfig,
    ) -> LockstepResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        let roster = Roster::new(player_ids)?;
        if **session.roster() != roster {
            return Err(LockstepError::RosterMismatch);
        }
        Ok(Self::assemble(resolver, session, config))
    }

    /// Controller, manager and session all share the session's roster.
    fn assemble(resolver: R, mut session: NetSession, config: LockstepConfig) -> Self {
        session.set_replay_comparison(config.replay_comparison);
        let roster = Arc::clone(session.roster());
        let players = roster.iter().cloned().map(PlayerState::new).collect();
        Self {
            controller: TurnController::new(Arc::clone(&roster), resolver),
            config,
            roster,
            players,
            session,
            ledger: TurnLedger::new(),
            turn_index: TurnIndex::ZERO,
            checksums: Vec::new(),
        }
    }

    /// Seed starting VP totals. Every id must be on the roster; nothing is
    /// applied if any is not.
    pub fn with_starting_totals<I, P>(mut self, totals: I) -> LockstepResult<Self>
    where
        I: IntoIterator<Item = (P, i64)>,
        P: Into<PlayerId>,
    {
        let mut resolved = Vec::new();
        for (id, points) in totals {
            let id = id.into();
            let position = self
                .roster
                .position(&id)
                .ok_or_else(|| LockstepError::unknown_player(&id))?;
            resolved.push((position, points));
        }
        for (position, points) in resolved {
            self.players[position].victory_points = points;
        }
        Ok(self)
    }

    /// The current turn must be below the ceiling and still `Open`.
    fn ensure_accepting(&self) -> LockstepResult<()> {
        let turn_index = self.turn_index;
        if self.is_finished() {
            return Err(LockstepError::TurnLimitExceeded {
                turn_index,
                limit: self.config.turn_limit,
            });
        }
        match self.ledger.phase(turn_index) {
            TurnPhase::Open => Ok(()),
            phase => Err(LockstepError::TurnNotOpen { turn_index, phase }),
        }
    }

    fn validate(&self, commands: &[Command]) -> LockstepResult<()> {
        self.ensure_accepting()?;
        match commands.iter().find(|cmd| !self.roster.contains(&cmd.player_id)) {
            Some(cmd) => Err(LockstepError::unknown_player(&cmd.player_id)),
            None => Ok(()),
        }
    }

    /// Queue local commands for the current turn and stage them for peers.
    /// The whole batch is rejected if any command names an unknown player,
    /// or if the current turn can no longer resolve.
    pub fn enqueue_commands<I>(&mut self, commands: I) -> LockstepResult<()>
    where
        I: IntoIterator<Item = Command>,
    {
        let commands: Vec<Command> = commands.into_iter().collect();
        self.validate(&commands)?;
        for command in commands {
            self.controller.queue_input(self.turn_index, command.clone());
            self.session.send_command(command);
        }
        Ok(())
    }

    /// Accept commands peers sent for the current turn. Rejected as a whole
    /// under the same conditions as `enqueue_commands`.
    pub fn receive_remote_commands<I>(&mut self, commands: I) -> LockstepResult<()>
    where
        I: IntoIterator<Item = Command>,
    {
        let commands: Vec<Command> = commands.into_iter().collect();
        self.validate(&commands)?;
        for command in commands {
            if self.config.remote_queueing == RemoteQueueing::DirectAndCollected {
                self.controller.queue_input(self.turn_index, command.clone());
            }
            self.session.receive_command(self.turn_index, command);
        }
        Ok(())
    }

    /// Resolve the current turn, apply its score deltas, and advance.
    pub fn resolve_current_turn(&mut self) -> LockstepResult<Vec<ActionResult>> {
        let turn_index = self.turn_index;
        if turn_index.0 >= self.config.turn_limit {
            return Err(LockstepError::TurnLimitExceeded {
                turn_index,
                limit: self.config.turn_limit,
            });
        }

        let collecting = self.ledger.begin(turn_index)?;
        for command in self.session.collect_turn_commands(turn_index) {
            self.controller.queue_input(turn_index, command);
        }
        let resolving = collecting.resolving(&mut self.ledger);

        let outcome = match self.config.commit_policy {
            CommitPolicy::Atomic => self.controller.resolve_turn(turn_index).and_then(|results| {
                // Every new total is computed before any is written.
                let mut staged = self.players.clone();
                for result in &results {
                    apply_result(&mut staged, &self.roster, turn_index, result)?;
                }
                self.players = staged;
                Ok(results)
            }),
            CommitPolicy::Incremental => {
                let players = &mut self.players;
                let roster = &self.roster;
                let mut results = Vec::new();
                self.controller
                    .resolve_turn_each(turn_index, |result| {
                        apply_result(players, roster, turn_index, &result)?;
                        results.push(result);
                        Ok(())
                    })
                    .map(|()| results)
            }
        };

        match outcome {
            Ok(results) => {
                self.checksums.push(turn_checksum(&results));
                resolving.commit(&mut self.ledger);
                self.turn_index = turn_index.next();
                info!(
                    "committed turn {turn_index} with {} result(s)",
                    results.len()
                );
                Ok(results)
            }
            Err(err) => {
                if let LockstepError::ScoreOverflow { .. } = err {
                    error!("aborting turn {turn_index}: {err}");
                }
                resolving.abort(&mut self.ledger);
                Err(err)
            }
        }
    }

    /// Play every remaining turn up to the ceiling, feeding each turn the
    /// local commands listed for it (none if absent). Returns one result
    /// list per resolved turn.
    pub fn run_full_game(
        &mut self,
        per_turn_commands: &BTreeMap<TurnIndex, Vec<Command>>,
    ) -> LockstepResult<Vec<Vec<ActionResult>>> {
        let mut history = Vec::new();
        while !self.is_finished() {
            let commands = per_turn_commands
                .get(&self.turn_index)
                .cloned()
                .unwrap_or_default();
            self.enqueue_commands(commands)?;
            history.push(self.resolve_current_turn()?);
        }
        Ok(history)
    }

    /// Snapshot of every player's VP total.
    pub fn standings(&self) -> BTreeMap<PlayerId, i64> {
        self.players
            .iter()
            .map(|p| (p.player_id.clone(), p.victory_points))
            .collect()
    }

    /// Hand staged outgoing commands to the transport.
    pub fn pop_outgoing(&mut self) -> Vec<Command> {
        self.session.pop_outgoing()
    }

    pub fn players(&self) -> &[PlayerState] {
        &self.players
    }

    pub fn turn_index(&self) -> TurnIndex {
        self.turn_index
    }

    pub fn turn_phase(&self, turn_index: TurnIndex) -> TurnPhase {
        self.ledger.phase(turn_index)
    }

    /// True once the turn index reached the configured ceiling.
    pub fn is_finished(&self) -> bool {
        self.turn_index.0 >= self.config.turn_limit
    }

    pub fn checksums(&self) -> &[u32] {
        &self.checksums
    }

    pub fn config(&self) -> &LockstepConfig {
        &self.config
    }

    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }

    pub fn session(&self) -> &NetSession {
        &self.session
    }

    pub fn controller(&self) -> &TurnController<R> {
        &self.controller
    }
}

fn apply_result(
    players: &mut [PlayerState],
    roster: &Roster,
    turn_index: TurnIndex,
    result: &ActionResult,
) -> LockstepResult<()> {
    match roster.position(&result.player_id) {
        Some(position) => players[position].apply_vp(result.vp_delta, turn_index),
        None => {
            warn!(
                "result for {} on turn {turn_index} names a player outside the roster; \
                 vp_delta {} not applied",
                result.player_id, result.vp_delta
            );
            Ok(())
        }
    }
}
