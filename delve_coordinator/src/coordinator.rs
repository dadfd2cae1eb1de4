// Single-writer coordinator thread for a `GameManager`.
//
// Architecture: one owner thread with a central `mpsc` channel.
//
// - **Coordinator thread**: owns the `GameManager` and a `DesyncMonitor`,
//   receives `Event`s from the channel, and handles them one at a time.
//   Nothing else ever touches the manager, so no locking is needed and every
//   peer-visible mutation happens in a single, well-defined order.
// - **Clients** (`CoordinatorClient`, any number, any thread): turn each call
//   into an `Event` carrying a reply channel, send it, and block on the
//   reply. Typically one client lives on each transport reader thread and one
//   on the game loop.
//
// Shutdown: `CoordinatorHandle::stop` sends `Event::Stop`; the thread leaves
// its loop and hands the manager back through `JoinHandle::join`. Requests
// sent after that fail with `CoordinatorError::Stopped`.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use delve_lockstep::{ActionResolver, GameManager, LockstepError};
use delve_protocol::{ActionResult, Command, PlayerId, TurnIndex};
use log::{debug, info};
use thiserror::Error;

use crate::desync::{Desync, DesyncMonitor};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator has stopped")]
    Stopped,
    #[error(transparent)]
    Lockstep(#[from] LockstepError),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Requests funneled into the coordinator thread.
enum Event {
    SubmitLocal {
        commands: Vec<Command>,
        reply: Sender<Result<(), LockstepError>>,
    },
    SubmitRemote {
        commands: Vec<Command>,
        reply: Sender<Result<(), LockstepError>>,
    },
    ResolveTurn {
        reply: Sender<Result<Vec<ActionResult>, LockstepError>>,
    },
    Standings {
        reply: Sender<BTreeMap<PlayerId, i64>>,
    },
    PopOutgoing {
        reply: Sender<Vec<Command>>,
    },
    CurrentTurn {
        reply: Sender<TurnIndex>,
    },
    Checksums {
        reply: Sender<Vec<u32>>,
    },
    ReportChecksum {
        peer: PlayerId,
        turn_index: TurnIndex,
        hash: u32,
        reply: Sender<Option<Desync>>,
    },
    Stop,
}

/// Handle returned by `start_coordinator` to reach and stop the thread.
pub struct CoordinatorHandle<R> {
    tx: Sender<Event>,
    thread: Option<thread::JoinHandle<GameManager<R>>>,
}

impl<R> CoordinatorHandle<R> {
    pub fn client(&self) -> CoordinatorClient {
        CoordinatorClient {
            tx: self.tx.clone(),
        }
    }

    /// Stop the coordinator and take the manager back.
    pub fn stop(mut self) -> CoordinatorResult<GameManager<R>> {
        let _ = self.tx.send(Event::Stop);
        let handle = self.thread.take().ok_or(CoordinatorError::Stopped)?;
        handle.join().map_err(|_| CoordinatorError::Stopped)
    }
}

/// Cloneable front end to a running coordinator.
#[derive(Clone)]
pub struct CoordinatorClient {
    tx: Sender<Event>,
}

impl CoordinatorClient {
    fn request<T>(&self, event: impl FnOnce(Sender<T>) -> Event) -> CoordinatorResult<T> {
        let (reply, rx) = mpsc::channel();
        self.tx
            .send(event(reply))
            .map_err(|_| CoordinatorError::Stopped)?;
        rx.recv().map_err(|_| CoordinatorError::Stopped)
    }

    /// `GameManager::enqueue_commands` on the coordinator thread.
    pub fn submit_local(&self, commands: Vec<Command>) -> CoordinatorResult<()> {
        self.request(|reply| Event::SubmitLocal { commands, reply })?
            .map_err(CoordinatorError::from)
    }

    /// `GameManager::receive_remote_commands` on the coordinator thread.
    pub fn submit_remote(&self, commands: Vec<Command>) -> CoordinatorResult<()> {
        self.request(|reply| Event::SubmitRemote { commands, reply })?
            .map_err(CoordinatorError::from)
    }

    /// `GameManager::resolve_current_turn` on the coordinator thread.
    pub fn resolve_turn(&self) -> CoordinatorResult<Vec<ActionResult>> {
        self.request(|reply| Event::ResolveTurn { reply })?
            .map_err(CoordinatorError::from)
    }

    pub fn standings(&self) -> CoordinatorResult<BTreeMap<PlayerId, i64>> {
        self.request(|reply| Event::Standings { reply })
    }

    pub fn pop_outgoing(&self) -> CoordinatorResult<Vec<Command>> {
        self.request(|reply| Event::PopOutgoing { reply })
    }

    pub fn turn_index(&self) -> CoordinatorResult<TurnIndex> {
        self.request(|reply| Event::CurrentTurn { reply })
    }

    pub fn checksums(&self) -> CoordinatorResult<Vec<u32>> {
        self.request(|reply| Event::Checksums { reply })
    }

    /// Feed a peer's turn checksum to the coordinator's `DesyncMonitor`.
    pub fn report_checksum(
        &self,
        peer: PlayerId,
        turn_index: TurnIndex,
        hash: u32,
    ) -> CoordinatorResult<Option<Desync>> {
        self.request(|reply| Event::ReportChecksum {
            peer,
            turn_index,
            hash,
            reply,
        })
    }
}

/// Move `manager` onto a dedicated thread. The desync monitor expects a
/// checksum from every roster member.
pub fn start_coordinator<R>(manager: GameManager<R>) -> CoordinatorHandle<R>
where
    R: ActionResolver + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let thread = thread::spawn(move || run_coordinator(manager, rx));
    CoordinatorHandle {
        tx,
        thread: Some(thread),
    }
}

/// Main loop. Runs until `Event::Stop` or until every sender is gone.
fn run_coordinator<R: ActionResolver>(
    mut manager: GameManager<R>,
    rx: Receiver<Event>,
) -> GameManager<R> {
    let mut monitor = DesyncMonitor::new(manager.roster().iter().cloned());
    info!(
        "coordinator started for {} player(s) at turn {} of {}",
        manager.roster().len(),
        manager.turn_index(),
        manager.config().turn_limit
    );

    while let Ok(event) = rx.recv() {
        if !handle_event(&mut manager, &mut monitor, event) {
            break;
        }
    }

    info!("coordinator stopped at turn {}", manager.turn_index());
    manager
}

/// Dispatch one event. Returns false when the loop should exit. A dropped
/// reply receiver means the caller gave up; the send error is ignored.
fn handle_event<R: ActionResolver>(
    manager: &mut GameManager<R>,
    monitor: &mut DesyncMonitor,
    event: Event,
) -> bool {
    match event {
        Event::SubmitLocal { commands, reply } => {
            let _ = reply.send(manager.enqueue_commands(commands));
        }
        Event::SubmitRemote { commands, reply } => {
            let _ = reply.send(manager.receive_remote_commands(commands));
        }
        Event::ResolveTurn { reply } => {
            let _ = reply.send(manager.resolve_current_turn());
        }
        Event::Standings { reply } => {
            let _ = reply.send(manager.standings());
        }
        Event::PopOutgoing { reply } => {
            let _ = reply.send(manager.pop_outgoing());
        }
        Event::CurrentTurn { reply } => {
            let _ = reply.send(manager.turn_index());
        }
        Event::Checksums { reply } => {
            let _ = reply.send(manager.checksums().to_vec());
        }
        Event::ReportChecksum {
            peer,
            turn_index,
            hash,
            reply,
        } => {
            let _ = reply.send(monitor.record(&peer, turn_index, hash));
        }
        Event::Stop => {
            debug!("coordinator received stop");
            return false;
        }
    }
    true
}
