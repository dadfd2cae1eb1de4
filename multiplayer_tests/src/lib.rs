// Test-only lockstep peer for multiplayer integration tests.
//
// Wraps a real `GameManager` (from `delve_lockstep`) and a real
// `DesyncMonitor` (from `delve_coordinator`) to provide a synchronous,
// test-friendly API for exercising the full lockstep pipeline:
// act → stage → exchange `PeerMessage`s → resolve → checksum → compare.
//
// The "transport" is in-process: `broadcast` JSON-encodes every staged
// message, shuffles delivery order with a seeded `GameRng`, and decodes it at
// each receiver. Each sender's batch stays intact, since a real transport
// preserves per-sender order; only the interleaving across senders varies.
//
// `DungeonResolver` is a small deterministic rule set that draws from its
// own seeded `GameRng`, standing in for the combat/loot collaborators a real
// host would plug in.
//
// See also: `tests/full_pipeline.rs` for the integration test scenarios.

use std::collections::BTreeMap;

use delve_coordinator::{Desync, DesyncMonitor};
use delve_lockstep::{
    ActionResolver, ActionResult, Command, GameManager, LockstepConfig, PeerMessage, PlayerId,
    ResolverError, TurnIndex,
};
use delve_prng::GameRng;

/// Rules for the test dungeon:
/// - `attack`: 1..=6 VP, event `roll`.
/// - `loot`: 25% chance of 3 VP, event `found`.
/// - `rest`: nothing.
/// - `trap`: always -2 VP.
///
/// Anything else is a resolver error.
pub struct DungeonResolver {
    rng: GameRng,
}

impl DungeonResolver {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: GameRng::new(seed),
        }
    }
}

impl ActionResolver for DungeonResolver {
    fn resolve(
        &mut self,
        command: &Command,
        turn_index: TurnIndex,
    ) -> Result<ActionResult, ResolverError> {
        let result = ActionResult::new(command.player_id.clone(), turn_index);
        match command.action.as_str() {
            "attack" => {
                let roll = self.rng.range_i64_inclusive(1, 6);
                Ok(result.with_vp(roll).with_event("roll", roll))
            }
            "loot" => {
                let found = self.rng.chance(0.25);
                Ok(result
                    .with_vp(if found { 3 } else { 0 })
                    .with_event("found", found))
            }
            "rest" => Ok(result),
            "trap" => Ok(result.with_vp(-2)),
            other => Err(ResolverError::new(format!("no such action '{other}'"))),
        }
    }
}

/// One lockstep participant.
pub struct TestPeer {
    pub id: PlayerId,
    pub manager: GameManager<DungeonResolver>,
    monitor: DesyncMonitor,
    /// What this peer handed to the transport, one entry per turn.
    sent: Vec<Vec<Command>>,
}

impl TestPeer {
    /// A peer playing as `id` in a game over `roster`. Every peer of one
    /// game must use the same `rules_seed`.
    pub fn new(id: &str, roster: &[&str], rules_seed: u64, config: LockstepConfig) -> Self {
        let manager = GameManager::with_config(
            roster.iter().copied(),
            DungeonResolver::new(rules_seed),
            config,
        )
        .expect("TestPeer::new: invalid roster");
        Self {
            id: PlayerId::from(id),
            manager,
            monitor: DesyncMonitor::new(roster.iter().copied()),
            sent: Vec::new(),
        }
    }

    /// Issue this peer's own commands for the current turn.
    pub fn act(&mut self, actions: &[&str]) {
        let commands = actions.iter().map(|a| Command::new(self.id.clone(), *a));
        self.manager
            .enqueue_commands(commands)
            .expect("TestPeer::act rejected");
    }

    /// Drain staged commands into a message for the current turn.
    pub fn outbox(&mut self) -> PeerMessage {
        let commands = self.manager.pop_outgoing();
        self.sent.push(commands.clone());
        PeerMessage::TurnCommands {
            from: self.id.clone(),
            turn_index: self.manager.turn_index(),
            commands,
        }
    }

    /// Handle one message from another peer. Returns a desync if a checksum
    /// report completed a turn with disagreeing hashes.
    pub fn deliver(&mut self, message: PeerMessage) -> Option<Desync> {
        match message {
            PeerMessage::TurnCommands {
                turn_index,
                commands,
                ..
            } => {
                assert_eq!(
                    turn_index,
                    self.manager.turn_index(),
                    "{}: commands for turn {turn_index} arrived out of lockstep",
                    self.id
                );
                self.manager
                    .receive_remote_commands(commands)
                    .expect("TestPeer::deliver rejected remote commands");
                None
            }
            PeerMessage::TurnChecksum {
                from,
                turn_index,
                hash,
            } => self.monitor.record(&from, turn_index, hash),
        }
    }

    pub fn resolve(&mut self) -> Vec<ActionResult> {
        self.manager
            .resolve_current_turn()
            .expect("TestPeer::resolve failed")
    }

    /// Checksum message for the most recently committed turn.
    pub fn checksum_message(&self) -> PeerMessage {
        let committed = self.manager.checksums().len();
        assert!(committed > 0, "{}: no committed turn to report", self.id);
        PeerMessage::TurnChecksum {
            from: self.id.clone(),
            turn_index: TurnIndex(committed as u32 - 1),
            hash: self.manager.checksums()[committed - 1],
        }
    }

    /// Per-turn commands this peer sent, in send order.
    pub fn sent_feed(&self) -> &[Vec<Command>] {
        &self.sent
    }

    pub fn standings(&self) -> BTreeMap<PlayerId, i64> {
        self.manager.standings()
    }
}

/// Simulate the wire: JSON-encode, decode, hand back.
fn transmit(message: &PeerMessage) -> PeerMessage {
    let bytes = serde_json::to_vec(message).expect("encode PeerMessage");
    serde_json::from_slice(&bytes).expect("decode PeerMessage")
}

/// Deliver every message to every peer except its sender, in an order
/// shuffled by `rng`. Returns every desync any peer detected.
pub fn broadcast(
    peers: &mut [TestPeer],
    mut messages: Vec<PeerMessage>,
    rng: &mut GameRng,
) -> Vec<Desync> {
    rng.shuffle(&mut messages);
    let mut desyncs = Vec::new();
    for message in &messages {
        for peer in peers.iter_mut() {
            if &peer.id != message.sender() {
                desyncs.extend(peer.deliver(transmit(message)));
            }
        }
    }
    desyncs
}

/// Play one full turn: each peer issues its actions (looked up by peer id,
/// none if absent), messages are exchanged in shuffled order, every peer
/// resolves, and checksums are cross-reported. Returns each peer's results
/// and any desyncs.
pub fn play_turn(
    peers: &mut [TestPeer],
    actions: &BTreeMap<&str, Vec<&str>>,
    rng: &mut GameRng,
) -> (Vec<Vec<ActionResult>>, Vec<Desync>) {
    for peer in peers.iter_mut() {
        if let Some(list) = actions.get(peer.id.as_str()) {
            peer.act(list);
        }
    }
    let outboxes: Vec<PeerMessage> = peers.iter_mut().map(TestPeer::outbox).collect();
    let mut desyncs = broadcast(peers, outboxes, rng);

    let results: Vec<Vec<ActionResult>> = peers.iter_mut().map(TestPeer::resolve).collect();

    let reports: Vec<PeerMessage> = peers.iter().map(TestPeer::checksum_message).collect();
    for (peer, own) in peers.iter_mut().zip(&reports) {
        desyncs.extend(peer.deliver(own.clone()));
    }
    desyncs.extend(broadcast(peers, reports, rng));

    (results, desyncs)
}
