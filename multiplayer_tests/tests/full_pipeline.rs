// End-to-end integration tests for the lockstep pipeline.
//
// Each test builds independent `TestPeer`s (one `GameManager` each), lets
// them act, exchanges `PeerMessage`s through the in-process transport with
// seeded delivery shuffles, and verifies the lockstep guarantees across
// peers: identical results, standings, and checksums every turn, replay logs
// that match what the other side actually sent, and desync detection when
// peers are configured inconsistently.

use std::collections::BTreeMap;

use delve_coordinator::start_coordinator;
use delve_lockstep::{
    ActionResult, GameManager, LockstepConfig, PlayerId, RemoteQueueing, TurnIndex,
    replay_checksum,
};
use delve_prng::GameRng;
use multiplayer_tests::{DungeonResolver, TestPeer, play_turn};

const RULES_SEED: u64 = 0xD1CE;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn peers(roster: &[&str], config: &LockstepConfig) -> Vec<TestPeer> {
    roster
        .iter()
        .map(|id| TestPeer::new(id, roster, RULES_SEED, config.clone()))
        .collect()
}

/// Scripted actions per turn: everyone does something, with some quiet turns.
fn actions_for(turn: u32, roster: &[&'static str]) -> BTreeMap<&'static str, Vec<&'static str>> {
    const MOVES: [&str; 4] = ["attack", "loot", "rest", "trap"];
    roster
        .iter()
        .enumerate()
        .filter(|(i, _)| (turn as usize + i) % 5 != 0)
        .map(|(i, id)| {
            let first = MOVES[(turn as usize + i) % MOVES.len()];
            let actions = if turn % 4 == 0 {
                vec![first, "attack"]
            } else {
                vec![first]
            };
            (*id, actions)
        })
        .collect()
}

fn play_game(
    peers: &mut [TestPeer],
    roster: &[&'static str],
    delivery_seed: u64,
) -> Vec<Vec<ActionResult>> {
    let mut rng = GameRng::new(delivery_seed);
    let mut history = Vec::new();
    while !peers[0].manager.is_finished() {
        let turn = peers[0].manager.turn_index().0;
        let (results, desyncs) = play_turn(peers, &actions_for(turn, roster), &mut rng);
        assert!(desyncs.is_empty(), "turn {turn}: {desyncs:?}");
        for (peer, peer_results) in peers.iter().zip(&results).skip(1) {
            assert_eq!(&results[0], peer_results, "turn {turn}: {} diverged", peer.id);
        }
        history.push(results[0].clone());
    }
    history
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// Two peers play a full game. Every turn they resolve identical results in
/// canonical order, and they end with identical standings and checksums.
#[test]
fn two_peer_full_game() {
    init_logging();
    let roster = ["host", "joiner"];
    let mut peers = peers(&roster, &LockstepConfig::default());
    let history = play_game(&mut peers, &roster, 1);

    assert_eq!(history.len(), 30);
    for results in &history {
        let ranks: Vec<usize> = results
            .iter()
            .map(|r| peers[0].manager.roster().rank(&r.player_id))
            .collect();
        assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "not canonical: {ranks:?}");
    }

    assert_eq!(peers[0].standings(), peers[1].standings());
    assert_eq!(peers[0].manager.checksums(), peers[1].manager.checksums());
    assert_eq!(peers[0].manager.checksums().len(), 30);
    assert_eq!(peers[0].manager.turn_index(), TurnIndex(30));
}

/// Each peer's replay log is exactly what the other peer sent, turn by turn.
#[test]
fn replay_log_matches_peer_feed() {
    let roster = ["host", "joiner"];
    let mut peers = peers(&roster, &LockstepConfig::default());
    play_game(&mut peers, &roster, 2);

    let (host, joiner) = (&peers[0], &peers[1]);
    assert!(host.manager.session().verify_replay(joiner.sent_feed()));
    assert!(joiner.manager.session().verify_replay(host.sent_feed()));
    assert!(!host.manager.session().verify_replay(host.sent_feed()));

    assert_eq!(
        host.manager.session().replay_checksum(),
        replay_checksum(joiner.sent_feed())
    );

    // A truncated feed fails verification.
    let truncated = &joiner.sent_feed()[..29];
    assert!(!host.manager.session().verify_replay(truncated));
}

/// Three peers, delivered in different shuffled orders, reach the same game.
#[test]
fn delivery_order_does_not_matter() {
    let roster = ["alpha", "beta", "gamma"];
    let config = LockstepConfig::default();

    let mut first = peers(&roster, &config);
    let history_first = play_game(&mut first, &roster, 10);
    let mut second = peers(&roster, &config);
    let history_second = play_game(&mut second, &roster, 99);

    assert_eq!(history_first, history_second);
    assert_eq!(first[2].standings(), second[0].standings());
    assert_eq!(first[1].manager.checksums(), second[2].manager.checksums());
}

/// Standings equal the sum of every resolved delta, on every peer.
#[test]
fn standings_are_sum_of_history() {
    let roster = ["alpha", "beta", "gamma"];
    let mut peers = peers(&roster, &LockstepConfig::default());
    let history = play_game(&mut peers, &roster, 3);

    let mut expected: BTreeMap<PlayerId, i64> =
        roster.iter().map(|id| (PlayerId::from(*id), 0)).collect();
    for result in history.iter().flatten() {
        *expected.entry(result.player_id.clone()).or_default() += result.vp_delta;
    }
    for peer in &peers {
        assert_eq!(peer.standings(), expected, "{}", peer.id);
    }
}

/// Peers built with different rule seeds diverge on the first random roll,
/// and the checksum exchange reports it on every peer.
#[test]
fn mismatched_rule_seeds_are_detected() {
    init_logging();
    let roster = ["host", "joiner"];
    let config = LockstepConfig::default();
    let mut peers = vec![
        TestPeer::new("host", &roster, 1, config.clone()),
        TestPeer::new("joiner", &roster, 2, config),
    ];
    let mut rng = GameRng::new(0);
    let actions = BTreeMap::from([("host", vec!["attack"; 8]), ("joiner", vec!["attack"; 8])]);
    let (_, desyncs) = play_turn(&mut peers, &actions, &mut rng);

    assert_eq!(desyncs.len(), 2, "each peer should report the desync");
    assert!(desyncs.iter().all(|d| d.turn_index == TurnIndex(0)));
}

/// With remote commands queued on arrival as well as on collection, each
/// peer resolves the other's commands twice and its own once, so the peers
/// disagree and the desync surfaces immediately.
#[test]
fn double_queued_remote_commands_desync() {
    let roster = ["host", "joiner"];
    let config = LockstepConfig {
        remote_queueing: RemoteQueueing::DirectAndCollected,
        ..LockstepConfig::default()
    };
    let mut peers = peers(&roster, &config);
    let mut rng = GameRng::new(0);
    let actions = BTreeMap::from([("host", vec!["trap"]), ("joiner", vec!["trap"])]);
    let (results, desyncs) = play_turn(&mut peers, &actions, &mut rng);

    assert_eq!(results[0].len(), 3);
    assert_eq!(peers[0].standings()[&PlayerId::from("host")], -2);
    assert_eq!(peers[0].standings()[&PlayerId::from("joiner")], -4);
    assert_eq!(peers[1].standings()[&PlayerId::from("host")], -4);
    assert!(!desyncs.is_empty());
}

/// A peer whose manager runs inside a coordinator stays in lockstep with a
/// plain peer.
#[test]
fn coordinated_peer_matches_plain_peer() {
    let roster = ["host", "joiner"];
    let mut plain = TestPeer::new("host", &roster, RULES_SEED, LockstepConfig::default());
    let coordinated = GameManager::new(roster, DungeonResolver::new(RULES_SEED)).unwrap();
    let handle = start_coordinator(coordinated);
    let joiner = handle.client();

    for turn in 0..10u32 {
        let actions = actions_for(turn, &roster);
        if let Some(list) = actions.get("host") {
            plain.act(list);
        }
        if let Some(list) = actions.get("joiner") {
            let commands = list
                .iter()
                .map(|a| delve_lockstep::Command::new("joiner", *a))
                .collect();
            joiner.submit_local(commands).unwrap();
        }

        let host_out = plain.manager.pop_outgoing();
        let joiner_out = joiner.pop_outgoing().unwrap();
        joiner.submit_remote(host_out).unwrap();
        plain.manager.receive_remote_commands(joiner_out).unwrap();

        let plain_results = plain.resolve();
        let coordinated_results = joiner.resolve_turn().unwrap();
        assert_eq!(plain_results, coordinated_results, "turn {turn}");
    }

    assert_eq!(joiner.standings().unwrap(), plain.standings());
    let manager = handle.stop().unwrap();
    assert_eq!(manager.checksums(), plain.manager.checksums());
}
