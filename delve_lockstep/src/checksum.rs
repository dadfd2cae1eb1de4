// CRC32 digests of committed turns, for cheap cross-peer comparison.
//
// Peers in a lockstep game should commit byte-identical results for every
// turn. Exchanging full result lists to check that is wasteful, so each peer
// hashes what it committed and only the hash travels (see
// `delve_coordinator::desync` for the comparing side).
//
// Every variable-length field is length-prefixed before hashing so that
// adjacent fields cannot bleed into each other ("ab"+"c" vs "a"+"bc").

use crc32fast::Hasher;
use delve_protocol::{ActionResult, Command, Payload};

fn update_str(hasher: &mut Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_map(hasher: &mut Hasher, map: &Payload) {
    hasher.update(&(map.len() as u64).to_le_bytes());
    for (key, value) in map {
        update_str(hasher, key);
        update_str(hasher, &value.to_string());
    }
}

/// Digest of one turn's ordered results.
pub fn turn_checksum(results: &[ActionResult]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&(results.len() as u64).to_le_bytes());
    for result in results {
        update_str(&mut hasher, result.player_id.as_str());
        hasher.update(&result.turn_index.0.to_le_bytes());
        hasher.update(&result.vp_delta.to_le_bytes());
        update_map(&mut hasher, &result.events);
    }
    hasher.finalize()
}

/// Digest of a replay log by command identity (`player_id + action`).
/// Payload is excluded, matching identity-only replay verification.
pub fn replay_checksum(log: &[Vec<Command>]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&(log.len() as u64).to_le_bytes());
    for turn in log {
        hasher.update(&(turn.len() as u64).to_le_bytes());
        for command in turn {
            update_str(&mut hasher, &command.identity_key());
        }
    }
    hasher.finalize()
}
