// Per-player score state owned by the game manager.

use delve_protocol::{PlayerId, TurnIndex};
use serde::{Deserialize, Serialize};

use crate::error::{LockstepError, LockstepResult};

/// A roster entry's running victory-point total. Only the game manager
/// mutates it, and only by applying resolver `vp_delta`s.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: PlayerId,
    pub victory_points: i64,
}

impl PlayerState {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            victory_points: 0,
        }
    }

    /// The total after adding `delta`, without changing anything.
    pub fn checked_total(&self, delta: i64, turn_index: TurnIndex) -> LockstepResult<i64> {
        self.victory_points
            .checked_add(delta)
            .ok_or_else(|| LockstepError::ScoreOverflow {
                player_id: self.player_id.clone(),
                turn_index,
            })
    }

    /// Add a (possibly negative) delta. On overflow the total is unchanged.
    pub fn apply_vp(&mut self, delta: i64, turn_index: TurnIndex) -> LockstepResult<()> {
        self.victory_points = self.checked_total(delta, turn_index)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_accumulate_in_both_directions() {
        let mut player = PlayerState::new(PlayerId::from("A"));
        player.apply_vp(5, TurnIndex(0)).unwrap();
        player.apply_vp(-2, TurnIndex(1)).unwrap();
        assert_eq!(player.victory_points, 3);
    }

    #[test]
    fn overflow_is_an_error_and_leaves_total_alone() {
        let mut player = PlayerState::new(PlayerId::from("A"));
        player.apply_vp(i64::MAX, TurnIndex(0)).unwrap();
        match player.apply_vp(1, TurnIndex(4)) {
            Err(LockstepError::ScoreOverflow {
                player_id,
                turn_index,
            }) => {
                assert_eq!(player_id.as_str(), "A");
                assert_eq!(turn_index, TurnIndex(4));
            }
            other => panic!("expected ScoreOverflow, got {other:?}"),
        }
        assert_eq!(player.victory_points, i64::MAX);
        assert!(player.apply_vp(i64::MIN, TurnIndex(5)).is_ok());
        assert_eq!(player.victory_points, -1);
    }
}
