// The fixed, ordered list of players in a game.
//
// Canonical order is roster position: the first registered player resolves
// first. The roster is built once and shared (`Arc<Roster>`) between the
// session and the turn controller so both sort with the same order by
// construction.
//
// Ids not in the roster sort after every roster member. Sorting is stable,
// so several unknown-player commands keep their arrival order relative to
// each other, and several commands from the same player do too.

use delve_protocol::PlayerId;
use rustc_hash::FxHashMap;

use crate::error::{LockstepError, LockstepResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    order: Vec<PlayerId>,
    positions: FxHashMap<PlayerId, usize>,
}

impl Roster {
    /// Build a roster from ids in registration order. Duplicates are rejected.
    pub fn new<I, P>(ids: I) -> LockstepResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PlayerId>,
    {
        let mut order = Vec::new();
        let mut positions = FxHashMap::default();
        for id in ids {
            let id = id.into();
            if positions.contains_key(&id) {
                return Err(LockstepError::DuplicatePlayer { player_id: id });
            }
            positions.insert(id.clone(), order.len());
            order.push(id);
        }
        Ok(Self { order, positions })
    }

    pub fn position(&self, id: &PlayerId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.positions.contains_key(id)
    }

    /// Sort key used for canonical ordering: roster position, or `len()` for
    /// ids outside the roster.
    pub fn rank(&self, id: &PlayerId) -> usize {
        self.position(id).unwrap_or(self.order.len())
    }

    /// Stable-sort `items` into canonical order.
    pub fn canonical_sort<T>(&self, items: &mut [T], player_of: impl Fn(&T) -> &PlayerId) {
        items.sort_by_key(|item| self.rank(player_of(item)));
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerId> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn positions_follow_registration_order() {
        let roster = Roster::new(["B", "A", "C"]).unwrap();
        assert_eq!(roster.position(&"B".into()), Some(0));
        assert_eq!(roster.position(&"C".into()), Some(2));
        assert_eq!(roster.rank(&"Z".into()), 3);
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = Roster::new(["A", "B", "A"]).unwrap_err();
        match err {
            LockstepError::DuplicatePlayer { player_id } => assert_eq!(player_id.as_str(), "A"),
            other => panic!("expected DuplicatePlayer, got {other:?}"),
        }
    }

    #[test]
    fn empty_roster_sorts_everything_by_arrival() {
        let roster = Roster::new(Vec::<PlayerId>::new()).unwrap();
        assert!(roster.is_empty());
        let mut ids: Vec<PlayerId> = vec!["y".into(), "x".into()];
        roster.canonical_sort(&mut ids, |id| id);
        assert_eq!(ids, vec![PlayerId::from("y"), PlayerId::from("x")]);
    }

    #[test]
    fn unknowns_sort_last_in_arrival_order() {
        let roster = Roster::new(["P1", "P2"]).unwrap();
        let mut arrivals: Vec<(PlayerId, u32)> = vec![
            ("U2".into(), 0),
            ("P2".into(), 1),
            ("U1".into(), 2),
            ("P1".into(), 3),
            ("P2".into(), 4),
        ];
        roster.canonical_sort(&mut arrivals, |(id, _)| id);
        let seq: Vec<u32> = arrivals.iter().map(|(_, n)| *n).collect();
        assert_eq!(seq, vec![3, 1, 4, 0, 2]);
    }

    proptest! {
        #[test]
        fn canonical_sort_is_rank_ordered_and_stable(
            picks in proptest::collection::vec(0usize..6, 0..40)
        ) {
            // Ids 0..3 are rostered, 3..6 are strangers.
            let roster = Roster::new(["p0", "p1", "p2"]).unwrap();
            let mut arrivals: Vec<(PlayerId, usize)> = picks
                .iter()
                .enumerate()
                .map(|(seq, pick)| (PlayerId::new(format!("p{pick}")), seq))
                .collect();
            roster.canonical_sort(&mut arrivals, |(id, _)| id);

            for pair in arrivals.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                let (ra, rb) = (roster.rank(&a.0), roster.rank(&b.0));
                prop_assert!(ra <= rb);
                if ra == rb {
                    prop_assert!(a.1 < b.1, "arrival order lost within rank {}", ra);
                }
            }
            prop_assert_eq!(arrivals.len(), picks.len());
        }
    }
}
