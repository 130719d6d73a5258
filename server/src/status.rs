use crate::roster::Room;
use kingscup_protocol::{Rank, StatusHolders};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelOutcome {
    /// The winner was a buddy and handed the status to the loser.
    Escaped,
    /// The winner was clean; the loser joins the buddies.
    Planted,
}

impl DuelOutcome {
    pub fn message(self) -> &'static str {
        match self {
            DuelOutcome::Escaped => "Escaped! The buddy star moved to the loser",
            DuelOutcome::Planted => "The loser earned a buddy star!",
        }
    }
}

/// Badges for the current game. Lives exactly as long as the game does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusBoard {
    pub king: Option<String>,
    pub queen: Option<String>,
    pub jack: Option<String>,
    pub buddies: BTreeSet<usize>,
}

impl StatusBoard {
    /// J, Q and K hand their badge to the drawer; other ranks do nothing.
    pub fn assign(&mut self, rank: Rank, drawer: &str) {
        let slot = match rank {
            Rank::Jack => &mut self.jack,
            Rank::Queen => &mut self.queen,
            Rank::King => &mut self.king,
            _ => return,
        };
        *slot = Some(drawer.to_string());
    }

    pub fn resolve_duel(&mut self, winner: usize, loser: usize) -> DuelOutcome {
        let outcome = if self.buddies.remove(&winner) {
            DuelOutcome::Escaped
        } else {
            DuelOutcome::Planted
        };
        self.buddies.insert(loser);
        outcome
    }

    pub fn snapshot(&self, room: &Room) -> StatusHolders {
        StatusHolders {
            king: self.king.clone(),
            queen: self.queen.clone(),
            jack: self.jack.clone(),
            buddies: self
                .buddies
                .iter()
                .filter_map(|&seat| room.name_at(seat).map(str::to_string))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn face_cards_overwrite_their_own_slot() {
        let mut board = StatusBoard::default();
        board.assign(Rank::King, "A");
        board.assign(Rank::Queen, "B");
        board.assign(Rank::King, "C");
        board.assign(Rank::Five, "D");
        assert_eq!(board.king.as_deref(), Some("C"));
        assert_eq!(board.queen.as_deref(), Some("B"));
        assert_eq!(board.jack, None);
    }

    #[test]
    fn buddy_escapes_to_loser() {
        let mut board = StatusBoard {
            buddies: BTreeSet::from([0, 2]),
            ..Default::default()
        };
        assert_eq!(board.resolve_duel(0, 1), DuelOutcome::Escaped);
        assert!(!board.buddies.contains(&0));
        assert!(board.buddies.contains(&1));
        assert_eq!(board.buddies.len(), 2);
    }

    #[test]
    fn clean_winner_plants_a_buddy() {
        let mut board = StatusBoard::default();
        assert_eq!(board.resolve_duel(0, 1), DuelOutcome::Planted);
        assert_eq!(board.buddies, BTreeSet::from([1]));

        // loser already a buddy: no duplicate
        assert_eq!(board.resolve_duel(2, 1), DuelOutcome::Planted);
        assert_eq!(board.buddies, BTreeSet::from([1]));
    }

    #[test]
    fn escaping_onto_an_existing_buddy_shrinks_the_gang() {
        let mut board = StatusBoard {
            buddies: BTreeSet::from([0, 1]),
            ..Default::default()
        };
        assert_eq!(board.resolve_duel(0, 1), DuelOutcome::Escaped);
        assert_eq!(board.buddies, BTreeSet::from([1]));
    }

    #[test]
    fn snapshot_names_the_buddies() {
        let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let room = Room::from_names(&names, &mut StdRng::seed_from_u64(1)).unwrap();
        let mut board = StatusBoard::default();
        board.assign(Rank::Jack, "B");
        board.buddies.extend([2, 0]);

        let snap = board.snapshot(&room);
        assert_eq!(snap.jack.as_deref(), Some("B"));
        assert_eq!(snap.buddies, vec!["A", "C"]);
    }
}
