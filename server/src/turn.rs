use crate::roster::Room;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnEngine {
    current: usize,
}

impl TurnEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Moves to the next seat, wrapping after the last one.
    pub fn advance(&mut self, seats: usize) -> usize {
        if seats > 0 {
            self.current = (self.current + 1) % seats;
        }
        self.current
    }

    pub fn owns_turn(&self, room: &Room, conn: Uuid) -> bool {
        room.players
            .get(self.current)
            .is_some_and(|p| p.connection == Some(conn))
    }
}

/// Seat after `seat` in turn order.
pub fn left_of(seat: usize, seats: usize) -> Option<usize> {
    (seats > 0).then(|| (seat + 1) % seats)
}

/// Seat before `seat` in turn order.
pub fn right_of(seat: usize, seats: usize) -> Option<usize> {
    (seats > 0).then(|| (seat + seats - 1) % seats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn advance_wraps_around() {
        let mut turn = TurnEngine { current: 3 };
        let seen: Vec<usize> = (0..5).map(|_| turn.advance(4)).collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 0]);
    }

    #[test]
    fn neighbours_wrap_both_ways() {
        assert_eq!(left_of(0, 3), Some(1));
        assert_eq!(right_of(0, 3), Some(2));
        assert_eq!(left_of(2, 3), Some(0));
        assert_eq!(right_of(2, 3), Some(1));
        assert_eq!(left_of(0, 0), None);
    }

    #[test]
    fn only_the_seated_connection_owns_the_turn() {
        let names: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let mut room = Room::from_names(&names, &mut StdRng::seed_from_u64(0)).unwrap();
        let a = Uuid::new_v4();
        let c = Uuid::new_v4();
        room.claim_seat(0, a);
        room.claim_seat(2, c);

        let mut turn = TurnEngine::new();
        assert!(turn.owns_turn(&room, a));
        assert!(!turn.owns_turn(&room, c));

        turn.advance(3);
        assert!(!turn.owns_turn(&room, a));
        assert!(!turn.owns_turn(&room, c), "unclaimed seat has no owner");
    }
}
