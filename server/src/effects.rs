use crate::roster::Room;
use crate::status::StatusBoard;
use crate::turn::{left_of, right_of};
use crate::victims;
use kingscup_protocol::{CardKind, Direction, Effect, Rank};

/// Turns a drawn rank into the effect clients act on. Status badges are
/// assigned separately by [`StatusBoard::assign`].
pub fn resolve(rank: Rank, drawer: usize, room: &Room, status: &StatusBoard) -> Effect {
    let info = rank.info();
    match info.kind {
        CardKind::MultiTarget => Effect::MultiSelect {
            count: info.count.unwrap_or(1),
        },
        CardKind::TargetLeft => auto_target(room, status, left_of(drawer, room.len()), Direction::Left),
        CardKind::TargetRight => auto_target(room, status, right_of(drawer, room.len()), Direction::Right),
        CardKind::Powder => Effect::SelfPunish {
            victims: victims::resolve(room, &status.buddies, drawer),
        },
        CardKind::Duel => Effect::Duel,
        CardKind::Minigame => Effect::Minigame,
        CardKind::Normal => match rank {
            Rank::Ace => Effect::SelfPunish {
                victims: victims::resolve(room, &status.buddies, drawer),
            },
            Rank::Five => Effect::AllDrink,
            _ => Effect::None,
        },
        CardKind::StatusJ | CardKind::StatusQ | CardKind::StatusK => Effect::None,
    }
}

fn auto_target(room: &Room, status: &StatusBoard, target: Option<usize>, direction: Direction) -> Effect {
    match target.and_then(|seat| room.name_at(seat).map(|name| (seat, name))) {
        Some((target, name)) => Effect::AutoTarget {
            target_name: name.to_string(),
            target_index: target,
            direction,
            victims: victims::resolve(room, &status.buddies, target),
        },
        None => Effect::None,
    }
}

/// How many extra seats a multi-target card asks the drawer to name.
pub fn required_picks(effect: &Effect) -> Option<usize> {
    match effect {
        Effect::MultiSelect { count } => Some(*count),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeSet;

    fn room(list: &[&str]) -> Room {
        let names: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        Room::from_names(&names, &mut StdRng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn four_hits_the_left_neighbour() {
        let r = room(&["A", "B", "C"]);
        let effect = resolve(Rank::Four, 0, &r, &StatusBoard::default());
        match effect {
            Effect::AutoTarget {
                target_name,
                target_index,
                direction,
                victims,
            } => {
                assert_eq!(target_name, "B");
                assert_eq!(target_index, 1);
                assert_eq!(direction, Direction::Left);
                assert_eq!(victims.names, vec!["B"]);
                assert!(!victims.is_buddy_effect);
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn six_hits_the_right_neighbour_with_wrap() {
        let r = room(&["A", "B", "C"]);
        let effect = resolve(Rank::Six, 0, &r, &StatusBoard::default());
        assert!(matches!(
            effect,
            Effect::AutoTarget { target_index: 2, direction: Direction::Right, .. }
        ));
    }

    #[test]
    fn left_target_expands_through_buddies() {
        let r = room(&["A", "B", "C"]);
        let status = StatusBoard {
            buddies: BTreeSet::from([1, 2]),
            ..Default::default()
        };
        let Effect::AutoTarget { victims, .. } = resolve(Rank::Four, 0, &r, &status) else {
            panic!("expected auto target");
        };
        assert!(victims.is_buddy_effect);
        assert_eq!(victims.names, vec!["B", "C"]);
    }

    #[test]
    fn ace_and_ten_punish_the_drawer() {
        let r = room(&["A", "B"]);
        for rank in [Rank::Ace, Rank::Ten] {
            let Effect::SelfPunish { victims } = resolve(rank, 1, &r, &StatusBoard::default()) else {
                panic!("expected self punish for {rank}");
            };
            assert_eq!(victims.names, vec!["B"]);
        }
    }

    #[test]
    fn remaining_ranks_map_to_their_tags() {
        let r = room(&["A", "B"]);
        let s = StatusBoard::default();
        assert_eq!(resolve(Rank::Two, 0, &r, &s), Effect::MultiSelect { count: 1 });
        assert_eq!(resolve(Rank::Three, 0, &r, &s), Effect::MultiSelect { count: 2 });
        assert_eq!(resolve(Rank::Five, 0, &r, &s), Effect::AllDrink);
        assert_eq!(resolve(Rank::Seven, 0, &r, &s), Effect::Duel);
        assert_eq!(resolve(Rank::Eight, 0, &r, &s), Effect::None);
        assert_eq!(resolve(Rank::Nine, 0, &r, &s), Effect::Minigame);
        for face in [Rank::Jack, Rank::Queen, Rank::King] {
            assert_eq!(resolve(face, 0, &r, &s), Effect::None);
        }
    }

    #[test]
    fn single_player_targets_themselves() {
        let r = room(&["Solo"]);
        let Effect::AutoTarget { target_index, .. } = resolve(Rank::Six, 0, &r, &StatusBoard::default()) else {
            panic!("expected auto target");
        };
        assert_eq!(target_index, 0);
    }

    #[test]
    fn picks_only_for_multi_select() {
        assert_eq!(required_picks(&Effect::MultiSelect { count: 2 }), Some(2));
        assert_eq!(required_picks(&Effect::AllDrink), None);
    }
}
