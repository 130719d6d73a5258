//! Who actually takes a punishment aimed at a seat.
//!
//! Buddies share fate: hitting any buddy hits every current buddy.

use crate::roster::Room;
use kingscup_protocol::Victims;
use std::collections::BTreeSet;

pub fn resolve(room: &Room, buddies: &BTreeSet<usize>, seat: usize) -> Victims {
    let Some(name) = room.name_at(seat) else {
        return Victims::default();
    };

    let mut victims = Victims {
        is_buddy_effect: false,
        names: vec![name.to_string()],
    };
    if buddies.contains(&seat) {
        victims.is_buddy_effect = true;
        for buddy in buddies.iter().filter_map(|&s| room.name_at(s)) {
            push_unique(&mut victims.names, buddy);
        }
    }
    victims
}

/// Union over several seats; the buddy flag is set if any seat expanded.
pub fn resolve_many(room: &Room, buddies: &BTreeSet<usize>, seats: &[usize]) -> Victims {
    let mut all = Victims::default();
    for &seat in seats {
        let one = resolve(room, buddies, seat);
        all.is_buddy_effect |= one.is_buddy_effect;
        for name in &one.names {
            push_unique(&mut all.names, name);
        }
    }
    all
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
