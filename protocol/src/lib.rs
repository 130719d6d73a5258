use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Cards in a full deck.
pub const DECK_SIZE: usize = 52;
/// Copies of every rank; suits carry no meaning in this game.
pub const COPIES_PER_RANK: usize = 4;

/// ---- Cards ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rank {
    Ace = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("card rank must be within 1..=13, got {0}")]
pub struct InvalidRank(pub u8);

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    /// Catalogue entry shown to clients when this rank is drawn.
    pub fn info(self) -> CardInfo {
        let (name, kind, count) = match self {
            Rank::Ace => ("A - Waterfall", CardKind::Normal, None),
            Rank::Two => ("2 - Duo", CardKind::MultiTarget, Some(1)),
            Rank::Three => ("3 - Trio", CardKind::MultiTarget, Some(2)),
            Rank::Four => ("4 - Left", CardKind::TargetLeft, None),
            Rank::Five => ("5 - All Drink", CardKind::Normal, None),
            Rank::Six => ("6 - Right", CardKind::TargetRight, None),
            Rank::Seven => ("7 - The Duel", CardKind::Duel, None),
            Rank::Eight => ("8 - Mate", CardKind::Normal, None),
            Rank::Nine => ("9 - Mini Games", CardKind::Minigame, None),
            Rank::Ten => ("10 - Powder", CardKind::Powder, None),
            Rank::Jack => ("J - Never Have I Ever", CardKind::StatusJ, None),
            Rank::Queen => ("Q - Question Master", CardKind::StatusQ, None),
            Rank::King => ("K - King's Cup", CardKind::StatusK, None),
        };
        CardInfo {
            name: name.to_string(),
            kind,
            count,
        }
    }
}

impl TryFrom<u8> for Rank {
    type Error = InvalidRank;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        value
            .checked_sub(1)
            .and_then(|i| Rank::ALL.get(i as usize).copied())
            .ok_or(InvalidRank(value))
    }
}

impl From<Rank> for u8 {
    fn from(rank: Rank) -> Self {
        rank.value()
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Ace => write!(f, "A"),
            Rank::Jack => write!(f, "J"),
            Rank::Queen => write!(f, "Q"),
            Rank::King => write!(f, "K"),
            other => write!(f, "{}", other.value()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Normal,
    MultiTarget,
    TargetLeft,
    TargetRight,
    Duel,
    Minigame,
    Powder,
    StatusJ,
    StatusQ,
    StatusK,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CardKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// ---- Deck ----
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("no cards left to draw")]
    EmptyDeck,
}

/// Four copies of every rank, Fisher–Yates shuffled with `rng`.
pub fn generate_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Rank> {
    let mut cards = Vec::with_capacity(DECK_SIZE);
    for rank in Rank::ALL {
        for _ in 0..COPIES_PER_RANK {
            cards.push(rank);
        }
    }
    cards.shuffle(rng);
    cards
}

/// Reads the card under `cursor` and returns it with the advanced cursor.
pub fn draw_at(cards: &[Rank], cursor: usize) -> Result<(Rank, usize), DeckError> {
    cards
        .get(cursor)
        .map(|rank| (*rank, cursor + 1))
        .ok_or(DeckError::EmptyDeck)
}

#[derive(Debug, Clone)]
pub struct Deck {
    pub cards: Vec<Rank>,
    pub drawn: usize,
}

impl Deck {
    pub fn standard_shuffled() -> Self {
        Self::shuffled_with(&mut thread_rng())
    }

    pub fn shuffled_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Deck::from_cards(generate_deck(rng))
    }

    pub fn from_cards(cards: Vec<Rank>) -> Self {
        Deck { cards, drawn: 0 }
    }

    pub fn draw(&mut self) -> Result<Rank, DeckError> {
        let (rank, cursor) = draw_at(&self.cards, self.drawn)?;
        self.drawn = cursor;
        Ok(rank)
    }

    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.drawn)
    }
}

/// ---- Effects ----
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

/// Everyone who takes a punishment aimed at one or more seats.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Victims {
    pub is_buddy_effect: bool,
    pub names: Vec<String>,
}

impl Victims {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// What the drawer (and everyone watching) has to do about a card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    MultiSelect {
        count: usize,
    },
    AutoTarget {
        target_name: String,
        target_index: usize,
        direction: Direction,
        victims: Victims,
    },
    SelfPunish {
        victims: Victims,
    },
    AllDrink,
    Duel,
    Minigame,
    None,
}

/// Badge holders plus the buddy gang, by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusHolders {
    pub king: Option<String>,
    pub queen: Option<String>,
    pub jack: Option<String>,
    pub buddies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicPlayer {
    pub name: String,
    pub connection: Option<Uuid>,
    pub ready: bool,
    pub color: String,
    pub online: bool,
}

/// ---- Events ----
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientToServer {
    CreateRoom { names: Vec<String> },
    SelectPlayer { index: usize },
    HostBackToSetup,
    ForceReset,
    ResetGame,
    StartGame,

    // Turn-gated
    DrawCard,
    EndTurn,
    ChooseMinigame { game_name: String },
    PunishLoser {
        index: usize,
        #[serde(default)]
        cause: Option<String>,
    },
    PunishMultiple { indices: Vec<usize> },
    StartDuel { target_index: usize },
    ResolveDuel { winner_index: usize, loser_index: usize },
    StartBomb,

    // Anyone may pass the hot potato
    PassBomb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServerToClient {
    Hello {
        your_id: Uuid,
    },
    RoomStatus {
        room_host_name: Option<String>,
        is_game_running: bool,
    },
    UpdateLobby {
        players: Vec<PublicPlayer>,
        game_started: bool,
    },
    UpdateGameStatus {
        players: Vec<PublicPlayer>,
    },
    GameStarted {
        turn_index: usize,
        remaining_cards: usize,
        status_holders: StatusHolders,
    },
    CardResult {
        card_value: Rank,
        card_info: CardInfo,
        drawer_name: String,
        drawer_index: usize,
        effect: Effect,
        remaining_cards: usize,
        status_holders: StatusHolders,
    },
    NextTurn {
        turn_index: usize,
    },
    MinigameSelected {
        game_name: String,
    },
    ShowPunishment {
        cause: String,
        victims: Victims,
    },
    DuelStarted {
        challenger: String,
        target: String,
    },
    DuelResult {
        winner: String,
        loser: String,
        message: String,
        status_holders: StatusHolders,
    },
    BombStarted {
        holder_index: usize,
        expires_at: DateTime<Utc>,
    },
    BombUpdate {
        holder_index: usize,
    },
    BombExploded {
        loser_index: usize,
    },
    BackToSetup {
        names: Vec<String>,
    },
    GameOver,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    #[test]
    fn generated_deck_holds_four_of_each_rank() {
        for seed in 0..20 {
            let deck = generate_deck(&mut StdRng::seed_from_u64(seed));
            assert_eq!(deck.len(), DECK_SIZE);

            let mut counts: HashMap<Rank, usize> = HashMap::new();
            for rank in &deck {
                *counts.entry(*rank).or_default() += 1;
            }
            assert_eq!(counts.len(), 13);
            assert!(counts.values().all(|&c| c == COPIES_PER_RANK));
        }
    }

    #[test]
    fn shuffle_depends_on_rng() {
        let a = generate_deck(&mut StdRng::seed_from_u64(1));
        let b = generate_deck(&mut StdRng::seed_from_u64(2));
        assert_ne!(a, b);
    }

    #[test]
    fn drawing_stops_at_the_end_of_the_deck() {
        let mut deck = Deck::shuffled_with(&mut StdRng::seed_from_u64(7));
        let mut drawn = 0;
        while deck.draw().is_ok() {
            drawn += 1;
        }
        assert_eq!(drawn, DECK_SIZE);
        assert_eq!(deck.remaining(), 0);
        assert_eq!(deck.draw(), Err(DeckError::EmptyDeck));
        assert_eq!(deck.drawn, DECK_SIZE);
    }

    #[test]
    fn draw_at_is_pure() {
        let cards = vec![Rank::King, Rank::Two];
        assert_eq!(draw_at(&cards, 0), Ok((Rank::King, 1)));
        assert_eq!(draw_at(&cards, 0), Ok((Rank::King, 1)));
        assert_eq!(draw_at(&cards, 1), Ok((Rank::Two, 2)));
        assert_eq!(draw_at(&cards, 2), Err(DeckError::EmptyDeck));
    }

    #[test]
    fn rank_values_cover_one_to_thirteen() {
        for (i, rank) in Rank::ALL.iter().enumerate() {
            assert_eq!(rank.value() as usize, i + 1);
            assert_eq!(Rank::try_from(rank.value()), Ok(*rank));
        }
        assert_eq!(Rank::try_from(0), Err(InvalidRank(0)));
        assert_eq!(Rank::try_from(14), Err(InvalidRank(14)));
        assert_eq!(Rank::Queen.to_string(), "Q");
        assert_eq!(Rank::Seven.to_string(), "7");
    }

    #[test]
    fn multi_target_ranks_carry_a_count() {
        assert_eq!(Rank::Two.info().count, Some(1));
        assert_eq!(Rank::Three.info().count, Some(2));
        assert_eq!(Rank::Ten.info().kind, CardKind::Powder);
        assert_eq!(Rank::Four.info().count, None);
    }

    #[test]
    fn wire_format_uses_numeric_ranks_and_tagged_effects() {
        let msg = ServerToClient::CardResult {
            card_value: Rank::Four,
            card_info: Rank::Four.info(),
            drawer_name: "A".into(),
            drawer_index: 0,
            effect: Effect::AutoTarget {
                target_name: "B".into(),
                target_index: 1,
                direction: Direction::Left,
                victims: Victims {
                    is_buddy_effect: false,
                    names: vec!["B".into()],
                },
            },
            remaining_cards: 51,
            status_holders: StatusHolders::default(),
        };
        let json: serde_json::Value = serde_json::to_value(&msg).unwrap();
        let body = &json["CardResult"];
        assert_eq!(body["card_value"], 4);
        assert_eq!(body["card_info"]["type"], "target_left");
        assert_eq!(body["effect"]["type"], "auto_target");
        assert_eq!(body["effect"]["direction"], "left");
    }

    #[test]
    fn client_events_decode_from_json() {
        let cmd: ClientToServer = serde_json::from_str(r#""DrawCard""#).unwrap();
        assert_eq!(cmd, ClientToServer::DrawCard);

        let cmd: ClientToServer =
            serde_json::from_str(r#"{"PunishLoser":{"index":2}}"#).unwrap();
        assert_eq!(
            cmd,
            ClientToServer::PunishLoser {
                index: 2,
                cause: None
            }
        );

        assert!(serde_json::from_str::<ClientToServer>(r#"{"SelectPlayer":{"index":-1}}"#).is_err());
    }
}
