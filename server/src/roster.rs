use kingscup_protocol::PublicPlayer;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_NAME_LEN: usize = 32;

/// Avatar colours; picked at random, repeats allowed.
pub const PALETTE: [&str; 8] = [
    "#FF6B6B", "#4ECDC4", "#FFE66D", "#FF9F43", "#A8D8EA", "#AA96DA", "#FCBAD3", "#FFFFD2",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("a room needs at least one player")]
    Empty,
    #[error("player names cannot be blank")]
    BlankName,
    #[error("player name {0:?} is longer than {MAX_NAME_LEN} characters")]
    NameTooLong(String),
    #[error("player name {0:?} appears twice")]
    DuplicateName(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub connection: Option<Uuid>,
    pub ready: bool,
    pub color: &'static str,
    pub online: bool,
}

impl Player {
    fn new(name: String, color: &'static str) -> Self {
        Player {
            name,
            connection: None,
            ready: false,
            color,
            online: true,
        }
    }

    pub fn public(&self) -> PublicPlayer {
        PublicPlayer {
            name: self.name.clone(),
            connection: self.connection,
            ready: self.ready,
            color: self.color.to_string(),
            online: self.online,
        }
    }
}

/// The one room this process hosts. Seat order is the turn order.
#[derive(Debug, Clone)]
pub struct Room {
    pub host_name: String,
    pub players: Vec<Player>,
}

impl Room {
    /// First name becomes the host. Names are trimmed and must be unique.
    pub fn from_names<R: Rng + ?Sized>(names: &[String], rng: &mut R) -> Result<Room, RosterError> {
        let mut players: Vec<Player> = Vec::with_capacity(names.len());
        for raw in names {
            let name = raw.trim();
            if name.is_empty() {
                return Err(RosterError::BlankName);
            }
            if name.chars().count() > MAX_NAME_LEN {
                return Err(RosterError::NameTooLong(name.to_string()));
            }
            if players.iter().any(|p| p.name == name) {
                return Err(RosterError::DuplicateName(name.to_string()));
            }
            let color = PALETTE.choose(rng).copied().unwrap_or(PALETTE[0]);
            players.push(Player::new(name.to_string(), color));
        }

        let host_name = players.first().map(|p| p.name.clone()).ok_or(RosterError::Empty)?;
        Ok(Room { host_name, players })
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn name_at(&self, seat: usize) -> Option<&str> {
        self.players.get(seat).map(|p| p.name.as_str())
    }

    pub fn is_occupied(&self, seat: usize) -> bool {
        seat < self.players.len()
    }

    /// Binds `conn` to the seat. Out-of-range seats are ignored and return false.
    pub fn claim_seat(&mut self, seat: usize, conn: Uuid) -> bool {
        match self.players.get_mut(seat) {
            Some(p) => {
                p.connection = Some(conn);
                p.ready = true;
                p.online = true;
                true
            }
            None => false,
        }
    }

    /// Keeps the seat (and its name) reserved; only the online flag drops.
    pub fn mark_offline(&mut self, conn: Uuid) -> bool {
        let mut touched = false;
        for p in self.players.iter_mut().filter(|p| p.connection == Some(conn)) {
            p.online = false;
            touched = true;
        }
        touched
    }

    /// Lobby again: names and colours stay, readiness and bindings go.
    pub fn reset_to_lobby(&mut self) {
        for p in self.players.iter_mut() {
            p.connection = None;
            p.ready = false;
            p.online = true;
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }

    pub fn public_players(&self) -> Vec<PublicPlayer> {
        self.players.iter().map(Player::public).collect()
    }
}
