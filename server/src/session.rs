//! The single authoritative game session.
//!
//! Every inbound event runs to completion under one lock: read, mutate,
//! broadcast. The hot-potato fuse is the only other writer and takes the
//! same lock.

use crate::bomb::{FuseTicket, HotPotato};
use crate::config::SessionConfig;
use crate::effects;
use crate::error::{Denied, SessionError};
use crate::hub::{Hub, Outbox};
use crate::roster::{Room, RosterError};
use crate::status::StatusBoard;
use crate::turn::TurnEngine;
use crate::victims;
use kingscup_protocol::{ClientToServer, Deck, DeckError, ServerToClient, StatusHolders};
use parking_lot::Mutex;
use rand::thread_rng;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_PUNISH_CAUSE: &str = "Lost the minigame";
pub const MULTI_PUNISH_CAUSE: &str = "Partners in crime";
pub const BOMB_PUNISH_CAUSE: &str = "Blown up by the hot potato";
const MAX_MINIGAME_NAME_LEN: usize = 64;

/// Everything that exists only while a game is running.
#[derive(Debug)]
struct Game {
    deck: Deck,
    turn: TurnEngine,
    status: StatusBoard,
    bomb: HotPotato,
    /// Extra seats the drawer still owes after a 2 or 3.
    pending_picks: Option<usize>,
}

impl Game {
    fn new(deck: Deck) -> Self {
        Game {
            deck,
            turn: TurnEngine::new(),
            status: StatusBoard::default(),
            bomb: HotPotato::default(),
            pending_picks: None,
        }
    }
}

/// Split borrow of a running game.
struct Table<'a> {
    room: &'a Room,
    game: &'a mut Game,
    hub: &'a Hub,
    generation: u64,
}

pub struct Session {
    config: SessionConfig,
    hub: Hub,
    room: Option<Room>,
    game: Option<Game>,
    /// Bumped whenever the game state is rebuilt or torn down.
    generation: u64,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Session {
            config,
            hub: Hub::default(),
            room: None,
            game: None,
            generation: 0,
        }
    }

    /// Registers the connection and brings it up to date.
    pub fn connect(&mut self, conn: Uuid, tx: Outbox) {
        self.hub.register(conn, tx);
        info!(%conn, peers = self.hub.len(), "client connected");
        self.hub.send_to(conn, ServerToClient::Hello { your_id: conn });
        for msg in self.resync() {
            self.hub.send_to(conn, msg);
        }
    }

    /// The seat stays reserved, turn and badges included.
    pub fn disconnect(&mut self, conn: Uuid) {
        self.hub.unregister(conn);
        info!(%conn, peers = self.hub.len(), "client disconnected");
        let running = self.game.is_some();
        let Some(room) = self.room.as_mut() else {
            return;
        };
        if room.mark_offline(conn) {
            let players = room.public_players();
            self.hub.broadcast(ServerToClient::UpdateLobby {
                players: players.clone(),
                game_started: running,
            });
            if running {
                self.hub.broadcast(ServerToClient::UpdateGameStatus { players });
            }
        }
    }

    /// What a client needs to rebuild the current view from nothing.
    pub fn resync(&self) -> Vec<ServerToClient> {
        let running = self.game.is_some();
        let mut out = vec![ServerToClient::RoomStatus {
            room_host_name: self.room.as_ref().map(|r| r.host_name.clone()),
            is_game_running: running,
        }];
        let Some(room) = &self.room else {
            return out;
        };
        out.push(ServerToClient::UpdateLobby {
            players: room.public_players(),
            game_started: running,
        });
        if let Some(game) = &self.game {
            out.push(ServerToClient::GameStarted {
                turn_index: game.turn.current(),
                remaining_cards: game.deck.remaining(),
                status_holders: game.status.snapshot(room),
            });
            if let (Some(holder_index), Some(expires_at)) = (game.bomb.holder(), game.bomb.expires_at()) {
                out.push(ServerToClient::BombStarted {
                    holder_index,
                    expires_at,
                });
            }
        }
        out
    }

    /// Applies one client event. A returned ticket asks the caller to start
    /// a fuse for a freshly armed bomb.
    pub fn handle(&mut self, conn: Uuid, cmd: ClientToServer) -> Result<Option<FuseTicket>, SessionError> {
        match cmd {
            ClientToServer::CreateRoom { names } => self.create_room(&names)?,
            ClientToServer::SelectPlayer { index } => self.select_player(conn, index)?,
            ClientToServer::HostBackToSetup => self.back_to_setup()?,
            ClientToServer::ForceReset => self.teardown(false),
            ClientToServer::ResetGame => self.teardown(true),
            ClientToServer::StartGame => self.start_game(Deck::standard_shuffled())?,
            ClientToServer::DrawCard => self.draw_card(conn)?,
            ClientToServer::EndTurn => self.end_turn(conn)?,
            ClientToServer::ChooseMinigame { game_name } => self.choose_minigame(conn, &game_name)?,
            ClientToServer::PunishLoser { index, cause } => self.punish_loser(conn, index, cause)?,
            ClientToServer::PunishMultiple { indices } => self.punish_multiple(conn, &indices)?,
            ClientToServer::StartDuel { target_index } => self.start_duel(conn, target_index)?,
            ClientToServer::ResolveDuel {
                winner_index,
                loser_index,
            } => self.resolve_duel(conn, winner_index, loser_index)?,
            ClientToServer::StartBomb => return self.start_bomb(conn).map(Some),
            ClientToServer::PassBomb => self.pass_bomb()?,
        }
        Ok(None)
    }

    // ---- guards ----

    fn table(&mut self) -> Result<Table<'_>, Denied> {
        match (self.room.as_ref(), self.game.as_mut()) {
            (Some(room), Some(game)) => Ok(Table {
                room,
                game,
                hub: &self.hub,
                generation: self.generation,
            }),
            _ => Err(Denied::NotRunning),
        }
    }

    /// Turn-gated events must come from the connection seated at the
    /// current turn.
    fn turn_table(&mut self, conn: Uuid) -> Result<Table<'_>, Denied> {
        let table = self.table()?;
        let seat = table.game.turn.current();
        if !table.game.turn.owns_turn(table.room, conn) {
            return Err(Denied::NotYourTurn { conn, seat });
        }
        Ok(table)
    }

    // ---- room lifecycle ----

    fn create_room(&mut self, names: &[String]) -> Result<(), SessionError> {
        if self.game.is_some() {
            return Err(SessionError::GameInProgress);
        }
        let room = Room::from_names(names, &mut thread_rng())?;
        self.generation += 1;
        info!(host = %room.host_name, players = room.len(), "room created");

        self.hub.broadcast(ServerToClient::RoomStatus {
            room_host_name: Some(room.host_name.clone()),
            is_game_running: false,
        });
        self.hub.broadcast(ServerToClient::UpdateLobby {
            players: room.public_players(),
            game_started: false,
        });
        self.room = Some(room);
        Ok(())
    }

    fn select_player(&mut self, conn: Uuid, seat: usize) -> Result<(), SessionError> {
        let running = self.game.is_some();
        let room = self.room.as_mut().ok_or(SessionError::NoRoom)?;
        if !room.claim_seat(seat, conn) {
            return Err(SessionError::SeatOutOfRange(seat));
        }
        info!(%conn, seat, name = room.name_at(seat).unwrap_or_default(), "seat claimed");

        let players = room.public_players();
        self.hub.broadcast(ServerToClient::UpdateLobby {
            players: players.clone(),
            game_started: running,
        });
        if running {
            self.hub.broadcast(ServerToClient::UpdateGameStatus { players });
        }
        Ok(())
    }

    fn back_to_setup(&mut self) -> Result<(), SessionError> {
        let room = self.room.as_mut().ok_or(SessionError::NoRoom)?;
        self.game = None;
        self.generation += 1;
        room.reset_to_lobby();
        info!(host = %room.host_name, "back to setup");

        self.hub.broadcast(ServerToClient::RoomStatus {
            room_host_name: Some(room.host_name.clone()),
            is_game_running: false,
        });
        self.hub.broadcast(ServerToClient::BackToSetup { names: room.names() });
        self.hub.broadcast(ServerToClient::UpdateLobby {
            players: room.public_players(),
            game_started: false,
        });
        Ok(())
    }

    fn teardown(&mut self, keep_names: bool) {
        let names = match (&self.room, keep_names) {
            (Some(room), true) => room.names(),
            _ => Vec::new(),
        };
        self.room = None;
        self.game = None;
        self.generation += 1;
        info!(keep_names, "room torn down");

        self.hub.broadcast(ServerToClient::RoomStatus {
            room_host_name: None,
            is_game_running: false,
        });
        self.hub.broadcast(ServerToClient::BackToSetup { names });
    }

    fn start_game(&mut self, deck: Deck) -> Result<(), SessionError> {
        let room = self.room.as_ref().ok_or(SessionError::NoRoom)?;
        if room.is_empty() {
            return Err(RosterError::Empty.into());
        }
        let game = Game::new(deck);
        let started = ServerToClient::GameStarted {
            turn_index: game.turn.current(),
            remaining_cards: game.deck.remaining(),
            status_holders: StatusHolders::default(),
        };
        self.game = Some(game);
        self.generation += 1;
        info!(players = room.len(), generation = self.generation, "game started");
        self.hub.broadcast(started);
        Ok(())
    }

    // ---- turn flow ----

    fn draw_card(&mut self, conn: Uuid) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        let drawer = t.game.turn.current();
        let drawer_name = t
            .room
            .name_at(drawer)
            .ok_or(SessionError::SeatOutOfRange(drawer))?
            .to_string();

        let rank = match t.game.deck.draw() {
            Ok(rank) => rank,
            Err(DeckError::EmptyDeck) => {
                info!("deck exhausted, game over");
                t.hub.broadcast(ServerToClient::GameOver);
                return Ok(());
            }
        };

        t.game.status.assign(rank, &drawer_name);
        let effect = effects::resolve(rank, drawer, t.room, &t.game.status);
        t.game.pending_picks = effects::required_picks(&effect);
        info!(%rank, seat = drawer, remaining = t.game.deck.remaining(), "card drawn");

        t.hub.broadcast(ServerToClient::CardResult {
            card_value: rank,
            card_info: rank.info(),
            drawer_name,
            drawer_index: drawer,
            effect,
            remaining_cards: t.game.deck.remaining(),
            status_holders: t.game.status.snapshot(t.room),
        });
        Ok(())
    }

    fn end_turn(&mut self, conn: Uuid) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        let next = t.game.turn.advance(t.room.len());
        t.game.pending_picks = None;
        debug!(seat = next, "turn advanced");
        t.hub.broadcast(ServerToClient::NextTurn { turn_index: next });
        Ok(())
    }

    fn choose_minigame(&mut self, conn: Uuid, game_name: &str) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        let game_name = game_name.trim();
        if game_name.is_empty() || game_name.chars().count() > MAX_MINIGAME_NAME_LEN {
            return Err(SessionError::InvalidPayload("minigame name"));
        }
        info!(game = game_name, "minigame selected");
        t.hub.broadcast(ServerToClient::MinigameSelected {
            game_name: game_name.to_string(),
        });
        Ok(())
    }

    fn punish_loser(&mut self, conn: Uuid, seat: usize, cause: Option<String>) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        let victims = victims::resolve(t.room, &t.game.status.buddies, seat);
        if victims.is_empty() {
            return Err(SessionError::SeatOutOfRange(seat));
        }
        let cause = cause
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_PUNISH_CAUSE.to_string());
        t.hub.broadcast(ServerToClient::ShowPunishment { cause, victims });
        Ok(())
    }

    fn punish_multiple(&mut self, conn: Uuid, seats: &[usize]) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        if seats.is_empty() {
            return Err(SessionError::InvalidPayload("no seats named"));
        }
        if let Some(&bad) = seats.iter().find(|&&s| !t.room.is_occupied(s)) {
            return Err(SessionError::SeatOutOfRange(bad));
        }
        if let Some(picks) = t.game.pending_picks.take() {
            let named = seats.iter().collect::<BTreeSet<_>>().len();
            // the drawer plus the seats they picked
            if named != picks + 1 {
                warn!(expected = picks + 1, named, "multi-punish count mismatch");
            }
        }

        let victims = victims::resolve_many(t.room, &t.game.status.buddies, seats);
        t.hub.broadcast(ServerToClient::ShowPunishment {
            cause: MULTI_PUNISH_CAUSE.to_string(),
            victims,
        });
        Ok(())
    }

    // ---- duels ----

    fn start_duel(&mut self, conn: Uuid, target: usize) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        let challenger = t.game.turn.current();
        if target == challenger {
            return Err(SessionError::SameSeat(target));
        }
        let (Some(challenger_name), Some(target_name)) = (t.room.name_at(challenger), t.room.name_at(target)) else {
            return Err(SessionError::SeatOutOfRange(target));
        };
        info!(challenger, target, "duel started");
        t.hub.broadcast(ServerToClient::DuelStarted {
            challenger: challenger_name.to_string(),
            target: target_name.to_string(),
        });
        Ok(())
    }

    fn resolve_duel(&mut self, conn: Uuid, winner: usize, loser: usize) -> Result<(), SessionError> {
        let t = self.turn_table(conn)?;
        if winner == loser {
            return Err(SessionError::SameSeat(winner));
        }
        let winner_name = t.room.name_at(winner).ok_or(SessionError::SeatOutOfRange(winner))?;
        let loser_name = t.room.name_at(loser).ok_or(SessionError::SeatOutOfRange(loser))?;

        let outcome = t.game.status.resolve_duel(winner, loser);
        info!(winner, loser, ?outcome, "duel resolved");
        t.hub.broadcast(ServerToClient::DuelResult {
            winner: winner_name.to_string(),
            loser: loser_name.to_string(),
            message: outcome.message().to_string(),
            status_holders: t.game.status.snapshot(t.room),
        });
        Ok(())
    }

    // ---- hot potato ----

    fn start_bomb(&mut self, conn: Uuid) -> Result<FuseTicket, SessionError> {
        let fuse = self.config.bomb_fuse;
        let t = self.turn_table(conn)?;
        let holder = t.game.turn.current();
        let ticket = t.game.bomb.arm(holder, t.generation, fuse)?;
        let expires_at = t.game.bomb.expires_at().ok_or(SessionError::BombIdle)?;
        info!(holder, %expires_at, "hot potato armed");
        t.hub.broadcast(ServerToClient::BombStarted {
            holder_index: holder,
            expires_at,
        });
        Ok(ticket)
    }

    fn pass_bomb(&mut self) -> Result<(), SessionError> {
        let t = self.table()?;
        let holder = t.game.bomb.pass(t.room.len()).ok_or(SessionError::BombIdle)?;
        debug!(holder, "hot potato passed");
        t.hub.broadcast(ServerToClient::BombUpdate { holder_index: holder });
        Ok(())
    }

    pub fn attach_fuse(&mut self, ticket: FuseTicket, handle: AbortHandle) {
        match self.game.as_mut() {
            Some(game) if ticket.generation == self.generation => game.bomb.attach(ticket, handle),
            _ => handle.abort(),
        }
    }

    /// Fires the bomb for `ticket` if it is still the live one. Returns
    /// whether anything exploded.
    pub fn detonate(&mut self, ticket: FuseTicket) -> bool {
        let Ok(t) = self.table() else {
            return false;
        };
        if ticket.generation != t.generation {
            return false;
        }
        let Some(loser) = t.game.bomb.explode(ticket.seq) else {
            return false;
        };

        let victims = victims::resolve(t.room, &t.game.status.buddies, loser);
        info!(seat = loser, victims = ?victims.names, "hot potato exploded");
        t.hub.broadcast(ServerToClient::BombExploded { loser_index: loser });
        t.hub.broadcast(ServerToClient::ShowPunishment {
            cause: BOMB_PUNISH_CAUSE.to_string(),
            victims,
        });
        true
    }
}

#[cfg(test)]
impl Session {
    pub fn is_running(&self) -> bool {
        self.game.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn current_seat(&self) -> Option<usize> {
        self.game.as_ref().map(|g| g.turn.current())
    }

    pub fn remaining_cards(&self) -> Option<usize> {
        self.game.as_ref().map(|g| g.deck.remaining())
    }

    pub fn buddies(&self) -> Option<&BTreeSet<usize>> {
        self.game.as_ref().map(|g| &g.status.buddies)
    }

    pub fn pending_picks(&self) -> Option<usize> {
        self.game.as_ref().and_then(|g| g.pending_picks)
    }

    pub fn bomb_holder(&self) -> Option<usize> {
        self.game.as_ref().and_then(|g| g.bomb.holder())
    }

    /// Starts a game with a known card order.
    pub(crate) fn start_with_deck(&mut self, cards: Vec<kingscup_protocol::Rank>) -> Result<(), SessionError> {
        self.start_game(Deck::from_cards(cards))
    }
}

/// Cloneable handle that serialises every access to the session.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<Session>>,
}

impl SharedSession {
    pub fn new(config: SessionConfig) -> Self {
        SharedSession {
            inner: Arc::new(Mutex::new(Session::new(config))),
        }
    }

    pub fn connect(&self, conn: Uuid, tx: Outbox) {
        self.inner.lock().connect(conn, tx);
    }

    pub fn disconnect(&self, conn: Uuid) {
        self.inner.lock().disconnect(conn);
    }

    pub fn dispatch(&self, conn: Uuid, cmd: ClientToServer) {
        debug!(%conn, ?cmd, "client event");
        let mut session = self.inner.lock();
        match session.handle(conn, cmd) {
            Ok(Some(ticket)) => {
                let fuse = session.config.bomb_fuse;
                let task = tokio::spawn(self.clone().burn(ticket, fuse));
                session.attach_fuse(ticket, task.abort_handle());
            }
            Ok(None) => {}
            Err(SessionError::Denied(reason)) => debug!(%conn, %reason, "turn-gated event denied"),
            Err(err) => debug!(%conn, %err, "dropped client event"),
        }
    }

    async fn burn(self, ticket: FuseTicket, fuse: Duration) {
        tokio::time::sleep(fuse).await;
        if !self.inner.lock().detonate(ticket) {
            debug!(?ticket, "stale fuse ignored");
        }
    }

    #[cfg(test)]
    pub fn with<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
