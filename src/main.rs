use clap::{Parser, Subcommand};
use futures_util::{SinkExt, StreamExt};
use kingscup_protocol::{ClientToServer, Effect, ServerToClient, StatusHolders, Victims};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};

const DEMO_MINIGAME: &str = "Rock Paper Scissors";

#[derive(Parser)]
#[command(name = "kingscup")]
#[command(about = "King's Cup - terminal client for the shared table")]
struct Cli {
    /// Server websocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:9001/ws")]
    url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Type table commands interactively
    Play,
    /// Seat every player on this connection and play the deck out
    Demo {
        /// Comma-separated player names
        #[arg(long, value_delimiter = ',', default_value = "Ana,Ben,Cy")]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play => run_play(&cli.url).await,
        Commands::Demo { names } => run_demo(&cli.url, names).await,
    }
}

async fn run_play(url: &str) -> anyhow::Result<()> {
    println!("🍺 King's Cup CLI Client");
    println!("========================");
    println!("🔗 Connecting to {}...", url);

    let (ws_stream, _) = connect_async(url).await?;
    println!("✅ Connected to server!");

    let (mut write, mut read) = ws_stream.split();

    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Ok(server_msg) = serde_json::from_str::<ServerToClient>(&text) {
                        print_event(&server_msg);
                    }
                }
                Ok(Message::Close(_)) => {
                    println!("🔌 Connection closed by server");
                    break;
                }
                Err(e) => {
                    println!("❌ WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    print_help();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();

        if line == "quit" {
            break;
        }
        if line == "help" {
            print_help();
            continue;
        }

        if let Some(msg) = parse_command(line) {
            let json = serde_json::to_string(&msg)?;
            write.send(Message::Text(json)).await?;
        } else {
            println!("❓ Unknown command: {}", line);
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}

async fn run_demo(url: &str, names: Vec<String>) -> anyhow::Result<()> {
    let seats = names.len();
    anyhow::ensure!(seats > 0, "demo needs at least one player name");

    println!("🍺 King's Cup demo with {} players", seats);
    let (ws_stream, _) = connect_async(url).await?;
    let (mut write, mut read) = ws_stream.split();

    let mut opening = vec![ClientToServer::CreateRoom { names }];
    opening.extend((0..seats).map(|index| ClientToServer::SelectPlayer { index }));
    opening.push(ClientToServer::StartGame);
    for cmd in opening {
        write.send(Message::Text(serde_json::to_string(&cmd)?)).await?;
    }

    while let Some(msg) = read.next().await {
        let text = match msg? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(event) = serde_json::from_str::<ServerToClient>(&text) else {
            continue;
        };
        print_event(&event);
        if event == ServerToClient::GameOver {
            break;
        }

        for reply in auto_play_response(&event, seats) {
            tokio::time::sleep(tokio::time::Duration::from_millis(150)).await;
            write.send(Message::Text(serde_json::to_string(&reply)?)).await?;
        }
    }

    println!("🏁 Deck finished!");
    Ok(())
}

/// What the demo's single connection sends back after each event. It holds
/// every seat, so it can always act for whoever's turn it is.
fn auto_play_response(msg: &ServerToClient, seats: usize) -> Vec<ClientToServer> {
    match msg {
        ServerToClient::GameStarted { .. } | ServerToClient::NextTurn { .. } => {
            vec![ClientToServer::DrawCard]
        }
        ServerToClient::CardResult {
            drawer_index, effect, ..
        } => {
            let drawer = *drawer_index;
            let next = (drawer + 1) % seats;
            let mut replies = match effect {
                Effect::MultiSelect { count } => vec![ClientToServer::PunishMultiple {
                    indices: (0..=*count).map(|i| (drawer + i) % seats).collect(),
                }],
                Effect::Duel if next != drawer => vec![
                    ClientToServer::StartDuel { target_index: next },
                    ClientToServer::ResolveDuel {
                        winner_index: drawer,
                        loser_index: next,
                    },
                ],
                Effect::Minigame => vec![
                    ClientToServer::ChooseMinigame {
                        game_name: DEMO_MINIGAME.to_string(),
                    },
                    ClientToServer::PunishLoser {
                        index: next,
                        cause: None,
                    },
                ],
                _ => Vec::new(),
            };
            replies.push(ClientToServer::EndTurn);
            replies
        }
        _ => Vec::new(),
    }
}

fn print_help() {
    println!("\n📋 Commands available:");
    println!("  room A B C        - Create the room with these players");
    println!("  seat N            - Claim seat N");
    println!("  start             - Deal a fresh deck");
    println!("  draw              - Draw a card");
    println!("  end               - End your turn");
    println!("  minigame NAME     - Announce the minigame");
    println!("  punish N [cause]  - Punish the player in seat N");
    println!("  multi N N ...     - Punish several seats at once");
    println!("  duel N            - Challenge seat N");
    println!("  winner W L        - Settle a duel");
    println!("  bomb              - Light the hot potato");
    println!("  pass              - Pass the hot potato on");
    println!("  setup             - Back to the lobby, names kept");
    println!("  reset             - Tear the room down");
    println!("  restart           - Tear down but offer the names again");
    println!("  help              - Show this list");
    println!("  quit              - Exit");
    println!("\nType commands and press Enter:");
}

fn parse_command(input: &str) -> Option<ClientToServer> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }
    let seat = |i: usize| parts.get(i).and_then(|s| s.parse::<usize>().ok());

    match parts[0].to_lowercase().as_str() {
        "room" if parts.len() > 1 => Some(ClientToServer::CreateRoom {
            names: parts[1..].iter().map(|s| s.to_string()).collect(),
        }),
        "seat" => seat(1).map(|index| ClientToServer::SelectPlayer { index }),
        "start" => Some(ClientToServer::StartGame),
        "draw" => Some(ClientToServer::DrawCard),
        "end" => Some(ClientToServer::EndTurn),
        "minigame" if parts.len() > 1 => Some(ClientToServer::ChooseMinigame {
            game_name: parts[1..].join(" "),
        }),
        "punish" => seat(1).map(|index| ClientToServer::PunishLoser {
            index,
            cause: (parts.len() > 2).then(|| parts[2..].join(" ")),
        }),
        "multi" => {
            let indices: Option<Vec<usize>> = parts[1..].iter().map(|s| s.parse().ok()).collect();
            indices
                .filter(|v| !v.is_empty())
                .map(|indices| ClientToServer::PunishMultiple { indices })
        }
        "duel" => seat(1).map(|target_index| ClientToServer::StartDuel { target_index }),
        "winner" => match (seat(1), seat(2)) {
            (Some(winner_index), Some(loser_index)) => Some(ClientToServer::ResolveDuel {
                winner_index,
                loser_index,
            }),
            _ => None,
        },
        "bomb" => Some(ClientToServer::StartBomb),
        "pass" => Some(ClientToServer::PassBomb),
        "setup" => Some(ClientToServer::HostBackToSetup),
        "reset" => Some(ClientToServer::ForceReset),
        "restart" => Some(ClientToServer::ResetGame),
        _ => None,
    }
}

fn print_event(msg: &ServerToClient) {
    match msg {
        ServerToClient::Hello { your_id } => {
            println!("👋 Welcome! Your ID: {}", your_id);
        }
        ServerToClient::RoomStatus {
            room_host_name,
            is_game_running,
        } => match room_host_name {
            Some(host) => println!("🏠 Room hosted by {} (game running: {})", host, is_game_running),
            None => println!("🏠 No room yet - create one with `room A B C`"),
        },
        ServerToClient::UpdateLobby { players, game_started } => {
            println!("👥 Players ({}){}:", players.len(), if *game_started { " [IN GAME]" } else { "" });
            for (i, p) in players.iter().enumerate() {
                let seated = if p.ready { " [SEATED]" } else { "" };
                let away = if p.online { "" } else { " [OFFLINE]" };
                println!("  {}: {}{}{}", i, p.name, seated, away);
            }
        }
        ServerToClient::UpdateGameStatus { players } => {
            let away: Vec<&str> = players.iter().filter(|p| !p.online).map(|p| p.name.as_str()).collect();
            if !away.is_empty() {
                println!("📴 Offline: {}", away.join(", "));
            }
        }
        ServerToClient::GameStarted {
            turn_index,
            remaining_cards,
            status_holders,
        } => {
            println!("\n🎲 === GAME ON ===");
            println!("🃏 {} cards in the deck, seat {} to draw", remaining_cards, turn_index);
            print_status(status_holders);
        }
        ServerToClient::CardResult {
            card_info,
            drawer_name,
            effect,
            remaining_cards,
            status_holders,
            ..
        } => {
            println!("\n🃏 {} drew {} ({} left)", drawer_name, card_info.name, remaining_cards);
            print_effect(drawer_name, effect);
            print_status(status_holders);
        }
        ServerToClient::NextTurn { turn_index } => {
            println!("👉 Seat {} to draw", turn_index);
        }
        ServerToClient::MinigameSelected { game_name } => {
            println!("🎮 Minigame: {}", game_name);
        }
        ServerToClient::ShowPunishment { cause, victims } => {
            println!("🍻 {} - {}", cause, describe_victims(victims));
        }
        ServerToClient::DuelStarted { challenger, target } => {
            println!("⚔️  {} challenges {}!", challenger, target);
        }
        ServerToClient::DuelResult {
            winner,
            loser,
            message,
            status_holders,
        } => {
            println!("🏆 {} beat {}. {}", winner, loser, message);
            print_status(status_holders);
        }
        ServerToClient::BombStarted {
            holder_index,
            expires_at,
        } => {
            println!("💣 Hot potato lit on seat {} - boom at {}", holder_index, expires_at.format("%H:%M:%S"));
        }
        ServerToClient::BombUpdate { holder_index } => {
            println!("💣 Hot potato passed to seat {}", holder_index);
        }
        ServerToClient::BombExploded { loser_index } => {
            println!("💥 BOOM! Seat {} was holding it", loser_index);
        }
        ServerToClient::BackToSetup { names } => {
            if names.is_empty() {
                println!("🧹 Table cleared");
            } else {
                println!("🧹 Back to setup: {}", names.join(", "));
            }
        }
        ServerToClient::GameOver => {
            println!("🏁 The deck is empty - game over!");
        }
    }
}

fn print_effect(drawer: &str, effect: &Effect) {
    match effect {
        Effect::MultiSelect { count } => println!("🎯 {} picks {} more to drink with them", drawer, count),
        Effect::AutoTarget {
            target_name, victims, ..
        } => println!("🎯 {} drinks: {}", target_name, describe_victims(victims)),
        Effect::SelfPunish { victims } => println!("🍺 Drawer drinks: {}", describe_victims(victims)),
        Effect::AllDrink => println!("🍻 Everybody drinks!"),
        Effect::Duel => println!("⚔️  Time for a duel"),
        Effect::Minigame => println!("🎮 Pick a minigame"),
        Effect::None => {}
    }
}

fn print_status(status: &StatusHolders) {
    let badge = |b: &Option<String>| b.clone().unwrap_or_else(|| "-".to_string());
    println!(
        "👑 K: {}  Q: {}  J: {}  ⭐ buddies: {}",
        badge(&status.king),
        badge(&status.queen),
        badge(&status.jack),
        if status.buddies.is_empty() { "-".to_string() } else { status.buddies.join(", ") }
    );
}

fn describe_victims(victims: &Victims) -> String {
    let names = victims.names.join(", ");
    if victims.is_buddy_effect {
        format!("{} (buddies share it)", names)
    } else {
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_commands() {
        assert_eq!(
            parse_command("room Ana Ben"),
            Some(ClientToServer::CreateRoom {
                names: vec!["Ana".into(), "Ben".into()]
            })
        );
        assert_eq!(parse_command("seat 2"), Some(ClientToServer::SelectPlayer { index: 2 }));
        assert_eq!(parse_command("DRAW"), Some(ClientToServer::DrawCard));
        assert_eq!(
            parse_command("winner 1 0"),
            Some(ClientToServer::ResolveDuel {
                winner_index: 1,
                loser_index: 0
            })
        );
        assert_eq!(parse_command("restart"), Some(ClientToServer::ResetGame));
    }

    #[test]
    fn punish_cause_is_optional() {
        assert_eq!(
            parse_command("punish 1"),
            Some(ClientToServer::PunishLoser { index: 1, cause: None })
        );
        assert_eq!(
            parse_command("punish 1 too slow"),
            Some(ClientToServer::PunishLoser {
                index: 1,
                cause: Some("too slow".into())
            })
        );
    }

    #[test]
    fn rejects_incomplete_commands() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("room"), None);
        assert_eq!(parse_command("seat x"), None);
        assert_eq!(parse_command("multi"), None);
        assert_eq!(parse_command("multi 1 two"), None);
        assert_eq!(parse_command("winner 1"), None);
        assert_eq!(parse_command("fold"), None);
    }

    #[test]
    fn demo_answers_a_trio_with_the_drawer_and_two_more() {
        let card = ServerToClient::CardResult {
            card_value: kingscup_protocol::Rank::Three,
            card_info: kingscup_protocol::Rank::Three.info(),
            drawer_name: "Cy".into(),
            drawer_index: 2,
            effect: Effect::MultiSelect { count: 2 },
            remaining_cards: 40,
            status_holders: StatusHolders::default(),
        };
        assert_eq!(
            auto_play_response(&card, 4),
            [
                ClientToServer::PunishMultiple { indices: vec![2, 3, 0] },
                ClientToServer::EndTurn,
            ]
        );
    }

    #[test]
    fn demo_skips_duels_at_a_table_of_one() {
        let card = ServerToClient::CardResult {
            card_value: kingscup_protocol::Rank::Seven,
            card_info: kingscup_protocol::Rank::Seven.info(),
            drawer_name: "Solo".into(),
            drawer_index: 0,
            effect: Effect::Duel,
            remaining_cards: 10,
            status_holders: StatusHolders::default(),
        };
        assert_eq!(auto_play_response(&card, 1), [ClientToServer::EndTurn]);
        assert_eq!(
            auto_play_response(&ServerToClient::NextTurn { turn_index: 0 }, 1),
            [ClientToServer::DrawCard]
        );
    }
}
