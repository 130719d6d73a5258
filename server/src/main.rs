use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use futures::{SinkExt, StreamExt};
use kingscup_protocol::{ClientToServer, ServerToClient};
use tracing::{info, warn};

mod bomb;
mod config;
mod effects;
mod error;
mod hub;
mod roster;
mod session;
mod status;
mod turn;
mod victims;

use config::Args;
use session::SharedSession;

#[derive(Clone)]
struct AppState {
    session: SharedSession,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let state = AppState {
        session: SharedSession::new(args.session_config()),
    };
    let app = router(state);

    let addr = args.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, fuse_secs = args.bomb_fuse_secs, "server listening on ws://{addr}/ws");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (tx_out, mut rx_out) = tokio::sync::mpsc::unbounded_channel::<ServerToClient>();

    let writer = tokio::spawn(async move {
        while let Some(msg) = rx_out.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "failed to encode outbound event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let my_id = uuid::Uuid::new_v4();
    state.session.connect(my_id, tx_out);

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(t) => match serde_json::from_str::<ClientToServer>(&t) {
                Ok(cmd) => state.session.dispatch(my_id, cmd),
                Err(err) => warn!(conn = %my_id, %err, "dropping malformed event"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.session.disconnect(my_id);
    writer.abort();
}
