use kingscup_protocol::ServerToClient;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

pub type Outbox = mpsc::UnboundedSender<ServerToClient>;

/// Every live connection's outbox, seated or not.
#[derive(Debug, Default)]
pub struct Hub {
    peers: HashMap<Uuid, Outbox>,
}

impl Hub {
    pub fn register(&mut self, conn: Uuid, tx: Outbox) {
        self.peers.insert(conn, tx);
    }

    pub fn unregister(&mut self, conn: Uuid) -> bool {
        self.peers.remove(&conn).is_some()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn send_to(&self, conn: Uuid, msg: ServerToClient) {
        if let Some(tx) = self.peers.get(&conn) {
            if tx.send(msg).is_err() {
                warn!(%conn, "direct send failed: outbox closed");
            }
        }
    }

    pub fn broadcast(&self, msg: ServerToClient) {
        for (conn, tx) in &self.peers {
            if tx.send(msg.clone()).is_err() {
                warn!(%conn, "broadcast failed: outbox closed");
            }
        }
    }
}
