//! The hot potato: a timed marker passed around the table outside normal
//! turn order. Whoever holds it when the fuse runs out is punished.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("a fuse of {0:?} has no representable deadline")]
pub struct FuseOutOfRange(pub Duration);

/// Identifies one arming of the bomb. A fuse task only detonates if its
/// ticket still matches the live bomb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuseTicket {
    pub generation: u64,
    pub seq: u64,
}

#[derive(Debug)]
struct Armed {
    holder: usize,
    seq: u64,
    expires_at: DateTime<Utc>,
    fuse: Option<AbortHandle>,
}

#[derive(Debug, Default)]
pub struct HotPotato {
    armed: Option<Armed>,
    seq: u64,
}

impl HotPotato {
    /// Arms the bomb on `holder`, cancelling any fuse already burning. An
    /// unschedulable fuse leaves the current bomb untouched.
    pub fn arm(&mut self, holder: usize, generation: u64, fuse: Duration) -> Result<FuseTicket, FuseOutOfRange> {
        let expires_at = chrono::Duration::from_std(fuse)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or(FuseOutOfRange(fuse))?;
        self.disarm();
        self.seq += 1;
        self.armed = Some(Armed {
            holder,
            seq: self.seq,
            expires_at,
            fuse: None,
        });
        Ok(FuseTicket {
            generation,
            seq: self.seq,
        })
    }

    /// Hands the running fuse task to the bomb so it can be cancelled.
    pub fn attach(&mut self, ticket: FuseTicket, handle: AbortHandle) {
        match self.armed.as_mut() {
            Some(armed) if armed.seq == ticket.seq => armed.fuse = Some(handle),
            _ => handle.abort(),
        }
    }

    pub fn holder(&self) -> Option<usize> {
        self.armed.as_ref().map(|a| a.holder)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.armed.as_ref().map(|a| a.expires_at)
    }

    /// Moves the bomb one seat along. The fuse keeps burning.
    pub fn pass(&mut self, seats: usize) -> Option<usize> {
        let armed = self.armed.as_mut()?;
        if seats == 0 {
            return None;
        }
        armed.holder = (armed.holder + 1) % seats;
        Some(armed.holder)
    }

    /// Called by the fuse itself: yields the holder and goes idle if the
    /// ticket is still current.
    pub fn explode(&mut self, seq: u64) -> Option<usize> {
        if self.armed.as_ref().is_some_and(|a| a.seq == seq) {
            self.armed.take().map(|a| a.holder)
        } else {
            None
        }
    }

    pub fn disarm(&mut self) {
        if let Some(fuse) = self.armed.take().and_then(|a| a.fuse) {
            fuse.abort();
        }
    }
}

impl Drop for HotPotato {
    fn drop(&mut self) {
        self.disarm();
    }
}
