//! Per-attempt "payload loaded" notification
//!
//! Every specialization attempt is issued a fresh [`AttemptToken`]. The payload
//! side reports the token it was started with, and a waiter only wakes for its
//! own token, so a late signal from an earlier attempt can never complete a
//! later one.
//!
//! The signal also tracks the *current* token: the one issued last, until its
//! attempt fails. Only a payload reporting the current token may take over the
//! inbound queue.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// Identifies one specialization attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptToken(u64);

impl AttemptToken {
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AttemptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attempt-{}", self.0)
    }
}

impl std::str::FromStr for AttemptToken {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches("attempt-").parse().map(Self)
    }
}

/// Issues attempt tokens and carries the loaded notifications for them
#[derive(Debug)]
pub struct LoadSignal {
    next: AtomicU64,
    current: Mutex<Option<AttemptToken>>,
    loaded: watch::Sender<BTreeSet<AttemptToken>>,
}

impl LoadSignal {
    pub fn new() -> Self {
        let (loaded, _) = watch::channel(BTreeSet::new());
        Self {
            next: AtomicU64::new(1),
            current: Mutex::new(None),
            loaded,
        }
    }

    /// Fresh token for a new attempt; it becomes the current one
    pub fn issue(&self) -> AttemptToken {
        let token = AttemptToken(self.next.fetch_add(1, Ordering::Relaxed));
        *self.current.lock() = Some(token);
        token
    }

    /// Drop `token` as current after its attempt failed
    pub fn retire(&self, token: AttemptToken) {
        let mut current = self.current.lock();
        if *current == Some(token) {
            debug!(%token, "Attempt token retired");
            *current = None;
        }
    }

    /// Token of the attempt in flight, or of the one that specialized the worker
    pub fn current(&self) -> Option<AttemptToken> {
        *self.current.lock()
    }

    pub fn is_current(&self, token: AttemptToken) -> bool {
        self.current() == Some(token)
    }

    /// Record that the payload started for `token` has loaded
    pub fn notify_loaded(&self, token: AttemptToken) {
        debug!(%token, "Payload reported loaded");
        self.loaded.send_modify(|loaded| {
            loaded.insert(token);
        });
    }

    pub fn is_loaded(&self, token: AttemptToken) -> bool {
        self.loaded.borrow().contains(&token)
    }

    /// Wait until `token` has been reported loaded; other tokens are ignored
    pub async fn wait(&self, token: AttemptToken) {
        let mut receiver = self.loaded.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = receiver.wait_for(|loaded| loaded.contains(&token)).await;
    }
}

impl Default for LoadSignal {
    fn default() -> Self {
        Self::new()
    }
}
