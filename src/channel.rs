//! Same-origin broadcast channels used to keep session managers in sync.
//!
//! An [`AuthHub`] stands in for the origin: every manager opened against the
//! same hub and channel name sees the others' signals. Delivery is
//! fire-and-forget and an endpoint never receives its own posts.

use std::{
    collections::HashMap,
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace, warn};
use ulid::Ulid;

/// Channel carrying session signals between managers.
pub const AUTH_CHANNEL: &str = "auth";

const CHANNEL_CAPACITY: usize = 64;

/// Messages understood on the auth channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AuthSignal {
    SignOut,
}

impl AuthSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignOut => "signOut",
        }
    }
}

impl fmt::Display for AuthSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthSignal {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "signOut" => Ok(Self::SignOut),
            other => Err(format!("unknown auth signal: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
struct Envelope {
    origin: Ulid,
    payload: String,
}

/// Registry of named channels shared by all endpoints of one origin.
#[derive(Clone, Debug, Default)]
pub struct AuthHub {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<Envelope>>>>,
}

impl AuthHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new endpoint on the channel called `name`, creating the channel on first use.
    #[must_use]
    pub fn open(&self, name: &str) -> AuthChannel {
        let sender = {
            // A poisoned registry only means another opener panicked mid-insert.
            let mut channels = self
                .channels
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            channels
                .entry(name.to_string())
                .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
                .clone()
        };

        let channel = AuthChannel {
            id: Ulid::new(),
            name: name.to_string(),
            sender,
            own_subscriptions: Arc::new(AtomicUsize::new(0)),
        };
        debug!(channel = %channel.name, endpoint = %channel.id, "auth channel opened");
        channel
    }
}

/// One endpoint of a named channel.
#[derive(Debug)]
pub struct AuthChannel {
    id: Ulid,
    name: String,
    sender: broadcast::Sender<Envelope>,
    own_subscriptions: Arc<AtomicUsize>,
}

impl AuthChannel {
    #[must_use]
    pub fn id(&self) -> Ulid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Posts `signal` to every other endpoint and returns how many of their
    /// subscriptions it reached. Having no listeners is not an error.
    pub fn post(&self, signal: AuthSignal) -> usize {
        self.post_raw(signal.as_str())
    }

    fn post_raw(&self, payload: &str) -> usize {
        let envelope = Envelope {
            origin: self.id,
            payload: payload.to_string(),
        };
        // Our own subscriptions are counted by the broadcast but skip the envelope.
        let receivers = self
            .sender
            .send(envelope)
            .unwrap_or(0)
            .saturating_sub(self.own_subscriptions.load(Ordering::Acquire));
        trace!(channel = %self.name, payload, receivers, "auth signal posted");
        receivers
    }

    /// Starts receiving signals posted from now on by other endpoints.
    #[must_use]
    pub fn subscribe(&self) -> AuthSubscription {
        self.own_subscriptions.fetch_add(1, Ordering::AcqRel);
        AuthSubscription {
            id: self.id,
            name: self.name.clone(),
            receiver: self.sender.subscribe(),
            own_subscriptions: Arc::clone(&self.own_subscriptions),
        }
    }
}

#[derive(Debug)]
pub struct AuthSubscription {
    id: Ulid,
    name: String,
    receiver: broadcast::Receiver<Envelope>,
    own_subscriptions: Arc<AtomicUsize>,
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.own_subscriptions.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AuthSubscription {
    /// Waits for the next signal from another endpoint.
    /// Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<AuthSignal> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.origin == self.id => {}
                Ok(envelope) => match envelope.payload.parse() {
                    Ok(signal) => return Some(signal),
                    Err(err) => debug!(channel = %self.name, "ignoring message: {err}"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.name, skipped, "auth listener lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
