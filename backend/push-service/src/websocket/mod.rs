//! WebSocket real-time push
//!
//! Architecture:
//! 1. ChannelRegistry: user id -> set of open channels
//! 2. PushSession: one actor per WebSocket connection, owns the channel's
//!    registration and writes queued frames to the socket
//! 3. Dispatcher: fans a payload out to every channel of one user

pub mod dispatcher;
pub mod registry;
pub mod session;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::error::{AppError, Result};

pub use dispatcher::{DeliveryOutcome, Dispatcher};
pub use registry::{ChannelRegistry, Registration};
pub use session::PushSession;

/// Opaque identifier of a notification addressee
///
/// Any non-blank string is accepted; surrounding whitespace is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::InvalidUserId(
                "user id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier of one open channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Sending half of a channel
///
/// Cloning yields a handle to the same channel (same id, same queue).
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    sender: UnboundedSender<String>,
    opened_at: DateTime<Utc>,
}

impl Channel {
    /// Open a new channel, returning the handle and the queue the session drains
    pub fn open() -> (Self, UnboundedReceiver<String>) {
        let (sender, receiver) = unbounded_channel();
        let channel = Self {
            id: ChannelId::new(),
            sender,
            opened_at: Utc::now(),
        };
        (channel, receiver)
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Queue one text frame. Fails once the receiving session has gone away.
    pub fn send(&self, frame: String) -> Result<()> {
        self.sender.send(frame).map_err(|_| AppError::ChannelClosed)
    }
}
