//! Rooms
//!
//! A room is where one conversation happens. Its media transport belongs to
//! the host framework and is reached through [`RoomTransport`], which hands
//! over recognised user speech and renders agent speech.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

use crate::error::SessionError;

/// Text the agent speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub text: String,
    /// Pace synthesized speech to the text instead of emitting it at once.
    pub text_pacing: bool,
}

#[async_trait]
pub trait RoomTransport: Send + Sync {
    /// The next final transcript from the remote participant, `None` once they leave.
    async fn next_transcript(&self) -> Option<String>;

    /// Renders agent speech into the room.
    async fn play(&self, utterance: &Utterance) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Disconnected,
    Connected,
    Closed,
}

pub struct Room {
    name: String,
    transport: Arc<dyn RoomTransport>,
    state: watch::Sender<RoomState>,
}

impl Room {
    pub fn new(name: impl Into<String>, transport: Arc<dyn RoomTransport>) -> Self {
        let (state, _) = watch::channel(RoomState::Disconnected);
        Self {
            name: name.into(),
            transport,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn transport(&self) -> &Arc<dyn RoomTransport> {
        &self.transport
    }

    pub fn state(&self) -> RoomState {
        *self.state.borrow()
    }

    /// Joins the room. Connecting twice is a no-op; a closed room cannot be rejoined.
    pub fn connect(&self) -> Result<(), SessionError> {
        let mut result = Ok(());
        self.state.send_if_modified(|state| match state {
            RoomState::Disconnected => {
                *state = RoomState::Connected;
                true
            }
            RoomState::Connected => false,
            RoomState::Closed => {
                result = Err(SessionError::RoomClosed(self.name.clone()));
                false
            }
        });
        if result.is_ok() {
            info!(room = %self.name, "Connected to room");
        }
        result
    }

    pub fn close(&self) {
        if self.state.send_replace(RoomState::Closed) != RoomState::Closed {
            info!(room = %self.name, "Room closed");
        }
    }

    /// Waits until the room is connected. Returns `false` if it closed first.
    pub async fn wait_connected(&self) -> bool {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| *s != RoomState::Disconnected).await {
            Ok(state) => *state == RoomState::Connected,
            Err(_) => false,
        }
    }

    /// Waits until the room is closed.
    pub async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| *s == RoomState::Closed).await;
    }
}
