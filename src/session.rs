//! Session state shared by every component
//!
//! One `SessionState` exists per client. Components receive `&SessionState`
//! to read it; only `ConnectionManager` holds `&mut` and calls the setters.

use crate::types::Identity;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Process-wide session state
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    connection: ConnectionState,
    reconnect_attempts: u32,
    identity: Identity,
}

impl SessionState {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            ..Default::default()
        }
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn set_connection(&mut self, state: ConnectionState) {
        self.connection = state;
    }

    pub(crate) fn set_reconnect_attempts(&mut self, attempts: u32) {
        self.reconnect_attempts = attempts;
    }

    /// Replace the identity, returning the previous one
    pub(crate) fn replace_identity(&mut self, identity: Identity) -> Identity {
        std::mem::replace(&mut self.identity, identity)
    }
}
