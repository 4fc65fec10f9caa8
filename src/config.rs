//! Client configuration
//!
//! Defaults reproduce the fixed timings the chat protocol expects: five
//! reconnect attempts two seconds apart, a one-second typing idle window, and
//! a three-second remote typing expiry.

use std::path::PathBuf;
use std::time::Duration;

/// Default broker endpoint (raw WebSocket behind the SockJS `/chat` endpoint)
pub const DEFAULT_URL: &str = "ws://localhost:8080/chat/websocket";

/// Default identity file
pub const DEFAULT_IDENTITY_FILE: &str = ".chat_identity.json";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker WebSocket URL
    pub url: String,
    /// Reconnect attempts before the session is given up
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,
    /// Keystroke idle window before `typing: false` is sent
    pub typing_idle: Duration,
    /// How long a remote typing indicator stays up without a refresh
    pub remote_typing_timeout: Duration,
    /// Where the identity is persisted
    pub identity_file: PathBuf,
    /// Capacity of the client command channel
    pub command_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_millis(2000),
            typing_idle: Duration::from_millis(1000),
            remote_typing_timeout: Duration::from_millis(3000),
            identity_file: PathBuf::from(DEFAULT_IDENTITY_FILE),
            command_channel_capacity: 256,
        }
    }
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_typing_idle(mut self, idle: Duration) -> Self {
        self.typing_idle = idle;
        self
    }

    #[must_use]
    pub fn with_remote_typing_timeout(mut self, timeout: Duration) -> Self {
        self.remote_typing_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_file = path.into();
        self
    }

    /// Values below 1 are clamped to 1
    #[must_use]
    pub fn with_command_channel_capacity(mut self, capacity: usize) -> Self {
        self.command_channel_capacity = capacity.max(1);
        self
    }
}
