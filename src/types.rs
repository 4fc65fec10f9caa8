//! Basic type definitions for the chat client
//!
//! Provides newtype wrappers and wire names for type safety:
//! - `Identity`: display name, never empty
//! - `Topic`: the three subscribed broker topics
//! - `Destination`: the four publish destinations

/// Display name used when the user supplies none
pub const ANONYMOUS: &str = "Anónimo";

/// Display name of the local user (newtype pattern)
///
/// Always non-empty: blank input falls back to [`ANONYMOUS`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from raw user input
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an incoming `sender` field names this identity
    pub fn is(&self, sender: &str) -> bool {
        self.0 == sender
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self(ANONYMOUS.to_string())
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Broker topics the client subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Chat content and join/leave/change notices
    Messages,
    /// Typing indicators
    Typing,
    /// Presence join/leave/rename
    UserEvents,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Messages, Topic::Typing, Topic::UserEvents];

    /// STOMP destination for the subscription
    pub fn destination(self) -> &'static str {
        match self {
            Topic::Messages => "/topic/messages",
            Topic::Typing => "/topic/typing",
            Topic::UserEvents => "/topic/userEvents",
        }
    }

    pub fn from_destination(destination: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.destination() == destination)
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.destination())
    }
}

/// Application destinations the client publishes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    SendMessage,
    UserJoin,
    Typing,
    UserEvent,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::SendMessage => "/app/sendMessage",
            Destination::UserJoin => "/app/userJoin",
            Destination::Typing => "/app/typing",
            Destination::UserEvent => "/app/userEvent",
        }
    }
}
