//! Message protocol definitions
//!
//! JSON payloads exchanged with the broker. Each topic decodes into its own
//! struct; the `type` field is a closed enum so an unknown kind is a decode
//! error rather than a silently mis-rendered event.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{Destination, Identity, Topic};

/// Sender used for rename notices
pub const SYSTEM_SENDER: &str = "Sistema";

/// Kind of a chat-channel message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary user content
    Chat,
    /// Join notice
    Join,
    /// Leave notice
    Leave,
    /// Rename notice
    Change,
}

/// Chat-channel payload (`/app/sendMessage`, `/topic/messages`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub sender: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

impl ChatMessage {
    pub fn chat(sender: &Identity, content: impl Into<String>) -> Self {
        Self {
            sender: sender.to_string(),
            content: content.into(),
            kind: MessageKind::Chat,
        }
    }

    /// Join notice broadcast once per successful connect
    pub fn join(sender: &Identity) -> Self {
        Self {
            sender: sender.to_string(),
            content: format!("{} se unió al chat", sender),
            kind: MessageKind::Join,
        }
    }

    /// Rename notice; travels on the chat channel, not the presence channel
    pub fn change(old: &Identity, new: &Identity) -> Self {
        Self {
            sender: SYSTEM_SENDER.to_string(),
            content: format!("{} ahora es {}", old, new),
            kind: MessageKind::Change,
        }
    }

    /// Whether this message renders as a system notice rather than a bubble
    pub fn is_notice(&self) -> bool {
        self.kind != MessageKind::Chat
    }
}

/// The only valid `type` of a typing payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypingKind {
    #[serde(rename = "TYPING")]
    Typing,
}

/// Typing-channel payload (`/app/typing`, `/topic/typing`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingEvent {
    pub sender: String,
    pub typing: bool,
    #[serde(rename = "type")]
    pub kind: TypingKind,
}

impl TypingEvent {
    pub fn new(sender: &Identity, typing: bool) -> Self {
        Self {
            sender: sender.to_string(),
            typing,
            kind: TypingKind::Typing,
        }
    }
}

/// Kind of a presence-channel event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceKind {
    Join,
    Leave,
    ChangeName,
}

/// Presence-channel payload (`/app/userJoin`, `/app/userEvent`, `/topic/userEvents`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEvent {
    pub sender: String,
    /// Previous name, only present on `CHANGE_NAME`
    #[serde(
        rename = "oldSender",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub old_sender: Option<String>,
    #[serde(rename = "type")]
    pub kind: PresenceKind,
}

impl UserEvent {
    pub fn join(sender: &Identity) -> Self {
        Self {
            sender: sender.to_string(),
            old_sender: None,
            kind: PresenceKind::Join,
        }
    }

    pub fn leave(sender: &Identity) -> Self {
        Self {
            sender: sender.to_string(),
            old_sender: None,
            kind: PresenceKind::Leave,
        }
    }
}

/// Decoded payload from one of the subscribed topics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncomingEvent {
    Message(ChatMessage),
    Typing(TypingEvent),
    Presence(UserEvent),
}

impl IncomingEvent {
    /// Decode a raw payload against the shape expected on `topic`
    pub fn decode(topic: Topic, payload: &str) -> Result<Self, AppError> {
        let event = match topic {
            Topic::Messages => IncomingEvent::Message(serde_json::from_str(payload)?),
            Topic::Typing => IncomingEvent::Typing(serde_json::from_str(payload)?),
            Topic::UserEvents => IncomingEvent::Presence(serde_json::from_str(payload)?),
        };
        Ok(event)
    }
}

/// Event published by the local client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingEvent {
    /// Chat content or a join/change notice
    Message(ChatMessage),
    /// Presence JOIN announced after connecting
    Join(UserEvent),
    /// Typing start/stop
    Typing(TypingEvent),
    /// Presence LEAVE announced on shutdown
    Leave(UserEvent),
}

impl OutgoingEvent {
    pub fn destination(&self) -> Destination {
        match self {
            OutgoingEvent::Message(_) => Destination::SendMessage,
            OutgoingEvent::Join(_) => Destination::UserJoin,
            OutgoingEvent::Typing(_) => Destination::Typing,
            OutgoingEvent::Leave(_) => Destination::UserEvent,
        }
    }

    pub fn to_json(&self) -> Result<String, AppError> {
        let json = match self {
            OutgoingEvent::Message(msg) => serde_json::to_string(msg)?,
            OutgoingEvent::Join(event) | OutgoingEvent::Leave(event) => {
                serde_json::to_string(event)?
            }
            OutgoingEvent::Typing(event) => serde_json::to_string(event)?,
        };
        Ok(json)
    }
}
