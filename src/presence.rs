//! Presence notices
//!
//! Turns join/leave/rename traffic into system notices and chat payloads
//! into render records. Our own JOIN echo is suppressed; LEAVE is rendered
//! for everyone, including a late echo of our own.

use tracing::{debug, warn};

use crate::message::{ChatMessage, PresenceKind, UserEvent};
use crate::sink::{Origin, RenderedRecord};
use crate::types::Identity;

#[derive(Debug, Default)]
pub struct PresenceTracker;

impl PresenceTracker {
    pub fn new() -> Self {
        Self
    }

    /// Notice for an event received on the presence topic
    pub fn on_presence(&self, event: &UserEvent, local: &Identity) -> Option<RenderedRecord> {
        match event.kind {
            PresenceKind::Join if local.is(&event.sender) => {
                debug!("Suppressing own join notice");
                None
            }
            PresenceKind::Join => Some(RenderedRecord::Notice(format!(
                "{} se unió al chat",
                event.sender
            ))),
            PresenceKind::Leave => Some(RenderedRecord::Notice(format!(
                "{} se desconectó",
                event.sender
            ))),
            PresenceKind::ChangeName => match &event.old_sender {
                Some(old) => Some(RenderedRecord::Notice(format!(
                    "{} ahora es {}",
                    old, event.sender
                ))),
                None => {
                    warn!("CHANGE_NAME from {} without oldSender", event.sender);
                    None
                }
            },
        }
    }

    /// Record for a payload received on the messages topic
    pub fn on_message(&self, message: &ChatMessage, local: &Identity) -> RenderedRecord {
        if message.is_notice() {
            return RenderedRecord::Notice(message.content.clone());
        }

        let origin = if local.is(&message.sender) {
            Origin::SelfSent
        } else {
            Origin::Received
        };
        RenderedRecord::Chat {
            sender: message.sender.clone(),
            content: message.content.clone(),
            origin,
        }
    }

    /// Rename notice to publish on the chat channel
    pub fn rename_notice(&self, old: &Identity, new: &Identity) -> ChatMessage {
        ChatMessage::change(old, new)
    }
}
