//! Typing indicator coordination
//!
//! Local side: the rising edge is sent on the first keystroke, the falling
//! edge after an idle window with no keystrokes. Remote side: a single slot
//! tracks the most recent remote typist and hides it after a timeout unless
//! refreshed.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::debug;

use crate::client::ClientCommand;
use crate::config::ClientConfig;
use crate::message::TypingEvent;
use crate::sink::RenderedRecord;
use crate::timer::{Timer, TimerFired, TimerKind};
use crate::types::Identity;

#[derive(Debug)]
pub struct TypingCoordinator {
    idle: Duration,
    remote_timeout: Duration,
    idle_timer: Timer,
    expiry_timer: Timer,
    /// Whether `typing: true` has been sent without a matching stop
    signaling: bool,
    remote_typist: Option<String>,
}

impl TypingCoordinator {
    pub fn new(config: &ClientConfig, commands: mpsc::Sender<ClientCommand>) -> Self {
        Self {
            idle: config.typing_idle,
            remote_timeout: config.remote_typing_timeout,
            idle_timer: Timer::new(TimerKind::TypingIdle, commands.clone()),
            expiry_timer: Timer::new(TimerKind::RemoteTypingExpiry, commands),
            signaling: false,
            remote_typist: None,
        }
    }

    /// Local keystroke; returns the start event on the rising edge only
    pub fn on_keystroke(&mut self, identity: &Identity) -> Option<TypingEvent> {
        self.idle_timer.arm(self.idle);
        if self.signaling {
            return None;
        }
        self.signaling = true;
        Some(TypingEvent::new(identity, true))
    }

    /// Idle window elapsed; returns the stop event
    pub fn on_idle_elapsed(
        &mut self,
        fired: TimerFired,
        identity: &Identity,
    ) -> Option<TypingEvent> {
        if !self.idle_timer.fire(fired) {
            debug!("Stale typing idle timer");
            return None;
        }
        self.signaling = false;
        Some(TypingEvent::new(identity, false))
    }

    /// A chat message was sent: always stop, whatever the current state
    pub fn on_message_sent(&mut self, identity: &Identity) -> TypingEvent {
        self.idle_timer.cancel();
        self.signaling = false;
        TypingEvent::new(identity, false)
    }

    #[cfg(test)]
    pub(crate) fn is_signaling(&self) -> bool {
        self.signaling
    }

    /// Typing event received from the broker
    pub fn on_remote(&mut self, event: &TypingEvent, local: &Identity) -> Option<RenderedRecord> {
        if local.is(&event.sender) {
            return None;
        }

        if event.typing {
            self.expiry_timer.arm(self.remote_timeout);
            self.remote_typist = Some(event.sender.clone());
            Some(RenderedRecord::TypingShown(format!(
                "{} está escribiendo...",
                event.sender
            )))
        } else {
            self.expiry_timer.cancel();
            self.remote_typist = None;
            Some(RenderedRecord::TypingHidden)
        }
    }

    /// Remote indicator expired without a refresh
    pub fn on_remote_expired(&mut self, fired: TimerFired) -> Option<RenderedRecord> {
        if !self.expiry_timer.fire(fired) {
            debug!("Stale typing expiry timer");
            return None;
        }
        if let Some(sender) = self.remote_typist.take() {
            debug!("Typing indicator for {} expired", sender);
        }
        Some(RenderedRecord::TypingHidden)
    }

    #[cfg(test)]
    pub(crate) fn remote_typist(&self) -> Option<&str> {
        self.remote_typist.as_deref()
    }
}
