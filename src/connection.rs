//! Connection lifecycle state machine
//!
//! `ConnectionManager` is the only writer of `SessionState`. It drives the
//! transport through connect, fixed-interval reconnect with a hard attempt
//! cap, and shutdown. Transport outcomes arrive as calls from the client
//! actor; the returned values tell the actor which side effects to run.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::ClientCommand;
use crate::config::ClientConfig;
use crate::session::{ConnectionState, SessionState};
use crate::sink::ConnectionStatus;
use crate::timer::{Timer, TimerFired, TimerKind};
use crate::transport::Transport;
use crate::types::Identity;

#[derive(Debug)]
pub struct ConnectionManager {
    max_attempts: u32,
    reconnect_delay: Duration,
    reconnect_timer: Timer,
}

impl ConnectionManager {
    pub fn new(config: &ClientConfig, commands: mpsc::Sender<ClientCommand>) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            reconnect_delay: config.reconnect_delay,
            reconnect_timer: Timer::new(TimerKind::ReconnectDelay, commands),
        }
    }

    /// Begin a connect attempt
    ///
    /// Only accepted from `Disconnected`. While a reconnect delay is pending
    /// the retry belongs to the reconnect timer.
    pub fn start(&mut self, session: &mut SessionState, transport: &mut dyn Transport) -> bool {
        if session.connection() != ConnectionState::Disconnected {
            debug!("Ignoring start while {}", session.connection());
            return false;
        }
        self.attempt(session, transport);
        true
    }

    /// Transport reported success
    ///
    /// Returns true only for a genuine `Connecting -> Connected` transition;
    /// the caller then subscribes and announces presence.
    pub fn on_connected(&mut self, session: &mut SessionState) -> bool {
        if session.connection() != ConnectionState::Connecting {
            warn!("Unexpected connect while {}", session.connection());
            return false;
        }

        self.reconnect_timer.cancel();
        session.set_connection(ConnectionState::Connected);
        session.set_reconnect_attempts(0);
        info!("Connected as {}", session.identity());
        true
    }

    /// Transport reported a failed connect attempt
    pub fn on_connect_failed(
        &mut self,
        session: &mut SessionState,
        reason: &str,
    ) -> Option<ConnectionStatus> {
        if session.connection() != ConnectionState::Connecting {
            debug!("Ignoring connect failure while {}: {}", session.connection(), reason);
            return None;
        }

        warn!("Connection error: {}", reason);
        Some(self.retry_or_give_up(session))
    }

    /// Transport reported that the session dropped
    pub fn on_disconnected(
        &mut self,
        session: &mut SessionState,
        reason: &str,
    ) -> Option<ConnectionStatus> {
        match session.connection() {
            ConnectionState::Connected => {
                warn!("Connection lost: {}", reason);
                session.set_connection(ConnectionState::Disconnected);
                Some(self.retry_or_give_up(session))
            }
            ConnectionState::Connecting => self.on_connect_failed(session, reason),
            state => {
                debug!("Ignoring disconnect while {}: {}", state, reason);
                None
            }
        }
    }

    /// Reconnect delay elapsed
    pub fn on_timer(
        &mut self,
        session: &mut SessionState,
        fired: TimerFired,
        transport: &mut dyn Transport,
    ) -> bool {
        if !self.reconnect_timer.fire(fired) {
            debug!("Stale reconnect timer");
            return false;
        }
        if session.connection() != ConnectionState::Reconnecting {
            return false;
        }

        let attempt = session.reconnect_attempts() + 1;
        session.set_reconnect_attempts(attempt);
        info!("Reconnecting ({}/{})...", attempt, self.max_attempts);
        self.attempt(session, transport);
        true
    }

    /// Close the session for good
    ///
    /// The caller publishes any LEAVE notice before calling this.
    pub fn shutdown(&mut self, session: &mut SessionState, transport: &mut dyn Transport) {
        self.reconnect_timer.cancel();
        if session.connection() != ConnectionState::Disconnected {
            info!("Shutting down ({})", session.connection());
            transport.disconnect();
        }
        session.set_connection(ConnectionState::Disconnected);
    }

    /// Replace the local identity, returning the previous one if it changed
    pub fn set_identity(
        &mut self,
        session: &mut SessionState,
        identity: Identity,
    ) -> Option<Identity> {
        if session.identity() == &identity {
            return None;
        }
        let old = session.replace_identity(identity);
        info!("Identity changed from {} to {}", old, session.identity());
        Some(old)
    }

    #[cfg(test)]
    pub(crate) fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_armed()
    }

    fn attempt(&mut self, session: &mut SessionState, transport: &mut dyn Transport) {
        info!("Connecting as {}", session.identity());
        session.set_connection(ConnectionState::Connecting);
        transport.connect();
    }

    fn retry_or_give_up(&mut self, session: &mut SessionState) -> ConnectionStatus {
        if session.reconnect_attempts() < self.max_attempts {
            session.set_connection(ConnectionState::Reconnecting);
            self.reconnect_timer.arm(self.reconnect_delay);
            ConnectionStatus::Disconnected
        } else {
            error!(
                "Giving up after {} reconnect attempts",
                session.reconnect_attempts()
            );
            session.set_connection(ConnectionState::Disconnected);
            ConnectionStatus::PermanentlyDisconnected
        }
    }
}
