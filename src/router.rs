//! Event routing between the transport and the client components
//!
//! Outbound events are serialized and published only while connected;
//! inbound payloads are decoded per topic into `IncomingEvent`s. A payload
//! that does not decode is logged and dropped.

use tracing::{debug, warn};

use crate::error::AppError;
use crate::message::{IncomingEvent, OutgoingEvent};
use crate::session::SessionState;
use crate::transport::Transport;
use crate::types::Topic;

#[derive(Debug, Default)]
pub struct EventRouter {
    subscribed: bool,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every topic for the current connection
    ///
    /// Repeated calls on the same connection are no-ops.
    pub fn subscribe_all(&mut self, session: &SessionState, transport: &mut dyn Transport) {
        if !session.is_connected() {
            debug!("Not connected, deferring subscriptions");
            return;
        }
        if self.subscribed {
            return;
        }

        for topic in Topic::ALL {
            debug!("Subscribing to {}", topic);
            transport.subscribe(topic.destination());
        }
        self.subscribed = true;
    }

    /// Forget subscriptions; the next connection must subscribe again
    pub fn connection_closed(&mut self) {
        self.subscribed = false;
    }

    #[cfg(test)]
    pub(crate) fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Publish if connected, otherwise drop (never queued or retried)
    pub fn publish(
        &self,
        session: &SessionState,
        transport: &mut dyn Transport,
        event: &OutgoingEvent,
    ) -> bool {
        if !session.is_connected() {
            debug!(
                "Not connected ({}), dropping {:?}",
                session.connection(),
                event.destination()
            );
            return false;
        }

        match event.to_json() {
            Ok(payload) => {
                transport.publish(event.destination().as_str(), payload);
                true
            }
            Err(e) => {
                warn!("Failed to serialize outgoing event: {}", e);
                false
            }
        }
    }

    /// Decode an inbound payload
    pub fn dispatch(&self, destination: &str, payload: &str) -> Option<IncomingEvent> {
        match self.decode(destination, payload) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!("Dropping payload on {}: {}", destination, e);
                None
            }
        }
    }

    fn decode(&self, destination: &str, payload: &str) -> Result<IncomingEvent, AppError> {
        let topic = Topic::from_destination(destination)
            .ok_or_else(|| AppError::UnknownDestination(destination.to_string()))?;
        IncomingEvent::decode(topic, payload)
    }
}
