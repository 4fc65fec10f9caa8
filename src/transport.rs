//! Transport abstraction
//!
//! The client drives the broker connection through the `Transport` trait.
//! Every method is fire-and-forget; outcomes come back later as
//! `TransportEvent`s on the client command channel.

/// Lifecycle and inbound traffic reported by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Session established with the broker
    Connected,
    /// Connect attempt failed (rejected or unreachable, not distinguished)
    ConnectFailed(String),
    /// Established session dropped
    Disconnected(String),
    /// Payload received on a subscribed destination
    MessageReceived { destination: String, payload: String },
}

/// Opaque pub/sub channel to the broker
pub trait Transport: Send {
    /// Begin a connection attempt
    fn connect(&mut self);

    fn subscribe(&mut self, destination: &str);

    fn publish(&mut self, destination: &str, payload: String);

    /// Close the session; no further events are reported for it
    fn disconnect(&mut self);
}
