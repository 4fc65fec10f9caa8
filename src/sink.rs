//! UI-facing sinks
//!
//! The client never renders anything itself. It appends `RenderedRecord`s to
//! a `RenderSink` and reports connection status to a `StatusSink`.

use tokio::sync::mpsc;

/// Who sent a chat line, relative to the local user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    SelfSent,
    Received,
}

/// A record appended to the render sink, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedRecord {
    /// Ordinary chat content
    Chat {
        sender: String,
        content: String,
        origin: Origin,
    },
    /// Join, leave, or rename notice
    Notice(String),
    /// Remote typing indicator shown with its text
    TypingShown(String),
    TypingHidden,
}

/// Connection status for the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    /// Reconnect attempts exhausted; no further automatic recovery
    PermanentlyDisconnected,
}

pub trait RenderSink: Send {
    fn append(&mut self, record: RenderedRecord);
}

pub trait StatusSink: Send {
    fn status(&mut self, status: ConnectionStatus);
}

/// Everything a `ChannelSink` forwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    Record(RenderedRecord),
    Status(ConnectionStatus),
}

/// Sink forwarding records and status onto one unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<UiUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl RenderSink for ChannelSink {
    fn append(&mut self, record: RenderedRecord) {
        // A closed UI just stops receiving
        let _ = self.sender.send(UiUpdate::Record(record));
    }
}

impl StatusSink for ChannelSink {
    fn status(&mut self, status: ConnectionStatus) {
        let _ = self.sender.send(UiUpdate::Status(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_preserves_order() {
        let (mut sink, mut rx) = ChannelSink::new();

        sink.status(ConnectionStatus::Connected);
        sink.append(RenderedRecord::Notice("Bob se unió al chat".to_string()));
        sink.append(RenderedRecord::TypingHidden);

        assert_eq!(rx.try_recv().unwrap(), UiUpdate::Status(ConnectionStatus::Connected));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiUpdate::Record(RenderedRecord::Notice("Bob se unió al chat".to_string()))
        );
        assert_eq!(rx.try_recv().unwrap(), UiUpdate::Record(RenderedRecord::TypingHidden));
    }
}
