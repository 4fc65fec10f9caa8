//! Presence-aware chat client library
//!
//! Keeps one logical connection to a STOMP pub/sub broker and exchanges
//! chat messages, typing indicators, and presence events over three topics.
//!
//! # Features
//! - Connection state machine with fixed-interval reconnect and a hard cap
//! - Subscription to the messages, typing, and user-event topics
//! - Debounced local typing indicator, expiring remote typing indicator
//! - Join/leave/rename system notices with own-echo suppression
//! - Identity persisted across sessions
//!
//! # Architecture
//! Uses the Actor pattern with an `mpsc` channel:
//! - `ChatClient` is the single actor owning all state
//! - Transport callbacks, user input, and timer expirations arrive as
//!   `ClientCommand`s on its channel
//! - No locks needed - every state change happens on the actor task
//!
//! # Example
//! ```ignore
//! use tokio::sync::mpsc;
//! use presence_chat::{
//!     ChannelSink, ChatClient, ClientCommand, ClientConfig, MemoryIdentityStore, StompTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::default();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
//!     let transport = StompTransport::new(config.url.clone(), cmd_tx.clone());
//!     let (sink, mut ui) = ChannelSink::new();
//!
//!     let client = ChatClient::new(
//!         &config,
//!         cmd_tx.clone(),
//!         cmd_rx,
//!         Box::new(transport),
//!         Box::new(MemoryIdentityStore::with_identity("Ana")),
//!         Box::new(sink.clone()),
//!         Box::new(sink),
//!     );
//!     tokio::spawn(client.run());
//!
//!     cmd_tx.send(ClientCommand::Start).await.unwrap();
//!     while let Some(update) = ui.recv().await {
//!         println!("{:?}", update);
//!     }
//! }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod identity;
pub mod message;
pub mod presence;
pub mod router;
pub mod session;
pub mod sink;
pub mod stomp;
pub mod timer;
pub mod transport;
pub mod typing;
pub mod types;

// Re-export main types for convenience
pub use client::{ChatClient, ClientCommand};
pub use config::ClientConfig;
pub use connection::ConnectionManager;
pub use error::AppError;
pub use identity::{FileIdentityStore, IdentityStore, MemoryIdentityStore};
pub use message::{ChatMessage, IncomingEvent, OutgoingEvent, TypingEvent, UserEvent};
pub use presence::PresenceTracker;
pub use router::EventRouter;
pub use session::{ConnectionState, SessionState};
pub use sink::{
    ChannelSink, ConnectionStatus, Origin, RenderSink, RenderedRecord, StatusSink, UiUpdate,
};
pub use stomp::StompTransport;
pub use transport::{Transport, TransportEvent};
pub use typing::TypingCoordinator;
pub use types::{Destination, Identity, Topic};
