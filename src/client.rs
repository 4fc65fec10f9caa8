//! ChatClient Actor implementation
//!
//! The central actor that owns all client state: the session, the connection
//! state machine, typing timers, and the transport. User input, transport
//! callbacks, and timer expirations all arrive as `ClientCommand`s on one
//! mpsc channel, so every state change happens on this task.

use std::ops::ControlFlow;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::ConnectionManager;
use crate::identity::IdentityStore;
use crate::message::{ChatMessage, IncomingEvent, OutgoingEvent, UserEvent};
use crate::presence::PresenceTracker;
use crate::router::EventRouter;
use crate::session::SessionState;
use crate::sink::{ConnectionStatus, RenderSink, StatusSink};
use crate::timer::{TimerFired, TimerKind};
use crate::transport::{Transport, TransportEvent};
use crate::typing::TypingCoordinator;
use crate::types::Identity;

/// Commands processed by the ChatClient actor
#[derive(Debug)]
pub enum ClientCommand {
    /// Open the connection
    Start,
    /// Local keystroke in the message input
    Keystroke,
    /// Send a chat message
    SendMessage { content: String },
    /// Change the local display name
    Rename { name: String },
    /// Announce leaving and close the connection
    Shutdown,
    /// Lifecycle or inbound traffic from the transport
    Transport(TransportEvent),
    /// A scoped timer expired
    TimerFired(TimerFired),
}

/// The main ChatClient actor
pub struct ChatClient {
    session: SessionState,
    connection: ConnectionManager,
    router: EventRouter,
    typing: TypingCoordinator,
    presence: PresenceTracker,
    transport: Box<dyn Transport>,
    store: Box<dyn IdentityStore>,
    render: Box<dyn RenderSink>,
    status: Box<dyn StatusSink>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ClientCommand>,
}

impl ChatClient {
    /// Create a client
    ///
    /// `commands` must be the sending half of `receiver`; timers report on
    /// it. The transport should report on a clone of it as well.
    pub fn new(
        config: &ClientConfig,
        commands: mpsc::Sender<ClientCommand>,
        receiver: mpsc::Receiver<ClientCommand>,
        transport: Box<dyn Transport>,
        store: Box<dyn IdentityStore>,
        render: Box<dyn RenderSink>,
        status: Box<dyn StatusSink>,
    ) -> Self {
        let identity = store.get().map(Identity::new).unwrap_or_default();
        debug!("Starting with identity {}", identity);

        Self {
            session: SessionState::new(identity),
            connection: ConnectionManager::new(config, commands.clone()),
            router: EventRouter::new(),
            typing: TypingCoordinator::new(config, commands),
            presence: PresenceTracker::new(),
            transport,
            store,
            render,
            status,
            receiver,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Run the ChatClient event loop
    ///
    /// Processes commands until `Shutdown`. The client's own timers hold
    /// senders, so the channel never closes on its own.
    pub async fn run(mut self) {
        info!("ChatClient started");

        while let Some(cmd) = self.receiver.recv().await {
            if self.handle_command(cmd).is_break() {
                break;
            }
        }

        info!("ChatClient shutting down");
    }

    /// Process a single command
    pub fn handle_command(&mut self, cmd: ClientCommand) -> ControlFlow<()> {
        match cmd {
            ClientCommand::Start => self.handle_start(),
            ClientCommand::Keystroke => self.handle_keystroke(),
            ClientCommand::SendMessage { content } => self.handle_send_message(content),
            ClientCommand::Rename { name } => self.handle_rename(name),
            ClientCommand::Shutdown => {
                self.handle_shutdown();
                return ControlFlow::Break(());
            }
            ClientCommand::Transport(event) => self.handle_transport(event),
            ClientCommand::TimerFired(fired) => self.handle_timer(fired),
        }
        ControlFlow::Continue(())
    }

    fn handle_start(&mut self) {
        self.connection.start(&mut self.session, self.transport.as_mut());
    }

    fn handle_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.handle_connected(),
            TransportEvent::ConnectFailed(reason) => {
                self.router.connection_closed();
                if let Some(status) = self
                    .connection
                    .on_connect_failed(&mut self.session, &reason)
                {
                    self.status.status(status);
                }
            }
            TransportEvent::Disconnected(reason) => {
                self.router.connection_closed();
                if let Some(status) = self.connection.on_disconnected(&mut self.session, &reason) {
                    self.status.status(status);
                }
            }
            TransportEvent::MessageReceived {
                destination,
                payload,
            } => self.handle_incoming(&destination, &payload),
        }
    }

    /// Session established: subscribe, report, persist, announce
    fn handle_connected(&mut self) {
        if !self.connection.on_connected(&mut self.session) {
            return;
        }

        self.router.connection_closed();
        self.router.subscribe_all(&self.session, self.transport.as_mut());
        self.status.status(ConnectionStatus::Connected);
        self.persist_identity();

        let identity = self.session.identity();
        let join_message = OutgoingEvent::Message(ChatMessage::join(identity));
        let join_event = OutgoingEvent::Join(UserEvent::join(identity));
        self.publish(&join_message);
        self.publish(&join_event);
    }

    fn handle_incoming(&mut self, destination: &str, payload: &str) {
        let Some(event) = self.router.dispatch(destination, payload) else {
            return;
        };

        let local = self.session.identity();
        let record = match event {
            IncomingEvent::Message(msg) => Some(self.presence.on_message(&msg, local)),
            IncomingEvent::Typing(typing) => self.typing.on_remote(&typing, local),
            IncomingEvent::Presence(user_event) => self.presence.on_presence(&user_event, local),
        };

        if let Some(record) = record {
            self.render.append(record);
        }
    }

    fn handle_keystroke(&mut self) {
        if let Some(start) = self.typing.on_keystroke(self.session.identity()) {
            self.publish(&OutgoingEvent::Typing(start));
        }
    }

    fn handle_send_message(&mut self, content: String) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        if !self.session.is_connected() {
            debug!("Not connected, message not sent");
            return;
        }

        let message = ChatMessage::chat(self.session.identity(), content);
        self.publish(&OutgoingEvent::Message(message));

        let stop = self.typing.on_message_sent(self.session.identity());
        self.publish(&OutgoingEvent::Typing(stop));
    }

    fn handle_rename(&mut self, name: String) {
        let identity = Identity::new(name);
        let Some(old) = self.connection.set_identity(&mut self.session, identity) else {
            return;
        };
        self.persist_identity();

        if self.session.is_connected() {
            let notice = self.presence.rename_notice(&old, self.session.identity());
            self.publish(&OutgoingEvent::Message(notice));
        }
    }

    fn handle_shutdown(&mut self) {
        if self.session.is_connected() {
            let leave = OutgoingEvent::Leave(UserEvent::leave(self.session.identity()));
            self.publish(&leave);
        }

        self.connection.shutdown(&mut self.session, self.transport.as_mut());
        self.router.connection_closed();
        self.status.status(ConnectionStatus::Disconnected);
    }

    fn handle_timer(&mut self, fired: TimerFired) {
        match fired.kind {
            TimerKind::TypingIdle => {
                if let Some(stop) = self.typing.on_idle_elapsed(fired, self.session.identity()) {
                    self.publish(&OutgoingEvent::Typing(stop));
                }
            }
            TimerKind::RemoteTypingExpiry => {
                if let Some(record) = self.typing.on_remote_expired(fired) {
                    self.render.append(record);
                }
            }
            TimerKind::ReconnectDelay => {
                self.connection.on_timer(&mut self.session, fired, self.transport.as_mut());
            }
        }
    }

    fn publish(&mut self, event: &OutgoingEvent) {
        self.router.publish(&self.session, self.transport.as_mut(), event);
    }

    fn persist_identity(&mut self) {
        if let Err(e) = self.store.set(self.session.identity().as_str()) {
            warn!("Failed to persist identity: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryIdentityStore;
    use crate::session::ConnectionState;
    use crate::sink::{ChannelSink, Origin, RenderedRecord, UiUpdate};
    use crate::transport::testing::{drain, published_to, RecordingTransport, TransportCall};

    struct Harness {
        client: ChatClient,
        calls: mpsc::UnboundedReceiver<TransportCall>,
        ui: mpsc::UnboundedReceiver<UiUpdate>,
    }

    impl Harness {
        fn new(name: &str) -> Self {
            let config = ClientConfig::default();
            let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
            let (transport, calls) = RecordingTransport::new();
            let (sink, ui) = ChannelSink::new();
            let client = ChatClient::new(
                &config,
                cmd_tx,
                cmd_rx,
                Box::new(transport),
                Box::new(MemoryIdentityStore::with_identity(name)),
                Box::new(sink.clone()),
                Box::new(sink),
            );
            Self { client, calls, ui }
        }

        fn connected(name: &str) -> Self {
            let mut harness = Self::new(name);
            harness.send(ClientCommand::Start);
            harness.send(ClientCommand::Transport(TransportEvent::Connected));
            harness.calls();
            harness.ui();
            harness
        }

        fn send(&mut self, cmd: ClientCommand) {
            let _ = self.client.handle_command(cmd);
        }

        fn receive(&mut self, destination: &str, payload: &str) {
            self.send(ClientCommand::Transport(TransportEvent::MessageReceived {
                destination: destination.to_string(),
                payload: payload.to_string(),
            }));
        }

        /// Wait for the next queued command (a timer) and handle it
        async fn step(&mut self) {
            let cmd = self.client.receiver.recv().await.expect("command channel open");
            let _ = self.client.handle_command(cmd);
        }

        fn calls(&mut self) -> Vec<TransportCall> {
            drain(&mut self.calls)
        }

        fn ui(&mut self) -> Vec<UiUpdate> {
            let mut updates = Vec::new();
            while let Ok(update) = self.ui.try_recv() {
                updates.push(update);
            }
            updates
        }
    }

    #[tokio::test]
    async fn test_connect_subscribes_and_announces() {
        let mut h = Harness::new("Ana");

        h.send(ClientCommand::Start);
        assert_eq!(h.calls(), vec![TransportCall::Connect]);

        h.send(ClientCommand::Transport(TransportEvent::Connected));
        let calls = h.calls();
        assert_eq!(
            &calls[..3],
            &[
                TransportCall::Subscribe("/topic/messages".to_string()),
                TransportCall::Subscribe("/topic/typing".to_string()),
                TransportCall::Subscribe("/topic/userEvents".to_string()),
            ]
        );
        assert_eq!(
            published_to(&calls, "/app/sendMessage"),
            vec![r#"{"sender":"Ana","content":"Ana se unió al chat","type":"join"}"#.to_string()]
        );
        assert_eq!(
            published_to(&calls, "/app/userJoin"),
            vec![r#"{"sender":"Ana","type":"JOIN"}"#.to_string()]
        );
        assert_eq!(h.ui(), vec![UiUpdate::Status(ConnectionStatus::Connected)]);
        assert_eq!(h.client.store.get(), Some("Ana".to_string()));
    }

    #[tokio::test]
    async fn test_anonymous_identity_when_store_empty() {
        let config = ClientConfig::default();
        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        let (transport, _calls) = RecordingTransport::new();
        let (sink, _ui) = ChannelSink::new();
        let client = ChatClient::new(
            &config,
            cmd_tx,
            cmd_rx,
            Box::new(transport),
            Box::new(MemoryIdentityStore::new()),
            Box::new(sink.clone()),
            Box::new(sink),
        );
        assert_eq!(client.session().identity().as_str(), "Anónimo");
    }

    #[tokio::test]
    async fn test_duplicate_connected_does_not_rejoin() {
        let mut h = Harness::connected("Ana");

        h.send(ClientCommand::Start);
        h.send(ClientCommand::Transport(TransportEvent::Connected));
        assert!(h.calls().is_empty());
        assert!(h.ui().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_drop_rejoins_once() {
        let mut h = Harness::connected("Ana");

        h.send(ClientCommand::Transport(TransportEvent::Disconnected(
            "reset".to_string(),
        )));
        assert_eq!(h.ui(), vec![UiUpdate::Status(ConnectionStatus::Disconnected)]);
        assert_eq!(h.client.session().connection(), ConnectionState::Reconnecting);

        // Publishing while reconnecting is silently dropped
        h.send(ClientCommand::SendMessage {
            content: "hola".to_string(),
        });
        assert!(h.calls().is_empty());

        h.step().await;
        assert_eq!(h.calls(), vec![TransportCall::Connect]);
        assert_eq!(h.client.session().reconnect_attempts(), 1);

        h.send(ClientCommand::Transport(TransportEvent::Connected));
        let calls = h.calls();
        assert_eq!(published_to(&calls, "/app/sendMessage").len(), 1);
        assert_eq!(published_to(&calls, "/app/userJoin").len(), 1);
        assert_eq!(h.client.session().reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_reconnects_surface_permanent_status() {
        let mut h = Harness::new("Ana");
        h.send(ClientCommand::Start);

        for _ in 0..5 {
            h.send(ClientCommand::Transport(TransportEvent::ConnectFailed(
                "refused".to_string(),
            )));
            assert_eq!(h.ui(), vec![UiUpdate::Status(ConnectionStatus::Disconnected)]);
            h.step().await;
        }

        h.send(ClientCommand::Transport(TransportEvent::ConnectFailed(
            "refused".to_string(),
        )));
        assert_eq!(
            h.ui(),
            vec![UiUpdate::Status(ConnectionStatus::PermanentlyDisconnected)]
        );
        assert_eq!(h.client.session().connection(), ConnectionState::Disconnected);
        assert_eq!(h.client.session().reconnect_attempts(), 5);

        let connects = h
            .calls()
            .into_iter()
            .filter(|call| *call == TransportCall::Connect)
            .count();
        assert_eq!(connects, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_during_reconnect_delay_is_ignored() {
        let mut h = Harness::new("Ana");
        h.send(ClientCommand::Start);

        for _ in 0..20 {
            h.send(ClientCommand::Transport(TransportEvent::ConnectFailed(
                "refused".to_string(),
            )));
            if h.client.session().connection() == ConnectionState::Disconnected {
                break;
            }
            h.send(ClientCommand::Start);
            assert_eq!(h.client.session().connection(), ConnectionState::Reconnecting);
            h.step().await;
        }

        assert_eq!(h.client.session().reconnect_attempts(), 5);
        assert_eq!(
            h.ui().last(),
            Some(&UiUpdate::Status(ConnectionStatus::PermanentlyDisconnected))
        );
        let connects = h
            .calls()
            .into_iter()
            .filter(|call| *call == TransportCall::Connect)
            .count();
        assert_eq!(connects, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_session_gives_up_after_retries() {
        let mut h = Harness::connected("Ana");

        h.send(ClientCommand::Transport(TransportEvent::Disconnected(
            "reset".to_string(),
        )));
        for attempt in 1..=5 {
            h.step().await;
            assert_eq!(h.client.session().connection(), ConnectionState::Connecting);
            assert_eq!(h.client.session().reconnect_attempts(), attempt);
            h.send(ClientCommand::Transport(TransportEvent::ConnectFailed(
                "refused".to_string(),
            )));
        }

        let mut statuses = vec![UiUpdate::Status(ConnectionStatus::Disconnected); 5];
        statuses.push(UiUpdate::Status(ConnectionStatus::PermanentlyDisconnected));
        assert_eq!(h.ui(), statuses);
        assert_eq!(h.client.session().connection(), ConnectionState::Disconnected);
        assert_eq!(h.calls(), vec![TransportCall::Connect; 5]);
    }

    #[tokio::test]
    async fn test_chat_tagged_self_and_received() {
        let mut ana = Harness::connected("Ana");
        let mut bob = Harness::connected("Bob");

        ana.send(ClientCommand::SendMessage {
            content: "  hi ".to_string(),
        });
        let calls = ana.calls();
        let sent = published_to(&calls, "/app/sendMessage");
        assert_eq!(
            sent,
            vec![r#"{"sender":"Ana","content":"hi","type":"chat"}"#.to_string()]
        );
        assert_eq!(
            published_to(&calls, "/app/typing"),
            vec![r#"{"sender":"Ana","typing":false,"type":"TYPING"}"#.to_string()]
        );

        // Broker fans the message out to both clients
        ana.receive("/topic/messages", &sent[0]);
        bob.receive("/topic/messages", &sent[0]);

        assert_eq!(
            ana.ui(),
            vec![UiUpdate::Record(RenderedRecord::Chat {
                sender: "Ana".to_string(),
                content: "hi".to_string(),
                origin: Origin::SelfSent,
            })]
        );
        assert_eq!(
            bob.ui(),
            vec![UiUpdate::Record(RenderedRecord::Chat {
                sender: "Ana".to_string(),
                content: "hi".to_string(),
                origin: Origin::Received,
            })]
        );
    }

    #[tokio::test]
    async fn test_blank_message_not_sent() {
        let mut h = Harness::connected("Ana");
        h.send(ClientCommand::SendMessage {
            content: "   ".to_string(),
        });
        assert!(h.calls().is_empty());
    }

    #[tokio::test]
    async fn test_presence_join_notice() {
        let mut h = Harness::connected("Ana");

        h.receive("/topic/userEvents", r#"{"sender":"Bob","type":"JOIN"}"#);
        assert_eq!(
            h.ui(),
            vec![UiUpdate::Record(RenderedRecord::Notice(
                "Bob se unió al chat".to_string()
            ))]
        );

        h.receive("/topic/userEvents", r#"{"sender":"Ana","type":"JOIN"}"#);
        assert!(h.ui().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payloads_do_not_stop_dispatch() {
        let mut h = Harness::connected("Ana");

        h.receive("/topic/messages", r#"{"sender":"Bob","type":"chat"}"#);
        h.receive("/topic/typing", r#"{"typing":true}"#);
        h.receive("/topic/userEvents", r#"{"sender":"Bob","type":"WAVE"}"#);
        h.receive("/topic/userEvents", "");
        assert!(h.ui().is_empty());

        h.receive(
            "/topic/messages",
            r#"{"sender":"Bob","content":"ok","type":"chat"}"#,
        );
        h.receive("/topic/typing", r#"{"sender":"Bob","typing":true,"type":"TYPING"}"#);
        h.receive("/topic/userEvents", r#"{"sender":"Bob","type":"LEAVE"}"#);

        assert_eq!(
            h.ui(),
            vec![
                UiUpdate::Record(RenderedRecord::Chat {
                    sender: "Bob".to_string(),
                    content: "ok".to_string(),
                    origin: Origin::Received,
                }),
                UiUpdate::Record(RenderedRecord::TypingShown(
                    "Bob está escribiendo...".to_string()
                )),
                UiUpdate::Record(RenderedRecord::Notice("Bob se desconectó".to_string())),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystroke_burst_through_client() {
        let mut h = Harness::connected("Ana");

        for _ in 0..5 {
            h.send(ClientCommand::Keystroke);
            tokio::time::advance(std::time::Duration::from_millis(100)).await;
        }
        assert_eq!(
            published_to(&h.calls(), "/app/typing"),
            vec![r#"{"sender":"Ana","typing":true,"type":"TYPING"}"#.to_string()]
        );

        h.step().await;
        assert_eq!(
            published_to(&h.calls(), "/app/typing"),
            vec![r#"{"sender":"Ana","typing":false,"type":"TYPING"}"#.to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_typing_expires() {
        let mut h = Harness::connected("Ana");

        h.receive("/topic/typing", r#"{"sender":"Bob","typing":true,"type":"TYPING"}"#);
        h.receive("/topic/typing", r#"{"sender":"Ana","typing":true,"type":"TYPING"}"#);
        assert_eq!(
            h.ui(),
            vec![UiUpdate::Record(RenderedRecord::TypingShown(
                "Bob está escribiendo...".to_string()
            ))]
        );

        h.step().await;
        assert_eq!(h.ui(), vec![UiUpdate::Record(RenderedRecord::TypingHidden)]);
    }

    #[tokio::test]
    async fn test_rename_while_connected() {
        let mut h = Harness::connected("Ana");

        h.send(ClientCommand::Rename {
            name: "Anita".to_string(),
        });
        assert_eq!(
            published_to(&h.calls(), "/app/sendMessage"),
            vec![r#"{"sender":"Sistema","content":"Ana ahora es Anita","type":"change"}"#.to_string()]
        );
        assert_eq!(h.client.session().identity().as_str(), "Anita");
        assert_eq!(h.client.store.get(), Some("Anita".to_string()));

        // Same name again is not a rename
        h.send(ClientCommand::Rename {
            name: "Anita".to_string(),
        });
        assert!(h.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rename_while_disconnected_only_persists() {
        let mut h = Harness::new("Ana");

        h.send(ClientCommand::Rename {
            name: "Anita".to_string(),
        });
        assert!(h.calls().is_empty());
        assert_eq!(h.client.store.get(), Some("Anita".to_string()));

        h.send(ClientCommand::Start);
        h.send(ClientCommand::Transport(TransportEvent::Connected));
        assert_eq!(
            published_to(&h.calls(), "/app/userJoin"),
            vec![r#"{"sender":"Anita","type":"JOIN"}"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_shutdown_announces_leave() {
        let mut h = Harness::connected("Ana");

        assert!(h.client.handle_command(ClientCommand::Shutdown).is_break());
        let calls = h.calls();
        assert_eq!(
            published_to(&calls, "/app/userEvent"),
            vec![r#"{"sender":"Ana","type":"LEAVE"}"#.to_string()]
        );
        assert_eq!(calls.last(), Some(&TransportCall::Disconnect));
        assert_eq!(h.ui(), vec![UiUpdate::Status(ConnectionStatus::Disconnected)]);
        assert_eq!(h.client.session().connection(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_shutdown_while_disconnected_sends_nothing() {
        let mut h = Harness::new("Ana");
        assert!(h.client.handle_command(ClientCommand::Shutdown).is_break());
        assert!(h.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let h = Harness::connected("Ana");
        let Harness { client, mut calls, .. } = h;

        let (tx, rx) = mpsc::channel(8);
        let client = ChatClient { receiver: rx, ..client };
        tx.send(ClientCommand::Shutdown).await.unwrap();

        client.run().await;
        assert_eq!(drain(&mut calls).last(), Some(&TransportCall::Disconnect));
    }
}
