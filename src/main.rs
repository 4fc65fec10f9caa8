//! Presence-aware chat client - Entry Point
//!
//! Connects to the broker, then reads lines from stdin:
//! - `/nick NAME` changes the display name
//! - `/typing` signals a keystroke without sending
//! - `/quit` announces leaving and exits
//! - anything else is sent as a chat message

use std::env;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use presence_chat::config::DEFAULT_URL;
use presence_chat::{
    ChannelSink, ChatClient, ClientCommand, ClientConfig, ConnectionStatus, FileIdentityStore,
    Origin, RenderedRecord, StompTransport, UiUpdate,
};

/// Grace period for the DISCONNECT frame to flush on exit
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=presence_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("presence_chat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Get broker URL from command line or use default
    let url = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let mut config = ClientConfig::new(url);
    if let Ok(path) = env::var("CHAT_IDENTITY_FILE") {
        config = config.with_identity_file(path);
    }

    // Create ChatClient actor channel and start
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_capacity);
    let transport = StompTransport::new(config.url.clone(), cmd_tx.clone());
    let store = FileIdentityStore::new(&config.identity_file);
    let (sink, mut ui_rx) = ChannelSink::new();

    let client = ChatClient::new(
        &config,
        cmd_tx.clone(),
        cmd_rx,
        Box::new(transport),
        Box::new(store),
        Box::new(sink.clone()),
        Box::new(sink),
    );
    info!(
        "Chatting as {} via {}",
        client.session().identity(),
        config.url
    );
    let client_task = tokio::spawn(client.run());

    // Terminal renderer
    tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            render(update);
        }
    });

    cmd_tx.send(ClientCommand::Start).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let cmd = match line.trim() {
                    "/quit" => break,
                    "/typing" => ClientCommand::Keystroke,
                    input => match input.strip_prefix("/nick ") {
                        Some(name) => ClientCommand::Rename {
                            name: name.to_string(),
                        },
                        None => ClientCommand::SendMessage {
                            content: input.to_string(),
                        },
                    },
                };
                if cmd_tx.send(cmd).await.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    let _ = cmd_tx.send(ClientCommand::Shutdown).await;
    let _ = client_task.await;
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    Ok(())
}

fn render(update: UiUpdate) {
    match update {
        UiUpdate::Status(ConnectionStatus::Connected) => println!("[Conectado]"),
        UiUpdate::Status(ConnectionStatus::Disconnected) => println!("[Desconectado]"),
        UiUpdate::Status(ConnectionStatus::PermanentlyDisconnected) => {
            println!("[Desconectado: sin más intentos de reconexión]")
        }
        UiUpdate::Record(RenderedRecord::Chat {
            content,
            origin: Origin::SelfSent,
            ..
        }) => println!("{:>40}", content),
        UiUpdate::Record(RenderedRecord::Chat {
            sender,
            content,
            origin: Origin::Received,
        }) => println!("{}: {}", sender, content),
        UiUpdate::Record(RenderedRecord::Notice(text)) => println!("  * {}", text),
        UiUpdate::Record(RenderedRecord::TypingShown(text)) => println!("  ({})", text),
        UiUpdate::Record(RenderedRecord::TypingHidden) => {}
    }
}
