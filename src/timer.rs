//! Scoped one-shot timers
//!
//! Each `Timer` is owned by exactly one component. Arming always cancels the
//! previous schedule first, and cancelling bumps a generation counter so a
//! firing that was already queued on the command channel is recognised as
//! stale and ignored.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use crate::client::ClientCommand;

/// Which timer fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Local keystroke idle window
    TypingIdle,
    /// Remote typing indicator expiry
    RemoteTypingExpiry,
    /// Fixed delay before a reconnect attempt
    ReconnectDelay,
}

/// Timer expiration delivered to the client actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

/// A cancellable one-shot timer feeding the client command channel
#[derive(Debug)]
pub struct Timer {
    kind: TimerKind,
    commands: mpsc::Sender<ClientCommand>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new(kind: TimerKind, commands: mpsc::Sender<ClientCommand>) -> Self {
        Self {
            kind,
            commands,
            generation: 0,
            task: None,
        }
    }

    /// Cancel any pending firing, then schedule a new one `after` from now
    ///
    /// The deadline is fixed here, not when the spawned task first runs.
    pub fn arm(&mut self, after: Duration) {
        self.cancel();

        let fired = TimerFired {
            kind: self.kind,
            generation: self.generation,
        };
        let deadline = Instant::now() + after;
        let commands = self.commands.clone();
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if commands.send(ClientCommand::TimerFired(fired)).await.is_err() {
                debug!("Client closed, dropping {:?} expiration", fired.kind);
            }
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
    }

    /// Accept an expiration, returning false when it is stale
    pub fn fire(&mut self, fired: TimerFired) -> bool {
        if fired.kind != self.kind || fired.generation != self.generation || self.task.is_none() {
            return false;
        }
        self.task = None;
        self.generation = self.generation.wrapping_add(1);
        true
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::time::Duration;

    use tokio::time::Instant;

    /// Paused-clock elapsed check, allowing the timer wheel's 1ms rounding
    #[track_caller]
    pub fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(1),
            "elapsed {:?}, expected {:?}",
            elapsed,
            expected
        );
    }
}
