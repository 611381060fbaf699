//! Console surface + the single apply point for queued updates.
//!
//! Background tasks never touch the buffer. They publish [`ConsoleEvent`]s
//! through a [`ConsoleSink`]; the UI thread owns the [`Console`] and applies
//! them in order, so the prompt boundary is only ever moved by one writer.

mod buffer;
mod sink;

pub use buffer::{ConsoleBuffer, ConsoleEdit, DEFAULT_PROMPT};
pub use sink::ConsoleSink;

use crate::error::Result;
use crate::session::Session;
use crate::{ConsoleEvent, SessionStatus};
use tokio::sync::mpsc;

#[derive(Debug)]
pub struct Console {
    buffer: ConsoleBuffer,
    events: mpsc::UnboundedReceiver<ConsoleEvent>,
    status: SessionStatus,
}

impl Console {
    pub fn new(buffer: ConsoleBuffer, events: mpsc::UnboundedReceiver<ConsoleEvent>) -> Self {
        Self {
            buffer,
            events,
            status: SessionStatus::Idle,
        }
    }

    pub fn buffer(&self) -> &ConsoleBuffer {
        &self.buffer
    }

    /// Last status reported by the session.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// A user edit. Refused edits leave the buffer untouched.
    pub fn edit(&mut self, edit: ConsoleEdit) -> bool {
        self.buffer.apply_edit(edit)
    }

    /// Apply everything queued right now without waiting.
    ///
    /// Returns the applied events so the caller can render them.
    pub fn pump(&mut self) -> Vec<ConsoleEvent> {
        let mut applied = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            self.apply(&event);
            applied.push(event);
        }
        applied
    }

    /// Wait for the next update and apply it. `None` once every producer is gone.
    pub async fn next_event(&mut self) -> Option<ConsoleEvent> {
        let event = self.events.recv().await?;
        self.apply(&event);
        Some(event)
    }

    /// Enter pressed: relay the pending-input region to the running process.
    ///
    /// The session queues the line break, the write outcome and a fresh
    /// prompt; they show up on the next [`pump`](Self::pump).
    pub fn submit(&mut self, session: &Session) -> Result<()> {
        let line = self.buffer.pending_input();
        session.submit_line(&line)
    }

    fn apply(&mut self, event: &ConsoleEvent) {
        if let ConsoleEvent::Status(status) = event {
            self.status = *status;
        }
        self.buffer.apply(event);
    }
}
