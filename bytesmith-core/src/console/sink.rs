use crate::{ConsoleEvent, SessionStatus};
use tokio::sync::mpsc;

/// Producer side of the console update queue.
///
/// Reader tasks, the exit waiter and the session all publish through clones
/// of this; only the [`Console`](super::Console) that owns the receiver
/// mutates the buffer. Sends never block and are dropped silently once the
/// UI side is gone.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    tx: mpsc::UnboundedSender<ConsoleEvent>,
}

impl ConsoleSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConsoleEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn append(&self, text: impl Into<String>) {
        let _ = self.tx.send(ConsoleEvent::Append(text.into()));
    }

    /// Append `text` followed by a newline.
    pub fn line(&self, text: &str) {
        let mut s = String::with_capacity(text.len() + 1);
        s.push_str(text);
        s.push('\n');
        self.append(s);
    }

    pub fn open_prompt(&self) {
        let _ = self.tx.send(ConsoleEvent::PromptOpened);
    }

    pub fn clear(&self) {
        let _ = self.tx.send(ConsoleEvent::Cleared);
    }

    pub fn status(&self, status: SessionStatus) {
        let _ = self.tx.send(ConsoleEvent::Status(status));
    }
}
