use bytesmith_core::ConsoleEvent;

/// Turns console events into text for a line-mode terminal.
///
/// The terminal already echoed the user's Enter, so the line break the
/// session appends on submit is dropped once.
#[derive(Debug)]
pub struct TerminalRenderer {
    prompt: String,
    swallow_newline: bool,
}

impl TerminalRenderer {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            swallow_newline: false,
        }
    }

    pub fn line_submitted(&mut self) {
        self.swallow_newline = true;
    }

    pub fn render(&mut self, event: &ConsoleEvent) -> Option<String> {
        match event {
            ConsoleEvent::Append(text) => {
                if self.swallow_newline && text == "\n" {
                    self.swallow_newline = false;
                    return None;
                }
                Some(text.clone())
            }
            ConsoleEvent::PromptOpened => Some(self.prompt.clone()),
            ConsoleEvent::Cleared => Some("\n".to_string()),
            ConsoleEvent::Status(status) => {
                tracing::debug!(status = status.label(), "Status changed");
                None
            }
        }
    }
}
