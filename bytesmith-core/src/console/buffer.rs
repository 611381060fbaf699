//! The console text surface.
//!
//! One string split by the prompt boundary:
//! - `[0, prompt_position)` is emitted history. It only ever grows at its end.
//! - `[prompt_position, len)` is the pending-input region the user edits.
//!
//! Positions are byte offsets and always sit on char boundaries. The cursor
//! never leaves the pending region.

use crate::ConsoleEvent;

pub const DEFAULT_PROMPT: &str = "> ";

/// A user edit against the pending-input region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleEdit {
    Insert(String),
    Backspace,
    Delete,
    MoveLeft,
    MoveRight,
    Home,
    End,
    MoveTo(usize),
}

#[derive(Debug, Clone)]
pub struct ConsoleBuffer {
    text: String,
    prompt_position: usize,
    cursor: usize,
    prompt: String,
}

impl Default for ConsoleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}

impl ConsoleBuffer {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            prompt_position: 0,
            cursor: 0,
            prompt: prompt.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn prompt_position(&self) -> usize {
        self.prompt_position
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Immutable emitted text before the prompt boundary.
    pub fn history(&self) -> &str {
        &self.text[..self.prompt_position]
    }

    /// Pending region exactly as typed.
    pub fn pending_raw(&self) -> &str {
        &self.text[self.prompt_position..]
    }

    /// What a submit would send: the pending region, trimmed.
    pub fn pending_input(&self) -> String {
        self.pending_raw().trim().to_string()
    }

    /// Append at the end and move the boundary (and cursor) past it.
    ///
    /// Anything typed but not yet submitted becomes history.
    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
        self.prompt_position = self.text.len();
        self.cursor = self.prompt_position;
    }

    pub fn open_prompt(&mut self) {
        let prompt = std::mem::take(&mut self.prompt);
        self.append(&prompt);
        self.prompt = prompt;
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.prompt_position = 0;
        self.cursor = 0;
    }

    /// Apply a queued update. Status changes leave the text alone.
    pub fn apply(&mut self, event: &ConsoleEvent) {
        match event {
            ConsoleEvent::Append(text) => self.append(text),
            ConsoleEvent::PromptOpened => self.open_prompt(),
            ConsoleEvent::Cleared => self.clear(),
            ConsoleEvent::Status(_) => {}
        }
    }

    /// Apply a user edit. Returns `false` when the edit was refused because it
    /// would touch history (or had nothing to act on).
    pub fn apply_edit(&mut self, edit: ConsoleEdit) -> bool {
        match edit {
            ConsoleEdit::Insert(s) => {
                if s.is_empty() {
                    return false;
                }
                self.text.insert_str(self.cursor, &s);
                self.cursor += s.len();
                true
            }
            ConsoleEdit::Backspace => match self.prev_boundary() {
                Some(start) => {
                    self.text.replace_range(start..self.cursor, "");
                    self.cursor = start;
                    true
                }
                None => false,
            },
            ConsoleEdit::Delete => match self.next_boundary() {
                Some(end) => {
                    self.text.replace_range(self.cursor..end, "");
                    true
                }
                None => false,
            },
            ConsoleEdit::MoveLeft => match self.prev_boundary() {
                Some(pos) => {
                    self.cursor = pos;
                    true
                }
                None => false,
            },
            ConsoleEdit::MoveRight => match self.next_boundary() {
                Some(pos) => {
                    self.cursor = pos;
                    true
                }
                None => false,
            },
            ConsoleEdit::Home => {
                self.cursor = self.prompt_position;
                true
            }
            ConsoleEdit::End => {
                self.cursor = self.text.len();
                true
            }
            ConsoleEdit::MoveTo(pos) => {
                if pos < self.prompt_position {
                    // Clicking into history snaps the caret back to the end.
                    self.cursor = self.text.len();
                    return false;
                }
                if pos > self.text.len() || !self.text.is_char_boundary(pos) {
                    return false;
                }
                self.cursor = pos;
                true
            }
        }
    }

    /// Start of the char before the cursor, if it is still in the pending region.
    fn prev_boundary(&self) -> Option<usize> {
        if self.cursor <= self.prompt_position {
            return None;
        }
        self.text[..self.cursor].char_indices().next_back().map(|(i, _)| i)
    }

    /// End of the char after the cursor, if there is one.
    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }
}
