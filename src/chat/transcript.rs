use chrono::{DateTime, Local};
use uuid::Uuid;

pub const WELCOME_TEXT: &str = "Hi! Ask me about any homework question. \
Press Enter to send, Shift+Enter for a new line, Ctrl+T to start from the template.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// One rendered chat message. Never changes after it is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub author: Author,
    pub text: String,
    pub created_at: DateTime<Local>,
}

impl ChatMessage {
    fn new(author: Author, text: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            text,
            created_at: Local::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Author::User, text.into())
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Author::Assistant, text.into())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Welcome,
    Message(ChatMessage),
    Error(String),
}

/// Append-only log of what the user sees.
///
/// Starts with a welcome placeholder, which is dropped as soon as the first
/// real message is appended.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Default for Transcript {
    fn default() -> Self {
        Self {
            entries: vec![Entry::Welcome],
        }
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push_message(&mut self, message: ChatMessage) {
        self.entries.retain(|entry| *entry != Entry::Welcome);
        self.entries.push(Entry::Message(message));
    }

    pub fn push_error(&mut self, banner: String) {
        self.entries.push(Entry::Error(banner));
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message(message) => Some(message),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Error(banner) => Some(banner.as_str()),
            _ => None,
        })
    }
}
