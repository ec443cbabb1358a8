//! # Transcript
//!
//! The append-only conversation shown to the learner.
//!
//! Messages live behind an `Arc`. Every mutation goes through
//! [`Arc::make_mut`], so a renderer holding a [`Transcript::snapshot`] keeps
//! seeing a consistent, whole structure while the reducer moves on.

use std::sync::Arc;

use crate::api::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    /// Visible text. For assistant messages this is the revealed prefix of
    /// the answer, not everything received so far.
    pub content: String,
    /// Citations, attached once the answer has finished animating.
    pub sources: Vec<Source>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// An empty assistant message, filled in as the answer is revealed.
    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Arc<Vec<Message>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cheap, immutable view of the current messages.
    pub fn snapshot(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.messages)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message and return its index.
    pub fn push(&mut self, message: Message) -> usize {
        let messages = Arc::make_mut(&mut self.messages);
        messages.push(message);
        messages.len() - 1
    }

    /// Apply `f` to the message at `index`. Returns `false` if out of range.
    pub fn update(&mut self, index: usize, f: impl FnOnce(&mut Message)) -> bool {
        if index >= self.messages.len() {
            return false;
        }
        f(&mut Arc::make_mut(&mut self.messages)[index]);
        true
    }
}
