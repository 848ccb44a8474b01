use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use crate::llm::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

/// In-process message log for one feature. Append-only; can only be cleared
/// as a whole.
#[derive(Debug, Default)]
pub struct ConversationMemory {
    messages: Mutex<Vec<(Role, String)>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Role, String)>> {
        self.messages.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, role: Role, content: impl Into<String>) {
        self.lock().push((role, content.into()));
    }

    /// Record a human turn and its reply together.
    pub fn push_exchange(&self, human: impl Into<String>, assistant: impl Into<String>) {
        let mut messages = self.lock();
        messages.push((Role::Human, human.into()));
        messages.push((Role::Assistant, assistant.into()));
    }

    pub fn messages(&self) -> Vec<(Role, String)> {
        self.lock().clone()
    }

    /// History in the shape chat-completion APIs expect.
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.lock()
            .iter()
            .map(|(role, content)| match role {
                Role::Human => ChatMessage::user(content.clone()),
                Role::Assistant => ChatMessage::assistant(content.clone()),
            })
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// One memory per feature.
#[derive(Debug, Default)]
pub struct Memories {
    pub chat: ConversationMemory,
    pub rag: ConversationMemory,
    pub agent: ConversationMemory,
}
