//! Ordered display messages of one session.

use crate::types::DisplayMessage;

#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<DisplayMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DisplayMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn push(&mut self, message: DisplayMessage) {
        self.messages.push(message);
    }

    /// Append `delta` to the message with `id`.
    ///
    /// Returns `None` and changes nothing when the message is gone, e.g.
    /// after the transcript was cleared while a reply was still streaming.
    pub fn append_delta(&mut self, id: &str, delta: &str) -> Option<&DisplayMessage> {
        let message = self.messages.iter_mut().rev().find(|m| m.id == id)?;
        message.content.push_str(delta);
        Some(message)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
