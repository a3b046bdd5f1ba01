use super::types::Message;

/// Ordered message sequence of one logical query (system prompt excluded;
/// the generator owns it).
///
/// Messages are never edited after being pushed. Between loop iterations the
/// generator builds the next sequence with [`ConversationHistory::extended_with`],
/// which copies, so a request already handed to the client keeps the exact
/// messages it was built from.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn add_user<S: AsRef<str>>(&mut self, content: S) -> &mut Self {
        self.messages.push(Message::user(content.as_ref()));
        self
    }

    pub fn add_assistant<S: AsRef<str>>(&mut self, content: S) -> &mut Self {
        self.messages.push(Message::assistant(content.as_ref()));
        self
    }

    /// Copy of this history with `extra` appended.
    pub fn extended_with<I: IntoIterator<Item = Message>>(&self, extra: I) -> Self {
        let mut messages = self.messages.clone();
        messages.extend(extra);
        Self { messages }
    }
}
