//! In-memory conversation sessions.

use std::collections::HashMap;

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Exchange {
    user: String,
    assistant: String,
}

/// Keeps the last `max_history` exchanges of every session.
#[derive(Debug, Default)]
pub struct SessionManager {
    max_history: usize,
    counter: u64,
    sessions: HashMap<String, Vec<Exchange>>,
}

impl SessionManager {
    pub fn new(max_history: usize) -> Self {
        Self { max_history, counter: 0, sessions: HashMap::new() }
    }

    /// Start a session and return its id (`session_1`, `session_2`, ...).
    pub fn create_session(&mut self) -> String {
        self.counter += 1;
        let id = format!("session_{}", self.counter);
        self.sessions.insert(id.clone(), Vec::new());
        debug!(target: "rag", session = %id, "session_created");
        id
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Record one question/answer pair. Unknown ids start a new session.
    pub fn add_exchange(&mut self, session_id: &str, user: &str, assistant: &str) {
        let exchanges = self.sessions.entry(session_id.to_string()).or_default();
        exchanges.push(Exchange { user: user.to_string(), assistant: assistant.to_string() });
        if exchanges.len() > self.max_history {
            let excess = exchanges.len() - self.max_history;
            exchanges.drain(..excess);
        }
    }

    /// Prior exchanges formatted for the system prompt, or `None` if there are none.
    pub fn get_history(&self, session_id: &str) -> Option<String> {
        let exchanges = self.sessions.get(session_id).filter(|e| !e.is_empty())?;
        let lines: Vec<String> = exchanges
            .iter()
            .map(|e| format!("User: {}\nAssistant: {}", e.user, e.assistant))
            .collect();
        Some(lines.join("\n"))
    }

    pub fn clear_session(&mut self, session_id: &str) {
        if let Some(exchanges) = self.sessions.get_mut(session_id) {
            exchanges.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential() {
        let mut m = SessionManager::new(2);
        assert_eq!(m.create_session(), "session_1");
        assert_eq!(m.create_session(), "session_2");
        assert!(m.contains("session_2"));
    }

    #[test]
    fn history_keeps_latest_exchanges() {
        let mut m = SessionManager::new(2);
        let id = m.create_session();
        assert_eq!(m.get_history(&id), None);
        m.add_exchange(&id, "q1", "a1");
        m.add_exchange(&id, "q2", "a2");
        m.add_exchange(&id, "q3", "a3");
        assert_eq!(m.get_history(&id).as_deref(), Some("User: q2\nAssistant: a2\nUser: q3\nAssistant: a3"));
        m.clear_session(&id);
        assert_eq!(m.get_history(&id), None);
    }

    #[test]
    fn zero_history_keeps_nothing() {
        let mut m = SessionManager::new(0);
        m.add_exchange("s", "q", "a");
        assert_eq!(m.get_history("s"), None);
    }
}
