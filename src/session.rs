//! Per-process conversation state.

use tokio::sync::RwLock;

/// Role of a message in the agent conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One remembered chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// The video the user is currently talking about plus recent chat history.
///
/// Shared between HTTP handlers, so all access goes through async locks.
pub struct Session {
    current_video: RwLock<Option<String>>,
    history: RwLock<Vec<ChatTurn>>,
    max_history: usize,
}

impl Session {
    pub fn new(max_history: usize) -> Self {
        Self {
            current_video: RwLock::new(None),
            history: RwLock::new(Vec::new()),
            max_history,
        }
    }

    pub async fn current_video(&self) -> Option<String> {
        self.current_video.read().await.clone()
    }

    pub async fn set_current_video(&self, youtube_id: &str) {
        *self.current_video.write().await = Some(youtube_id.to_string());
    }

    /// The last `max_history` turns, oldest first.
    pub async fn recent_history(&self) -> Vec<ChatTurn> {
        let history = self.history.read().await;
        let start = history.len().saturating_sub(self.max_history);
        history[start..].to_vec()
    }

    /// Append a completed user/assistant exchange and drop the oldest turns.
    pub async fn record_exchange(&self, user: &str, assistant: &str) {
        let mut history = self.history.write().await;
        history.push(ChatTurn {
            role: Role::User,
            content: user.to_string(),
        });
        history.push(ChatTurn {
            role: Role::Assistant,
            content: assistant.to_string(),
        });
        let excess = history.len().saturating_sub(self.max_history);
        history.drain(..excess);
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_video() {
        let session = Session::new(12);
        assert!(session.current_video().await.is_none());
        session.set_current_video("abc").await;
        assert_eq!(session.current_video().await.as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let session = Session::new(4);
        for i in 0..5 {
            session.record_exchange(&format!("q{i}"), &format!("a{i}")).await;
        }
        let history = session.recent_history().await;
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q3");
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[3].content, "a4");

        session.clear_history().await;
        assert!(session.recent_history().await.is_empty());
    }
}
