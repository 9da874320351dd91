//! Per-video conversation memory.
//!
//! Every exchange is recorded twice: in the log of the video it was about
//! and in a global log spanning all videos. Memory lives for the lifetime of
//! the process.

use crate::video::VideoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Assistant => write!(f, "Assistant"),
        }
    }
}

/// A single remembered message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub video_id: VideoId,
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(video_id: VideoId, role: Role, content: impl Into<String>) -> Self {
        Self {
            video_id,
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

/// Process-lifetime conversation store.
#[derive(Default)]
pub struct ConversationMemory {
    by_video: RwLock<HashMap<VideoId, Vec<ChatMessage>>>,
    global: RwLock<Vec<ChatMessage>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one question and its answer.
    pub fn append_exchange(&self, video_id: &VideoId, question: &str, answer: &str) {
        let messages = [
            ChatMessage::new(video_id.clone(), Role::User, question),
            ChatMessage::new(video_id.clone(), Role::Assistant, answer),
        ];

        self.by_video
            .write()
            .unwrap()
            .entry(video_id.clone())
            .or_default()
            .extend(messages.iter().cloned());
        self.global.write().unwrap().extend(messages);
    }

    /// Messages about one video, oldest first.
    pub fn history(&self, video_id: &VideoId) -> Vec<ChatMessage> {
        self.by_video
            .read()
            .unwrap()
            .get(video_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Messages about every video, oldest first.
    pub fn global_history(&self) -> Vec<ChatMessage> {
        self.global.read().unwrap().clone()
    }

    /// The last `n` messages about one video.
    pub fn recent_window(&self, video_id: &VideoId, n: usize) -> Vec<ChatMessage> {
        let by_video = self.by_video.read().unwrap();
        match by_video.get(video_id) {
            Some(messages) => messages[messages.len().saturating_sub(n)..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Clear one video's log, or every per-video log when `video_id` is `None`.
    /// The global log is untouched.
    pub fn clear(&self, video_id: Option<&VideoId>) {
        let mut by_video = self.by_video.write().unwrap();
        match video_id {
            Some(id) => {
                by_video.remove(id);
            }
            None => by_video.clear(),
        }
    }

    pub fn clear_global(&self) {
        self.global.write().unwrap().clear();
    }

    /// Message count per video.
    pub fn all_memories(&self) -> BTreeMap<VideoId, usize> {
        self.by_video
            .read()
            .unwrap()
            .iter()
            .map(|(id, messages)| (id.clone(), messages.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vid(id: &str) -> VideoId {
        VideoId::parse(id).unwrap()
    }

    #[test]
    fn test_append_records_both_logs() {
        let memory = ConversationMemory::new();
        let a = vid("dQw4w9WgXcQ");

        memory.append_exchange(&a, "What is it?", "A song.");

        let history = memory.history(&a);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[0].content, "What is it?");
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(memory.global_history().len(), 2);
    }

    #[test]
    fn test_isolation_between_videos() {
        let memory = ConversationMemory::new();
        let a = vid("dQw4w9WgXcQ");
        let b = vid("jNQXAC9IVRw");

        memory.append_exchange(&a, "qa", "aa");
        memory.append_exchange(&b, "qb", "ab");

        assert!(memory.history(&a).iter().all(|m| m.video_id == a));
        assert!(memory.history(&b).iter().all(|m| m.video_id == b));

        let global = memory.global_history();
        assert_eq!(global.len(), 4);
        assert!(global.iter().any(|m| m.video_id == a));
        assert!(global.iter().any(|m| m.video_id == b));
    }

    #[test]
    fn test_clear_one_video_keeps_others_and_global() {
        let memory = ConversationMemory::new();
        let a = vid("dQw4w9WgXcQ");
        let b = vid("jNQXAC9IVRw");
        memory.append_exchange(&a, "qa", "aa");
        memory.append_exchange(&b, "qb", "ab");

        memory.clear(Some(&a));

        assert!(memory.history(&a).is_empty());
        assert_eq!(memory.history(&b).len(), 2);
        assert_eq!(memory.global_history().len(), 4);

        memory.clear(None);
        assert!(memory.all_memories().is_empty());
        assert_eq!(memory.global_history().len(), 4);

        memory.clear_global();
        assert!(memory.global_history().is_empty());
    }

    #[test]
    fn test_recent_window() {
        let memory = ConversationMemory::new();
        let a = vid("dQw4w9WgXcQ");
        for i in 0..5 {
            memory.append_exchange(&a, &format!("q{}", i), &format!("a{}", i));
        }

        let window = memory.recent_window(&a, 6);
        assert_eq!(window.len(), 6);
        assert_eq!(window[0].content, "q2");
        assert_eq!(window[5].content, "a4");

        assert!(memory.recent_window(&vid("jNQXAC9IVRw"), 6).is_empty());
        assert_eq!(memory.all_memories().get(&a), Some(&10));
    }
}
