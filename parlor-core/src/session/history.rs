//! Durable storage for the session collection

use super::store::ChatSession;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File-backed store for the full session collection.
///
/// The whole collection lives in one JSON slot; every mutating call
/// rewrites the serialized collection wholesale. There is no
/// partial-write protocol: a crash mid-write can corrupt the slot, and
/// corrupt content reads back as an empty history. Storage failures
/// are logged and swallowed here; they never propagate to callers.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Create a store backed by the given slot path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the storage slot
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All sessions in stored order. Missing or unparsable content
    /// yields an empty collection, never an error.
    pub fn list(&self) -> Vec<ChatSession> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read history slot {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!(
                    "History slot {} is unparsable, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Allocate a new empty session bound to `model` and write it to
    /// the slot.
    pub fn create(&self, model: impl Into<String>) -> ChatSession {
        let session = ChatSession::new(model);
        self.save(&session);
        session
    }

    /// Insert or replace `session` by id and rewrite the slot
    pub fn save(&self, session: &ChatSession) {
        let mut sessions = self.list();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.write_all(&sessions);
    }

    /// Remove the session with `id`, if present. Absent ids are a no-op.
    pub fn delete(&self, id: &str) {
        let mut sessions = self.list();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        if sessions.len() != before {
            self.write_all(&sessions);
        }
    }

    /// Update the title of a stored session. Unknown ids are a no-op.
    pub fn rename(&self, id: &str, title: impl Into<String>) {
        let mut sessions = self.list();
        if let Some(session) = sessions.iter_mut().find(|s| s.id == id) {
            session.title = title.into();
            session.touch();
            self.write_all(&sessions);
        }
    }

    fn write_all(&self, sessions: &[ChatSession]) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create history directory: {}", e);
                return;
            }
        }

        let content = match serde_json::to_string_pretty(sessions) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize history: {}", e);
                return;
            }
        };

        if let Err(e) = std::fs::write(&self.path, content) {
            warn!("Failed to write history slot {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::store::ChatMessage;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("history.json"))
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list().is_empty());
    }

    fn session_with_id(id: &str, model: &str) -> ChatSession {
        let mut session = ChatSession::new(model);
        session.id = id.to_string();
        session
    }

    #[test]
    fn test_create_writes_through() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.create("llama2");

        let sessions = store.list();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].model, "llama2");
        assert!(sessions[0].messages.is_empty());
    }

    #[test]
    fn test_save_is_last_write_wins() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut a = session_with_id("a", "llama2");
        let b = session_with_id("b", "mistral");

        store.save(&a);
        store.save(&b);

        a.push(ChatMessage::user("hi"));
        store.save(&a);
        store.save(&a);

        let sessions = store.list();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "a");
        assert_eq!(sessions[0].messages.len(), 1);
        assert_eq!(sessions[1].id, "b");
    }

    #[test]
    fn test_save_preserves_insertion_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for id in ["1", "2", "3"] {
            store.save(&session_with_id(id, "llama2"));
        }

        let mut second = store.list().remove(1);
        second.push(ChatMessage::user("bump"));
        store.save(&second);

        let ids: Vec<String> = store.list().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let a = session_with_id("a", "llama2");
        store.save(&a);

        store.delete("a");
        assert!(store.list().is_empty());

        // Deleting an unknown id leaves the collection unchanged
        store.save(&a);
        store.delete("missing");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_rename() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.save(&session_with_id("a", "llama2"));

        store.rename("a", "Renamed");
        assert_eq!(store.list()[0].title, "Renamed");

        store.rename("missing", "Ignored");
        assert_eq!(store.list()[0].title, "Renamed");
    }

    #[test]
    fn test_corrupt_slot_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.list().is_empty());

        // The store stays usable after corruption
        let session = store.create("llama2");
        store.save(&session);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_roundtrip_preserves_messages() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut session = store.create("llama2");
        session.push(ChatMessage::user("hi"));
        session.push(ChatMessage::assistant("hello"));
        store.save(&session);

        let loaded = &store.list()[0];
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].content, "hello");
    }
}
