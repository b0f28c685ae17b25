use super::snapshot::{read_snapshot, write_snapshot};
use super::{
    CommandRecord, ConversationLink, ConversationRecord, FileAction, FileInteraction,
    MemorySnapshot,
};
use crate::error::Result;
use crate::log_store;
use crate::observability::{MemoryMetrics, SearchPath};
use crate::security::normalize_key;
use crate::semantic::{conversation_document, GuardedIndex};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_CAPACITY: usize = 100;

/// File-backed conversation, file-interaction and command history.
///
/// Every mutation writes the full snapshot before returning. Load and save
/// failures are logged and never reach the caller; the in-memory state stays
/// authoritative.
pub struct PersistentStore {
    path: PathBuf,
    capacity: usize,
    interaction_cap: Option<usize>,
    state: MemorySnapshot,
    next_sequence: u64,
    semantic: Option<GuardedIndex>,
    metrics: Option<MemoryMetrics>,
}

impl PersistentStore {
    /// Load the store at `path`, or start empty if it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>, capacity: usize) -> Self {
        let path = path.into();
        let state = match read_snapshot(&path) {
            Ok(Some(snapshot)) => {
                tracing::info!(
                    path = %path.display(),
                    conversations = snapshot.conversations.len(),
                    "Loaded memory"
                );
                snapshot
            }
            Ok(None) => {
                tracing::info!(path = %path.display(), "No memory file found, starting empty");
                MemorySnapshot::default()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load memory, starting empty");
                MemorySnapshot::default()
            }
        };

        let next_sequence = seed_sequence(&state.conversations);

        Self {
            path,
            capacity: capacity.max(1),
            interaction_cap: None,
            state,
            next_sequence,
            semantic: None,
            metrics: None,
        }
    }

    pub fn with_interaction_cap(mut self, cap: Option<usize>) -> Self {
        self.interaction_cap = cap.filter(|c| *c > 0);
        self
    }

    pub fn with_metrics(mut self, metrics: MemoryMetrics) -> Self {
        metrics.set_stored_conversations(self.state.conversations.len());
        self.metrics = Some(metrics);
        self
    }

    /// Attach a semantic collaborator and feed it the conversations already
    /// on disk.
    pub fn with_semantic_index(mut self, mut index: GuardedIndex) -> Self {
        for conv in self.state.conversations.iter().rev() {
            let text = conversation_document(
                &conv.user_input,
                &conv.assistant_response,
                conv.code_result.as_deref(),
            );
            if let Err(e) = index.add(&conv.id, &text) {
                tracing::warn!(error = %e, "Semantic index unavailable while seeding");
                break;
            }
        }
        self.semantic = Some(index);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> &MemorySnapshot {
        &self.state
    }

    pub fn add_conversation(
        &mut self,
        user_input: &str,
        assistant_response: &str,
        executed_code: Option<&str>,
        code_result: Option<&str>,
    ) -> String {
        let now = Utc::now();
        let id = format!("conv_{}_{}", now.timestamp(), self.next_sequence);
        self.next_sequence += 1;

        let record = ConversationRecord {
            id: id.clone(),
            timestamp: now,
            user_input: user_input.to_string(),
            assistant_response: assistant_response.to_string(),
            executed_code: executed_code.map(str::to_string),
            code_result: code_result.map(str::to_string),
            related_files: Vec::new(),
            related_conversations: Vec::new(),
        };

        self.state.conversations.insert(0, record);
        let evicted = if self.state.conversations.len() > self.capacity {
            self.state.conversations.split_off(self.capacity)
        } else {
            Vec::new()
        };

        if let Some(semantic) = self.semantic.as_mut() {
            let text = conversation_document(user_input, assistant_response, code_result);
            if let Err(e) = semantic.add(&id, &text) {
                tracing::warn!(conversation_id = %id, error = %e, "Failed to index conversation");
                if let Some(metrics) = &self.metrics {
                    metrics.record_semantic_failure();
                }
            }
            for old in &evicted {
                if let Err(e) = semantic.remove(&old.id) {
                    tracing::warn!(conversation_id = %old.id, error = %e, "Failed to drop evicted conversation from index");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_semantic_failure();
                    }
                }
            }
        }

        self.persist();
        if let Some(metrics) = &self.metrics {
            metrics.record_conversation(self.state.conversations.len());
        }
        tracing::info!(conversation_id = %id, "Added conversation");
        id
    }

    /// Log an interaction with `path` and return the normalized key it was
    /// stored under.
    pub fn add_file_interaction(
        &mut self,
        path: &str,
        action: FileAction,
        conversation_id: Option<&str>,
    ) -> String {
        let key = normalize_key(path);

        let interactions = self.state.file_interactions.entry(key.clone()).or_default();
        interactions.insert(
            0,
            FileInteraction {
                timestamp: Utc::now(),
                action,
                conversation_id: conversation_id.map(str::to_string),
            },
        );
        if let Some(cap) = self.interaction_cap {
            interactions.truncate(cap);
        }

        if let Some(id) = conversation_id {
            if let Some(conv) = self.state.conversations.iter_mut().find(|c| c.id == id) {
                if !conv.related_files.contains(&key) {
                    conv.related_files.push(key.clone());
                }
            }
        }

        self.persist();
        if let Some(metrics) = &self.metrics {
            metrics.record_file_interaction();
        }
        log_store!(debug, path = %key, action = %action, "Added file interaction");
        key
    }

    pub fn add_command(&mut self, command: &str, result: &str, conversation_id: Option<&str>) {
        self.state.command_history.insert(
            0,
            CommandRecord {
                timestamp: Utc::now(),
                command: command.to_string(),
                result: result.to_string(),
                conversation_id: conversation_id.map(str::to_string),
            },
        );
        self.state.command_history.truncate(self.capacity);

        self.persist();
        if let Some(metrics) = &self.metrics {
            metrics.record_command();
        }
        log_store!(debug, command = %command, "Added command to history");
    }

    /// Link `source_id` to `target_id`. Returns false and changes nothing
    /// unless both conversations exist.
    pub fn link_conversations(&mut self, source_id: &str, target_id: &str, relation: &str) -> bool {
        let target_exists = self.state.conversations.iter().any(|c| c.id == target_id);
        let source = self.state.conversations.iter_mut().find(|c| c.id == source_id);

        let source = match (source, target_exists) {
            (Some(source), true) => source,
            _ => {
                tracing::warn!(source_id, target_id, "Could not link conversations");
                return false;
            }
        };

        let already_linked = source
            .related_conversations
            .iter()
            .any(|link| link.id == target_id && link.relation == relation);
        if !already_linked {
            source.related_conversations.push(ConversationLink {
                id: target_id.to_string(),
                relation: relation.to_string(),
            });
        }

        self.persist();
        tracing::info!(source_id, target_id, relation, "Linked conversations");
        true
    }

    pub fn get_conversation(&self, id: &str) -> Option<&ConversationRecord> {
        self.state.conversations.iter().find(|c| c.id == id)
    }

    pub fn get_recent_conversations(&self, count: usize) -> &[ConversationRecord] {
        let end = count.min(self.state.conversations.len());
        &self.state.conversations[..end]
    }

    /// Interactions for `path`, newest first. The path is normalized the
    /// same way as on insert.
    pub fn get_file_history(&self, path: &str) -> &[FileInteraction] {
        self.state
            .file_interactions
            .get(&normalize_key(path))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn file_interactions(&self) -> &BTreeMap<String, Vec<FileInteraction>> {
        &self.state.file_interactions
    }

    pub fn command_history(&self) -> &[CommandRecord] {
        &self.state.command_history
    }

    pub fn conversations(&self) -> &[ConversationRecord] {
        &self.state.conversations
    }

    /// Conversations matching `query`, newest first.
    ///
    /// The semantic collaborator is asked first when attached; its ids are
    /// mapped back onto stored records. An error, an open circuit or an
    /// answer naming no stored conversation falls through to a
    /// case-insensitive substring match on input and response.
    pub fn search_conversations(&self, query: &str) -> Vec<&ConversationRecord> {
        if let Some(semantic) = &self.semantic {
            match semantic.query(query) {
                Ok(ids) if !ids.is_empty() => {
                    let hits: Vec<&ConversationRecord> = self
                        .state
                        .conversations
                        .iter()
                        .filter(|c| ids.contains(&c.id))
                        .collect();
                    if !hits.is_empty() {
                        if let Some(metrics) = &self.metrics {
                            metrics.record_search(SearchPath::Semantic);
                        }
                        return hits;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "Semantic search failed, using substring search");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_semantic_failure();
                    }
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_search(SearchPath::Substring);
        }
        let needle = query.to_lowercase();
        self.state
            .conversations
            .iter()
            .filter(|c| {
                c.user_input.to_lowercase().contains(&needle)
                    || c.assistant_response.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Drop every record and persist the empty state.
    pub fn clear(&mut self) {
        self.state = MemorySnapshot::default();

        if let Some(semantic) = self.semantic.as_mut() {
            if let Err(e) = semantic.clear() {
                tracing::warn!(error = %e, "Failed to clear semantic index");
            }
        }

        self.persist();
        if let Some(metrics) = &self.metrics {
            metrics.set_stored_conversations(0);
        }
        tracing::info!(path = %self.path.display(), "Memory cleared");
    }

    /// Write the snapshot now, reporting any failure.
    pub fn flush(&mut self) -> Result<()> {
        self.state.last_updated = Utc::now();
        write_snapshot(&self.path, &self.state)
    }

    fn persist(&mut self) {
        match self.flush() {
            Ok(()) => {
                log_store!(debug, path = %self.path.display(), "Memory saved");
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to save memory");
                if let Some(metrics) = &self.metrics {
                    metrics.record_persist_failure();
                }
            }
        }
    }
}

/// Next id sequence: one past the highest `conv_<secs>_<seq>` suffix on disk.
fn seed_sequence(conversations: &[ConversationRecord]) -> u64 {
    conversations
        .iter()
        .filter_map(|c| c.id.rsplit('_').next()?.parse::<u64>().ok())
        .max()
        .map(|max| {
            max.checked_add(1).unwrap_or_else(|| {
                tracing::warn!(max, "Stored id sequence is exhausted, restarting from the conversation count");
                conversations.len() as u64
            })
        })
        .unwrap_or(conversations.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SemanticConfig;
    use tempfile::TempDir;

    fn temp_store(capacity: usize) -> (TempDir, PersistentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::open(dir.path().join("memory.json"), capacity);
        (dir, store)
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let (_dir, mut store) = temp_store(3);
        let ids: Vec<String> = (0..5)
            .map(|i| store.add_conversation(&format!("q{}", i), "a", None, None))
            .collect();

        let stored: Vec<&str> = store.conversations().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(stored, vec![ids[4].as_str(), ids[3].as_str(), ids[2].as_str()]);
    }

    #[test]
    fn test_ids_never_reused_after_eviction() {
        let (_dir, mut store) = temp_store(1);
        let first = store.add_conversation("a", "b", None, None);
        let second = store.add_conversation("c", "d", None, None);
        assert_ne!(first, second);
    }

    #[test]
    fn test_sequence_seeded_from_disk() {
        let (dir, mut store) = temp_store(10);
        let first = store.add_conversation("a", "b", None, None);
        assert!(first.ends_with("_0"));
        store.add_conversation("c", "d", None, None);

        let mut reopened = PersistentStore::open(dir.path().join("memory.json"), 10);
        let third = reopened.add_conversation("e", "f", None, None);
        assert!(third.ends_with("_2"), "unexpected id {}", third);
    }

    #[test]
    fn test_sequence_at_u64_max_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let stored = format!("conv_1_{}", u64::MAX);
        std::fs::write(
            &path,
            format!(
                r#"{{"conversations":[{{"id":"{}","timestamp":"2024-05-01T10:00:00Z","user_input":"a","assistant_response":"b"}}]}}"#,
                stored
            ),
        )
        .unwrap();

        let mut store = PersistentStore::open(&path, 10);
        assert_eq!(store.conversations().len(), 1);
        let next = store.add_conversation("c", "d", None, None);
        assert_ne!(next, stored);
        assert_eq!(store.conversations().len(), 2);
    }

    #[test]
    fn test_evicted_conversations_leave_semantic_index() {
        let config = SemanticConfig {
            enabled: true,
            top_k: 1,
            min_similarity: 0.1,
            ..SemanticConfig::default()
        };
        let (_dir, store) = temp_store(1);
        let mut store = store.with_semantic_index(GuardedIndex::local(&config));

        store.add_conversation("disk usage report alpha", "ok", None, None);
        store.add_conversation("disk usage report beta", "ok", None, None);

        // The evicted conversation would be the closest match if still indexed.
        let hits: Vec<&str> = store
            .search_conversations("disk usage report alpha")
            .into_iter()
            .map(|c| c.user_input.as_str())
            .collect();
        assert_eq!(hits, vec!["disk usage report beta"]);
    }

    #[test]
    fn test_link_requires_both_ids() {
        let (_dir, mut store) = temp_store(10);
        let a = store.add_conversation("a", "b", None, None);
        assert!(!store.link_conversations(&a, "conv_missing", "follow-up"));
        assert!(!store.link_conversations("conv_missing", &a, "follow-up"));
        assert!(store.get_conversation(&a).unwrap().related_conversations.is_empty());
    }

    #[test]
    fn test_link_is_idempotent() {
        let (_dir, mut store) = temp_store(10);
        let a = store.add_conversation("a", "b", None, None);
        let b = store.add_conversation("c", "d", None, None);

        assert!(store.link_conversations(&a, &b, "follow-up"));
        assert!(store.link_conversations(&a, &b, "follow-up"));

        let links = &store.get_conversation(&a).unwrap().related_conversations;
        assert_eq!(links.len(), 1);
        assert_eq!(links[0], ConversationLink { id: b.clone(), relation: "follow-up".to_string() });
    }

    #[test]
    fn test_file_interaction_links_once() {
        let (_dir, mut store) = temp_store(10);
        let conv = store.add_conversation("write it", "ok", None, None);

        store.add_file_interaction("/tmp/a.txt", FileAction::Write, Some(&conv));
        store.add_file_interaction("/tmp/a.txt", FileAction::Write, Some(&conv));

        let record = store.get_conversation(&conv).unwrap();
        assert_eq!(record.related_files, vec!["/tmp/a.txt".to_string()]);
        assert_eq!(store.get_file_history("/tmp/a.txt").len(), 2);
    }

    #[test]
    fn test_file_history_newest_first() {
        let (_dir, mut store) = temp_store(10);
        store.add_file_interaction("/tmp/b.txt", FileAction::Read, None);
        store.add_file_interaction("/tmp/./b.txt", FileAction::Modify, None);

        let history = store.get_file_history("/tmp/b.txt");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, FileAction::Modify);
        assert_eq!(history[1].action, FileAction::Read);
    }

    #[test]
    fn test_interaction_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = PersistentStore::open(dir.path().join("m.json"), 10).with_interaction_cap(Some(2));
        for _ in 0..4 {
            store.add_file_interaction("/tmp/c.txt", FileAction::Read, None);
        }
        assert_eq!(store.get_file_history("/tmp/c.txt").len(), 2);
    }

    #[test]
    fn test_unknown_conversation_id_still_logs_interaction() {
        let (_dir, mut store) = temp_store(10);
        store.add_file_interaction("/tmp/d.txt", FileAction::Read, Some("conv_nope"));
        assert_eq!(store.get_file_history("/tmp/d.txt").len(), 1);
    }

    #[test]
    fn test_command_history_capacity() {
        let (_dir, mut store) = temp_store(2);
        store.add_command("ls", "a", None);
        store.add_command("pwd", "/", None);
        store.add_command("whoami", "me", None);

        let commands: Vec<&str> = store.command_history().iter().map(|c| c.command.as_str()).collect();
        assert_eq!(commands, vec!["whoami", "pwd"]);
    }

    #[test]
    fn test_substring_search_is_case_insensitive() {
        let (_dir, mut store) = temp_store(10);
        store.add_conversation("Find PDF reports", "Found 3", None, None);
        store.add_conversation("weather", "Sunny, no reports", None, None);
        store.add_conversation("hello", "hi", None, None);

        let hits: Vec<&str> = store
            .search_conversations("REPORTS")
            .iter()
            .map(|c| c.user_input.as_str())
            .collect();
        assert_eq!(hits, vec!["weather", "Find PDF reports"]);
    }

    #[test]
    fn test_recent_conversations() {
        let (_dir, mut store) = temp_store(10);
        store.add_conversation("one", "1", None, None);
        store.add_conversation("two", "2", None, None);

        assert_eq!(store.get_recent_conversations(1)[0].user_input, "two");
        assert_eq!(store.get_recent_conversations(10).len(), 2);
        assert!(store.get_recent_conversations(0).is_empty());
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let (dir, mut store) = temp_store(10);
        store.add_conversation("one", "1", None, None);
        store.add_command("ls", "x", None);
        store.add_file_interaction("/tmp/e.txt", FileAction::Read, None);
        store.clear();
        store.clear();

        let reopened = PersistentStore::open(dir.path().join("memory.json"), 10);
        assert!(reopened.conversations().is_empty());
        assert!(reopened.command_history().is_empty());
        assert!(reopened.file_interactions().is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, "not json at all").unwrap();

        let mut store = PersistentStore::open(&path, 10);
        assert!(store.conversations().is_empty());
        store.add_conversation("a", "b", None, None);
        assert_eq!(PersistentStore::open(&path, 10).conversations().len(), 1);
    }

    #[test]
    fn test_unwritable_path_does_not_fail_operations() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        // Parent of the store path is a regular file, so every save fails.
        let metrics = MemoryMetrics::new().unwrap();
        let mut store = PersistentStore::open(blocker.join("memory.json"), 10).with_metrics(metrics.clone());
        let id = store.add_conversation("a", "b", None, None);

        assert!(store.get_conversation(&id).is_some());
        assert!(store.flush().is_err());
        assert_eq!(metrics.stats().persist_failures, 1);
    }
}
