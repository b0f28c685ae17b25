use super::{ContextBundle, RelatedFile};
use crate::memory::ShortTermMemory;
use crate::security::normalize_key;
use crate::storage::PersistentStore;
use std::path::Path;

pub const DEFAULT_CONTEXT_ITEMS: usize = 3;

const TOKEN_TRIM: &[char] = &['"', '\'', '`', ',', ';', ':', '?', '!', '(', ')', '[', ']'];

/// Pulls conversations, files and commands related to a query out of the
/// store, plus the recent-results window.
#[derive(Debug, Clone)]
pub struct ContextRetriever {
    max_items: usize,
}

impl ContextRetriever {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn build_context(
        &self,
        query: &str,
        store: &PersistentStore,
        memory: &ShortTermMemory,
    ) -> ContextBundle {
        let related_conversations = store
            .search_conversations(query)
            .into_iter()
            .take(self.max_items)
            .cloned()
            .collect();

        let related_files = self.related_files(query, store);

        let needle = query.to_lowercase();
        let related_commands = store
            .command_history()
            .iter()
            .filter(|c| c.command.to_lowercase().contains(&needle))
            .take(self.max_items)
            .cloned()
            .collect();

        let bundle = ContextBundle {
            related_conversations,
            related_files,
            related_commands,
            recent_results: memory.results_history().to_vec(),
        };

        tracing::debug!(
            conversations = bundle.related_conversations.len(),
            files = bundle.related_files.len(),
            commands = bundle.related_commands.len(),
            recent_results = bundle.recent_results.len(),
            "Built context"
        );
        bundle
    }

    /// Query tokens naming an existing path with logged interactions.
    fn related_files(&self, query: &str, store: &PersistentStore) -> Vec<RelatedFile> {
        let mut files: Vec<RelatedFile> = Vec::new();

        for token in query.split_whitespace() {
            if files.len() >= self.max_items {
                break;
            }
            let Some(key) = existing_path_key(token) else {
                continue;
            };
            if files.iter().any(|f| f.path == key) {
                continue;
            }
            let history = store.get_file_history(&key);
            if history.is_empty() {
                continue;
            }
            files.push(RelatedFile {
                interactions: history.iter().take(self.max_items).cloned().collect(),
                path: key,
            });
        }

        files
    }
}

impl Default for ContextRetriever {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_ITEMS)
    }
}

/// Normalized key for `token` if it names something on disk. A trailing
/// full stop is tried off as well, for paths ending a sentence.
fn existing_path_key(token: &str) -> Option<String> {
    let trimmed = token.trim_matches(TOKEN_TRIM);
    if trimmed.is_empty() {
        return None;
    }

    let candidates = [trimmed, trimmed.trim_end_matches('.')];
    candidates
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| normalize_key(c))
        .find(|key| Path::new(key).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileAction;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> PersistentStore {
        PersistentStore::open(dir.path().join("memory.json"), 100)
    }

    #[test]
    fn test_related_conversations_are_capped() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        for i in 0..5 {
            store.add_conversation(&format!("list logs {}", i), "ok", None, None);
        }

        let bundle = ContextRetriever::new(3).build_context("logs", &store, &ShortTermMemory::default());
        let inputs: Vec<&str> = bundle
            .related_conversations
            .iter()
            .map(|c| c.user_input.as_str())
            .collect();
        assert_eq!(inputs, vec!["list logs 4", "list logs 3", "list logs 2"]);
    }

    #[test]
    fn test_related_files_need_existing_path_with_history() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let known = dir.path().join("notes.txt");
        std::fs::write(&known, "x").unwrap();
        let unlogged = dir.path().join("other.txt");
        std::fs::write(&unlogged, "y").unwrap();

        let known_str = known.to_string_lossy().to_string();
        for _ in 0..4 {
            store.add_file_interaction(&known_str, FileAction::Write, None);
        }
        store.add_file_interaction("/definitely/missing/file.txt", FileAction::Read, None);

        let query = format!(
            "compare \"{}\" with {} and /definitely/missing/file.txt.",
            known_str,
            unlogged.display()
        );
        let bundle = ContextRetriever::new(3).build_context(&query, &store, &ShortTermMemory::default());

        assert_eq!(bundle.related_files.len(), 1);
        assert_eq!(bundle.related_files[0].path, normalize_key(&known_str));
        assert_eq!(bundle.related_files[0].interactions.len(), 3);
    }

    #[test]
    fn test_related_files_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        let file_str = file.to_string_lossy().to_string();
        store.add_file_interaction(&file_str, FileAction::Read, None);

        let query = format!("{} {}.", file_str, file_str);
        let bundle = ContextRetriever::default().build_context(&query, &store, &ShortTermMemory::default());
        assert_eq!(bundle.related_files.len(), 1);
    }

    #[test]
    fn test_related_commands_substring_match() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.add_command("ls /tmp", "a b", None);
        store.add_command("cat /etc/hosts", "127.0.0.1", None);
        store.add_command("LS -la", "total 0", None);

        let bundle = ContextRetriever::new(3).build_context("ls", &store, &ShortTermMemory::default());
        let commands: Vec<&str> = bundle.related_commands.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(commands, vec!["LS -la", "ls /tmp"]);
    }

    #[test]
    fn test_recent_results_ignore_query() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut memory = ShortTermMemory::default();
        for i in 0..7 {
            memory.push_recent_result(&format!("q{}", i), "r");
        }

        let retriever = ContextRetriever::default();
        for query in ["", "unrelated", "q1"] {
            let bundle = retriever.build_context(query, &store, &memory);
            assert_eq!(bundle.recent_results.len(), 5);
            assert_eq!(bundle.recent_results[0].query, "q2");
            assert_eq!(bundle.recent_results[4].query, "q6");
        }
    }

    #[test]
    fn test_empty_store_gives_empty_bundle() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let bundle = ContextRetriever::default().build_context("anything", &store, &ShortTermMemory::default());
        assert!(bundle.is_empty());
    }
}
