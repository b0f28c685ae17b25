use super::ordinal::parse_ordinal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Result kind whose list value becomes the current found-files list.
pub const FILE_SEARCH: &str = "file_search";

pub const DEFAULT_RESULTS_WINDOW: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LastOperation {
    /// `None` until something has been stored.
    pub kind: Option<String>,
    pub result: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentResult {
    pub query: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

/// Session-scoped working set: what just happened. Nothing here is
/// persisted.
#[derive(Debug, Clone)]
pub struct ShortTermMemory {
    command_results: HashMap<String, Value>,
    found_files: Vec<String>,
    last_operation: LastOperation,
    results_history: Vec<RecentResult>,
    max_results: usize,
}

impl ShortTermMemory {
    pub fn new(max_results: usize) -> Self {
        Self {
            command_results: HashMap::new(),
            found_files: Vec::new(),
            last_operation: LastOperation::default(),
            results_history: Vec::new(),
            max_results: max_results.max(1),
        }
    }

    pub fn store_result(&mut self, kind: &str, result: Value) {
        if kind == FILE_SEARCH {
            if let Value::Array(items) = &result {
                self.found_files = items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                tracing::debug!(count = self.found_files.len(), "Stored found files");
            }
        }

        self.command_results.insert(kind.to_string(), result.clone());
        self.last_operation = LastOperation {
            kind: Some(kind.to_string()),
            result: Some(result),
            timestamp: Some(Utc::now()),
        };
        tracing::debug!(kind, "Stored command result");
    }

    pub fn get_result(&self, kind: &str) -> Option<&Value> {
        self.command_results.get(kind)
    }

    /// Drop the slot for `kind`. `last_operation` is left as it was.
    pub fn forget(&mut self, kind: &str) -> Option<Value> {
        self.command_results.remove(kind)
    }

    pub fn last_operation(&self) -> &LastOperation {
        &self.last_operation
    }

    pub fn found_files(&self) -> &[String] {
        &self.found_files
    }

    /// Resolve "el segundo", "last", "archivo 3" and the like against the
    /// most recent file search.
    pub fn get_file_by_ordinal(&self, reference: &str) -> Option<&str> {
        if self.found_files.is_empty() {
            return None;
        }
        parse_ordinal(reference)?
            .pick(&self.found_files)
            .map(String::as_str)
    }

    /// Append to the recent-results window, dropping the oldest entries
    /// past the limit.
    pub fn push_recent_result(&mut self, query: &str, result: &str) {
        self.results_history.push(RecentResult {
            query: query.to_string(),
            result: result.to_string(),
            timestamp: Utc::now(),
        });
        if self.results_history.len() > self.max_results {
            let excess = self.results_history.len() - self.max_results;
            self.results_history.drain(..excess);
        }
    }

    /// Oldest first.
    pub fn results_history(&self) -> &[RecentResult] {
        &self.results_history
    }

    pub fn clear(&mut self) {
        self.command_results.clear();
        self.found_files.clear();
        self.last_operation = LastOperation::default();
        self.results_history.clear();
    }
}

impl Default for ShortTermMemory {
    fn default() -> Self {
        Self::new(DEFAULT_RESULTS_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn with_files() -> ShortTermMemory {
        let mut memory = ShortTermMemory::default();
        memory.store_result(FILE_SEARCH, json!(["/a.txt", "/b.txt", "/c.txt"]));
        memory
    }

    #[test]
    fn test_ordinal_lookup() {
        let memory = with_files();
        assert_eq!(memory.get_file_by_ordinal("el segundo"), Some("/b.txt"));
        assert_eq!(memory.get_file_by_ordinal("el décimo"), None);
        assert_eq!(memory.get_file_by_ordinal("archivo 3"), Some("/c.txt"));
        assert_eq!(memory.get_file_by_ordinal("el último"), Some("/c.txt"));
        assert_eq!(memory.get_file_by_ordinal("item 0"), None);
        assert_eq!(memory.get_file_by_ordinal("nada"), None);
    }

    #[test]
    fn test_ordinal_without_files() {
        let memory = ShortTermMemory::default();
        assert_eq!(memory.get_file_by_ordinal("el primero"), None);
    }

    #[test]
    fn test_file_search_overwrites_list() {
        let mut memory = with_files();
        memory.store_result(FILE_SEARCH, json!(["/z.txt"]));
        assert_eq!(memory.found_files(), &["/z.txt".to_string()]);
    }

    #[test]
    fn test_non_list_file_search_keeps_previous_list() {
        let mut memory = with_files();
        memory.store_result(FILE_SEARCH, json!("no matches"));
        assert_eq!(memory.found_files().len(), 3);
        assert_eq!(memory.get_result(FILE_SEARCH), Some(&json!("no matches")));
    }

    #[test]
    fn test_other_kinds_do_not_touch_found_files() {
        let mut memory = with_files();
        memory.store_result("read_file", json!(["/q.txt"]));
        assert_eq!(memory.found_files().len(), 3);
    }

    #[test]
    fn test_last_operation_tracks_latest_store() {
        let mut memory = ShortTermMemory::default();
        assert_eq!(memory.last_operation().kind, None);

        memory.store_result("system_info", json!("cpu 12%"));
        memory.store_result("read_file", json!("/etc/hosts"));

        let last = memory.last_operation();
        assert_eq!(last.kind.as_deref(), Some("read_file"));
        assert_eq!(last.result, Some(json!("/etc/hosts")));
        assert!(last.timestamp.is_some());
        assert_eq!(memory.get_result("system_info"), Some(&json!("cpu 12%")));
    }

    #[test]
    fn test_results_window_drops_oldest() {
        let mut memory = ShortTermMemory::new(5);
        for i in 0..7 {
            memory.push_recent_result(&format!("q{}", i), &format!("r{}", i));
        }
        let queries: Vec<&str> = memory.results_history().iter().map(|r| r.query.as_str()).collect();
        assert_eq!(queries, vec!["q2", "q3", "q4", "q5", "q6"]);
    }

    #[test]
    fn test_forget_and_clear() {
        let mut memory = with_files();
        memory.store_result("remember", json!("milk"));
        assert_eq!(memory.forget("remember"), Some(json!("milk")));
        assert_eq!(memory.get_result("remember"), None);

        memory.push_recent_result("q", "r");
        memory.clear();
        assert!(memory.found_files().is_empty());
        assert!(memory.results_history().is_empty());
        assert_eq!(memory.last_operation(), &LastOperation::default());
        assert_eq!(memory.get_result(FILE_SEARCH), None);
    }
}
