use crate::error::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Which path served a conversation search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPath {
    Semantic,
    Substring,
}

impl SearchPath {
    fn label(self) -> &'static str {
        match self {
            SearchPath::Semantic => "semantic",
            SearchPath::Substring => "substring",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryStats {
    pub conversations_added: u64,
    pub file_interactions: u64,
    pub commands_added: u64,
    pub semantic_searches: u64,
    pub substring_searches: u64,
    pub semantic_failures: u64,
    pub persist_failures: u64,
    pub references_resolved: u64,
    pub stored_conversations: i64,
}

/// Counters for one engine. Each instance owns its registry so several
/// engines can live in the same process.
#[derive(Clone)]
pub struct MemoryMetrics {
    registry: Arc<Registry>,
    conversations_added: IntCounter,
    file_interactions: IntCounter,
    commands_added: IntCounter,
    searches: IntCounterVec,
    semantic_failures: IntCounter,
    persist_failures: IntCounter,
    references_resolved: IntCounter,
    stored_conversations: IntGauge,
}

impl MemoryMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let conversations_added = IntCounter::with_opts(
            Opts::new("memory_conversations_added_total", "Conversations recorded")
                .const_label("component", "memory-core"),
        )?;
        let file_interactions = IntCounter::with_opts(Opts::new(
            "memory_file_interactions_total",
            "File interactions logged",
        ))?;
        let commands_added = IntCounter::with_opts(Opts::new(
            "memory_commands_added_total",
            "Commands recorded in history",
        ))?;
        let searches = IntCounterVec::new(
            Opts::new("memory_searches_total", "Conversation searches by path"),
            &["path"],
        )?;
        let semantic_failures = IntCounter::with_opts(Opts::new(
            "memory_semantic_failures_total",
            "Semantic index calls that failed or were skipped",
        ))?;
        let persist_failures = IntCounter::with_opts(Opts::new(
            "memory_persist_failures_total",
            "Snapshot writes that failed",
        ))?;
        let references_resolved = IntCounter::with_opts(Opts::new(
            "memory_references_resolved_total",
            "Ambiguous references rewritten to concrete values",
        ))?;
        let stored_conversations = IntGauge::with_opts(Opts::new(
            "memory_stored_conversations",
            "Conversations currently held by the store",
        ))?;

        registry.register(Box::new(conversations_added.clone()))?;
        registry.register(Box::new(file_interactions.clone()))?;
        registry.register(Box::new(commands_added.clone()))?;
        registry.register(Box::new(searches.clone()))?;
        registry.register(Box::new(semantic_failures.clone()))?;
        registry.register(Box::new(persist_failures.clone()))?;
        registry.register(Box::new(references_resolved.clone()))?;
        registry.register(Box::new(stored_conversations.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            conversations_added,
            file_interactions,
            commands_added,
            searches,
            semantic_failures,
            persist_failures,
            references_resolved,
            stored_conversations,
        })
    }

    pub fn record_conversation(&self, stored: usize) {
        self.conversations_added.inc();
        self.stored_conversations.set(stored as i64);
    }

    pub fn record_file_interaction(&self) {
        self.file_interactions.inc();
    }

    pub fn record_command(&self) {
        self.commands_added.inc();
    }

    pub fn record_search(&self, path: SearchPath) {
        self.searches.with_label_values(&[path.label()]).inc();
    }

    pub fn record_semantic_failure(&self) {
        self.semantic_failures.inc();
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.inc();
    }

    pub fn record_references_resolved(&self, count: usize) {
        self.references_resolved.inc_by(count as u64);
    }

    pub fn set_stored_conversations(&self, stored: usize) {
        self.stored_conversations.set(stored as i64);
    }

    /// Prometheus text exposition of every metric in this registry.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            conversations_added: self.conversations_added.get(),
            file_interactions: self.file_interactions.get(),
            commands_added: self.commands_added.get(),
            semantic_searches: self.searches.with_label_values(&[SearchPath::Semantic.label()]).get(),
            substring_searches: self.searches.with_label_values(&[SearchPath::Substring.label()]).get(),
            semantic_failures: self.semantic_failures.get(),
            persist_failures: self.persist_failures.get(),
            references_resolved: self.references_resolved.get(),
            stored_conversations: self.stored_conversations.get(),
        }
    }
}
