use crate::commands;
use crate::config::MemoryConfig;
use crate::context::{format_for_prompt, ContextBundle, ContextRetriever};
use crate::error::{MemoryError, Result};
use crate::extractor::{extract_file_references, FileReference};
use crate::memory::ShortTermMemory;
use crate::observability::MemoryMetrics;
use crate::resolver::{ReferenceResolver, ResolvedCommand};
use crate::security::CapabilityTable;
use crate::semantic::{GuardedIndex, SemanticIndex};
use crate::storage::{FileAction, PersistentStore};
use serde_json::Value;

/// One assistant session's memory: the durable store, the short-term
/// working set, and the helpers that read them.
///
/// Construct with [`MemoryEngine::open`] and pass it by reference to
/// whatever drives the session.
pub struct MemoryEngine {
    config: MemoryConfig,
    store: PersistentStore,
    short_term: ShortTermMemory,
    resolver: ReferenceResolver,
    retriever: ContextRetriever,
    capabilities: CapabilityTable,
    metrics: MemoryMetrics,
}

impl MemoryEngine {
    /// Load the store named by `config`, or start empty.
    pub fn open(config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let metrics = MemoryMetrics::new()?;

        let mut store = PersistentStore::open(&config.store_path, config.max_memory_items)
            .with_interaction_cap(config.interaction_cap())
            .with_metrics(metrics.clone());
        if config.semantic.enabled {
            store = store.with_semantic_index(GuardedIndex::local(&config.semantic));
        }

        tracing::info!(
            store = %config.store_path.display(),
            semantic = config.semantic.enabled,
            "Memory engine ready"
        );

        Ok(Self {
            short_term: ShortTermMemory::new(config.max_results_history),
            resolver: ReferenceResolver::new(),
            retriever: ContextRetriever::new(config.max_context_items),
            capabilities: CapabilityTable::with_defaults(),
            store,
            metrics,
            config,
        })
    }

    /// Replace the semantic collaborator. Stored conversations are indexed
    /// into it straight away.
    pub fn with_semantic_index(mut self, index: Box<dyn SemanticIndex>) -> Self {
        let guarded = GuardedIndex::new(index, &self.config.semantic);
        self.store = self.store.with_semantic_index(guarded);
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    pub fn short_term(&self) -> &ShortTermMemory {
        &self.short_term
    }

    pub fn metrics(&self) -> &MemoryMetrics {
        &self.metrics
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    /// Record a finished turn. A non-empty `code_result` also enters the
    /// recent-results window.
    pub fn add_conversation(
        &mut self,
        user_input: &str,
        assistant_response: &str,
        executed_code: Option<&str>,
        code_result: Option<&str>,
    ) -> String {
        let id = self
            .store
            .add_conversation(user_input, assistant_response, executed_code, code_result);

        if let Some(result) = code_result.filter(|r| !r.is_empty()) {
            self.short_term.push_recent_result(user_input, result);
        }
        id
    }

    pub fn add_file_interaction(
        &mut self,
        path: &str,
        action: FileAction,
        conversation_id: Option<&str>,
    ) -> String {
        self.store.add_file_interaction(path, action, conversation_id)
    }

    pub fn add_command(&mut self, command: &str, result: &str, conversation_id: Option<&str>) {
        self.store.add_command(command, result, conversation_id);
    }

    pub fn link_conversations(&mut self, source_id: &str, target_id: &str, relation: &str) -> bool {
        self.store.link_conversations(source_id, target_id, relation)
    }

    /// Scan executed code for file access and log one interaction per hit.
    pub fn record_code_references(
        &mut self,
        code: &str,
        conversation_id: Option<&str>,
    ) -> Vec<FileReference> {
        let refs = extract_file_references(code);
        for r in &refs {
            self.store.add_file_interaction(&r.path, r.action, conversation_id);
        }
        if !refs.is_empty() {
            tracing::debug!(count = refs.len(), conversation_id, "Recorded code file references");
        }
        refs
    }

    pub fn resolve(&self, command: &str) -> ResolvedCommand {
        let resolved = self.resolver.resolve(command, &self.short_term);
        self.metrics.record_references_resolved(resolved.substitutions.len());
        resolved
    }

    pub fn build_context(&self, query: &str) -> ContextBundle {
        self.retriever.build_context(query, &self.store, &self.short_term)
    }

    pub fn context_for_prompt(&self, query: &str) -> String {
        format_for_prompt(&self.build_context(query))
    }

    pub fn store_result(&mut self, kind: &str, result: Value) {
        self.short_term.store_result(kind, result);
    }

    pub fn get_result(&self, kind: &str) -> Option<&Value> {
        self.short_term.get_result(kind)
    }

    pub fn get_file_by_ordinal(&self, reference: &str) -> Option<&str> {
        self.short_term.get_file_by_ordinal(reference)
    }

    /// Reply to a memory command, or `None` if `text` is not one.
    pub fn handle_memory_command(&mut self, text: &str) -> Option<String> {
        commands::handle_memory_command(text, &mut self.short_term)
    }

    /// Run an allow-listed operation. Operations that declare file access
    /// are logged against their first argument.
    pub fn invoke_capability(
        &mut self,
        name: &str,
        args: &[String],
        conversation_id: Option<&str>,
    ) -> Result<String> {
        let access = self
            .capabilities
            .get(name)
            .ok_or_else(|| MemoryError::InvalidInput(format!("operation not allowed: {}", name)))?
            .access;

        let output = self.capabilities.invoke(name, args)?;

        if let (Some(action), Some(path)) = (access, args.first()) {
            self.store.add_file_interaction(path, action, conversation_id);
        }
        Ok(output)
    }

    /// Write the store now, reporting failure.
    pub fn flush(&mut self) -> Result<()> {
        self.store.flush()
    }

    /// Wipe durable and short-term state.
    pub fn clear(&mut self) {
        self.store.clear();
        self.short_term.clear();
    }
}
