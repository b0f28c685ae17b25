pub mod format;
pub mod retriever;

pub use format::format_for_prompt;
pub use retriever::{ContextRetriever, DEFAULT_CONTEXT_ITEMS};

use crate::memory::RecentResult;
use crate::storage::{CommandRecord, ConversationRecord, FileInteraction};
use serde::{Deserialize, Serialize};

/// Everything handed to the decision layer for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub related_conversations: Vec<ConversationRecord>,
    pub related_files: Vec<RelatedFile>,
    pub related_commands: Vec<CommandRecord>,
    /// Always the full recent-results window, oldest first.
    pub recent_results: Vec<RecentResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedFile {
    pub path: String,
    /// Newest first.
    pub interactions: Vec<FileInteraction>,
}

impl ContextBundle {
    pub fn is_empty(&self) -> bool {
        self.related_conversations.is_empty()
            && self.related_files.is_empty()
            && self.related_commands.is_empty()
            && self.recent_results.is_empty()
    }
}
