use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MemoryError;

/// One logged user/assistant exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub assistant_response: String,
    #[serde(default)]
    pub executed_code: Option<String>,
    #[serde(default)]
    pub code_result: Option<String>,
    #[serde(default)]
    pub related_files: Vec<String>,
    #[serde(default)]
    pub related_conversations: Vec<ConversationLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationLink {
    pub id: String,
    pub relation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    Read,
    Write,
    Modify,
}

impl FileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileAction::Read => "read",
            FileAction::Write => "write",
            FileAction::Modify => "modify",
        }
    }
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileAction {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "read" => Ok(FileAction::Read),
            "write" => Ok(FileAction::Write),
            "modify" => Ok(FileAction::Modify),
            other => Err(MemoryError::InvalidInput(format!("unknown file action: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInteraction {
    pub timestamp: DateTime<Utc>,
    pub action: FileAction,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub result: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Everything the store persists. Written whole on every save; missing
/// fields load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySnapshot {
    /// Newest first.
    pub conversations: Vec<ConversationRecord>,
    /// Absolute path -> interactions, newest first.
    pub file_interactions: BTreeMap<String, Vec<FileInteraction>>,
    /// Newest first.
    pub command_history: Vec<CommandRecord>,
    pub last_updated: DateTime<Utc>,
}
