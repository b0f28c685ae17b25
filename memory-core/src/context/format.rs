/// Renders a context bundle as the text block injected into the decision prompt

use super::ContextBundle;
use chrono::{DateTime, Local, Utc};

const RECENT_RESULT_CHARS: usize = 150;
const CONVERSATION_RESULT_CHARS: usize = 100;
const COMMAND_RESULT_CHARS: usize = 100;

/// Sections appear in a fixed order (recent results, conversations, files,
/// commands), empty ones are omitted, and one blank line separates them.
pub fn format_for_prompt(bundle: &ContextBundle) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !bundle.recent_results.is_empty() {
        let mut lines = vec!["Recent command results:".to_string()];
        for (i, result) in bundle.recent_results.iter().enumerate() {
            lines.push(format!(
                "{}. {} - Query: {}",
                i + 1,
                local_time(&result.timestamp),
                result.query
            ));
            lines.push(format!("   Result: {}", truncate(&result.result, RECENT_RESULT_CHARS)));
        }
        sections.push(lines.join("\n"));
    }

    if !bundle.related_conversations.is_empty() {
        let mut lines = vec!["Relevant previous conversations:".to_string()];
        for (i, conv) in bundle.related_conversations.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, local_time(&conv.timestamp)));
            lines.push(format!("   User: {}", conv.user_input));
            lines.push(format!("   Assistant: {}", conv.assistant_response));
            if let Some(result) = conv.code_result.as_deref().filter(|r| !r.is_empty()) {
                lines.push(format!("   Result: {}", truncate(result, CONVERSATION_RESULT_CHARS)));
            }
        }
        sections.push(lines.join("\n"));
    }

    if !bundle.related_files.is_empty() {
        let mut lines = vec!["Relevant files:".to_string()];
        for file in &bundle.related_files {
            let (action, when) = match file.interactions.first() {
                Some(latest) => (latest.action.to_string(), local_time(&latest.timestamp)),
                None => ("unknown".to_string(), "unknown".to_string()),
            };
            lines.push(format!("- {} (last action: {} at {})", file.path, action, when));
        }
        sections.push(lines.join("\n"));
    }

    if !bundle.related_commands.is_empty() {
        let mut lines = vec!["Recent relevant commands:".to_string()];
        for cmd in &bundle.related_commands {
            lines.push(format!("- {}: {}", local_time(&cmd.timestamp), cmd.command));
            if !cmd.result.is_empty() {
                lines.push(format!("  Result: {}", truncate(&cmd.result, COMMAND_RESULT_CHARS)));
            }
        }
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

fn local_time(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Cut to `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}
