/// Utterances answered straight from short-term memory, in Spanish or English

use crate::context::format::truncate;
use crate::memory::ShortTermMemory;
use chrono::Local;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Result kind that holds whatever the user asked to remember.
pub const REMEMBER_KIND: &str = "remember";

const LAST_OPERATION_CHARS: usize = 200;
const LIST_PREVIEW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Spanish,
    English,
}

impl Language {
    fn pick<'a>(self, spanish: &'a str, english: &'a str) -> &'a str {
        match self {
            Language::Spanish => spanish,
            Language::English => english,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryCommand {
    Remember(String),
    Forget(String),
    ListFiles,
    LastOperation,
}

struct CommandPatterns {
    remember: Regex,
    forget: Regex,
    list_files: Regex,
    last_operation: Regex,
}

static COMMAND_PATTERNS: OnceLock<CommandPatterns> = OnceLock::new();

fn command_patterns() -> &'static CommandPatterns {
    COMMAND_PATTERNS.get_or_init(|| CommandPatterns {
        remember: Regex::new(r"(?i)\b(?P<verb>recordar|remember)\s+(?P<info>.+)")
            .expect("remember pattern is valid"),
        forget: Regex::new(r"(?i)\b(?P<verb>olvidar|forget)\s+(?P<info>.+)")
            .expect("forget pattern is valid"),
        list_files: Regex::new(
            r"(?i)\b(?:(?P<es>mostrar archivos|listar archivos encontrados)|show files|list found files)\b",
        )
        .expect("list pattern is valid"),
        last_operation: Regex::new(r"(?i)(?:(?P<es>[úu]ltima operaci[óo]n)|\blast operation\b)")
            .expect("last operation pattern is valid"),
    })
}

fn language_of(verb: &str) -> Language {
    match verb.to_lowercase().as_str() {
        "recordar" | "olvidar" => Language::Spanish,
        _ => Language::English,
    }
}

/// Recognize a memory command. Anything else is left for the decision
/// layer.
pub fn parse_memory_command(text: &str) -> Option<(MemoryCommand, Language)> {
    let patterns = command_patterns();

    if let Some(caps) = patterns.remember.captures(text) {
        let info = caps["info"].trim();
        if !info.is_empty() {
            return Some((MemoryCommand::Remember(info.to_string()), language_of(&caps["verb"])));
        }
    }

    if let Some(caps) = patterns.forget.captures(text) {
        let info = caps["info"].trim();
        if !info.is_empty() {
            return Some((MemoryCommand::Forget(info.to_string()), language_of(&caps["verb"])));
        }
    }

    if let Some(caps) = patterns.list_files.captures(text) {
        let lang = if caps.name("es").is_some() { Language::Spanish } else { Language::English };
        return Some((MemoryCommand::ListFiles, lang));
    }

    if let Some(caps) = patterns.last_operation.captures(text) {
        let lang = if caps.name("es").is_some() { Language::Spanish } else { Language::English };
        return Some((MemoryCommand::LastOperation, lang));
    }

    None
}

/// Run a parsed command against `memory` and return the reply text.
pub fn execute_memory_command(
    command: &MemoryCommand,
    lang: Language,
    memory: &mut ShortTermMemory,
) -> String {
    match command {
        MemoryCommand::Remember(info) => {
            memory.store_result(REMEMBER_KIND, Value::String(info.clone()));
            format!("{}: {}", lang.pick("He recordado", "Remembered"), info)
        }
        MemoryCommand::Forget(info) => {
            let stored = matches!(memory.get_result(REMEMBER_KIND), Some(Value::String(s)) if s == info);
            if stored {
                memory.forget(REMEMBER_KIND);
                format!("{}: {}", lang.pick("He olvidado", "Forgot"), info)
            } else {
                format!(
                    "{}: {}",
                    lang.pick("No recuerdo haber guardado", "I don't remember storing"),
                    info
                )
            }
        }
        MemoryCommand::ListFiles => render_found_files(memory, lang),
        MemoryCommand::LastOperation => render_last_operation(memory, lang),
    }
}

/// Parse and run in one step. `None` means the text is not a memory command.
pub fn handle_memory_command(text: &str, memory: &mut ShortTermMemory) -> Option<String> {
    let (command, lang) = parse_memory_command(text)?;
    tracing::debug!(?command, "Handling memory command");
    Some(execute_memory_command(&command, lang, memory))
}

fn render_found_files(memory: &ShortTermMemory, lang: Language) -> String {
    let files = memory.found_files();
    if files.is_empty() {
        return lang
            .pick(
                "No hay archivos en la memoria. Realiza una búsqueda primero.",
                "No files in memory. Run a search first.",
            )
            .to_string();
    }

    let mut lines = vec![lang
        .pick("Archivos encontrados en la última búsqueda:", "Files found in the last search:")
        .to_string()];
    for (i, file) in files.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, file));
    }
    lines.join("\n")
}

fn render_last_operation(memory: &ShortTermMemory, lang: Language) -> String {
    let last = memory.last_operation();
    let Some(kind) = last.kind.as_deref() else {
        return lang
            .pick(
                "No hay operaciones recientes en la memoria.",
                "No recent operations in memory.",
            )
            .to_string();
    };

    let mut lines = vec![format!("{}: {}", lang.pick("Última operación", "Last operation"), kind)];

    if let Some(ts) = last.timestamp {
        lines.push(format!(
            "{}: {}",
            lang.pick("Realizada a las", "Performed at"),
            ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }

    match &last.result {
        Some(Value::Array(items)) if !items.is_empty() => {
            lines.push(format!(
                "{}: {} {} {}",
                lang.pick("Resultado", "Result"),
                lang.pick("lista con", "list with"),
                items.len(),
                lang.pick("elementos", "items")
            ));
            lines.push(lang.pick("Primeros elementos:", "First items:").to_string());
            for (i, item) in items.iter().take(LIST_PREVIEW).enumerate() {
                lines.push(format!("  {}. {}", i + 1, display_value(item)));
            }
            if items.len() > LIST_PREVIEW {
                lines.push(format!(
                    "  ... {} {} {}",
                    lang.pick("y", "and"),
                    items.len() - LIST_PREVIEW,
                    lang.pick("más", "more")
                ));
            }
        }
        Some(value) if !is_blank(value) => {
            lines.push(format!(
                "{}: {}",
                lang.pick("Resultado", "Result"),
                truncate(&display_value(value), LAST_OPERATION_CHARS)
            ));
        }
        _ => {}
    }

    lines.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
