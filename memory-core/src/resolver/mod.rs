/// Rewrites ambiguous references in a command using short-term memory

pub mod rules;

use crate::memory::ShortTermMemory;
use regex::{NoExpand, Regex};
use rules::{find_file_reference, last_result_regex, RuleMatch, ARTICLES, NOUNS, NUMBER_WORDS};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    File { phrase: String, path: String },
    LastResult { value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCommand {
    pub text: String,
    pub substitutions: Vec<Substitution>,
}

impl ResolvedCommand {
    pub fn changed(&self) -> bool {
        !self.substitutions.is_empty()
    }
}

/// Two independent passes: file ordinals, then "last result". Neither can
/// fail; anything unresolved is passed through as written.
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver;

impl ReferenceResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, command: &str, memory: &ShortTermMemory) -> ResolvedCommand {
        let mut substitutions = Vec::new();

        let text = match self.resolve_file_reference(command, memory) {
            Some((text, sub)) => {
                substitutions.push(sub);
                text
            }
            None => command.to_string(),
        };

        let text = match self.resolve_last_result(&text, memory) {
            Some((text, sub)) => {
                substitutions.push(sub);
                text
            }
            None => text,
        };

        if !substitutions.is_empty() {
            tracing::debug!(original = command, resolved = %text, "Resolved references");
        }

        ResolvedCommand { text, substitutions }
    }

    fn resolve_file_reference(
        &self,
        command: &str,
        memory: &ShortTermMemory,
    ) -> Option<(String, Substitution)> {
        let found = find_file_reference(command)?;
        let path = memory.get_file_by_ordinal(found.reference)?;

        let replacement = format!("{} \"{}\"", file_phrase(&found), path);
        let text = replace_reference(command, &found, &replacement);

        Some((
            text,
            Substitution::File {
                phrase: found.phrase.to_string(),
                path: path.to_string(),
            },
        ))
    }

    fn resolve_last_result(
        &self,
        command: &str,
        memory: &ShortTermMemory,
    ) -> Option<(String, Substitution)> {
        let regex = last_result_regex();
        if !regex.is_match(command) {
            return None;
        }

        let last = memory.last_operation();
        last.kind.as_ref()?;
        let value = match last.result.as_ref()? {
            Value::String(s) => s.clone(),
            Value::Array(items) => match items.first()? {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            _ => return None,
        };

        let quoted = format!("\"{}\"", value);
        let text = regex.replace_all(command, NoExpand(&quoted)).into_owned();
        Some((text, Substitution::LastResult { value }))
    }
}

/// Replace the reference phrase with `replacement`.
///
/// Tries the canonical phrasing built from the reference token first
/// (article, optional noun, optional "number" word, token), then just the
/// article plus token, and finally the span the rule matched. Bare forms
/// such as "archivo 3" only ever hit the last case.
fn replace_reference(command: &str, found: &RuleMatch<'_>, replacement: &str) -> String {
    let token = regex::escape(found.reference);
    let candidates = [
        format!(r"(?i)\b(?:{ARTICLES})\s+(?:(?:{NOUNS})\s+)?(?:(?:{NUMBER_WORDS})\s+)?{token}\b"),
        format!(r"(?i)\b(?:{ARTICLES})\s+{token}\b"),
    ];

    for pattern in &candidates {
        let Ok(regex) = Regex::new(pattern) else {
            continue;
        };
        // Only accept a hit that overlaps the rule's own match, so an
        // unrelated earlier phrase with the same token is left alone.
        if let Some(m) = regex.find(command) {
            if m.start() <= found.start && m.end() >= found.start {
                let end = m.end().max(found.end);
                return splice(command, m.start(), end, replacement);
            }
        }
    }

    splice(command, found.start, found.end, replacement)
}

fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}

fn file_phrase(found: &RuleMatch<'_>) -> &'static str {
    let first_word = found
        .phrase
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match first_word.as_str() {
        "the" | "file" | "document" | "number" | "item" => "the file",
        _ => "el archivo",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FILE_SEARCH;
    use serde_json::json;

    fn memory_with(files: Value) -> ShortTermMemory {
        let mut memory = ShortTermMemory::default();
        memory.store_result(FILE_SEARCH, files);
        memory
    }

    #[test]
    fn test_resolves_first_file() {
        let memory = memory_with(json!(["/x/report.pdf"]));
        let resolved = ReferenceResolver::new().resolve("abre el primero", &memory);
        assert!(resolved.text.contains("/x/report.pdf"));
        assert_eq!(resolved.text, "abre el archivo \"/x/report.pdf\"");
        assert!(resolved.changed());
    }

    #[test]
    fn test_no_files_leaves_command_unchanged() {
        let memory = ShortTermMemory::default();
        let resolved = ReferenceResolver::new().resolve("abre el primero", &memory);
        assert_eq!(resolved.text, "abre el primero");
        assert!(!resolved.changed());
    }

    #[test]
    fn test_out_of_range_leaves_command_unchanged() {
        let memory = memory_with(json!(["/a.txt"]));
        let resolved = ReferenceResolver::new().resolve("abre el tercero", &memory);
        assert_eq!(resolved.text, "abre el tercero");
    }

    #[test]
    fn test_noun_number_form() {
        let memory = memory_with(json!(["/a.txt", "/b.txt"]));
        let resolved = ReferenceResolver::new().resolve("borra el archivo número 2 ahora", &memory);
        assert_eq!(resolved.text, "borra el archivo \"/b.txt\" ahora");
    }

    #[test]
    fn test_article_number_form() {
        let memory = memory_with(json!(["/a.txt", "/b.txt", "/c.txt"]));
        let resolver = ReferenceResolver::new();

        assert_eq!(resolver.resolve("abre el 2", &memory).text, "abre el archivo \"/b.txt\"");
        assert_eq!(
            resolver.resolve("abre la 3º ahora", &memory).text,
            "abre el archivo \"/c.txt\" ahora"
        );
        assert_eq!(resolver.resolve("open the 1", &memory).text, "open the file \"/a.txt\"");
        assert_eq!(resolver.resolve("abre el 7", &memory).text, "abre el 7");
    }

    #[test]
    fn test_bare_form_replaces_matched_span() {
        let memory = memory_with(json!(["/a.txt", "/b.txt", "/c.txt"]));
        let resolved = ReferenceResolver::new().resolve("abre archivo 3", &memory);
        assert_eq!(resolved.text, "abre el archivo \"/c.txt\"");
    }

    #[test]
    fn test_english_phrase() {
        let memory = memory_with(json!(["/a.txt", "/b.txt"]));
        let resolved = ReferenceResolver::new().resolve("open the last one", &memory);
        assert_eq!(resolved.text, "open the file \"/b.txt\"");
    }

    #[test]
    fn test_last_result_string() {
        let mut memory = ShortTermMemory::default();
        memory.store_result("read_file", json!("/etc/hosts"));
        let resolved = ReferenceResolver::new().resolve("muestra el último resultado", &memory);
        assert_eq!(resolved.text, "muestra el \"/etc/hosts\"");
        assert_eq!(
            resolved.substitutions,
            vec![Substitution::LastResult { value: "/etc/hosts".to_string() }]
        );
    }

    #[test]
    fn test_last_result_list_uses_first_element() {
        let memory = memory_with(json!(["/a.txt", "/b.txt"]));
        let resolved = ReferenceResolver::new().resolve("copy the last result", &memory);
        assert_eq!(resolved.text, "copy the \"/a.txt\"");
    }

    #[test]
    fn test_last_result_unresolvable_values() {
        let resolver = ReferenceResolver::new();

        let empty = ShortTermMemory::default();
        assert_eq!(resolver.resolve("copy the last result", &empty).text, "copy the last result");

        let empty_list = memory_with(json!([]));
        assert_eq!(resolver.resolve("copy the last result", &empty_list).text, "copy the last result");

        let mut number = ShortTermMemory::default();
        number.store_result("count", json!(42));
        assert_eq!(resolver.resolve("copy the last result", &number).text, "copy the last result");
    }

    #[test]
    fn test_passes_are_independent() {
        let memory = memory_with(json!(["/a.txt", "/b.txt"]));
        let resolved = ReferenceResolver::new()
            .resolve("compara el segundo con el último resultado", &memory);
        assert_eq!(
            resolved.text,
            "compara el archivo \"/b.txt\" con el \"/a.txt\""
        );
        assert_eq!(resolved.substitutions.len(), 2);
    }

    #[test]
    fn test_dollar_signs_in_paths_are_literal() {
        let memory = memory_with(json!(["/tmp/$HOME/a.txt"]));
        let resolved = ReferenceResolver::new().resolve("abre el primero", &memory);
        assert_eq!(resolved.text, "abre el archivo \"/tmp/$HOME/a.txt\"");
    }
}
