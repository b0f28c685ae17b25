/// Ordered reference patterns, evaluated first match wins

use crate::memory::ORDINAL_WORDS_PATTERN;
use regex::Regex;
use std::sync::OnceLock;

pub const ARTICLES: &str = "el|la|los|las|the";
pub const NOUNS: &str = "archivo|documento|fichero|file|document";
pub const NUMBER_WORDS: &str = "número|numero|number";

/// Words that turn "the last ..." into a last-result reference rather than a
/// file reference.
const RESULT_WORDS: &[&str] = &["resultado", "result"];

#[derive(Debug)]
pub struct ReferenceRule {
    pub name: &'static str,
    /// Must define a `reference` capture group.
    pub regex: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<'t> {
    pub rule: &'static str,
    /// Ordinal word or number to resolve.
    pub reference: &'t str,
    /// The whole matched phrase.
    pub phrase: &'t str,
    pub start: usize,
    pub end: usize,
}

static FILE_RULES: OnceLock<Vec<ReferenceRule>> = OnceLock::new();
static LAST_RESULT_REGEX: OnceLock<Regex> = OnceLock::new();

fn rule(name: &'static str, pattern: String) -> ReferenceRule {
    ReferenceRule {
        name,
        regex: Regex::new(&pattern).expect("reference pattern is valid"),
    }
}

/// The file-reference grammar in priority order.
pub fn file_rules() -> &'static [ReferenceRule] {
    FILE_RULES.get_or_init(|| {
        vec![
            // "el primero", "the second file", "the last one"
            rule(
                "ordinal_word",
                format!(
                    r"(?i)\b(?:{ARTICLES})\s+(?:(?:{NOUNS})\s+)?(?P<reference>{ORDINAL_WORDS_PATTERN})\b(?:\s+(?:one|{NOUNS})\b)?"
                ),
            ),
            // "el archivo 2", "the file number 3"
            rule(
                "noun_number",
                format!(r"(?i)\b(?:{ARTICLES})\s+(?:{NOUNS})\s+(?:(?:{NUMBER_WORDS})\s+)?(?P<reference>\d+)\b"),
            ),
            // "el 2", "la 3º", "the 2"
            rule(
                "article_number",
                format!(r"(?i)\b(?:{ARTICLES})\s+(?P<reference>\d+)(?:[º°]|\b)"),
            ),
            // "número 2"
            rule(
                "bare_number",
                format!(r"(?i)\b(?:{NUMBER_WORDS})\s+(?P<reference>\d+)\b"),
            ),
            // "archivo 3", "item 3"
            rule(
                "bare_noun",
                format!(r"(?i)\b(?:{NOUNS}|item)\s+(?P<reference>\d+)\b"),
            ),
        ]
    })
}

pub fn last_result_regex() -> &'static Regex {
    LAST_RESULT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)\b(?:último|ultimo|last)\s+(?:resultado|result)\b")
            .expect("last-result pattern is valid")
    })
}

fn followed_by_result_word(text: &str, end: usize) -> bool {
    let rest = text[end..].trim_start().to_lowercase();
    RESULT_WORDS.iter().any(|w| rest.starts_with(w))
}

/// First match of the highest-priority rule that matches at all.
pub fn find_file_reference(text: &str) -> Option<RuleMatch<'_>> {
    for rule in file_rules() {
        let hit = rule.regex.captures_iter(text).find_map(|caps| {
            let whole = caps.get(0)?;
            let reference = caps.name("reference")?;
            if followed_by_result_word(text, whole.end()) {
                return None;
            }
            Some(RuleMatch {
                rule: rule.name,
                reference: reference.as_str(),
                phrase: whole.as_str(),
                start: whole.start(),
                end: whole.end(),
            })
        });
        if hit.is_some() {
            return hit;
        }
    }
    None
}
