/// Lexical scan of generated code for the files it touches.
///
/// A heuristic for enriching the interaction log, not an analysis: a miss
/// just means nothing gets logged.

use crate::storage::FileAction;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub path: String,
    pub action: FileAction,
}

struct Patterns {
    open: Regex,
    path_write: Regex,
    fs_modify: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        // open('p') / open("p", "w") / open('p', mode='a'), but not `.open(`
        open: Regex::new(
            r#"(?:^|[^.\w])open\(\s*['"]([^'"]+)['"](?:\s*,\s*(?:mode\s*=\s*)?['"]([^'"]*)['"])?"#,
        )
        .expect("open pattern is valid"),
        path_write: Regex::new(
            r#"\bPath\(\s*['"]([^'"]+)['"]\s*\)\.(?:write_text|write_bytes|open)\b"#,
        )
        .expect("path pattern is valid"),
        fs_modify: Regex::new(r#"\bos\.(?:rename|makedirs|mkdir)\(\s*['"]([^'"]+)['"]"#)
            .expect("os pattern is valid"),
    })
}

/// Every `(path, action)` the snippet appears to touch, in pattern order:
/// `open` calls, then path-object writes, then rename/mkdir calls.
pub fn extract_file_references(code: &str) -> Vec<FileReference> {
    let patterns = patterns();
    let mut refs = Vec::new();

    for caps in patterns.open.captures_iter(code) {
        let mode = caps.get(2).map(|m| m.as_str()).unwrap_or("r");
        let action = if mode.contains('w') || mode.contains('a') {
            FileAction::Write
        } else {
            FileAction::Read
        };
        refs.push(FileReference {
            path: caps[1].to_string(),
            action,
        });
    }

    for caps in patterns.path_write.captures_iter(code) {
        refs.push(FileReference {
            path: caps[1].to_string(),
            action: FileAction::Write,
        });
    }

    for caps in patterns.fs_modify.captures_iter(code) {
        refs.push(FileReference {
            path: caps[1].to_string(),
            action: FileAction::Modify,
        });
    }

    refs
}
