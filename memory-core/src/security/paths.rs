/// Path normalization for file-interaction keys

use std::path::{Component, Path, PathBuf};

/// Expand a leading `~` to the user's home directory.
pub fn expand_user(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

/// Absolute, user-expanded form of `raw` with `.` and `..` removed
/// lexically. The filesystem is never consulted, so symlinks are kept as
/// written and the path does not need to exist.
pub fn normalize_path(raw: &str) -> PathBuf {
    let cleaned = raw.trim().replace('\0', "");
    let expanded = expand_user(&cleaned);

    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(expanded)
    };

    lexical_clean(&absolute)
}

/// Normalized path as the string used for store keys.
pub fn normalize_key(raw: &str) -> String {
    normalize_path(raw).to_string_lossy().into_owned()
}

fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            // `..` at the root stays at the root
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
