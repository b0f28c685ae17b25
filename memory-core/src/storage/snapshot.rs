use super::MemorySnapshot;
use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Read a snapshot. `Ok(None)` when the file does not exist yet.
pub fn read_snapshot(path: &Path) -> Result<Option<MemorySnapshot>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let snapshot: MemorySnapshot = serde_json::from_str(&content)?;
    Ok(Some(snapshot))
}

/// Replace the file at `path` with `snapshot`. The data goes to a temp file
/// beside the target first and is renamed over it, so readers never see a
/// half-written document.
pub fn write_snapshot(path: &Path, snapshot: &MemorySnapshot) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&parent)?;

    let content = serde_json::to_vec_pretty(snapshot)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(&content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
