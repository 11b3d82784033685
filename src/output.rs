use std::{fs, path::Path};

use anyhow::Context;

use crate::entry::Entry;

/// Write `entries` as a pretty-printed JSON array.
pub fn write_json(entries: &[Entry], path: &Path) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(entries)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), count = entries.len(), "wrote records");
    Ok(())
}

/// Read back a dump written by [`write_json`].
pub fn read_json(path: &Path) -> anyhow::Result<Vec<Entry>> {
    let json = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("malformed record dump {}", path.display()))
}
