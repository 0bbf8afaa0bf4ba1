//! File-based data source.
//!
//! Reads a snapshot previously written with [`save_snapshot`] (or by hand,
//! in the same JSON shape the Trello API returns).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use boardpulse_types::Snapshot;

use super::DataSource;

/// A data source that reads a board snapshot from a JSON file.
///
/// The file is read again on every [`load`](DataSource::load).
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self { path, description }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DataSource for FileSource {
    fn load(&mut self) -> Result<Snapshot> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Read error: {}", self.path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Parse error: {}", self.path.display()))?;

        if !snapshot.version.is_compatible() {
            bail!(
                "{} was written with snapshot schema {}.{}, which this build cannot read",
                self.path.display(),
                snapshot.version.major,
                snapshot.version.minor
            );
        }

        debug!(path = %self.path.display(), cards = snapshot.cards.len(), "loaded snapshot file");
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Write `snapshot` as pretty JSON, readable by [`FileSource`].
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot)?;
    let mut file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;

    info!(path = %path.display(), "saved snapshot");
    Ok(())
}
