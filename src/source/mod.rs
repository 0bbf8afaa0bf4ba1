//! Data source abstraction for loading board snapshots.
//!
//! This module provides a trait-based abstraction over where a snapshot
//! comes from: the live Trello API, a snapshot file saved earlier, or a
//! time-boxed cache in front of either.

mod cached;
mod file;
mod trello;

pub use cached::{CachedSource, DEFAULT_CACHE_TTL};
pub use file::{save_snapshot, FileSource};
pub use trello::TrelloSource;

use std::fmt::Debug;

use boardpulse_types::Snapshot;

/// Trait for loading board snapshots from various sources.
///
/// # Example
///
/// ```no_run
/// use boardpulse::{DataSource, FileSource};
///
/// let mut source = FileSource::new("board.json");
/// let snapshot = source.load()?;
/// println!("{} cards from {}", snapshot.cards.len(), source.description());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub trait DataSource: Send + Debug {
    /// Load a complete snapshot.
    ///
    /// Each call may hit the backend again; wrap the source in a
    /// [`CachedSource`] to reuse recent results.
    fn load(&mut self) -> anyhow::Result<Snapshot>;

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}

impl<S: DataSource + ?Sized> DataSource for Box<S> {
    fn load(&mut self) -> anyhow::Result<Snapshot> {
        (**self).load()
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}
