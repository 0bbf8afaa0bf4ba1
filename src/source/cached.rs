//! Time-boxed cache in front of another source.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::debug;

use boardpulse_types::Snapshot;

use super::DataSource;

/// Snapshots younger than this are reused.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Reuses the last snapshot of the wrapped source until it is older than the
/// TTL or [`invalidate`](Self::invalidate) is called.
///
/// Failed loads are not cached.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    cached: Option<(Instant, Snapshot)>,
    description: String,
}

impl<S: DataSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        let description = format!("{} (cached {}s)", inner.description(), ttl.as_secs());
        Self {
            inner,
            ttl,
            cached: None,
            description,
        }
    }

    /// Drop the cached snapshot; the next load goes to the wrapped source.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// A cached snapshot exists and is younger than the TTL.
    pub fn is_fresh(&self) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|(at, _)| at.elapsed() < self.ttl)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: DataSource> DataSource for CachedSource<S> {
    fn load(&mut self) -> Result<Snapshot> {
        if self.is_fresh() {
            if let Some((at, snapshot)) = &self.cached {
                debug!(age_secs = at.elapsed().as_secs(), "using cached snapshot");
                return Ok(snapshot.clone());
            }
        }

        let snapshot = self.inner.load()?;
        self.cached = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }

    fn description(&self) -> &str {
        &self.description
    }
}
