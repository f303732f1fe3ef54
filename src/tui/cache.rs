//! Load cache owned by the dashboard.
//!
//! A loaded table (or the failure to load one) is reused for `ttl`; a forced
//! refresh drops it with `invalidate`.

use std::time::{Duration, Instant};

use crate::domain::ObservationTable;
use crate::error::TableError;
use crate::io::TableLoader;

/// How long a load result is reused by default.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

pub struct TableCache<L> {
    loader: L,
    ttl: Duration,
    entry: Option<(Instant, Result<ObservationTable, TableError>)>,
}

impl<L: TableLoader> TableCache<L> {
    pub fn new(loader: L, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            entry: None,
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The cached load result, reloading first if it is missing or stale.
    pub fn get(&mut self) -> Result<ObservationTable, TableError> {
        if let Some((at, result)) = &self.entry {
            if at.elapsed() < self.ttl {
                return result.clone();
            }
        }
        let result = self.loader.load();
        self.entry = Some((Instant::now(), result.clone()));
        result
    }

    /// Forget the cached result; the next `get` reloads.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    /// When the cached result was loaded, if any.
    pub fn loaded_at(&self) -> Option<Instant> {
        self.entry.as_ref().map(|(at, _)| *at)
    }
}
