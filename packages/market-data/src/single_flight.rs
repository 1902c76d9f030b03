//! Per-key de-duplication of concurrent fetches.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::error::Result;

/// Concurrent callers asking for the same key while a fetch is in flight wait
/// on that fetch instead of starting their own. The slot is dropped once the
/// fetch settles, so later callers fetch afresh (normally after a cache hit).
pub struct SingleFlight<V> {
    in_flight: DashMap<String, Arc<OnceCell<Result<V>>>>,
}

impl<V: Clone> SingleFlight<V> {
    pub fn new() -> Self {
        Self {
            in_flight: DashMap::new(),
        }
    }

    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        // The map guard must not live across the await below.
        let cell = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .value()
            .clone();

        let outcome = cell.get_or_init(fetch).await.clone();

        self.in_flight
            .remove_if(key, |_, current| Arc::ptr_eq(current, &cell));
        outcome
    }

    /// Keys with a fetch currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl<V: Clone> Default for SingleFlight<V> {
    fn default() -> Self {
        Self::new()
    }
}
