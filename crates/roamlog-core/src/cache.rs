//! Durable local snapshot of the trip collection.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Trip;
use crate::storage::KeyValueStore;
use crate::util::unix_timestamp_millis;

const CACHE_KEY: &str = "cached_trips";

/// The cached collection plus its write stamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTrips {
    pub data: Vec<Trip>,
    pub cached_at: i64,
}

/// Full-replace trip cache over a key-value store.
///
/// Every write replaces the whole collection; the facade computes the
/// resulting collection before calling [`TripCache::put`].
#[derive(Debug, Clone)]
pub struct TripCache<S> {
    store: S,
}

impl<S: KeyValueStore> TripCache<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Durably overwrite the cached collection, stamped with the
    /// current time.
    pub async fn put(&self, trips: &[Trip]) -> Result<()> {
        let envelope = CachedTrips {
            data: trips.to_vec(),
            cached_at: unix_timestamp_millis(),
        };
        let serialized = serde_json::to_string(&envelope)?;
        self.store.set(CACHE_KEY, &serialized).await
    }

    /// The last cached collection, or `None` if never cached.
    pub async fn get(&self) -> Result<Option<Vec<Trip>>> {
        Ok(self.snapshot().await?.map(|snapshot| snapshot.data))
    }

    /// The cached collection with its stamp, for staleness display.
    pub async fn snapshot(&self) -> Result<Option<CachedTrips>> {
        let Some(raw) = self.store.get(CACHE_KEY).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}
