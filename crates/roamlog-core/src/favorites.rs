//! Favorited trip ids, kept outside the synced trip records.

use crate::error::Result;
use crate::storage::KeyValueStore;

const FAVORITES_KEY: &str = "favorite_trips";

/// Durable set of favorited trip ids.
///
/// The set lives only on-device; the facade joins it into the
/// `is_favorite` flag on every read.
#[derive(Debug, Clone)]
pub struct FavoritesStore<S> {
    store: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Ids of all favorited trips.
    pub async fn list(&self) -> Result<Vec<String>> {
        let Some(raw) = self.store.get(FAVORITES_KEY).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw)?)
    }

    /// Add the id when absent, remove it when present. Returns the
    /// updated set.
    pub async fn toggle(&self, trip_id: &str) -> Result<Vec<String>> {
        let mut favorites = self.list().await?;
        if favorites.iter().any(|id| id == trip_id) {
            favorites.retain(|id| id != trip_id);
        } else {
            favorites.push(trip_id.to_string());
        }

        let serialized = serde_json::to_string(&favorites)?;
        self.store.set(FAVORITES_KEY, &serialized).await?;
        Ok(favorites)
    }
}
