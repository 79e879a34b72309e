//! Trip service facade - the single entry point consumed by UI code.
//!
//! Every operation decides between the live and the offline path via
//! the connectivity oracle, normalizes data at the boundary, joins the
//! favorites set on reads, and keeps cache and queue consistent with
//! every mutation. Offline mutations write the queue first and the
//! cache second, so the queue is always the source of truth for
//! pending work.

use crate::cache::TripCache;
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::favorites::FavoritesStore;
use crate::models::{ActionKind, HttpMethod, NewTrip, Trip, TripPatch};
use crate::queue::OfflineQueue;
use crate::remote::TripsRemote;
use crate::storage::KeyValueStore;
use crate::util::unix_timestamp_millis;

pub struct TripService<S, C, R> {
    cache: TripCache<S>,
    queue: OfflineQueue<S>,
    favorites: FavoritesStore<S>,
    connectivity: C,
    remote: R,
}

impl<S, C, R> TripService<S, C, R>
where
    S: KeyValueStore + Clone,
    C: Connectivity,
    R: TripsRemote,
{
    /// Wire the facade from its collaborators. Cache, queue, and
    /// favorites views share the given store.
    pub fn new(store: S, connectivity: C, remote: R) -> Self {
        Self {
            cache: TripCache::new(store.clone()),
            queue: OfflineQueue::new(store.clone()),
            favorites: FavoritesStore::new(store),
            connectivity,
            remote,
        }
    }

    /// Pending-action queue view, for host inspection.
    pub const fn queue(&self) -> &OfflineQueue<S> {
        &self.queue
    }

    /// Cache view, for host staleness display.
    pub const fn cache(&self) -> &TripCache<S> {
        &self.cache
    }

    /// List trips: live when online, cached otherwise.
    ///
    /// Any failure along the live path degrades to the cache and is
    /// never surfaced to the caller.
    pub async fn get_trips(&self) -> Result<Vec<Trip>> {
        if self.connectivity.is_online().await {
            match self.fetch_and_cache().await {
                Ok(trips) => return self.join_favorites(trips).await,
                Err(error) => {
                    tracing::warn!("Trip fetch failed, serving cached trips: {error}");
                }
            }
        }

        let trips = self.cache.get().await?.unwrap_or_default();
        self.join_favorites(trips).await
    }

    /// Fetch one trip: from the remote when online, from the cache
    /// otherwise. An offline cache miss is a hard error.
    pub async fn get_trip(&self, id: &str) -> Result<Trip> {
        if !self.connectivity.is_online().await {
            let trips = self.cache.get().await?.unwrap_or_default();
            let trip = trips
                .into_iter()
                .find(|trip| trip.id.as_deref() == Some(id))
                .ok_or_else(|| Error::NotFound(format!("trip {id} not in cache")))?;
            return self.join_favorite(trip).await;
        }

        let trip = self.remote.fetch_trip(id).await?.normalized();
        self.join_favorite(trip).await
    }

    /// Create a trip.
    ///
    /// Offline, the mutation is queued and a `local-<timestamp>` trip
    /// is returned immediately — the caller sees success before the
    /// remote system does (optimistic local-first write). Online, a
    /// remote failure is a hard error and nothing is created.
    pub async fn create_trip(&self, input: NewTrip) -> Result<Trip> {
        input.validate()?;
        let trip = input.into_trip();

        if !self.connectivity.is_online().await {
            self.queue
                .enqueue(
                    ActionKind::Create,
                    "/trips",
                    HttpMethod::Post,
                    serde_json::to_value(&trip)?,
                )
                .await?;

            let local = Trip {
                id: Some(format!("local-{}", unix_timestamp_millis())),
                ..trip
            };
            let mut trips = self.cache.get().await?.unwrap_or_default();
            trips.push(local.clone());
            self.cache.put(&trips).await?;

            tracing::info!("Created trip locally while offline");
            return Ok(local);
        }

        let created = self.remote.create_trip(&trip).await?.normalized();
        let mut trips = self.cache.get().await?.unwrap_or_default();
        trips.push(created.clone());
        self.cache.put(&trips).await?;
        Ok(created)
    }

    /// Update a trip with a partial patch.
    ///
    /// Offline, the patch is queued and eagerly merged into the cached
    /// entry so subsequent reads reflect the pending edit; a trip the
    /// cache has never seen is a hard error before anything is queued.
    pub async fn update_trip(&self, id: &str, patch: TripPatch) -> Result<Trip> {
        let patch = patch.normalized();

        if !self.connectivity.is_online().await {
            let mut trips = self.cache.get().await?.unwrap_or_default();
            let position = trips
                .iter()
                .position(|trip| trip.id.as_deref() == Some(id))
                .ok_or_else(|| Error::NotFound(format!("trip {id} not in cache")))?;

            self.queue
                .enqueue(
                    ActionKind::Update,
                    format!("/trips/{id}"),
                    HttpMethod::Put,
                    serde_json::to_value(&patch)?,
                )
                .await?;

            patch.apply_to(&mut trips[position]);
            let updated = trips[position].clone();
            self.cache.put(&trips).await?;
            return self.join_favorite(updated).await;
        }

        let updated = self.remote.update_trip(id, &patch).await?.normalized();
        let mut trips = self.cache.get().await?.unwrap_or_default();
        if let Some(entry) = trips
            .iter_mut()
            .find(|trip| trip.id.as_deref() == Some(id))
        {
            *entry = updated.clone();
        } else {
            trips.push(updated.clone());
        }
        self.cache.put(&trips).await?;
        self.join_favorite(updated).await
    }

    /// Delete a trip.
    ///
    /// Offline, the deletion is queued and the cached entry removed
    /// immediately. Online, a remote failure is a hard error and the
    /// cached entry stays.
    pub async fn delete_trip(&self, id: &str) -> Result<()> {
        if !self.connectivity.is_online().await {
            self.queue
                .enqueue(
                    ActionKind::Delete,
                    format!("/trips/{id}"),
                    HttpMethod::Delete,
                    serde_json::json!({ "id": id }),
                )
                .await?;
            return self.remove_from_cache(id).await;
        }

        self.remote.delete_trip(id).await?;
        self.remove_from_cache(id).await
    }

    /// Flip a trip's membership in the favorites set. Returns the
    /// updated set of favorited ids.
    pub async fn toggle_favorite(&self, id: &str) -> Result<Vec<String>> {
        self.favorites.toggle(id).await
    }

    async fn fetch_and_cache(&self) -> Result<Vec<Trip>> {
        let trips: Vec<Trip> = self
            .remote
            .list_trips()
            .await?
            .into_iter()
            .map(Trip::normalized)
            .collect();
        self.cache.put(&trips).await?;
        Ok(trips)
    }

    async fn remove_from_cache(&self, id: &str) -> Result<()> {
        let mut trips = self.cache.get().await?.unwrap_or_default();
        trips.retain(|trip| trip.id.as_deref() != Some(id));
        self.cache.put(&trips).await
    }

    async fn join_favorites(&self, mut trips: Vec<Trip>) -> Result<Vec<Trip>> {
        let favorites = self.favorites.list().await?;
        for trip in &mut trips {
            trip.is_favorite = trip
                .id
                .as_deref()
                .is_some_and(|id| favorites.iter().any(|favorite| favorite == id));
        }
        Ok(trips)
    }

    async fn join_favorite(&self, mut trip: Trip) -> Result<Trip> {
        let favorites = self.favorites.list().await?;
        trip.is_favorite = trip
            .id
            .as_deref()
            .is_some_and(|id| favorites.iter().any(|favorite| favorite == id));
        Ok(trip)
    }
}
