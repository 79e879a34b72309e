//! Durable FIFO queue of mutations not yet confirmed by the remote system.

use serde_json::Value;

use crate::error::Result;
use crate::models::{ActionKind, HttpMethod, QueueAction};
use crate::storage::KeyValueStore;

const QUEUE_KEY: &str = "offline_queue";
const DEAD_LETTER_KEY: &str = "offline_queue_dead";

/// Consecutive replay failures before an action is dead-lettered.
pub const MAX_REPLAY_ATTEMPTS: u32 = 5;

/// Ordered log of pending mutations over a key-value store.
///
/// The whole queue is persisted on every change; actions replay in
/// enqueue order so a CREATE always precedes an UPDATE that references
/// the same local id.
#[derive(Debug, Clone)]
pub struct OfflineQueue<S> {
    store: S,
}

impl<S: KeyValueStore> OfflineQueue<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Append a mutation with a freshly generated id and timestamp.
    pub async fn enqueue(
        &self,
        kind: ActionKind,
        endpoint: impl Into<String>,
        method: HttpMethod,
        payload: Value,
    ) -> Result<QueueAction> {
        let action = QueueAction::new(kind, endpoint, method, payload);

        let mut actions = self.list().await?;
        actions.push(action.clone());
        self.save(QUEUE_KEY, &actions).await?;

        tracing::debug!(kind = %action.kind, endpoint = %action.endpoint, "Queued offline action");
        Ok(action)
    }

    /// Remove exactly one action by id.
    pub async fn remove(&self, action_id: &str) -> Result<()> {
        let mut actions = self.list().await?;
        actions.retain(|action| action.id != action_id);
        self.save(QUEUE_KEY, &actions).await
    }

    /// Current queue contents in insertion order.
    pub async fn list(&self) -> Result<Vec<QueueAction>> {
        self.load(QUEUE_KEY).await
    }

    /// Record a failed replay attempt for an action.
    ///
    /// After [`MAX_REPLAY_ATTEMPTS`] consecutive failures the action is
    /// moved to the dead-letter document instead of being retried on
    /// every drain forever. Returns `true` when that happened.
    pub async fn record_failure(&self, action_id: &str) -> Result<bool> {
        let mut actions = self.list().await?;
        let Some(position) = actions.iter().position(|action| action.id == action_id) else {
            return Ok(false);
        };

        actions[position].attempts += 1;
        if actions[position].attempts >= MAX_REPLAY_ATTEMPTS {
            let action = actions.remove(position);
            self.save(QUEUE_KEY, &actions).await?;

            let mut dead = self.dead_letters().await?;
            dead.push(action);
            self.save(DEAD_LETTER_KEY, &dead).await?;
            return Ok(true);
        }

        self.save(QUEUE_KEY, &actions).await?;
        Ok(false)
    }

    /// Actions given up on after repeated replay failures.
    pub async fn dead_letters(&self) -> Result<Vec<QueueAction>> {
        self.load(DEAD_LETTER_KEY).await
    }

    async fn load(&self, key: &str) -> Result<Vec<QueueAction>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_str(&raw)?)
    }

    async fn save(&self, key: &str, actions: &[QueueAction]) -> Result<()> {
        let serialized = serde_json::to_string(actions)?;
        self.store.set(key, &serialized).await
    }
}
