//! Durable key-value persistence backing the cache and the queue.
//!
//! Every value is a full JSON document; writes replace the whole
//! document. There is no partial-merge primitive and no transaction
//! spanning two keys — callers own the read-modify-write cycle.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Full-document key-value storage.
///
/// Persistence failures propagate to the caller; implementations never
/// retry internally.
pub trait KeyValueStore {
    /// Read the document stored under `key`, or `None` if never written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Durably replace the document stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the document stored under `key`, if any.
    async fn remove(&self, key: &str) -> Result<()>;
}
