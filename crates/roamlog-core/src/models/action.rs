//! Queued mutation records awaiting remote confirmation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::util::unix_timestamp_millis;

/// Kind of mutation captured in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "CREATE"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// HTTP method to replay against the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A pending mutation: the remote operation captured at enqueue time,
/// replayed verbatim by the sync coordinator. The `id` is a local queue
/// management token, unrelated to any trip id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueAction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub endpoint: String,
    pub method: HttpMethod,
    pub payload: Value,
    /// Creation time in Unix millis, used for ordering and diagnostics.
    pub timestamp: i64,
    /// Consecutive failed replay attempts.
    #[serde(default)]
    pub attempts: u32,
}

impl QueueAction {
    /// Create a new action with a freshly generated id and timestamp.
    #[must_use]
    pub fn new(kind: ActionKind, endpoint: impl Into<String>, method: HttpMethod, payload: Value) -> Self {
        let timestamp = unix_timestamp_millis();
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        Self {
            id: format!("{timestamp}-{suffix}"),
            kind,
            endpoint: endpoint.into(),
            method,
            payload,
            timestamp,
            attempts: 0,
        }
    }
}
