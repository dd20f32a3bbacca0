//! The hierarchical JSON document store.
//!
//! Election metadata and user identity live in an external store addressed
//! by slash-separated paths. The store offers no transactions and
//! last-write-wins semantics; the one concession to concurrency control is
//! [`DocumentStore::compare_and_swap`], which the rest of the crate uses for
//! every read-modify-write that must not race.

mod firebase;
#[cfg(test)]
mod memory;

pub use firebase::FirebaseStore;
#[cfg(test)]
pub use memory::MemoryStore;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store protocol violation: {0}")]
    Protocol(String),
    #[error("malformed document at {path}: {message}")]
    Malformed { path: String, message: String },
}

/// A connection to the document store.
///
/// Paths are slash-separated with no leading or trailing slash, e.g.
/// `elections/-Kx3.../address`.
#[rocket::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the subtree at `path`. `None` if nothing is stored there.
    async fn read(&self, path: &str) -> Result<Option<Value>, StoreError>;

    /// Overwrite the subtree at `path`.
    async fn write(&self, path: &str, value: &Value) -> Result<(), StoreError>;

    /// Merge `fields` into the object at `path`, leaving other keys intact.
    async fn update(&self, path: &str, fields: &Map<String, Value>) -> Result<(), StoreError>;

    /// Append `value` to the collection at `path` under a generated key,
    /// returning the key.
    async fn push(&self, path: &str, value: &Value) -> Result<String, StoreError>;

    /// Write `value` at `path` only if the current content equals
    /// `expected` (`None` meaning absent). Returns whether the write
    /// happened. This is the primitive behind deployment idempotency and
    /// the account counter.
    async fn compare_and_swap(
        &self,
        path: &str,
        expected: Option<&Value>,
        value: &Value,
    ) -> Result<bool, StoreError>;
}
