//! Persistence used by the agent and the prompt heuristic.
//!
//! - `CacheStorage`: named buckets of request/response pairs (Cache Storage)
//! - `KeyValueStore`: small string-to-string store (`localStorage`)
//!
//! Each has an in-memory implementation for tests and embedding, and an
//! on-disk JSON implementation for the terminal host.

pub mod cache;
pub mod error;
pub mod kv;

pub use cache::{BucketSummary, CacheStorage, CachedData, DiskCacheStorage, MemoryCacheStorage};
pub use error::StorageError;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
