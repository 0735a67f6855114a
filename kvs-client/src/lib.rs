//! # Scoped Key-Value Client
//!
//! Purpose: Typed get/put access to a Redis-compatible store over a bounded
//! pool of blocking TCP connections, with every key scoped by a domain prefix.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Reuse TCP connections to avoid repeated connects.
//! 2. **Typed Split**: Scalars are stored as text, records and maps as BSON documents.
//! 3. **Kinds over Sentinels**: Failures carry an `ErrorKind` callers can match on.
//! 4. **Bounded Retry**: Only transient I/O failures are retried, with backoff.

mod config;
mod error;
mod pool;
mod resp;
mod retry;
mod store;
mod value;

pub use config::{StoreConfig, DEFAULT_ADDR, DEFAULT_MAX_ACTIVE, DEFAULT_MAX_IDLE};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use pool::PoolStats;
pub use retry::RetryPolicy;
pub use store::KeyValueClient;
pub use value::Scalar;
