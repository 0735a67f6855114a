//! # Key-Value Client
//!
//! Purpose: Typed, domain-scoped access to a Redis-compatible store.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KeyValueClient` hides pooling, framing and encoding.
//! 2. **Scoped Keys**: Every key is prefixed with the client's domain, so two
//!    domains never see each other's values.
//! 3. **Typed Entry Points**: Scalars go through `put`; records, maps and
//!    sequences through `put_object`. The caller picks the matching getter.
//! 4. **Propagate, then Log**: Fallible calls return their error; only the
//!    `get_must_*` family substitutes zero values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::pool::{ConnectionPool, PoolStats};
use crate::resp::Reply;
use crate::retry::RetryPolicy;
use crate::value::{decode_document, encode_document, Scalar};

/// Pooled client bound to one endpoint and one key domain.
///
/// Cheap to share: wrap it in an `Arc` and call it from any thread.
pub struct KeyValueClient {
    domain: String,
    pool: ConnectionPool,
    retry: RetryPolicy,
}

impl KeyValueClient {
    /// Creates a client for `addr` with default pool limits.
    ///
    /// # Panics
    ///
    /// Panics when the first connection to `addr` cannot be established. Use
    /// [`KeyValueClient::connect`] to handle that case instead.
    pub fn new(addr: impl Into<String>, domain: impl Into<String>) -> Self {
        let config = StoreConfig::new(addr, domain);
        let addr = config.addr.clone();
        match Self::connect(config) {
            Ok(client) => client,
            Err(err) => {
                error!(%addr, error = %err, "key-value store unreachable");
                panic!("key-value store at {addr} unreachable: {err}");
            }
        }
    }

    /// Creates a client from a full configuration, dialing the first connection.
    pub fn connect(config: StoreConfig) -> StoreResult<Self> {
        let domain = config.domain.clone();
        let retry = config.retry;
        let pool = ConnectionPool::open(config)?;
        Ok(KeyValueClient {
            domain,
            pool,
            retry,
        })
    }

    /// The prefix applied to every key.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Pool counters, mainly for diagnostics.
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Stores a scalar as text.
    #[instrument(level = "debug", skip(self, value), fields(domain = %self.domain))]
    pub fn put<V: Scalar>(&self, key: &str, value: V) -> StoreResult<()> {
        let data = value.to_store_bytes();
        self.set(key, &data)
    }

    /// Stores a record, map or sequence as a BSON document.
    ///
    /// Nothing is written when encoding fails.
    #[instrument(level = "debug", skip(self, value), fields(domain = %self.domain))]
    pub fn put_object<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let data = encode_document(value).map_err(|err| {
            error!(error = %err, "failed to encode value");
            err
        })?;
        self.set(key, &data)
    }

    fn set(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        let scoped = self.scoped_key(key)?;
        let result = self
            .command("SET", &[b"SET", &scoped[..], data])
            .and_then(|reply| match reply {
                Reply::Status(_) => Ok(()),
                _ => Err(StoreError::UnexpectedResponse { command: "SET" }),
            });
        if let Err(err) = &result {
            error!(key, error = %err, "SET failed");
        }
        result
    }

    /// Reads a value written by `put_object`.
    #[instrument(level = "debug", skip(self), fields(domain = %self.domain))]
    pub fn get_object<T: DeserializeOwned>(&self, key: &str) -> StoreResult<T> {
        let bytes = self.get_bytes(key)?;
        decode_document(&bytes)
    }

    /// Reads a value written by `put_object` into `out`.
    ///
    /// `out` is left untouched on any error.
    pub fn get_object_into<T: DeserializeOwned>(&self, key: &str, out: &mut T) -> StoreResult<()> {
        *out = self.get_object(key)?;
        Ok(())
    }

    /// Reads the raw stored bytes.
    pub fn get_bytes(&self, key: &str) -> StoreResult<Vec<u8>> {
        let scoped = self.scoped_key(key)?;
        let reply = self.command("GET", &[b"GET", &scoped[..]]).map_err(|err| {
            error!(key, error = %err, "GET failed");
            err
        })?;
        match reply {
            Reply::Bulk(Some(data)) => Ok(data),
            Reply::Bulk(None) => Err(StoreError::NotExist {
                key: key.to_string(),
            }),
            _ => Err(StoreError::UnexpectedResponse { command: "GET" }),
        }
    }

    /// Reads a stored value as text.
    #[instrument(level = "debug", skip(self), fields(domain = %self.domain))]
    pub fn get_string(&self, key: &str) -> StoreResult<String> {
        let bytes = self.get_bytes(key)?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Like `get_string`, returning `""` on any error.
    pub fn get_must_string(&self, key: &str) -> String {
        self.get_string(key).unwrap_or_default()
    }

    /// Reads a stored base-10 integer.
    ///
    /// Full 64-bit range; same result as `get_int64`.
    pub fn get_int(&self, key: &str) -> StoreResult<i64> {
        self.get_int64(key)
    }

    /// Like `get_int`, returning `0` on any error.
    pub fn get_must_int(&self, key: &str) -> i64 {
        self.get_int(key).unwrap_or_default()
    }

    /// Reads a stored base-10 64-bit integer.
    pub fn get_int64(&self, key: &str) -> StoreResult<i64> {
        Ok(self.get_string(key)?.parse()?)
    }

    /// Like `get_int64`, returning `0` on any error.
    pub fn get_must_int64(&self, key: &str) -> i64 {
        self.get_int64(key).unwrap_or_default()
    }

    /// Reads a stored decimal as `f32`.
    pub fn get_float32(&self, key: &str) -> StoreResult<f32> {
        Ok(self.get_string(key)?.parse()?)
    }

    /// Like `get_float32`, returning `0.0` on any error.
    pub fn get_must_float32(&self, key: &str) -> f32 {
        self.get_float32(key).unwrap_or_default()
    }

    /// Reads a stored decimal as `f64`.
    pub fn get_float64(&self, key: &str) -> StoreResult<f64> {
        Ok(self.get_string(key)?.parse()?)
    }

    /// Like `get_float64`, returning `0.0` on any error.
    pub fn get_must_float64(&self, key: &str) -> f64 {
        self.get_float64(key).unwrap_or_default()
    }

    /// True when a value is stored under `key`.
    pub fn exists(&self, key: &str) -> StoreResult<bool> {
        match self.get_bytes(key) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_exist() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Deletes `key`. Deleting a missing key is not an error.
    #[instrument(level = "debug", skip(self), fields(domain = %self.domain))]
    pub fn del(&self, key: &str) -> StoreResult<()> {
        let scoped = self.scoped_key(key)?;
        match self.command("DEL", &[b"DEL", &scoped[..]])? {
            Reply::Integer(removed) => {
                debug!(key, removed, "DEL");
                Ok(())
            }
            _ => Err(StoreError::UnexpectedResponse { command: "DEL" }),
        }
    }

    fn scoped_key(&self, key: &str) -> StoreResult<Vec<u8>> {
        if key.is_empty() {
            return Err(StoreError::EmptyKey);
        }
        let mut scoped = Vec::with_capacity(self.domain.len() + key.len());
        scoped.extend_from_slice(self.domain.as_bytes());
        scoped.extend_from_slice(key.as_bytes());
        Ok(scoped)
    }

    // One pooled connection per attempt; a failed attempt drops its
    // connection, so a retry dials or reuses a different one.
    fn command(&self, name: &'static str, args: &[&[u8]]) -> StoreResult<Reply> {
        self.retry.run(name, || {
            let mut conn = self.pool.acquire()?;
            conn.exec(args)?.into_result()
        })
    }
}
