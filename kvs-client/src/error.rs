//! # Store Errors
//!
//! One error type for every client operation, classified by `ErrorKind` so
//! callers branch on the kind of failure instead of comparing error values.

use std::num::{ParseFloatError, ParseIntError};
use std::string::FromUtf8Error;

use thiserror::Error;

/// Result type for the key-value client.
pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse classification of a `StoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The key is absent from the store.
    NotExist,
    /// The value has no BSON representation.
    UnsupportedType,
    /// The caller supplied an empty key.
    InvalidKey,
    /// The value could not be encoded.
    Encode,
    /// The stored payload could not be decoded into the requested shape.
    Decode,
    /// A stored string is not a valid number.
    Parse,
    /// Network, framing or server-side failure.
    Transport,
    /// Invalid client configuration.
    Config,
}

/// Errors surfaced by the key-value client.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key {key:?} does not exist")]
    NotExist { key: String },

    #[error("unsupported value type {type_name}: {reason}")]
    UnsupportedType {
        type_name: &'static str,
        reason: String,
    },

    #[error("key must not be empty")]
    EmptyKey,

    #[error("encode error: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("decode error: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("stored value is not valid utf-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    #[error("invalid integer: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("invalid float: {0}")]
    ParseFloat(#[from] ParseFloatError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(&'static str),

    #[error("server error: {message}")]
    Server { message: String },

    #[error("unexpected response to {command}")]
    UnexpectedResponse { command: &'static str },

    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    #[error("invalid config: {0}")]
    Config(String),
}

impl StoreError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotExist { .. } => ErrorKind::NotExist,
            StoreError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            StoreError::EmptyKey => ErrorKind::InvalidKey,
            StoreError::Encode(_) => ErrorKind::Encode,
            StoreError::Decode(_) | StoreError::InvalidUtf8(_) => ErrorKind::Decode,
            StoreError::ParseInt(_) | StoreError::ParseFloat(_) => ErrorKind::Parse,
            StoreError::Io(_)
            | StoreError::Protocol(_)
            | StoreError::Server { .. }
            | StoreError::UnexpectedResponse { .. }
            | StoreError::InvalidAddress(_) => ErrorKind::Transport,
            StoreError::Config(_) => ErrorKind::Config,
        }
    }

    /// True when the key was simply absent.
    pub fn is_not_exist(&self) -> bool {
        self.kind() == ErrorKind::NotExist
    }

    /// True for failures worth retrying on a fresh connection.
    ///
    /// Only raw I/O failures qualify: a server error reply or a framing error
    /// will repeat on the next attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}
