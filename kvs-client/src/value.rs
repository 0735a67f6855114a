//! # Stored Values
//!
//! Scalars are stored as their textual form so they read back through
//! `get_string` and the numeric getters. Structured values go through
//! `encode_document` / `decode_document` as BSON documents.

use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};

/// A value stored as plain text.
pub trait Scalar {
    /// The bytes written to the store.
    fn to_store_bytes(&self) -> Vec<u8>;
}

macro_rules! display_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn to_store_bytes(&self) -> Vec<u8> {
                    self.to_string().into_bytes()
                }
            }
        )*
    };
}

display_scalar!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
);

impl Scalar for str {
    fn to_store_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Scalar for String {
    fn to_store_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl<T: Scalar + ?Sized> Scalar for &T {
    fn to_store_bytes(&self) -> Vec<u8> {
        (**self).to_store_bytes()
    }
}

/// Field holding a non-document value inside its envelope document.
pub const ENVELOPE_FIELD: &str = "__value";

/// Encodes a structured value as a BSON document.
///
/// Records and maps are stored as-is. Sequences and bare scalars are wrapped
/// in a one-field envelope `{ "__value": ... }`, since a BSON blob must be a
/// document. Values BSON cannot express fail with `UnsupportedType`.
pub fn encode_document<T: Serialize + ?Sized>(value: &T) -> StoreResult<Vec<u8>> {
    let encoded = bson::to_bson(value).map_err(|err| StoreError::UnsupportedType {
        type_name: std::any::type_name::<T>(),
        reason: err.to_string(),
    })?;
    let document = match encoded {
        Bson::Document(document) => document,
        other => {
            let mut envelope = Document::new();
            envelope.insert(ENVELOPE_FIELD, other);
            envelope
        }
    };
    let mut buf = Vec::new();
    document.to_writer(&mut buf)?;
    Ok(buf)
}

/// Decodes a blob produced by `encode_document`, unwrapping envelopes.
pub fn decode_document<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    let mut document: Document = bson::from_slice(bytes)?;
    if document.len() == 1 {
        if let Some(inner) = document.remove(ENVELOPE_FIELD) {
            return Ok(bson::from_bson(inner)?);
        }
    }
    Ok(bson::from_document(document)?)
}
