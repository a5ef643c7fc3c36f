//! # Wire Codec
//!
//! Atoms and sets travel between processes as bincode and show up in logs
//! and CLI output as JSON. Every field round-trips exactly, including
//! metadata, tags and the set's `last_updated`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::{BeliefAtom, BeliefSet};

/// Encoding or decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("binary encoding failed: {message}")]
    Encode { message: String },

    #[error("binary decoding failed: {message}")]
    Decode { message: String },

    #[error("json conversion failed: {message}")]
    Json { message: String },
}

pub fn encode_atom(atom: &BeliefAtom) -> Result<Vec<u8>, CodecError> {
    encode(atom)
}

pub fn decode_atom(bytes: &[u8]) -> Result<BeliefAtom, CodecError> {
    decode(bytes)
}

pub fn encode_set(set: &BeliefSet) -> Result<Vec<u8>, CodecError> {
    encode(set)
}

pub fn decode_set(bytes: &[u8]) -> Result<BeliefSet, CodecError> {
    decode(bytes)
}

/// Pretty JSON for logs and operator output.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, CodecError> {
    serde_json::to_string_pretty(value).map_err(|e| CodecError::Json {
        message: e.to_string(),
    })
}

pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, CodecError> {
    serde_json::from_str(text).map_err(|e| CodecError::Json {
        message: e.to_string(),
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode {
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
        message: e.to_string(),
    })
}
