#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Response normalization for the residue map services.
//!
//! The classification service answers in one of two shapes: a JSON object
//! whose fields already match the canonical record, or a block of
//! `Label: value` lines. [`detect_shape`] resolves a response body into a
//! [`ResponseShape`] once, and [`classification::normalize_classification`]
//! folds either variant into one [`ClassificationOutcome`]. Nothing
//! downstream inspects field presence again.
//!
//! The listing and summary endpoints are always structured; see
//! [`listing`].
//!
//! Normalization is total for well-typed input: malformed text degrades to
//! defaults. Only a JSON array, which can be neither a record nor text,
//! fails with [`NormalizeError::InvalidResponseShape`].
//!
//! [`ClassificationOutcome`]: residue_map_report_models::ClassificationOutcome

pub mod classification;
pub mod listing;
pub mod text;

use text::TextOutcome;

/// Errors from normalization.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// The payload is not a shape this normalizer understands.
    #[error("Invalid response shape: {message}")]
    InvalidResponseShape {
        /// Description of what was received.
        message: String,
    },

    /// A structured payload had fields of the wrong type.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A response body after format detection.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// A JSON object.
    Structured(serde_json::Map<String, serde_json::Value>),
    /// Delimited `Label: value` text.
    Text(TextOutcome),
}

/// Resolves a raw response body into a [`ResponseShape`].
///
/// A body that parses as a JSON object is structured. A body that parses
/// as a JSON string is treated as text with the string's contents. Any
/// other body except an array, including bare JSON scalars, is treated as
/// text.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidResponseShape`] if the body is a JSON
/// array.
pub fn detect_shape(body: &str) -> Result<ResponseShape, NormalizeError> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => Ok(ResponseShape::Structured(map)),
        Ok(serde_json::Value::String(inner)) => Ok(ResponseShape::Text(TextOutcome::parse(&inner))),
        Ok(array @ serde_json::Value::Array(_)) => Err(NormalizeError::InvalidResponseShape {
            message: format!("expected an object or text, got {}", json_kind(&array)),
        }),
        _ => Ok(ResponseShape::Text(TextOutcome::parse(body))),
    }
}

pub(crate) const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
