//! Classification outcome normalization.

use residue_map_report_models::{ClassificationOutcome, ServedBy};

use crate::text::TextOutcome;
use crate::{NormalizeError, ResponseShape, detect_shape};

/// Verdict literal meaning "no waste", compared case-insensitively.
pub const CLEAN_VERDICT: &str = "sem lixo";

/// Label used for a contaminated verdict when the service gives none.
pub const DIRTY_LABEL: &str = "COM lixo";

/// Label used for a clean verdict when the service gives none.
pub const CLEAN_LABEL: &str = "SEM lixo";

/// Caller-supplied values substituted for missing fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutcomeDefaults {
    /// Location label to use when the response carries none (typically the
    /// label the user submitted with the image).
    pub location: Option<String>,
    /// Confidence to use when the response carries none.
    pub confidence: f64,
}

/// Maps a prediction string to a verdict.
///
/// [`CLEAN_VERDICT`] (any case, surrounding whitespace ignored) is clean;
/// any other non-empty string is contaminated. An empty string is clean.
#[must_use]
pub fn verdict_from_prediction(prediction: &str) -> bool {
    let prediction = prediction.trim();
    !prediction.is_empty() && !prediction.eq_ignore_ascii_case(CLEAN_VERDICT)
}

/// Returns the display label for a verdict.
#[must_use]
pub const fn verdict_label(plastic_detected: bool) -> &'static str {
    if plastic_detected { DIRTY_LABEL } else { CLEAN_LABEL }
}

/// Detects the shape of `body` and normalizes it into a
/// [`ClassificationOutcome`].
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidResponseShape`] if the body is a JSON
/// array.
pub fn normalize_classification(
    body: &str,
    defaults: &OutcomeDefaults,
    served_by: ServedBy,
) -> Result<ClassificationOutcome, NormalizeError> {
    let outcome = match detect_shape(body)? {
        ResponseShape::Structured(map) => from_structured(&map, defaults, served_by),
        ResponseShape::Text(text) => from_text(&text, body, defaults, served_by),
    };
    log::debug!(
        "Normalized classification: detected={}, label={}, served by {}",
        outcome.plastic_detected,
        outcome.label,
        outcome.source_endpoint.endpoint_id
    );
    Ok(outcome)
}

/// Structured shape: fields pass through, missing numbers become 0 and a
/// missing verdict becomes `false`.
fn from_structured(
    map: &serde_json::Map<String, serde_json::Value>,
    defaults: &OutcomeDefaults,
    served_by: ServedBy,
) -> ClassificationOutcome {
    let get = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k));

    let plastic_detected = get(&["plasticDetected", "verdict"])
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let confidence_score = get(&["confidenceScore", "confidence"])
        .and_then(serde_json::Value::as_f64)
        .map_or(0.0, clamp_confidence);
    let label = get(&["label", "classification", "prediction"])
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| verdict_label(plastic_detected).to_string(), String::from);
    let location = get(&["location", "locationLabel"])
        .and_then(serde_json::Value::as_str)
        .map(String::from)
        .or_else(|| defaults.location.clone());
    let lat = get(&["lat", "latitude"]).and_then(serde_json::Value::as_f64);
    let lon = get(&["lon", "longitude"]).and_then(serde_json::Value::as_f64);
    let (lat, lon) = match (lat, lon) {
        (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
        _ => (None, None),
    };

    ClassificationOutcome {
        plastic_detected,
        confidence_score,
        label,
        location,
        lat,
        lon,
        raw_diagnostic: serde_json::Value::Object(map.clone()),
        source_endpoint: served_by,
    }
}

/// Text shape: lines located by label, defaults for whatever is missing.
fn from_text(
    text: &TextOutcome,
    body: &str,
    defaults: &OutcomeDefaults,
    served_by: ServedBy,
) -> ClassificationOutcome {
    let plastic_detected = text
        .prediction
        .as_deref()
        .is_some_and(verdict_from_prediction);
    let label = text
        .prediction
        .clone()
        .unwrap_or_else(|| verdict_label(plastic_detected).to_string());
    let location = text.location.clone().or_else(|| defaults.location.clone());
    let (lat, lon) = text
        .lat_lon()
        .map_or((None, None), |(lat, lon)| (Some(lat), Some(lon)));

    ClassificationOutcome {
        plastic_detected,
        confidence_score: clamp_confidence(defaults.confidence),
        label,
        location,
        lat,
        lon,
        raw_diagnostic: serde_json::Value::String(body.to_string()),
        source_endpoint: served_by,
    }
}

fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
