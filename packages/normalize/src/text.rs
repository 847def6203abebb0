//! Delimited `Label: value` text parsing.
//!
//! Lines are located by label prefix, in any order. Unknown lines are
//! ignored and a repeated label keeps its first occurrence.

/// Line prefix carrying the verdict.
pub const PREDICTION_LABEL: &str = "Prediction:";

/// Line prefix carrying the location label.
pub const LOCATION_LABEL: &str = "Location:";

/// Line prefix carrying the `lat, lon` pair.
pub const COORDINATES_LABEL: &str = "Coordinates:";

/// The fields found in a delimited-text response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOutcome {
    /// Value of the `Prediction:` line.
    pub prediction: Option<String>,
    /// Value of the `Location:` line.
    pub location: Option<String>,
    /// Value of the `Coordinates:` line, unparsed.
    pub coordinates: Option<String>,
}

impl TextOutcome {
    /// Parses a multi-line `Label: value` block. Never fails.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        let mut outcome = Self::default();

        for line in body.lines().map(str::trim) {
            if let Some(value) = field_value(line, PREDICTION_LABEL) {
                outcome.prediction.get_or_insert(value);
            } else if let Some(value) = field_value(line, LOCATION_LABEL) {
                outcome.location.get_or_insert(value);
            } else if let Some(value) = field_value(line, COORDINATES_LABEL) {
                outcome.coordinates.get_or_insert(value);
            }
        }

        outcome
    }

    /// Parses the `Coordinates:` value, if present and readable.
    #[must_use]
    pub fn lat_lon(&self) -> Option<(f64, f64)> {
        parse_coordinates(self.coordinates.as_deref()?)
    }
}

/// Returns the trimmed value after `label`, or `None` if the line does not
/// start with it or the value is blank.
fn field_value(line: &str, label: &str) -> Option<String> {
    let value = line.strip_prefix(label)?.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.to_string())
}

/// Splits a `"lat, lon"` string on the first comma and parses both halves.
///
/// Returns `None` if there is no comma or either half is not a finite
/// number.
#[must_use]
pub fn parse_coordinates(s: &str) -> Option<(f64, f64)> {
    let (lat, lon) = s.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    Some((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_three_lines() {
        let text = TextOutcome::parse("Prediction: SEM lixo\nLocation: X\nCoordinates: -10.0, -20.0");
        assert_eq!(text.prediction.as_deref(), Some("SEM lixo"));
        assert_eq!(text.location.as_deref(), Some("X"));
        let (lat, lon) = text.lat_lon().unwrap();
        assert!((lat - -10.0).abs() < f64::EPSILON);
        assert!((lon - -20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn tolerates_missing_lines_and_noise() {
        let text = TextOutcome::parse("model v2\n\n  Location:   Ilhabela  \nfoo: bar");
        assert!(text.prediction.is_none());
        assert_eq!(text.location.as_deref(), Some("Ilhabela"));
        assert!(text.coordinates.is_none());
        assert!(text.lat_lon().is_none());
    }

    #[test]
    fn handles_crlf_line_endings() {
        let text = TextOutcome::parse("Prediction: COM lixo\r\nLocation: Y\r\n");
        assert_eq!(text.prediction.as_deref(), Some("COM lixo"));
        assert_eq!(text.location.as_deref(), Some("Y"));
    }

    #[test]
    fn first_occurrence_wins() {
        let text = TextOutcome::parse("Location: A\nLocation: B");
        assert_eq!(text.location.as_deref(), Some("A"));
    }

    #[test]
    fn blank_value_is_missing() {
        let text = TextOutcome::parse("Prediction:   \nPrediction: COM lixo");
        assert_eq!(text.prediction.as_deref(), Some("COM lixo"));
    }

    #[test]
    fn splits_coordinates_on_first_comma_only() {
        assert!(parse_coordinates("1.5, 2.5, 3.5").is_none());
        let (lat, lon) = parse_coordinates(" -23.96 ,-46.33 ").unwrap();
        assert!((lat - -23.96).abs() < f64::EPSILON);
        assert!((lon - -46.33).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_unreadable_coordinates() {
        assert!(parse_coordinates("unknown").is_none());
        assert!(parse_coordinates("abc, 10").is_none());
        assert!(parse_coordinates("NaN, 10").is_none());
        assert!(parse_coordinates("").is_none());
    }
}
