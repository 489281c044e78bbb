//! The metric record (C1) and its validation rules.
//!
//! Mirrors the wire shape in spec.md §3/§6: `type` + `id` + exactly one of
//! `value`/`delta`. `MetricKind` and `Sample` realize the tagged-sum REDESIGN
//! FLAG (spec.md §9) in place of the source's dynamically-typed map value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown metric type {0:?}")]
    UnknownType(String),
    #[error("gauge metric {0:?} is missing a value")]
    MissingValue(String),
    #[error("counter metric {0:?} is missing a delta")]
    MissingDelta(String),
    #[error("gauge metric {0:?} must not carry a delta")]
    UnexpectedDelta(String),
    #[error("counter metric {0:?} must not carry a value")]
    UnexpectedValue(String),
    #[error("metric name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// The wire-format metric record: `{"type": ..., "id": ..., "value": ..., "delta": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    #[serde(rename = "id")]
    pub name: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_value"
    )]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
}

/// `value`'s float is encoded the way `encoding/json` renders a Go
/// `*float64` — `strconv.AppendFloat(..., 'f', -1, 64)` drops the
/// fractional part entirely for a whole number (`99.0` → `99`), unlike
/// serde_json's `ryu`-backed default which always prints one. Matched here
/// by serializing whole, finite, in-range values as integers and falling
/// back to the normal float encoding otherwise.
pub fn serialize_go_float<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e18 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_optional_value<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(v) => serialize_go_float(v, serializer),
        None => serializer.serialize_none(),
    }
}

impl Data {
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self {
            kind: MetricKind::Gauge,
            name: name.into(),
            value: Some(value),
            delta: None,
        }
    }

    pub fn counter(name: impl Into<String>, delta: i64) -> Self {
        Self {
            kind: MetricKind::Counter,
            name: name.into(),
            value: None,
            delta: Some(delta),
        }
    }

    /// Enforces the invariants from spec.md §3: non-empty name, exactly one
    /// of value/delta present, and it must match the declared kind.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        match self.kind {
            MetricKind::Gauge => {
                if self.value.is_none() {
                    return Err(ValidationError::MissingValue(self.name.clone()));
                }
                if self.delta.is_some() {
                    return Err(ValidationError::UnexpectedDelta(self.name.clone()));
                }
            }
            MetricKind::Counter => {
                if self.delta.is_none() {
                    return Err(ValidationError::MissingDelta(self.name.clone()));
                }
                if self.value.is_some() {
                    return Err(ValidationError::UnexpectedValue(self.name.clone()));
                }
            }
        }
        Ok(())
    }

    /// Applies the merge-or-replace rule from spec.md §3/§9: a counter
    /// update merges into an existing record of the same name and kind by
    /// summing deltas; anything else (gauge, or a kind change) replaces.
    pub fn merge(existing: Option<&Data>, incoming: Data) -> Data {
        match (existing, incoming.kind) {
            (Some(prev), MetricKind::Counter) if prev.kind == MetricKind::Counter => Data {
                kind: MetricKind::Counter,
                name: incoming.name,
                value: None,
                delta: Some(prev.delta.unwrap_or(0) + incoming.delta.unwrap_or(0)),
            },
            _ => incoming,
        }
    }
}

/// A single sampled value in the agent's current-values map (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Gauge(f64),
    Counter(i64),
}

impl Sample {
    /// The total function from map entry to wire record (spec.md §4.3 projection).
    pub fn into_data(self, name: &str) -> Data {
        match self {
            Sample::Gauge(v) => Data::gauge(name, v),
            Sample::Counter(v) => Data::counter(name, v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_requires_value_not_delta() {
        let d = Data {
            kind: MetricKind::Gauge,
            name: "Alloc".into(),
            value: None,
            delta: None,
        };
        assert_eq!(
            d.validate(),
            Err(ValidationError::MissingValue("Alloc".into()))
        );
    }

    #[test]
    fn counter_with_value_is_rejected() {
        let d = Data {
            kind: MetricKind::Counter,
            name: "PollCount".into(),
            value: Some(1.0),
            delta: Some(1),
        };
        assert_eq!(
            d.validate(),
            Err(ValidationError::UnexpectedValue("PollCount".into()))
        );
    }

    #[test]
    fn empty_name_rejected() {
        let d = Data::gauge("", 1.0);
        assert_eq!(d.validate(), Err(ValidationError::EmptyName));
    }

    #[test]
    fn counter_merge_sums_deltas() {
        let existing = Data::counter("c", 10);
        let incoming = Data::counter("c", 5);
        let merged = Data::merge(Some(&existing), incoming);
        assert_eq!(merged.delta, Some(15));
    }

    #[test]
    fn counter_merge_replaces_on_kind_change() {
        let existing = Data::gauge("c", 1.5);
        let incoming = Data::counter("c", 5);
        let merged = Data::merge(Some(&existing), incoming);
        assert_eq!(merged.kind, MetricKind::Counter);
        assert_eq!(merged.delta, Some(5));
    }

    #[test]
    fn gauge_update_always_replaces() {
        let existing = Data::gauge("Alloc", 1.0);
        let incoming = Data::gauge("Alloc", 2.0);
        let merged = Data::merge(Some(&existing), incoming);
        assert_eq!(merged.value, Some(2.0));
    }

    #[test]
    fn serialization_omits_absent_field() {
        let g = Data::gauge("Alloc", 1234.5);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains("\"value\":1234.5"));
        assert!(!json.contains("delta"));

        let c = Data::counter("PollCount", 42);
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("\"delta\":42"));
        assert!(!json.contains("value"));
    }

    #[test]
    fn whole_number_gauge_serializes_without_trailing_zero() {
        let g = Data::gauge("Alloc", 99.0);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains("\"value\":99"));
        assert!(!json.contains("99.0"));
    }

    #[test]
    fn fractional_gauge_keeps_its_decimal() {
        let g = Data::gauge("Alloc", 12.5);
        let json = serde_json::to_string(&g).unwrap();
        assert!(json.contains("\"value\":12.5"));
    }

    #[test]
    fn s2_scenario_reply_matches_literal_body() {
        let g = Data::gauge("Alloc", 99.0);
        let json = serde_json::to_string(&g).unwrap();
        assert_eq!(json, r#"{"type":"gauge","id":"Alloc","value":99}"#);
    }
}
