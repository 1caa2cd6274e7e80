//! Ingestion boundary: raw samples in, validated [`Ingested`] values out.
//!
//! Nothing downstream ever sees a NaN, an out-of-range vital, or an
//! impossible coordinate. Rejections happen here, before a value can
//! reach a subject's rolling history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, VigilError};
use crate::geo::Coordinates;
use crate::reading::{
    AlertType, DeviceAlert, Ingested, LocationFix, Metric, Reading, StressTier, SubjectStatus,
};

/// Physically possible heart rate, bpm (exclusive lower bound).
pub const HEART_RATE_RANGE: (f64, f64) = (0.0, 300.0);
/// Oxygen saturation, percent.
pub const OXYGEN_RANGE: (f64, f64) = (0.0, 100.0);
/// Body temperature, °C.
pub const TEMPERATURE_RANGE: (f64, f64) = (25.0, 45.0);

/// A numeric measurement, or a tier name for categorical metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Number(f64),
    Text(String),
}

/// Raw sample as pushed by a sample source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sample {
    Vitals {
        #[serde(rename = "subjectId")]
        subject_id: String,
        metric: Metric,
        value: SampleValue,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    Location {
        #[serde(rename = "subjectId")]
        subject_id: String,
        lat: f64,
        lng: f64,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    Alert {
        #[serde(rename = "subjectId")]
        subject_id: String,
        #[serde(rename = "alertType")]
        alert_type: AlertType,
        #[serde(default)]
        status: Option<SubjectStatus>,
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default)]
        lng: Option<f64>,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
}

impl Sample {
    pub fn subject_id(&self) -> &str {
        match self {
            Sample::Vitals { subject_id, .. }
            | Sample::Location { subject_id, .. }
            | Sample::Alert { subject_id, .. } => subject_id,
        }
    }
}

/// Validate and normalize a raw sample. Missing timestamps become `now`.
pub fn ingest(sample: Sample) -> Result<Ingested> {
    ingest_at(sample, Utc::now())
}

/// Same as [`ingest`] with an explicit ingestion time.
pub fn ingest_at(sample: Sample, now: DateTime<Utc>) -> Result<Ingested> {
    let subject = sample.subject_id().trim().to_string();
    if subject.is_empty() {
        return Err(VigilError::invalid("", "subject id must not be empty"));
    }

    match sample {
        Sample::Vitals {
            metric,
            value,
            timestamp,
            ..
        } => {
            let value = normalize_vital(&subject, metric, &value)?;
            Ok(Ingested::Vitals(Reading {
                subject_id: subject,
                metric,
                value,
                taken_at: timestamp.unwrap_or(now),
            }))
        }
        Sample::Location {
            lat,
            lng,
            timestamp,
            ..
        } => {
            let position = Coordinates::new(lat, lng);
            if !position.is_valid() {
                return Err(VigilError::invalid(
                    &subject,
                    format!("coordinates out of range: ({lat}, {lng})"),
                ));
            }
            Ok(Ingested::Location(LocationFix {
                subject_id: subject,
                position,
                taken_at: timestamp.unwrap_or(now),
            }))
        }
        Sample::Alert {
            alert_type,
            status,
            lat,
            lng,
            timestamp,
            ..
        } => {
            if !alert_type.is_device_originated() {
                return Err(VigilError::invalid(
                    &subject,
                    format!("alert type '{alert_type}' is derived by the pipeline, not reported"),
                ));
            }
            let position = match (lat, lng) {
                (Some(lat), Some(lng)) => {
                    let p = Coordinates::new(lat, lng);
                    if !p.is_valid() {
                        return Err(VigilError::invalid(
                            &subject,
                            format!("alert coordinates out of range: ({lat}, {lng})"),
                        ));
                    }
                    Some(p)
                }
                (None, None) => None,
                _ => {
                    return Err(VigilError::invalid(
                        &subject,
                        "alert position needs both lat and lng",
                    ))
                }
            };
            Ok(Ingested::Alert(DeviceAlert {
                subject_id: subject,
                alert_type,
                status,
                position,
                raised_at: timestamp.unwrap_or(now),
            }))
        }
    }
}

fn normalize_vital(subject: &str, metric: Metric, value: &SampleValue) -> Result<f64> {
    if metric == Metric::StressLevel {
        let tier = match value {
            SampleValue::Text(name) => StressTier::from_name(name),
            SampleValue::Number(n) => StressTier::from_ordinal(*n),
        };
        return tier.map(|t| t.ordinal()).ok_or_else(|| {
            VigilError::invalid(subject, format!("unknown stress tier: {value:?}"))
        });
    }

    let n = match value {
        SampleValue::Number(n) => *n,
        SampleValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
            VigilError::invalid(subject, format!("{metric} value is not numeric: '{s}'"))
        })?,
    };

    if !n.is_finite() {
        return Err(VigilError::invalid(subject, format!("{metric} value is not finite")));
    }

    let in_range = match metric {
        Metric::HeartRate => n > HEART_RATE_RANGE.0 && n <= HEART_RATE_RANGE.1,
        Metric::OxygenLevel => (OXYGEN_RANGE.0..=OXYGEN_RANGE.1).contains(&n),
        Metric::Temperature => (TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&n),
        Metric::StressLevel => true,
    };

    if !in_range {
        return Err(VigilError::invalid(
            subject,
            format!("{metric} value {n} outside physical range"),
        ));
    }
    Ok(n)
}

/// Parse one JSON line into a [`Sample`].
pub fn parse_line(line: &str) -> Result<Sample> {
    serde_json::from_str(line.trim()).map_err(|e| VigilError::Serialize(format!("invalid sample: {e}")))
}

/// Parse and ingest a batch of JSON lines, separating successes from failures.
///
/// Returns `(ingested, errors)` where each error carries its 0-based line
/// index. Blank lines are skipped; a bad line never blocks the others.
pub fn parse_batch(lines: &[&str]) -> (Vec<Ingested>, Vec<(usize, VigilError)>) {
    let mut ok = Vec::with_capacity(lines.len());
    let mut errors = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line).and_then(ingest) {
            Ok(sample) => ok.push(sample),
            Err(e) => {
                warn!(line = idx, error = %e, "rejected sample");
                errors.push((idx, e));
            }
        }
    }

    (ok, errors)
}
