//! Camera payloads and the records they become
//!
//! Each payload type has a natural key. Handlers upsert on that key, which
//! is what makes re-delivery of the same file harmless.

use crate::error::RecordError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Record kinds
// ============================================================================

/// Record families, one per ingestion stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    PeopleCount,
    VehicleCount,
    FaceRecognition,
    Alert,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PeopleCount => "people_count",
            Self::VehicleCount => "vehicle_count",
            Self::FaceRecognition => "face_recognition",
            Self::Alert => "alert",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common behaviour of every persisted record
pub trait Record: Serialize {
    const KIND: RecordKind;

    /// Identity used for create-or-update
    fn natural_key(&self) -> String;

    fn validate(&self) -> Result<(), RecordError>;
}

/// Parse and validate one payload.
pub fn parse<R>(bytes: &[u8]) -> Result<R, RecordError>
where
    R: Record + DeserializeOwned,
{
    let record: R = serde_json::from_slice(bytes)?;
    record.validate()?;
    Ok(record)
}

fn key_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn require_camera_id(camera_id: &str) -> Result<(), RecordError> {
    if camera_id.trim().is_empty() {
        return Err(RecordError::Invalid("camera_id is empty".to_string()));
    }
    Ok(())
}

// ============================================================================
// People counts
// ============================================================================

/// Line-crossing counter output for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeopleCount {
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub count_in: u32,
    #[serde(default)]
    pub count_out: u32,
    /// People currently inside the counted area, when the camera tracks it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<u32>,
}

impl Record for PeopleCount {
    const KIND: RecordKind = RecordKind::PeopleCount;

    fn natural_key(&self) -> String {
        format!("{}@{}", self.camera_id, key_timestamp(&self.timestamp))
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_camera_id(&self.camera_id)
    }
}

// ============================================================================
// Vehicle counts
// ============================================================================

/// Per-class vehicle counts for one interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleCount {
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    /// Vehicle class (`car`, `truck`, `bus`, ...) → count
    #[serde(default)]
    pub counts: BTreeMap<String, u32>,
}

impl VehicleCount {
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&n| u64::from(n)).sum()
    }
}

impl Record for VehicleCount {
    const KIND: RecordKind = RecordKind::VehicleCount;

    fn natural_key(&self) -> String {
        format!("{}@{}", self.camera_id, key_timestamp(&self.timestamp))
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_camera_id(&self.camera_id)?;
        if self.counts.keys().any(|class| class.trim().is_empty()) {
            return Err(RecordError::Invalid("vehicle class is empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Face recognitions
// ============================================================================

/// One recognised face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRecognition {
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    pub person_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,
    /// Match confidence in `0.0..=1.0`
    pub confidence: f64,
    /// Snapshot reference as produced by the camera
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

impl Record for FaceRecognition {
    const KIND: RecordKind = RecordKind::FaceRecognition;

    fn natural_key(&self) -> String {
        format!(
            "{}@{}#{}",
            self.camera_id,
            key_timestamp(&self.timestamp),
            self.person_id
        )
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_camera_id(&self.camera_id)?;
        if self.person_id.trim().is_empty() {
            return Err(RecordError::Invalid("person_id is empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(RecordError::Invalid(format!(
                "confidence {} outside 0..=1",
                self.confidence
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Camera alert. The type is decided by the folder the file arrived in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Filled from the binding; any value in the payload is overwritten
    #[serde(default)]
    pub alert_type: String,
    pub camera_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form detector output
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl Record for Alert {
    const KIND: RecordKind = RecordKind::Alert;

    fn natural_key(&self) -> String {
        format!(
            "{}/{}@{}",
            self.alert_type,
            self.camera_id,
            key_timestamp(&self.timestamp)
        )
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_camera_id(&self.camera_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_people_count_parse_and_key() {
        let record: PeopleCount = parse(
            br#"{"camera_id":"cam-01","timestamp":"2026-10-18T09:00:00Z","count_in":5,"count_out":2}"#,
        )
        .unwrap();
        assert_eq!(record.count_in, 5);
        assert_eq!(record.occupancy, None);
        assert_eq!(record.natural_key(), "cam-01@2026-10-18T09:00:00.000Z");
    }

    #[test]
    fn test_offset_timestamps_share_a_key() {
        let utc: PeopleCount =
            parse(br#"{"camera_id":"c","timestamp":"2026-10-18T09:00:00Z"}"#).unwrap();
        let tokyo: PeopleCount =
            parse(br#"{"camera_id":"c","timestamp":"2026-10-18T18:00:00+09:00"}"#).unwrap();
        assert_eq!(utc.natural_key(), tokyo.natural_key());
    }

    #[test]
    fn test_empty_camera_id_rejected() {
        let err = parse::<PeopleCount>(br#"{"camera_id":" ","timestamp":"2026-10-18T09:00:00Z"}"#)
            .unwrap_err();
        assert!(matches!(err, RecordError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = parse::<VehicleCount>(br#"{"camera_id":"c","#).unwrap_err();
        assert!(matches!(err, RecordError::Json(_)));
    }

    #[test]
    fn test_vehicle_total() {
        let record: VehicleCount = parse(
            br#"{"camera_id":"gate","timestamp":"2026-10-18T09:00:00Z","counts":{"car":7,"truck":2}}"#,
        )
        .unwrap();
        assert_eq!(record.total(), 9);
    }

    #[test]
    fn test_face_confidence_range() {
        let ok = br#"{"camera_id":"lobby","timestamp":"2026-10-18T09:00:00Z","person_id":"p-9","confidence":0.93}"#;
        let record: FaceRecognition = parse(ok).unwrap();
        assert_eq!(record.natural_key(), "lobby@2026-10-18T09:00:00.000Z#p-9");

        let bad = br#"{"camera_id":"lobby","timestamp":"2026-10-18T09:00:00Z","person_id":"p-9","confidence":1.5}"#;
        assert!(matches!(parse::<FaceRecognition>(bad), Err(RecordError::Invalid(_))));
    }

    #[test]
    fn test_alert_defaults() {
        let alert: Alert =
            parse(br#"{"camera_id":"yard","timestamp":"2026-10-18T09:00:00Z"}"#).unwrap();
        assert_eq!(alert.severity, Severity::Medium);
        assert!(alert.details.is_null());
        assert_eq!(alert.alert_type, "");
    }
}
