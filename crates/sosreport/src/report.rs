//! Core report types for sosreport.
//!
//! A [`Report`] is the single persisted record of one SOS submission. Its
//! serialized form is the document body written to the store, so field
//! names follow the wire names (`callTime`, `voiceNote`, `images`, ...).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// The category of emergency being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistressType {
    /// Medical emergency.
    #[default]
    Medical,
    /// Threat to personal safety.
    Security,
    /// Fire.
    Fire,
    /// Anything else, including values this build does not know.
    #[serde(other)]
    Other,
}

impl std::fmt::Display for DistressType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Medical => write!(f, "medical"),
            Self::Security => write!(f, "security"),
            Self::Fire => write!(f, "fire"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A resolved device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Degrees north of the equator.
    pub latitude: f64,
    /// Degrees east of Greenwich.
    pub longitude: f64,
}

impl Location {
    /// Create a location from a coordinate pair.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Whether both coordinates are finite and within range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// One SOS submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Document identifier (assigned by the document store).
    #[serde(skip)]
    pub id: Option<String>,

    /// When the user pressed send.
    #[serde(with = "iso_millis")]
    pub call_time: DateTime<Utc>,

    /// Where the device was at submission time.
    pub location: Location,

    /// Free-text caller name.
    pub caller_name: String,

    /// Free-text caller phone number.
    pub caller_number: String,

    /// Selected emergency category.
    pub distress_type: DistressType,

    /// Fixed dispatch message.
    pub message: String,

    /// Download URL of the recorded voice note.
    pub voice_note: Option<String>,

    /// Download URLs of the attached images, in selection order.
    /// A `None` slot marks a file whose upload failed.
    #[serde(default)]
    pub images: Vec<Option<String>>,
}

impl Report {
    /// The call time in the wire format (`2023-05-26T12:00:00.000Z`).
    #[must_use]
    pub fn call_time_iso(&self) -> String {
        format_timestamp(self.call_time)
    }

    /// Whether a voice note is attached.
    #[must_use]
    pub fn has_voice_note(&self) -> bool {
        self.voice_note.is_some()
    }

    /// Number of image uploads that failed.
    #[must_use]
    pub fn missing_images(&self) -> usize {
        self.images.iter().filter(|url| url.is_none()).count()
    }

    /// Return the same report tagged with a store identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Format a timestamp the way reports and blob keys carry it.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for millisecond ISO-8601 timestamps.
///
/// A fixed width keeps lexicographic order equal to chronological order,
/// which the stores rely on when sorting by `callTime`.
pub(crate) mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(*at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Report {
        Report {
            id: None,
            call_time: Utc.with_ymd_and_hms(2023, 5, 26, 12, 0, 0).unwrap(),
            location: Location::new(50.0, 50.0),
            caller_name: "John Doe".to_string(),
            caller_number: "1234567890".to_string(),
            distress_type: DistressType::Medical,
            message: "This is an SOS, please help".to_string(),
            voice_note: None,
            images: vec![Some("https://example.com/image1.png".to_string())],
        }
    }

    #[test]
    fn test_distress_type_display() {
        assert_eq!(DistressType::Medical.to_string(), "medical");
        assert_eq!(DistressType::Security.to_string(), "security");
        assert_eq!(DistressType::Fire.to_string(), "fire");
        assert_eq!(DistressType::Other.to_string(), "other");
    }

    #[test]
    fn test_unknown_distress_type_reads_as_other() {
        let parsed: DistressType = serde_json::from_str("\"flood\"").unwrap();
        assert_eq!(parsed, DistressType::Other);
    }

    #[test]
    fn test_location_validity() {
        assert!(Location::new(50.0, 50.0).is_valid());
        assert!(Location::new(-90.0, 180.0).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, -180.5).is_valid());
        assert!(!Location::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_report_wire_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["callTime"], "2023-05-26T12:00:00.000Z");
        assert_eq!(json["callerName"], "John Doe");
        assert_eq!(json["callerNumber"], "1234567890");
        assert_eq!(json["distressType"], "medical");
        assert_eq!(json["location"]["latitude"], 50.0);
        assert!(json["voiceNote"].is_null());
        assert_eq!(json["images"][0], "https://example.com/image1.png");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_report_reads_plain_iso_time() {
        let json = serde_json::json!({
            "callTime": "2023-05-26T12:00:00Z",
            "location": {"latitude": 50, "longitude": 50},
            "callerName": "John Doe",
            "callerNumber": "1234567890",
            "distressType": "medical",
            "message": "This is an SOS, please help",
            "voiceNote": "https://example.com/audio.wav",
            "images": ["https://example.com/image1.png", null]
        });
        let report: Report = serde_json::from_value(json).unwrap();
        assert_eq!(report.call_time, sample().call_time);
        assert!(report.has_voice_note());
        assert_eq!(report.missing_images(), 1);
        assert_eq!(report.location, Location::new(50.0, 50.0));
    }

    #[test]
    fn test_with_id() {
        let report = sample().with_id("abc");
        assert_eq!(report.id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_call_time_iso() {
        assert_eq!(sample().call_time_iso(), "2023-05-26T12:00:00.000Z");
    }
}
