use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Event name that marks a session as engaged
pub const EVENT_PAGECLOSE: &str = "pageclose";

/// A single web-analytics event record as it appears in the NDJSON logs.
///
/// Wire field names are the short keys emitted by the collector; records that
/// fail to deserialize are dropped during lenient ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Browser name
    #[serde(rename = "bn")]
    pub browser_name: String,

    /// Mobile device flag
    #[serde(rename = "md")]
    pub is_mobile: bool,

    /// Referrer URL, absent for direct traffic
    #[serde(rename = "rl")]
    pub referrer: Option<String>,

    /// Viewport as "WxH"
    #[serde(rename = "vp")]
    pub viewport: String,

    /// Event name, e.g. "pageview" or "pageclose"
    #[serde(rename = "ev")]
    pub event_name: String,

    /// Event timestamp, epoch milliseconds
    #[serde(rename = "ts")]
    pub timestamp_ms: i64,

    /// Event value
    pub value: f64,

    /// Session category
    pub category: String,
}

impl AnalyticsEvent {
    /// Event timestamp as a UTC datetime
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp_ms).single()
    }

    /// Whether the session ended via a pageclose event
    pub fn is_engaged(&self) -> bool {
        self.event_name == EVENT_PAGECLOSE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_LINE: &str = r#"{"bn":"Chrome","md":true,"rl":"https://www.google.com/","vp":"390x700","ev":"pageclose","ts":1718000000123,"value":2.5,"category":"news"}"#;

    #[test]
    fn test_deserialize_event() {
        let event: AnalyticsEvent = serde_json::from_str(SAMPLE_LINE).unwrap();
        assert_eq!(event.browser_name, "Chrome");
        assert!(event.is_mobile);
        assert_eq!(event.viewport, "390x700");
        assert!(event.is_engaged());
        assert_eq!(event.timestamp().unwrap().timestamp_millis(), 1718000000123);
    }

    #[test]
    fn test_null_referrer() {
        let line = r#"{"bn":"Firefox","md":false,"rl":null,"vp":"1920x1080","ev":"pageview","ts":1718000000123,"value":0.0,"category":"shop"}"#;
        let event: AnalyticsEvent = serde_json::from_str(line).unwrap();
        assert!(event.referrer.is_none());
        assert!(!event.is_engaged());
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let line = r#"{"bn":"Chrome","md":true}"#;
        assert!(serde_json::from_str::<AnalyticsEvent>(line).is_err());
    }
}
