#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use engagement_ml::config::TrainingConfig;
use engagement_ml::models::AnalyticsEvent;

pub fn create_test_event(
    browser: &str,
    is_mobile: bool,
    referrer: Option<&str>,
    event_name: &str,
    value: f64,
    category: &str,
) -> AnalyticsEvent {
    AnalyticsEvent {
        browser_name: browser.to_string(),
        is_mobile,
        referrer: referrer.map(|r| r.to_string()),
        viewport: if is_mobile { "390x700" } else { "1920x1080" }.to_string(),
        event_name: event_name.to_string(),
        timestamp_ms: 1_718_000_000_000,
        value,
        category: category.to_string(),
    }
}

/// Alternating news/shop sessions; news sessions are mobile Google referrals
/// with high values that end in pageclose, shop sessions are none of those.
pub fn create_test_events(n: usize) -> Vec<AnalyticsEvent> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                create_test_event(
                    "Chrome",
                    true,
                    Some("https://www.google.com/"),
                    "pageclose",
                    10.0 + i as f64 * 0.1,
                    "news",
                )
            } else {
                create_test_event("Firefox", false, None, "pageview", 0.5, "shop")
            }
        })
        .collect()
}

/// Gzip a batch of events as NDJSON
pub fn gzip_events(events: &[AnalyticsEvent]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    for event in events {
        let line = serde_json::to_string(event).unwrap();
        encoder.write_all(line.as_bytes()).unwrap();
        encoder.write_all(b"\n").unwrap();
    }
    encoder.finish().unwrap()
}

pub fn write_gzip_fixture(path: &Path, events: &[AnalyticsEvent]) {
    std::fs::write(path, gzip_events(events)).unwrap();
}

pub fn small_training_config() -> TrainingConfig {
    TrainingConfig {
        n_estimators: 10,
        max_depth: Some(6),
        min_samples_leaf: 1,
        test_size: 0.3,
        seed: 42,
    }
}
