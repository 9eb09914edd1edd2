use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::AnalyticsEvent;

/// Read a gzip-compressed NDJSON event log into memory.
///
/// Batch-trainer semantics: the first malformed line aborts the whole read.
pub fn read_gzip_events(path: &Path) -> Result<Vec<AnalyticsEvent>> {
    let file = File::open(path)?;
    let reader = BufReader::new(GzDecoder::new(file));

    let mut events = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let event: AnalyticsEvent = serde_json::from_str(&line).map_err(|e| {
            AppError::Parse(format!("{} line {}: {}", path.display(), line_no + 1, e))
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Decompress a fetched log object, falling back to plain text when the
/// payload is not gzip. Content that is neither gzip nor UTF-8 is an error;
/// the incremental trainer skips such files.
pub fn decode_log_bytes(bytes: &[u8]) -> Result<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    match decoder.read_to_string(&mut text) {
        Ok(_) => Ok(text),
        Err(_) => String::from_utf8(bytes.to_vec()).map_err(|e| {
            AppError::Parse(format!("object is neither gzip nor UTF-8 text: {}", e))
        }),
    }
}

/// Parse NDJSON lines, dropping lines that fail to decode.
pub fn parse_events_lenient(text: &str) -> Vec<AnalyticsEvent> {
    let mut events = Vec::new();
    let mut dropped = 0usize;

    for line in text.lines() {
        match serde_json::from_str::<AnalyticsEvent>(line) {
            Ok(event) => events.push(event),
            Err(_) => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("dropped {} malformed lines", dropped);
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const VALID_LINE: &str = r#"{"bn":"Chrome","md":true,"rl":null,"vp":"390x700","ev":"pageclose","ts":1718000000123,"value":1.0,"category":"news"}"#;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_read_gzip_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json.gz");
        let body = format!("{}\n{}\n", VALID_LINE, VALID_LINE);
        std::fs::write(&path, gzip(&body)).unwrap();

        let events = read_gzip_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].browser_name, "Chrome");
    }

    #[test]
    fn test_read_gzip_events_malformed_line_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json.gz");
        let body = format!("{}\nnot json\n", VALID_LINE);
        std::fs::write(&path, gzip(&body)).unwrap();

        let err = read_gzip_events(&path).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_decode_gzip_bytes() {
        let text = decode_log_bytes(&gzip("hello\nworld\n")).unwrap();
        assert_eq!(text, "hello\nworld\n");
    }

    #[test]
    fn test_decode_plain_text_fallback() {
        let text = decode_log_bytes(b"plain text, not gzip").unwrap();
        assert_eq!(text, "plain text, not gzip");
    }

    #[test]
    fn test_decode_rejects_binary_garbage() {
        let err = decode_log_bytes(&[0xff, 0xfe, 0x00, 0x9c]).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }

    #[test]
    fn test_parse_events_lenient_drops_bad_lines() {
        let text = format!("{}\ngarbage\n{{\"half\": true}}\n{}\n", VALID_LINE, VALID_LINE);
        let events = parse_events_lenient(&text);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_parse_events_lenient_empty_input() {
        assert!(parse_events_lenient("").is_empty());
    }
}
