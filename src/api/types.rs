//! Wire types for the question-answering API.
//!
//! The streamed body is a sequence of blank-line separated records. Each
//! meaningful record carries one `data: ` line with a JSON object:
//!
//! ```text
//! data: {"type":"content","data":"Retrieval-"}
//!
//! data: {"type":"sources","data":[{"course":"GenAI 101","lecture":"Intro","timestamp_start":"00:03:12.500"}]}
//!
//! data: {"type":"done"}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix that marks a record line as carrying an event payload.
pub const DATA_PREFIX: &str = "data:";

/// Template used to left-pad short timestamps (`3:12` → `00:03:12`).
const TIMESTAMP_TEMPLATE: &str = "00:00:00";

/// Request body for `POST /api/query`.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct QueryRequest<'a> {
    pub question: &'a str,
}

/// A citation linking part of an answer to a lecture and timestamp.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub course: String,
    pub lecture: String,
    pub timestamp_start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_end: Option<String>,
    /// Transcript excerpt the answer was grounded on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Source {
    /// Display form of `timestamp_start`: the part before the fractional
    /// seconds, truncated to `HH:MM:SS`.
    pub fn display_timestamp(&self) -> String {
        clock(&self.timestamp_start)
    }

    /// `HH:MM:SS`, or `HH:MM:SS-HH:MM:SS` when the end is known.
    pub fn display_range(&self) -> String {
        match self.timestamp_end.as_deref().filter(|end| !end.trim().is_empty()) {
            Some(end) => format!("{}-{}", self.display_timestamp(), clock(end)),
            None => self.display_timestamp(),
        }
    }

    /// One-line citation, e.g. `GenAI 101 • Intro • 00:03:12`.
    pub fn label(&self) -> String {
        format!("{} • {} • {}", self.course, self.lecture, self.display_range())
    }

    /// The transcript excerpt, if the backend sent a non-blank one.
    pub fn excerpt(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

fn clock(raw: &str) -> String {
    let whole = raw.split('.').next().unwrap_or_default().trim();
    let shown: String = whole.chars().take(TIMESTAMP_TEMPLATE.len()).collect();
    let missing = TIMESTAMP_TEMPLATE.len() - shown.chars().count();
    format!("{}{}", &TIMESTAMP_TEMPLATE[..missing], shown)
}

/// A typed event decoded from one stream record.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Partial answer text.
    Content(String),
    /// Ordered citations for the answer.
    Sources(Vec<Source>),
    /// End of the answer.
    Done,
}

/// Raw `{type, data}` envelope. `data` is left untyped until the
/// discriminator is known.
#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Why a record did not yield an event.
#[derive(Debug, PartialEq)]
pub enum RecordError {
    /// No `data:` line in the record (comments, `event:` lines, keep-alives).
    NoData,
    /// The payload was not valid JSON or `data` had the wrong shape.
    Malformed(String),
    /// Valid envelope with a `type` we don't handle.
    UnknownType(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::NoData => write!(f, "record has no data line"),
            RecordError::Malformed(msg) => write!(f, "malformed record: {msg}"),
            RecordError::UnknownType(t) => write!(f, "unknown event type '{t}'"),
        }
    }
}

impl std::error::Error for RecordError {}

/// Parse one complete record into a [`StreamEvent`].
///
/// Multiple `data:` lines in a record are joined with `\n` before decoding.
/// Other lines (`event:`, `id:`, `:` comments) are ignored.
pub fn parse_record(record: &str) -> Result<StreamEvent, RecordError> {
    let mut payload: Option<String> = None;
    for line in record.lines() {
        let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
            continue;
        };
        let rest = rest.strip_prefix(' ').unwrap_or(rest);
        match payload.as_mut() {
            Some(p) => {
                p.push('\n');
                p.push_str(rest);
            }
            None => payload = Some(rest.to_string()),
        }
    }
    let payload = payload.ok_or(RecordError::NoData)?;

    let envelope: Envelope =
        serde_json::from_str(&payload).map_err(|e| RecordError::Malformed(e.to_string()))?;

    match envelope.event_type.as_str() {
        "content" => match envelope.data {
            serde_json::Value::String(text) => Ok(StreamEvent::Content(text)),
            other => Err(RecordError::Malformed(format!(
                "content data must be a string, got {other}"
            ))),
        },
        "sources" => serde_json::from_value::<Vec<Source>>(envelope.data)
            .map(StreamEvent::Sources)
            .map_err(|e| RecordError::Malformed(e.to_string())),
        "done" => Ok(StreamEvent::Done),
        other => Err(RecordError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(timestamp_start: &str) -> Source {
        Source {
            course: "GenAI 101".to_string(),
            lecture: "Intro".to_string(),
            timestamp_start: timestamp_start.to_string(),
            timestamp_end: None,
            text: None,
        }
    }

    #[test]
    fn parses_content_event() {
        let event = parse_record(r#"data: {"type":"content","data":"Retrieval-"}"#).unwrap();
        assert_eq!(event, StreamEvent::Content("Retrieval-".to_string()));
    }

    #[test]
    fn parses_sources_event_with_extra_fields() {
        let record = r#"data: {"type":"sources","data":[{"course":"GenAI 101","lecture":"Intro","timestamp_start":"00:03:12.500","timestamp_end":"00:03:40.000","text":"RAG stands for..."}]}"#;
        let StreamEvent::Sources(sources) = parse_record(record).unwrap() else {
            panic!("expected sources");
        };
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].course, "GenAI 101");
        assert_eq!(sources[0].timestamp_end.as_deref(), Some("00:03:40.000"));
        assert_eq!(sources[0].text.as_deref(), Some("RAG stands for..."));
    }

    #[test]
    fn parses_done_with_or_without_data() {
        assert_eq!(parse_record(r#"data: {"type":"done"}"#), Ok(StreamEvent::Done));
        assert_eq!(
            parse_record(r#"data: {"type":"done","data":{"ignored":true}}"#),
            Ok(StreamEvent::Done)
        );
    }

    #[test]
    fn accepts_data_prefix_without_space() {
        assert_eq!(
            parse_record(r#"data:{"type":"content","data":"x"}"#),
            Ok(StreamEvent::Content("x".to_string()))
        );
    }

    #[test]
    fn ignores_event_and_comment_lines() {
        let record = ": keep-alive\nevent: message\ndata: {\"type\":\"done\"}";
        assert_eq!(parse_record(record), Ok(StreamEvent::Done));
    }

    #[test]
    fn record_without_marker_is_no_data() {
        assert_eq!(parse_record("hello world"), Err(RecordError::NoData));
        assert_eq!(parse_record(": ping"), Err(RecordError::NoData));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_record("data: {\"type\":\"content\",").unwrap_err();
        assert!(matches!(err, RecordError::Malformed(_)));
    }

    #[test]
    fn content_with_non_string_data_is_malformed() {
        let err = parse_record(r#"data: {"type":"content","data":42}"#).unwrap_err();
        assert!(matches!(err, RecordError::Malformed(_)));
    }

    #[test]
    fn unknown_type_is_reported() {
        assert_eq!(
            parse_record(r#"data: {"type":"usage","data":12}"#),
            Err(RecordError::UnknownType("usage".to_string()))
        );
    }

    #[test]
    fn label_shows_range_when_end_is_known() {
        let source = Source {
            timestamp_end: Some("00:04:01.250".to_string()),
            ..source("00:03:12.500")
        };
        assert_eq!(source.label(), "GenAI 101 • Intro • 00:03:12-00:04:01");
    }

    #[test]
    fn blank_excerpt_is_hidden() {
        let mut source = source("00:03:12.500");
        assert_eq!(source.excerpt(), None);
        source.text = Some("  ".to_string());
        assert_eq!(source.excerpt(), None);
        source.text = Some(" RAG combines retrieval with generation. ".to_string());
        assert_eq!(source.excerpt(), Some("RAG combines retrieval with generation."));
    }

    #[test]
    fn display_timestamp_drops_fraction() {
        assert_eq!(source("00:03:12.500").display_timestamp(), "00:03:12");
    }

    #[test]
    fn display_timestamp_truncates_long_values() {
        assert_eq!(source("000:03:12").display_timestamp(), "000:03:1");
    }

    #[test]
    fn display_timestamp_pads_short_values() {
        assert_eq!(source("3:12.9").display_timestamp(), "00:03:12");
        assert_eq!(source("1:03:12").display_timestamp(), "01:03:12");
        assert_eq!(source("").display_timestamp(), "00:00:00");
    }

    #[test]
    fn label_joins_fields_with_bullets() {
        assert_eq!(source("00:03:12.500").label(), "GenAI 101 • Intro • 00:03:12");
    }

    #[test]
    fn query_request_serializes_question() {
        let json = serde_json::to_string(&QueryRequest {
            question: "What is RAG?",
        })
        .unwrap();
        assert_eq!(json, r#"{"question":"What is RAG?"}"#);
    }
}
