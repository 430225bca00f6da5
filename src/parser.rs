use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::ansi::strip_ansi;
use crate::record::{Level, MetaValue, Record};

/// Canonical timestamp rendering used everywhere a record is displayed.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// OTLP log record wire shape (simplified). Every field is optional so
/// detection can require at least one recognized field to be present.
#[derive(Debug, Deserialize)]
struct OtlpRecord {
    #[serde(rename = "timeUnixNano")]
    time_unix_nano: Option<i64>,
    #[serde(rename = "severityNumber")]
    severity_number: Option<i64>,
    #[serde(rename = "severityText")]
    severity_text: Option<String>,
    body: Option<serde_json::Value>,
    attributes: Option<serde_json::Value>,
    resource: Option<serde_json::Value>,
    #[serde(rename = "instrumentationScope")]
    instrumentation_scope: Option<serde_json::Value>,
}

impl OtlpRecord {
    fn has_any_field(&self) -> bool {
        self.time_unix_nano.is_some()
            || self.severity_number.is_some()
            || self.severity_text.is_some()
            || self.body.is_some()
            || self.attributes.is_some()
            || self.resource.is_some()
            || self.instrumentation_scope.is_some()
    }
}

static TIMED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\(([0-9.]+)ms\)\s+(.+)$").expect("timed regex"));

static COMMON_LOG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\S+) - - \[([^\]]+)\] "([^"]*)" (\d+) (\d+)"#).expect("common log regex")
});

/// Timestamp extraction patterns for plain-text lines, checked in order.
static TIMESTAMP_RES: LazyLock<[Regex; 4]> = LazyLock::new(|| {
    [
        // 2023-01-01 12:00:00
        Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").expect("datetime regex"),
        // 01/Jan/2023:12:00:00
        Regex::new(r"(\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2})").expect("clf time regex"),
        // Jan 1 12:00:00
        Regex::new(r"(\w{3} \d{1,2} \d{2}:\d{2}:\d{2})").expect("syslog time regex"),
        // ISO-8601 with optional fraction and Z or offset
        Regex::new(r"(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2}))")
            .expect("iso8601 regex"),
    ]
});

/// Total, format-detecting line parser. Any byte sequence produces a
/// well-formed `Record`; unknown inputs degrade to `Info` plain text with a
/// wall-clock timestamp.
#[derive(Debug, Clone)]
pub struct LogParser {
    tz: Tz,
}

impl LogParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse one raw line (terminator already stripped) into a record.
    pub fn parse(&self, line: &str, source: &str) -> Record {
        if let Some(record) = self.try_parse_otlp(line, source) {
            return record;
        }
        let clean = strip_ansi(line);
        if let Some(record) = self.try_parse_timed(line, &clean, source) {
            return record;
        }
        if let Some(record) = self.try_parse_common_log(line, &clean, source) {
            return record;
        }
        self.parse_plain(line, clean, source)
    }

    /// OTLP JSON: an object carrying at least one recognized field.
    fn try_parse_otlp(&self, line: &str, source: &str) -> Option<Record> {
        let otlp: OtlpRecord = serde_json::from_str(line).ok()?;
        if !otlp.has_any_field() {
            return None;
        }

        let nanos = otlp.time_unix_nano.unwrap_or(0);
        let timestamp = if nanos > 0 {
            DateTime::from_timestamp_nanos(nanos)
                .with_timezone(&self.tz)
                .format(TIMESTAMP_FORMAT)
                .to_string()
        } else {
            self.wall_clock()
        };

        let level = otlp_level(
            otlp.severity_number.unwrap_or(0),
            otlp.severity_text.as_deref().unwrap_or(""),
        );

        let message = match &otlp.body {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(body @ serde_json::Value::Object(map)) => match map.get("stringValue") {
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => serde_json::to_string(body).unwrap_or_default(),
            },
            Some(body) => serde_json::to_string(body).unwrap_or_default(),
            None => String::new(),
        };

        let mut metadata = BTreeMap::new();
        for (key, value) in [
            ("attributes", otlp.attributes),
            ("resource", otlp.resource),
            ("instrumentationScope", otlp.instrumentation_scope),
        ] {
            if let Some(value) = value {
                metadata.insert(key.to_string(), MetaValue::from(value));
            }
        }

        Some(Record {
            timestamp,
            level,
            message,
            source: source.to_string(),
            raw: line.to_string(),
            metadata,
        })
    }

    /// Timed-structured lines, e.g. Rails `  (0.3ms)  SELECT ...`.
    fn try_parse_timed(&self, line: &str, clean: &str, source: &str) -> Option<Record> {
        let caps = TIMED_RE.captures(clean)?;
        let duration = caps.get(1)?.as_str().to_string();
        let message = caps.get(2)?.as_str().to_string();

        let upper = message.to_uppercase();
        let level = if upper.contains("ERROR") {
            Level::Error
        } else if upper.contains("WARN") {
            Level::Warn
        } else if ["SQL", "SELECT", "INSERT", "UPDATE", "DELETE"]
            .iter()
            .any(|kw| upper.contains(kw))
        {
            Level::Debug
        } else {
            Level::Info
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("duration_ms".to_string(), MetaValue::Str(duration));

        Some(Record {
            timestamp: self.wall_clock(),
            level,
            message,
            source: source.to_string(),
            raw: line.to_string(),
            metadata,
        })
    }

    /// Apache/Nginx common log format.
    fn try_parse_common_log(&self, line: &str, clean: &str, source: &str) -> Option<Record> {
        let caps = COMMON_LOG_RE.captures(clean)?;
        let ip = caps.get(1)?.as_str();
        let time_field = caps.get(2)?.as_str();
        let request = caps.get(3)?.as_str();
        let status = caps.get(4)?.as_str();
        let size = caps.get(5)?.as_str();

        let level = match status.parse::<u32>() {
            Ok(code) if code >= 500 => Level::Error,
            Ok(code) if code >= 400 => Level::Warn,
            _ => Level::Info,
        };

        // Best effort: `23/Dec/2023:15:30:45 +0000`; keep the raw field when
        // it does not parse.
        let timestamp = DateTime::parse_from_str(time_field, "%d/%b/%Y:%H:%M:%S %z")
            .map(|t| t.with_timezone(&self.tz).format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_else(|_| time_field.to_string());

        let mut metadata = BTreeMap::new();
        metadata.insert("ip".to_string(), MetaValue::Str(ip.to_string()));
        metadata.insert("request".to_string(), MetaValue::Str(request.to_string()));
        metadata.insert("status_code".to_string(), MetaValue::Str(status.to_string()));
        metadata.insert("response_size".to_string(), MetaValue::Str(size.to_string()));

        Some(Record {
            timestamp,
            level,
            message: format!("{ip} {request} - Status: {status}"),
            source: source.to_string(),
            raw: line.to_string(),
            metadata,
        })
    }

    /// Fallback: the stripped line is the message, level and timestamp are
    /// sniffed out of the text.
    fn parse_plain(&self, line: &str, clean: String, source: &str) -> Record {
        let upper = clean.to_uppercase();
        let level = if upper.contains("ERROR") || upper.contains("FATAL") {
            Level::Error
        } else if upper.contains("WARN") {
            Level::Warn
        } else if upper.contains("DEBUG") || upper.contains("TRACE") {
            Level::Debug
        } else {
            Level::Info
        };

        let timestamp = self
            .extract_timestamp(&clean)
            .unwrap_or_else(|| self.wall_clock());

        Record {
            timestamp,
            level,
            message: clean,
            source: source.to_string(),
            raw: line.to_string(),
            metadata: BTreeMap::new(),
        }
    }

    /// Try the known timestamp shapes against the message; first match wins.
    fn extract_timestamp(&self, text: &str) -> Option<String> {
        for (i, re) in TIMESTAMP_RES.iter().enumerate() {
            let Some(caps) = re.captures(text) else {
                continue;
            };
            let captured = caps.get(1)?.as_str();
            let parsed: Option<DateTime<Utc>> = match i {
                0 => NaiveDateTime::parse_from_str(captured, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|t| Utc.from_utc_datetime(&t)),
                1 => NaiveDateTime::parse_from_str(captured, "%d/%b/%Y:%H:%M:%S")
                    .ok()
                    .map(|t| Utc.from_utc_datetime(&t)),
                2 => {
                    // Syslog style carries no year; assume the current one.
                    let year = Utc::now().year();
                    NaiveDateTime::parse_from_str(
                        &format!("{year} {captured}"),
                        "%Y %b %e %H:%M:%S",
                    )
                    .ok()
                    .map(|t| Utc.from_utc_datetime(&t))
                }
                _ => DateTime::parse_from_rfc3339(captured)
                    .ok()
                    .map(|t| t.with_timezone(&Utc)),
            };
            if let Some(utc) = parsed {
                return Some(
                    utc.with_timezone(&self.tz)
                        .format(TIMESTAMP_FORMAT)
                        .to_string(),
                );
            }
        }
        None
    }

    fn wall_clock(&self) -> String {
        Utc::now()
            .with_timezone(&self.tz)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}

/// OTLP severity bands; zero/absent number falls back to the text field.
fn otlp_level(number: i64, text: &str) -> Level {
    match number {
        n if n >= 17 => Level::Error,
        n if n >= 13 => Level::Warn,
        n if n >= 9 => Level::Info,
        n if n >= 5 => Level::Debug,
        _ => match text.to_uppercase().as_str() {
            "ERROR" | "FATAL" => Level::Error,
            "WARN" | "WARNING" => Level::Warn,
            "INFO" => Level::Info,
            "DEBUG" | "TRACE" => Level::Debug,
            _ => Level::Info,
        },
    }
}
