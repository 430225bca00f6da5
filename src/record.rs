use std::collections::BTreeMap;
use std::fmt;

/// Log severity. `Info` is the default whenever detection fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dynamically typed metadata value. JSON shape is preserved lossily only at
/// the leaves: numbers become `Int` when they fit, `Float` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for MetaValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => MetaValue::Null,
            serde_json::Value::Bool(b) => MetaValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    MetaValue::Int(i)
                } else {
                    MetaValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => MetaValue::Str(s),
            serde_json::Value::Array(items) => {
                MetaValue::List(items.into_iter().map(MetaValue::from).collect())
            }
            serde_json::Value::Object(map) => MetaValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, MetaValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Null => f.write_str("null"),
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Int(i) => write!(f, "{i}"),
            MetaValue::Float(x) => write!(f, "{x}"),
            MetaValue::Str(s) => f.write_str(s),
            MetaValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            MetaValue::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

/// A parsed log entry. Consumers treat records as values; a record may be
/// evicted from the parse cache at any time after it is handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Canonical local-time string (`YYYY-MM-DD HH:MM:SS` in the configured
    /// zone). Never empty: falls back to ingestion wall-clock time.
    pub timestamp: String,
    pub level: Level,
    /// User-visible body with ANSI escapes stripped.
    pub message: String,
    /// Origin label: file path or `"stdin"`.
    pub source: String,
    /// The original line, escapes and all.
    pub raw: String,
    pub metadata: BTreeMap<String, MetaValue>,
}

impl Record {
    /// Render the detail view body: one field per line, metadata pairs last.
    pub fn detail_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("Level:     {}\n", self.level));
        out.push_str(&format!("Source:    {}\n", self.source));
        out.push_str(&format!("Message:   {}\n", self.raw));
        if !self.metadata.is_empty() {
            out.push_str("Metadata:\n");
            for (key, value) in &self.metadata {
                out.push_str(&format!("  {key}: {value}\n"));
            }
        }
        out
    }
}
