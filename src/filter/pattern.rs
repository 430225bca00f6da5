use regex::Regex;

use super::FilterMode;

/// One compiled user pattern.
enum CompiledPattern {
    Substring {
        needle: String,
        case_sensitive: bool,
    },
    Regex(Regex),
}

impl CompiledPattern {
    fn matches(&self, text: &str) -> bool {
        match self {
            CompiledPattern::Substring {
                needle,
                case_sensitive,
            } => {
                if *case_sensitive {
                    text.contains(needle.as_str())
                } else {
                    text.to_lowercase().contains(needle.as_str())
                }
            }
            CompiledPattern::Regex(re) => re.is_match(text),
        }
    }
}

/// A comma-separated pattern list compiled under a filter mode.
///
/// Empty fragments are ignored. A regex that fails to compile is skipped
/// rather than fatal; `skipped()` reports how many so the UI can post a
/// status note.
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
    skipped: usize,
}

impl PatternSet {
    pub fn compile(list: &str, mode: FilterMode) -> Self {
        let mut patterns = Vec::new();
        let mut skipped = 0;

        for fragment in list.split(',') {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }
            match mode {
                FilterMode::Plain { case_sensitive } => {
                    let needle = if case_sensitive {
                        fragment.to_string()
                    } else {
                        fragment.to_lowercase()
                    };
                    patterns.push(CompiledPattern::Substring {
                        needle,
                        case_sensitive,
                    });
                }
                FilterMode::Regex { case_sensitive } => {
                    let source = if case_sensitive {
                        fragment.to_string()
                    } else {
                        format!("(?i){fragment}")
                    };
                    match Regex::new(&source) {
                        Ok(re) => patterns.push(CompiledPattern::Regex(re)),
                        Err(_) => skipped += 1,
                    }
                }
            }
        }

        Self { patterns, skipped }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if any pattern in the set matches.
    pub fn matches(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(text))
    }

    /// Number of patterns dropped for failing to compile.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
