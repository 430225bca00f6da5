pub mod engine;
pub mod pattern;

use crate::record::Level;

/// Filter mode for switching between plain substring and regex matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Plain { case_sensitive: bool },
    Regex { case_sensitive: bool },
}

impl Default for FilterMode {
    fn default() -> Self {
        FilterMode::Plain {
            case_sensitive: false,
        }
    }
}

impl FilterMode {
    pub fn plain() -> Self {
        FilterMode::Plain {
            case_sensitive: false,
        }
    }

    pub fn regex() -> Self {
        FilterMode::Regex {
            case_sensitive: false,
        }
    }

    /// Toggle between Plain and Regex, preserving case sensitivity.
    pub fn toggle_regex(&mut self) {
        *self = match *self {
            FilterMode::Plain { case_sensitive } => FilterMode::Regex { case_sensitive },
            FilterMode::Regex { case_sensitive } => FilterMode::Plain { case_sensitive },
        };
    }

    pub fn toggle_case_sensitivity(&mut self) {
        match self {
            FilterMode::Plain { case_sensitive } | FilterMode::Regex { case_sensitive } => {
                *case_sensitive = !*case_sensitive
            }
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, FilterMode::Regex { .. })
    }

    pub fn is_case_sensitive(&self) -> bool {
        match self {
            FilterMode::Plain { case_sensitive } | FilterMode::Regex { case_sensitive } => {
                *case_sensitive
            }
        }
    }
}

/// Which severity levels pass the filter. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelFilter {
    pub debug: bool,
    pub info: bool,
    pub warn: bool,
    pub error: bool,
}

impl Default for LevelFilter {
    fn default() -> Self {
        Self {
            debug: true,
            info: true,
            warn: true,
            error: true,
        }
    }
}

impl LevelFilter {
    pub fn allows(&self, level: Level) -> bool {
        match level {
            Level::Debug => self.debug,
            Level::Info => self.info,
            Level::Warn => self.warn,
            Level::Error => self.error,
        }
    }

    pub fn toggle(&mut self, level: Level) {
        match level {
            Level::Debug => self.debug = !self.debug,
            Level::Info => self.info = !self.info,
            Level::Warn => self.warn = !self.warn,
            Level::Error => self.error = !self.error,
        }
    }
}

/// The complete, user-visible filter state. Any change triggers a full
/// rebuild of the filtered view; nothing is patched incrementally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub levels: LevelFilter,
    /// Comma-separated include patterns; matches are highlighted and
    /// navigable but never filter.
    pub include: String,
    /// Comma-separated exclude patterns; any match drops the record.
    pub exclude: String,
    pub mode: FilterMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_plain_insensitive() {
        let mode = FilterMode::default();
        assert!(!mode.is_regex());
        assert!(!mode.is_case_sensitive());
    }

    #[test]
    fn toggle_regex_preserves_case() {
        let mut mode = FilterMode::Plain {
            case_sensitive: true,
        };
        mode.toggle_regex();
        assert!(mode.is_regex());
        assert!(mode.is_case_sensitive());
        mode.toggle_regex();
        assert!(!mode.is_regex());
        assert!(mode.is_case_sensitive());
    }

    #[test]
    fn toggle_case() {
        let mut mode = FilterMode::regex();
        mode.toggle_case_sensitivity();
        assert!(mode.is_case_sensitive());
    }

    #[test]
    fn level_filter_defaults_allow_all() {
        let levels = LevelFilter::default();
        for level in [Level::Debug, Level::Info, Level::Warn, Level::Error] {
            assert!(levels.allows(level));
        }
    }

    #[test]
    fn level_filter_toggle() {
        let mut levels = LevelFilter::default();
        levels.toggle(Level::Debug);
        assert!(!levels.allows(Level::Debug));
        assert!(levels.allows(Level::Error));
        levels.toggle(Level::Debug);
        assert!(levels.allows(Level::Debug));
    }
}
