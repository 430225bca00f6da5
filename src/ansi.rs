use regex::Regex;
use std::sync::LazyLock;

/// Regex matching CSI escape sequences: ESC [ params final-letter.
/// Colored log output (Rails, npm, docker) is full of these; they must be
/// gone before any format regex runs and before a message is stored.
static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("ANSI regex must compile"));

/// Strip all ANSI escape sequences from a string.
///
/// The unstripped original stays available in `Record::raw`.
pub fn strip_ansi(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// True if the string still contains an ESC-bracket sequence.
pub fn contains_ansi(s: &str) -> bool {
    ANSI_RE.is_match(s)
}
