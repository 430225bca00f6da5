use chrono_tz::Tz;
use std::path::{Path, PathBuf};

use crate::stream::DEFAULT_MAX_LINES;

/// Runtime configuration, assembled from CLI flags and passed explicitly to
/// whoever needs it. There is no process-global state.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cap on pipe-mode records kept in memory. File sources ignore this.
    pub max_lines: usize,
    pub files: Vec<PathBuf>,
    /// Advisory refresh floor (seconds) used while all sources are idle.
    pub refresh_rate: u64,
    pub include: String,
    pub exclude: String,
    pub timezone: Tz,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            files: Vec::new(),
            refresh_rate: 1,
            include: String::new(),
            exclude: String::new(),
            timezone: chrono_tz::UTC,
        }
    }
}

/// Resolve an IANA zone name; unknown zones fall back to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

/// Expand a positional argument: a directory becomes its regular files
/// (top-level only, hidden files included); anything else passes through
/// and is validated at open time.
pub fn expand_path(path: &Path) -> Vec<PathBuf> {
    let Ok(meta) = std::fs::metadata(path) else {
        return vec![path.to_path_buf()];
    };
    if !meta.is_dir() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(path)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|e| e.path())
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn known_timezone_resolves() {
        assert_eq!(resolve_timezone("Europe/Berlin").name(), "Europe/Berlin");
        assert_eq!(resolve_timezone("UTC").name(), "UTC");
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        assert_eq!(resolve_timezone("Not/AZone").name(), "UTC");
        assert_eq!(resolve_timezone("").name(), "UTC");
    }

    #[test]
    fn file_path_passes_through() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("app.log");
        File::create(&file).unwrap();
        assert_eq!(expand_path(&file), vec![file]);
    }

    #[test]
    fn missing_path_passes_through() {
        let path = Path::new("/no/such/file.log");
        assert_eq!(expand_path(path), vec![path.to_path_buf()]);
    }

    #[test]
    fn directory_expands_to_top_level_files() {
        let dir = tempdir().unwrap();
        for name in ["b.log", "a.log", ".hidden"] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            writeln!(f, "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        File::create(dir.path().join("nested/deep.log")).unwrap();

        let files = expand_path(dir.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        // Hidden files included, nested files excluded, sorted order.
        assert_eq!(names, vec![".hidden", "a.log", "b.log"]);
    }
}
