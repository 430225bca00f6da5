use std::time::{Duration, Instant};

use crate::filter::engine::CompiledFilter;
use crate::filter::FilterSpec;
use crate::record::Record;
use crate::source::{Source, SourceEvent};
use crate::viewport::Viewport;

/// Second `g` within this window completes the `gg` jump-to-top chord.
const G_CHORD_WINDOW: Duration = Duration::from_millis(500);

/// One visible row: its position in the filtered view, the underlying line
/// index, and whether it hits an include pattern.
pub struct Row {
    pub position: usize,
    pub line: usize,
    pub record: Record,
    pub is_match: bool,
}

/// Per-source view state: the filtered/match views, viewport, tailing mode,
/// and match navigation cursor.
pub struct TabState {
    pub source: Source,
    /// Line indices passing the active filter, strictly increasing.
    pub filtered: Vec<usize>,
    /// Positions into `filtered` hit by include patterns.
    pub matches: Vec<usize>,
    pub current_match: usize,
    pub viewport: Viewport,
    /// While tailing, every batch advances selection to the last entry.
    pub tailing: bool,
    last_g_press: Option<Instant>,
}

impl TabState {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            filtered: Vec::new(),
            matches: Vec::new(),
            current_match: 0,
            viewport: Viewport::new(),
            tailing: true,
            last_g_press: None,
        }
    }

    /// Short display name for the tab bar.
    pub fn name(&self) -> String {
        let label = self.source.label();
        std::path::Path::new(label)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| label.to_string())
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn line_count(&self) -> usize {
        self.source.line_count()
    }

    /// Drain source messages and refresh views on data arrival. Events are
    /// passed back up for status reporting.
    pub fn poll(&mut self, spec: &FilterSpec) -> Vec<SourceEvent> {
        let events = self.source.poll();
        let data_changed = events.iter().any(|e| {
            matches!(
                e,
                SourceEvent::IndexingDone { .. } | SourceEvent::BatchReady { .. }
            )
        });
        if data_changed {
            self.refresh_data(spec);
        }
        events
    }

    fn recompute(&mut self, spec: &FilterSpec) -> CompiledFilter {
        let filter = CompiledFilter::compile(spec);
        let outcome = self.source.scan_filter(&filter);
        self.filtered = outcome.filtered;
        self.matches = outcome.matches;
        if !self.matches.is_empty() {
            self.current_match = self.current_match.min(self.matches.len() - 1);
        } else {
            self.current_match = 0;
        }
        filter
    }

    /// Full rebuild after a filter change, then the position policy:
    /// jump to the most recent match, else reset an out-of-range viewport,
    /// else stay put. Tailing overrides everything.
    ///
    /// Returns how many user patterns failed to compile, for the status
    /// line.
    pub fn apply_filter(&mut self, spec: &FilterSpec) -> usize {
        let filter = self.recompute(spec);
        let len = self.filtered.len();

        if self.tailing {
            self.viewport.to_bottom(len);
        } else if let Some(&pos) = self.matches.last() {
            self.current_match = self.matches.len() - 1;
            self.viewport.center_on(pos, len);
        } else if self.viewport.start() >= len {
            self.viewport.to_top();
        } else {
            self.viewport.clamp(len);
        }

        filter.skipped_patterns()
    }

    /// Rebuild because data changed (index done, batch landed). The user's
    /// position is preserved unless tailing pins the view to the end.
    pub fn refresh_data(&mut self, spec: &FilterSpec) {
        self.recompute(spec);
        let len = self.filtered.len();
        if self.tailing {
            self.viewport.to_bottom(len);
        } else {
            self.viewport.clamp(len);
        }
    }

    // --- Scrolling. Upward movement always leaves tailing mode. ---

    pub fn scroll_down(&mut self) {
        self.viewport.down(self.filtered.len());
    }

    pub fn scroll_up(&mut self) {
        self.tailing = false;
        self.viewport.up(self.filtered.len());
    }

    pub fn half_page_down(&mut self) {
        self.viewport.half_page_down(self.filtered.len());
    }

    pub fn half_page_up(&mut self) {
        self.tailing = false;
        self.viewport.half_page_up(self.filtered.len());
    }

    pub fn to_top(&mut self) {
        self.tailing = false;
        self.viewport.to_top();
    }

    /// `G`: jump to the end and start following it.
    pub fn to_bottom(&mut self) {
        self.tailing = true;
        self.viewport.to_bottom(self.filtered.len());
    }

    pub fn toggle_tailing(&mut self) {
        self.tailing = !self.tailing;
        if self.tailing {
            self.viewport.to_bottom(self.filtered.len());
        }
    }

    /// Single `g`: completes the `gg` chord when pressed twice quickly.
    pub fn press_g(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last_g_press {
            if now.duration_since(last) < G_CHORD_WINDOW {
                self.to_top();
                self.last_g_press = None;
                return;
            }
        }
        self.last_g_press = Some(now);
    }

    // --- Match navigation: cyclic, re-centering. Tailing is untouched;
    // while it stays on, the next batch snaps the view back to the end. ---

    pub fn next_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.current_match = (self.current_match + 1) % self.matches.len();
        self.jump_to_current_match();
    }

    pub fn prev_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.current_match = self
            .current_match
            .checked_sub(1)
            .unwrap_or(self.matches.len() - 1);
        self.jump_to_current_match();
    }

    fn jump_to_current_match(&mut self) {
        let pos = self.matches[self.current_match];
        self.viewport.center_on(pos, self.filtered.len());
    }

    /// Absolute selected position in the filtered view.
    pub fn selected_position(&self) -> usize {
        self.viewport.selected()
    }

    /// The record under the cursor, if any.
    pub fn selected_record(&self) -> Option<Record> {
        let line = *self.filtered.get(self.viewport.selected())?;
        self.source.record(line)
    }

    /// Fetch the visible rows. Contiguous filtered runs collapse into a
    /// single positional read underneath.
    pub fn visible_rows(&self) -> Vec<Row> {
        let range = self.viewport.range(self.filtered.len());
        let positions: Vec<usize> = range.collect();
        let lines: Vec<usize> = positions.iter().map(|&p| self.filtered[p]).collect();
        let records = self.source.records(&lines);

        positions
            .into_iter()
            .zip(lines)
            .zip(records)
            .map(|((position, line), record)| Row {
                position,
                line,
                record,
                is_match: self.matches.binary_search(&position).is_ok(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::LogParser;
    use std::io::Cursor;
    use std::time::Duration;

    fn pipe_tab(input: &str, max_lines: usize) -> TabState {
        let source = Source::open_pipe(
            Cursor::new(input.to_string()),
            LogParser::new(chrono_tz::UTC),
            "stdin",
            max_lines,
        );
        let mut tab = TabState::new(source);
        let deadline = Instant::now() + Duration::from_secs(5);
        while tab.source.is_live() {
            tab.poll(&FilterSpec::default());
            assert!(Instant::now() < deadline, "pipe never completed");
            std::thread::sleep(Duration::from_millis(1));
        }
        tab
    }

    fn lines(n: usize) -> String {
        (0..n).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn tailing_follows_appended_batches() {
        let mut tab = pipe_tab(&lines(10), 1000);
        assert!(tab.tailing);
        tab.refresh_data(&FilterSpec::default());
        assert_eq!(tab.selected_position(), 9);

        // Scenario: 50 more records arrive while tailing.
        let Source::Pipe(pipe) = &mut tab.source else {
            unreachable!()
        };
        for i in 10..60 {
            pipe_push(pipe, &format!("line {i}"));
        }
        tab.refresh_data(&FilterSpec::default());
        assert_eq!(tab.selected_position(), 59);
        assert!(tab.viewport.range(tab.filtered_count()).contains(&59));
    }

    fn pipe_push(pipe: &mut crate::source::PipeSource, message: &str) {
        pipe.push_for_test(LogParser::new(chrono_tz::UTC).parse(message, "stdin"));
    }

    #[test]
    fn scroll_up_leaves_tailing() {
        let mut tab = pipe_tab(&lines(100), 1000);
        tab.refresh_data(&FilterSpec::default());
        assert!(tab.tailing);
        tab.scroll_up();
        assert!(!tab.tailing);
    }

    #[test]
    fn to_bottom_restores_tailing() {
        let mut tab = pipe_tab(&lines(100), 1000);
        tab.refresh_data(&FilterSpec::default());
        tab.to_top();
        assert!(!tab.tailing);
        assert_eq!(tab.selected_position(), 0);
        tab.to_bottom();
        assert!(tab.tailing);
        assert_eq!(tab.selected_position(), 99);
    }

    #[test]
    fn gg_chord_jumps_to_top() {
        let mut tab = pipe_tab(&lines(50), 1000);
        tab.refresh_data(&FilterSpec::default());
        assert_eq!(tab.selected_position(), 49);

        tab.press_g();
        assert_eq!(tab.selected_position(), 49, "single g does nothing");
        tab.press_g();
        assert_eq!(tab.selected_position(), 0);
        assert!(!tab.tailing);
    }

    #[test]
    fn filter_rebuild_selects_last_match() {
        let input = "INFO a\nERROR b\nWARN c\nERROR d\n";
        let mut tab = pipe_tab(input, 1000);
        tab.tailing = false;
        let spec = FilterSpec {
            include: "ERROR".into(),
            ..Default::default()
        };
        tab.apply_filter(&spec);

        // All four records visible, matches at view positions 1 and 3,
        // selection on the most recent match.
        assert_eq!(tab.filtered_count(), 4);
        assert_eq!(tab.matches, vec![1, 3]);
        assert_eq!(tab.selected_position(), 3);
        assert_eq!(tab.current_match, 1);
    }

    #[test]
    fn filter_rebuild_resets_out_of_range_viewport() {
        let mut tab = pipe_tab(&lines(100), 1000);
        tab.refresh_data(&FilterSpec::default());
        tab.tailing = false;
        tab.to_bottom();
        tab.tailing = false;

        // A filter that keeps almost nothing.
        let spec = FilterSpec {
            exclude: "line".into(),
            ..Default::default()
        };
        tab.apply_filter(&spec);
        assert_eq!(tab.filtered_count(), 0);
        assert_eq!(tab.selected_position(), 0);
    }

    #[test]
    fn match_navigation_cycles_and_centers() {
        let input: String = (0..200)
            .map(|i| {
                if i % 50 == 0 {
                    format!("MARK {i}\n")
                } else {
                    format!("line {i}\n")
                }
            })
            .collect();
        let mut tab = pipe_tab(&input, 1000);
        tab.tailing = false;
        tab.viewport.set_height(10);
        let spec = FilterSpec {
            include: "MARK".into(),
            ..Default::default()
        };
        tab.apply_filter(&spec);
        assert_eq!(tab.match_count(), 4);
        assert_eq!(tab.current_match, 3);

        tab.next_match();
        assert_eq!(tab.current_match, 0);
        assert_eq!(tab.selected_position(), 0);

        tab.prev_match();
        assert_eq!(tab.current_match, 3);
        assert_eq!(tab.selected_position(), 150);
        assert!(tab.viewport.range(tab.filtered_count()).contains(&150));

        tab.prev_match();
        assert_eq!(tab.current_match, 2);
        assert_eq!(tab.selected_position(), 100);
    }

    #[test]
    fn match_navigation_keeps_tailing_on() {
        let input = "INFO a\nERROR b\nINFO c\nERROR d\n";
        let mut tab = pipe_tab(input, 1000);
        let spec = FilterSpec {
            include: "ERROR".into(),
            ..Default::default()
        };
        tab.apply_filter(&spec);
        assert!(tab.tailing);

        tab.next_match();
        assert!(tab.tailing, "n must not leave tailing mode");
        tab.prev_match();
        assert!(tab.tailing, "N must not leave tailing mode");

        // The next batch snaps the view back to the end as usual.
        let Source::Pipe(pipe) = &mut tab.source else {
            unreachable!()
        };
        pipe_push(pipe, "ERROR e");
        tab.refresh_data(&spec);
        assert_eq!(tab.selected_position(), 4);
    }

    #[test]
    fn visible_rows_flag_matches() {
        let input = "INFO a\nERROR b\nWARN c\nERROR d\n";
        let mut tab = pipe_tab(input, 1000);
        tab.tailing = false;
        tab.viewport.set_height(10);
        let spec = FilterSpec {
            include: "ERROR".into(),
            ..Default::default()
        };
        tab.apply_filter(&spec);

        let rows = tab.visible_rows();
        assert_eq!(rows.len(), 4);
        assert!(!rows[0].is_match);
        assert!(rows[1].is_match);
        assert!(!rows[2].is_match);
        assert!(rows[3].is_match);
        assert_eq!(rows[1].record.message, "ERROR b");
    }

    #[test]
    fn selected_record_follows_cursor() {
        let mut tab = pipe_tab("a\nb\nc\n", 1000);
        tab.refresh_data(&FilterSpec::default());
        tab.to_top();
        assert_eq!(tab.selected_record().unwrap().message, "a");
        tab.scroll_down();
        assert_eq!(tab.selected_record().unwrap().message, "b");
    }

    #[test]
    fn invalid_pattern_count_reported() {
        let mut tab = pipe_tab("a\nb\n", 1000);
        let spec = FilterSpec {
            include: "[broken".into(),
            mode: crate::filter::FilterMode::regex(),
            ..Default::default()
        };
        let skipped = tab.apply_filter(&spec);
        assert_eq!(skipped, 1);
        assert_eq!(tab.filtered_count(), 2);
    }
}
