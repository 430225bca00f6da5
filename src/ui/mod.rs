use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use crate::app::{panel_item, App, Focus, Mode};
use crate::record::Level;

const TIME_COLUMN: usize = 19;
const LEVEL_COLUMN: usize = 8;

fn level_color(level: Level) -> Color {
    match level {
        Level::Debug => Color::DarkGray,
        Level::Info => Color::LightBlue,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// Render the full frame: header, filter panel, log stream (or detail
/// view), status line. Also feeds the viewport its current height.
pub fn render(frame: &mut Frame, app: &mut App) {
    let [header_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let [left_area, right_area] =
        Layout::horizontal([Constraint::Length(32), Constraint::Min(20)]).areas(body_area);

    // Rows available inside the bordered stream panel, minus its column
    // header line.
    let view_height = right_area.height.saturating_sub(3).max(1) as usize;
    app.active_mut().viewport.set_height(view_height);

    render_header(frame, app, header_area);
    render_filter_panel(frame, app, left_area);
    match app.mode {
        Mode::Detail => render_detail(frame, app, right_area),
        _ => render_stream(frame, app, right_area),
    }
    render_status(frame, app, status_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let tab = app.active();
    let mut parts = vec![format!(" panam — {}", tab.name())];
    if app.tabs.len() > 1 {
        parts.push(format!("[{}/{}]", app.active_tab + 1, app.tabs.len()));
    }
    if tab.source.is_indexing() {
        parts.push("indexing…".to_string());
    } else {
        parts.push(format!("{}/{}", tab.filtered_count(), tab.line_count()));
        if let Some(elapsed) = tab.source.index_elapsed() {
            parts.push(format!("indexed in {} ms", elapsed.as_millis()));
        }
    }
    if tab.match_count() > 0 {
        parts.push(format!(
            "match {}/{}",
            tab.current_match + 1,
            tab.match_count()
        ));
    }
    if tab.tailing {
        parts.push("LIVE ●".to_string());
    }

    let header = Paragraph::new(parts.join("  |  "))
        .style(Style::new().fg(Color::Black).bg(Color::LightBlue));
    frame.render_widget(header, area);
}

fn checkbox(on: bool) -> &'static str {
    if on {
        "[x]"
    } else {
        "[ ]"
    }
}

fn render_filter_panel(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Filters;
    let marker = |item: usize| {
        if focused && app.panel_item == item {
            "▶ "
        } else {
            "  "
        }
    };
    let input_line = |value: &str, editing: bool, placeholder: &str| {
        if editing {
            format!("   {value}_")
        } else if value.is_empty() {
            format!("   {placeholder}")
        } else {
            format!("   {value}")
        }
    };

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from("FILTERS"));
    lines.push(Line::from(""));
    lines.push(Line::from(format!("{}Include:", marker(panel_item::INCLUDE))));
    lines.push(Line::from(input_line(
        &app.filter.include,
        app.mode == Mode::EditInclude,
        "type to filter…",
    )));
    lines.push(Line::from(format!("{}Exclude:", marker(panel_item::EXCLUDE))));
    lines.push(Line::from(input_line(
        &app.filter.exclude,
        app.mode == Mode::EditExclude,
        "type to exclude…",
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "{}{} Use Regex",
        marker(panel_item::REGEX),
        checkbox(app.filter.mode.is_regex())
    )));
    lines.push(Line::from(format!(
        "{}{} Case Sensitive",
        marker(panel_item::CASE),
        checkbox(app.filter.mode.is_case_sensitive())
    )));
    lines.push(Line::from(""));
    lines.push(Line::from("Levels:"));
    for (item, label, enabled) in [
        (panel_item::ERROR, "ERROR", app.filter.levels.error),
        (panel_item::WARN, "WARN", app.filter.levels.warn),
        (panel_item::INFO, "INFO", app.filter.levels.info),
        (panel_item::DEBUG, "DEBUG", app.filter.levels.debug),
    ] {
        lines.push(Line::from(format!(
            "{}{} {}",
            marker(item),
            checkbox(enabled),
            label
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Sources:"));
    for (i, tab) in app.tabs.iter().enumerate() {
        let active = if i == app.active_tab { "• " } else { "  " };
        lines.push(Line::from(format!("{active}{}", tab.name())));
    }

    let border_style = if focused {
        Style::new().fg(Color::LightBlue)
    } else {
        Style::new().fg(Color::DarkGray)
    };
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).border_style(border_style));
    frame.render_widget(panel, area);
}

fn render_stream(frame: &mut Frame, app: &App, area: Rect) {
    let tab = app.active();
    let width = area.width.saturating_sub(2) as usize;
    let message_width = width.saturating_sub(TIME_COLUMN + LEVEL_COLUMN + 4).max(20);

    let mut lines: Vec<Line> = Vec::new();
    lines.push(Line::from(Span::styled(
        format!(
            "{:<time$}  {:<level$}  MESSAGE",
            "TIME",
            "LEVEL",
            time = TIME_COLUMN,
            level = LEVEL_COLUMN
        ),
        Style::new().add_modifier(Modifier::BOLD),
    )));

    if tab.source.is_indexing() {
        lines.push(Line::from("  indexing…"));
    } else if tab.filtered_count() == 0 {
        lines.push(Line::from("  no lines match the current filter"));
    } else {
        let selected = tab.selected_position();
        for row in tab.visible_rows() {
            let is_selected = row.position == selected;
            let marker = if is_selected { "▶" } else { " " };

            let message = flatten(&row.record.message);
            let message = truncate_to_width(&message, message_width);
            let mut message_style = Style::new();
            if row.is_match {
                message_style = message_style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
            }

            let mut line = Line::from(vec![
                Span::raw(format!("{marker} ")),
                Span::raw(format!("{:<width$}", row.record.timestamp, width = TIME_COLUMN)),
                Span::raw("  "),
                Span::styled(
                    format!("{:<width$}", format!("[{}]", row.record.level), width = LEVEL_COLUMN),
                    Style::new().fg(level_color(row.record.level)),
                ),
                Span::raw("  "),
                Span::styled(message, message_style),
            ]);
            if is_selected {
                line = line.style(Style::new().bg(Color::Indexed(235)));
            }
            lines.push(line);
        }
    }

    let border_style = if app.focus == Focus::Logs {
        Style::new().fg(Color::LightBlue)
    } else {
        Style::new().fg(Color::DarkGray)
    };
    let panel = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).border_style(border_style));
    frame.render_widget(panel, area);
}

fn render_detail(frame: &mut Frame, app: &App, area: Rect) {
    let body = match app.active().selected_record() {
        Some(record) => record.detail_text(),
        None => "no entry selected".to_string(),
    };
    let lines: Vec<Line> = body
        .lines()
        .skip(app.detail_scroll)
        .map(|l| Line::from(l.to_string()))
        .collect();

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" detail (esc to close) "),
    );
    frame.render_widget(panel, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = match &app.status {
        Some(note) => note.clone(),
        None => " q quit · tab panel · / filter · \\ exclude · t tail · n/N match · enter detail"
            .to_string(),
    };
    let status = Paragraph::new(text).style(Style::new().fg(Color::DarkGray));
    frame.render_widget(status, area);
}

fn flatten(message: &str) -> String {
    message.replace(['\n', '\t'], " ")
}

/// Truncate to a display width, appending an ellipsis when cut.
fn truncate_to_width(s: &str, max: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > max.saturating_sub(1) {
            out.push('…');
            return out;
        }
        width += w;
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;
    use crate::parser::LogParser;
    use crate::source::Source;
    use crate::tab::TabState;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::io::Cursor;
    use std::time::{Duration, Instant};

    fn test_app(input: &str) -> App {
        let source = Source::open_pipe(
            Cursor::new(input.to_string()),
            LogParser::new(chrono_tz::UTC),
            "stdin",
            1000,
        );
        let mut app = App::new(vec![TabState::new(source)], FilterSpec::default());
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.tabs[0].source.is_live() {
            app.poll_sources();
            assert!(Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(1));
        }
        app
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn renders_header_and_rows() {
        let mut app = test_app("ERROR boom\nINFO fine\n");
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("panam"));
        assert!(text.contains("[ERROR]"));
        assert!(text.contains("boom"));
        assert!(text.contains("LIVE"));
    }

    #[test]
    fn renders_detail_view() {
        let mut app = test_app("hello detail\n");
        app.apply_event(crate::event::AppEvent::OpenDetail);
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Timestamp:"));
        assert!(text.contains("hello detail"));
    }

    #[test]
    fn render_sets_viewport_height() {
        let mut app = test_app("a\nb\nc\n");
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render(f, &mut app)).unwrap();
        // 30 rows total: 1 header + 1 status + 28 body; borders and the
        // column header leave 25 for rows.
        assert_eq!(app.active().viewport.height(), 25);
    }

    #[test]
    fn truncation_is_width_aware() {
        assert_eq!(truncate_to_width("short", 20), "short");
        let cut = truncate_to_width("a very long message that will not fit", 10);
        assert!(cut.ends_with('…'));
        assert!(cut.chars().count() <= 10);
    }
}
