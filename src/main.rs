use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    event::{self as crossterm_event, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use panam::app::App;
use panam::config::{expand_path, resolve_timezone, Config};
use panam::filter::FilterSpec;
use panam::input::handle_key;
use panam::parser::LogParser;
use panam::source::Source;
use panam::stream::DEFAULT_MAX_LINES;
use panam::tab::TabState;
use panam::ui;

/// Refresh tick while any source is still producing data.
const ACTIVE_TICK_MS: u64 = 50;

#[derive(Parser, Debug)]
#[command(name = "panam")]
#[command(version)]
#[command(about = "A terminal UI for viewing and filtering log files")]
#[command(long_about = "Panam is a TUI for browsing, filtering, and tailing log files in \
real time. It supports piped input, multi-gigabyte files via lazy indexing, and \
structured formats (OTLP JSON, common log, timed lines) out of the box.")]
#[command(after_help = "\
EXAMPLES:
    panam app.log                 View a single log file
    panam /var/log                View every file in a directory
    panam -e api.log,worker.log   View multiple files as tabs
    kubectl logs pod | panam      Tail piped logs
    panam -i error -x healthz     Start with include/exclude patterns
")]
struct Cli {
    /// Log file or directory to view
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Maximum lines kept in memory for piped input
    #[arg(short = 'm', long = "max_line", default_value_t = DEFAULT_MAX_LINES)]
    max_line: usize,

    /// Files to view (comma-separated, repeatable)
    #[arg(short = 'e', long = "files", value_delimiter = ',')]
    files: Vec<PathBuf>,

    /// Refresh rate in seconds while idle (advisory)
    #[arg(short = 'r', long = "refresh_rate", default_value_t = 1)]
    refresh_rate: u64,

    /// Default include filter patterns (comma-separated)
    #[arg(short = 'i', long = "include", default_value = "")]
    include: String,

    /// Default exclude filter patterns (comma-separated)
    #[arg(short = 'x', long = "exclude", default_value = "")]
    exclude: String,

    /// IANA timezone for timestamp display (unknown zones fall back to UTC)
    #[arg(long = "timezone", default_value = "UTC")]
    timezone: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut files = cli.files.clone();
    if let Some(path) = &cli.path {
        files.extend(expand_path(path));
    }

    let config = Config {
        max_lines: cli.max_line,
        files,
        refresh_rate: cli.refresh_rate.max(1),
        include: cli.include,
        exclude: cli.exclude,
        timezone: resolve_timezone(&cli.timezone),
    };

    let parser = LogParser::new(config.timezone);

    // Sources open before the terminal flips to the alternate screen, so an
    // unreadable file is a plain fatal error with a normal exit code.
    let mut tabs = Vec::new();
    if !io::stdin().is_terminal() {
        tabs.push(TabState::new(Source::open_stdin(
            parser.clone(),
            config.max_lines,
        )));
    }
    for path in &config.files {
        let source = Source::open_file(path, parser.clone())
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        tabs.push(TabState::new(source));
    }

    if tabs.is_empty() {
        bail!("no input: pass a file or directory, or pipe data into panam");
    }

    let filter = FilterSpec {
        include: config.include.clone(),
        exclude: config.exclude.clone(),
        ..Default::default()
    };
    let mut app = App::new(tabs, filter);

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &config);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    config: &Config,
) -> Result<()> {
    loop {
        // Drain ingestion messages, then render the (possibly updated)
        // state. Batches coalesce into at most one redraw per tick.
        app.poll_sources();
        terminal.draw(|frame| ui::render(frame, app))?;

        let busy = app
            .tabs
            .iter()
            .any(|t| t.source.is_indexing() || t.source.is_live());
        let tick = if busy {
            Duration::from_millis(ACTIVE_TICK_MS)
        } else {
            Duration::from_secs(config.refresh_rate)
        };

        if crossterm_event::poll(tick)? {
            match crossterm_event::read()? {
                Event::Key(key) if key.kind != KeyEventKind::Release => {
                    for event in handle_key(key, app) {
                        app.apply_event(event);
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
