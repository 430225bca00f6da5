use crate::event::AppEvent;
use crate::filter::FilterSpec;
use crate::record::Level;
use crate::source::SourceEvent;
use crate::tab::TabState;

/// Which panel owns j/k navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Filters,
    Logs,
}

/// Interaction mode. Edit modes capture keystrokes into a pattern input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stream,
    Detail,
    EditInclude,
    EditExclude,
}

/// Left-panel rows, top to bottom.
pub mod panel_item {
    pub const INCLUDE: usize = 0;
    pub const EXCLUDE: usize = 1;
    pub const REGEX: usize = 2;
    pub const CASE: usize = 3;
    pub const ERROR: usize = 4;
    pub const WARN: usize = 5;
    pub const INFO: usize = 6;
    pub const DEBUG: usize = 7;
    pub const COUNT: usize = 8;
}

/// Top-level application state: the tabs, the shared filter spec, and the
/// interaction mode. Rendering reads this; `apply_event` mutates it.
pub struct App {
    pub tabs: Vec<TabState>,
    pub active_tab: usize,
    pub filter: FilterSpec,
    pub focus: Focus,
    pub mode: Mode,
    pub panel_item: usize,
    pub detail_scroll: usize,
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(tabs: Vec<TabState>, filter: FilterSpec) -> Self {
        Self {
            tabs,
            active_tab: 0,
            filter,
            focus: Focus::Logs,
            mode: Mode::Stream,
            panel_item: panel_item::INCLUDE,
            detail_scroll: 0,
            status: None,
            should_quit: false,
        }
    }

    pub fn active(&self) -> &TabState {
        &self.tabs[self.active_tab]
    }

    pub fn active_mut(&mut self) -> &mut TabState {
        &mut self.tabs[self.active_tab]
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, Mode::EditInclude | Mode::EditExclude)
    }

    /// Drain ingestion messages from every tab and surface the interesting
    /// ones in the status line.
    pub fn poll_sources(&mut self) {
        let filter = self.filter.clone();
        let mut notes = Vec::new();
        for tab in self.tabs.iter_mut() {
            for event in tab.poll(&filter) {
                match event {
                    SourceEvent::IndexingDone { lines, elapsed } => {
                        notes.push(format!(
                            "{}: indexed {} lines in {} ms",
                            tab.name(),
                            lines,
                            elapsed.as_millis()
                        ));
                    }
                    SourceEvent::IoError(err) => {
                        notes.push(format!("{}: {}", tab.name(), err));
                    }
                    SourceEvent::BatchReady { .. } | SourceEvent::SourceClosed => {}
                }
            }
        }
        if let Some(note) = notes.pop() {
            self.status = Some(note);
        }
    }

    /// Re-apply the active filter after any change to it.
    fn apply_filters(&mut self) {
        let filter = self.filter.clone();
        let skipped = self.active_mut().apply_filter(&filter);
        if skipped > 0 {
            self.status = Some(format!(
                "{skipped} invalid pattern{} ignored",
                if skipped == 1 { "" } else { "s" }
            ));
        } else {
            self.status = None;
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Quit => self.should_quit = true,

            // Log stream navigation
            AppEvent::ScrollDown => self.active_mut().scroll_down(),
            AppEvent::ScrollUp => self.active_mut().scroll_up(),
            AppEvent::HalfPageDown => self.active_mut().half_page_down(),
            AppEvent::HalfPageUp => self.active_mut().half_page_up(),
            AppEvent::JumpToEnd => self.active_mut().to_bottom(),
            AppEvent::PressG => self.active_mut().press_g(),
            AppEvent::NextMatch => self.active_mut().next_match(),
            AppEvent::PrevMatch => self.active_mut().prev_match(),
            AppEvent::ToggleTailing => self.active_mut().toggle_tailing(),

            // Detail view
            AppEvent::OpenDetail => {
                if self.active().selected_record().is_some() {
                    self.mode = Mode::Detail;
                    self.detail_scroll = 0;
                }
            }
            AppEvent::CloseDetail => self.mode = Mode::Stream,
            AppEvent::DetailScrollDown => self.detail_scroll += 1,
            AppEvent::DetailScrollUp => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1)
            }

            // Panel focus and option toggles
            AppEvent::SwitchPanel => {
                self.focus = match self.focus {
                    Focus::Filters => Focus::Logs,
                    Focus::Logs => Focus::Filters,
                };
            }
            AppEvent::PanelDown => {
                self.panel_item = (self.panel_item + 1) % panel_item::COUNT;
            }
            AppEvent::PanelUp => {
                self.panel_item = self
                    .panel_item
                    .checked_sub(1)
                    .unwrap_or(panel_item::COUNT - 1);
            }
            AppEvent::PanelActivate => self.activate_panel_item(),
            AppEvent::BeginEdit => match self.panel_item {
                panel_item::INCLUDE => self.mode = Mode::EditInclude,
                panel_item::EXCLUDE => self.mode = Mode::EditExclude,
                _ => {}
            },
            AppEvent::FocusInclude => {
                self.focus = Focus::Filters;
                self.panel_item = panel_item::INCLUDE;
                self.mode = Mode::EditInclude;
            }
            AppEvent::FocusExclude => {
                self.focus = Focus::Filters;
                self.panel_item = panel_item::EXCLUDE;
                self.mode = Mode::EditExclude;
            }

            // Pattern editing; the filter re-applies on every edit.
            AppEvent::InputChar(c) => {
                self.active_input_mut().push(c);
                self.apply_filters();
            }
            AppEvent::InputBackspace => {
                self.active_input_mut().pop();
                self.apply_filters();
            }
            AppEvent::InputSubmit | AppEvent::InputCancel => {
                self.mode = Mode::Stream;
            }
            AppEvent::ToggleFilterMode => {
                self.filter.mode.toggle_regex();
                self.apply_filters();
            }

            // Tabs keep their own views; refresh on activation so a filter
            // changed elsewhere catches up without jumping the viewport.
            AppEvent::NextTab => {
                if !self.tabs.is_empty() {
                    self.active_tab = (self.active_tab + 1) % self.tabs.len();
                    self.refresh_active();
                }
            }
            AppEvent::PrevTab => {
                if !self.tabs.is_empty() {
                    self.active_tab = self
                        .active_tab
                        .checked_sub(1)
                        .unwrap_or(self.tabs.len() - 1);
                    self.refresh_active();
                }
            }
        }
    }

    fn activate_panel_item(&mut self) {
        match self.panel_item {
            panel_item::INCLUDE => self.mode = Mode::EditInclude,
            panel_item::EXCLUDE => self.mode = Mode::EditExclude,
            panel_item::REGEX => {
                self.filter.mode.toggle_regex();
                self.apply_filters();
            }
            panel_item::CASE => {
                self.filter.mode.toggle_case_sensitivity();
                self.apply_filters();
            }
            panel_item::ERROR => self.toggle_level(Level::Error),
            panel_item::WARN => self.toggle_level(Level::Warn),
            panel_item::INFO => self.toggle_level(Level::Info),
            panel_item::DEBUG => self.toggle_level(Level::Debug),
            _ => {}
        }
    }

    fn toggle_level(&mut self, level: Level) {
        self.filter.levels.toggle(level);
        self.apply_filters();
    }

    fn refresh_active(&mut self) {
        let filter = self.filter.clone();
        self.active_mut().refresh_data(&filter);
    }

    fn active_input_mut(&mut self) -> &mut String {
        match self.mode {
            Mode::EditExclude => &mut self.filter.exclude,
            _ => &mut self.filter.include,
        }
    }
}
