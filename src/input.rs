use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Focus, Mode};
use crate::event::AppEvent;

/// Map one key press to app events, honoring the current mode and focus.
pub fn handle_key(key: KeyEvent, app: &App) -> Vec<AppEvent> {
    // Ctrl+C quits from anywhere.
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return vec![AppEvent::Quit];
    }

    match app.mode {
        Mode::Detail => detail_keys(key),
        Mode::EditInclude | Mode::EditExclude => edit_keys(key),
        Mode::Stream => match app.focus {
            Focus::Logs => stream_keys(key),
            Focus::Filters => panel_keys(key),
        },
    }
}

fn detail_keys(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => vec![AppEvent::CloseDetail],
        KeyCode::Char('j') | KeyCode::Down => vec![AppEvent::DetailScrollDown],
        KeyCode::Char('k') | KeyCode::Up => vec![AppEvent::DetailScrollUp],
        _ => Vec::new(),
    }
}

fn edit_keys(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Esc => vec![AppEvent::InputCancel],
        KeyCode::Enter => vec![AppEvent::InputSubmit],
        KeyCode::Backspace => vec![AppEvent::InputBackspace],
        KeyCode::Tab => vec![AppEvent::ToggleFilterMode],
        KeyCode::Char(c) => vec![AppEvent::InputChar(c)],
        _ => Vec::new(),
    }
}

fn stream_keys(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Char('q') => vec![AppEvent::Quit],
        KeyCode::Tab => vec![AppEvent::SwitchPanel],
        KeyCode::Char('/') => vec![AppEvent::FocusInclude],
        KeyCode::Char('\\') => vec![AppEvent::FocusExclude],
        KeyCode::Char('j') | KeyCode::Down => vec![AppEvent::ScrollDown],
        KeyCode::Char('k') | KeyCode::Up => vec![AppEvent::ScrollUp],
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            vec![AppEvent::HalfPageDown]
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            vec![AppEvent::HalfPageUp]
        }
        KeyCode::Char('G') => vec![AppEvent::JumpToEnd],
        KeyCode::Char('g') => vec![AppEvent::PressG],
        KeyCode::Char('n') => vec![AppEvent::NextMatch],
        KeyCode::Char('N') => vec![AppEvent::PrevMatch],
        KeyCode::Char('t') => vec![AppEvent::ToggleTailing],
        KeyCode::Enter => vec![AppEvent::OpenDetail],
        KeyCode::Char(']') => vec![AppEvent::NextTab],
        KeyCode::Char('[') => vec![AppEvent::PrevTab],
        _ => Vec::new(),
    }
}

fn panel_keys(key: KeyEvent) -> Vec<AppEvent> {
    match key.code {
        KeyCode::Char('q') => vec![AppEvent::Quit],
        KeyCode::Tab => vec![AppEvent::SwitchPanel],
        KeyCode::Char('/') => vec![AppEvent::FocusInclude],
        KeyCode::Char('\\') => vec![AppEvent::FocusExclude],
        KeyCode::Char('j') | KeyCode::Down => vec![AppEvent::PanelDown],
        KeyCode::Char('k') | KeyCode::Up => vec![AppEvent::PanelUp],
        KeyCode::Char(' ') | KeyCode::Enter => vec![AppEvent::PanelActivate],
        KeyCode::Char('i') => vec![AppEvent::BeginEdit],
        _ => Vec::new(),
    }
}
