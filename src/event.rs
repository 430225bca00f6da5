/// Events produced by input handling and applied to the app state.
/// Handlers return these instead of mutating state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    // Log stream navigation
    ScrollDown,
    ScrollUp,
    HalfPageDown,
    HalfPageUp,
    JumpToEnd,
    /// Single `g`; two inside the chord window jump to the top.
    PressG,
    NextMatch,
    PrevMatch,
    ToggleTailing,

    // Detail view
    OpenDetail,
    CloseDetail,
    DetailScrollDown,
    DetailScrollUp,

    // Panel focus and filter controls
    SwitchPanel,
    PanelUp,
    PanelDown,
    /// Toggle the selected left-panel option (regex / case / level).
    PanelActivate,
    /// Start editing the selected pattern input.
    BeginEdit,
    FocusInclude,
    FocusExclude,

    // Pattern input editing (filters re-apply on every edit)
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    ToggleFilterMode,

    // Tabs
    NextTab,
    PrevTab,

    Quit,
}
