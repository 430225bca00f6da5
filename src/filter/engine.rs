use super::pattern::PatternSet;
use super::{FilterSpec, LevelFilter};
use crate::record::Record;

/// Verdict for a single record against the active filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Level masked out or an exclude pattern hit.
    Drop,
    /// Passes the filter.
    Keep,
    /// Passes the filter and hits an include pattern.
    KeepMatch,
}

/// Filter spec with its patterns compiled once per rebuild.
pub struct CompiledFilter {
    levels: LevelFilter,
    include: PatternSet,
    exclude: PatternSet,
}

impl CompiledFilter {
    pub fn compile(spec: &FilterSpec) -> Self {
        Self {
            levels: spec.levels,
            include: PatternSet::compile(&spec.include, spec.mode),
            exclude: PatternSet::compile(&spec.exclude, spec.mode),
        }
    }

    /// Evaluation order is fixed: level mask, then excludes (short-circuit),
    /// then includes. Includes never filter; they only mark matches.
    pub fn evaluate(&self, record: &Record) -> Acceptance {
        if !self.levels.allows(record.level) {
            return Acceptance::Drop;
        }
        if self.exclude.matches(&record.message) {
            return Acceptance::Drop;
        }
        if !self.include.is_empty() && self.include.matches(&record.message) {
            return Acceptance::KeepMatch;
        }
        Acceptance::Keep
    }

    /// Patterns dropped for failing to compile, for the status line.
    pub fn skipped_patterns(&self) -> usize {
        self.include.skipped() + self.exclude.skipped()
    }
}

/// The result of a full rebuild: the filtered view plus the match index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Line indices passing the filter, strictly increasing.
    pub filtered: Vec<usize>,
    /// Positions *into* `filtered` whose records also hit an include
    /// pattern. Kept separate because includes highlight, not filter.
    pub matches: Vec<usize>,
}

/// Accumulates a filtered view in line order during a rebuild pass.
///
/// Rebuilds always run front to back over a source, so both sequences come
/// out strictly increasing without a sort.
#[derive(Default)]
pub struct ViewBuilder {
    outcome: FilterOutcome,
}

impl ViewBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: usize, acceptance: Acceptance) {
        match acceptance {
            Acceptance::Drop => {}
            Acceptance::Keep => self.outcome.filtered.push(line),
            Acceptance::KeepMatch => {
                self.outcome.matches.push(self.outcome.filtered.len());
                self.outcome.filtered.push(line);
            }
        }
    }

    pub fn finish(self) -> FilterOutcome {
        self.outcome
    }
}
