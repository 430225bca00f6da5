use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::cache::ParseCache;
use crate::fetch::{strip_line_terminator, LineFetcher};
use crate::filter::engine::{CompiledFilter, FilterOutcome, ViewBuilder};
use crate::index::{build_index, LineIndex};
use crate::parser::LogParser;
use crate::record::Record;
use crate::stream::{spawn_ingester, StreamMessage, StreamStore};

/// Lines per fetch+parse batch during a filter rebuild. Non-matching
/// records are dropped as soon as they are evaluated.
const REBUILD_BATCH: usize = 512;

/// Typed notifications surfaced to the UI loop when a source is polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// The background index pass finished; the source is now readable.
    IndexingDone { lines: usize, elapsed: Duration },
    /// New pipe records were appended.
    BatchReady { appended: usize },
    /// The pipe reached EOF.
    SourceClosed,
    /// A non-fatal read error; ingestion state is preserved.
    IoError(String),
}

enum IndexMessage {
    Built { index: LineIndex, elapsed: Duration },
    Failed(String),
}

/// A file-backed source: offset table owned here, lazy fetch+parse with a
/// shared parse cache behind a coarse lock.
pub struct FileSource {
    label: String,
    index: LineIndex,
    fetcher: LineFetcher,
    cache: RwLock<ParseCache>,
    parser: LogParser,
    index_rx: Option<Receiver<IndexMessage>>,
    index_elapsed: Option<Duration>,
}

impl FileSource {
    /// Open a file and start indexing it on a background thread. Fails fast
    /// when the file cannot be opened; the index arrives via `poll`.
    pub fn open(path: &Path, parser: LogParser) -> Result<Self> {
        let fetcher = LineFetcher::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let (tx, rx) = channel();
        let index_path: PathBuf = path.to_path_buf();
        std::thread::spawn(move || {
            let started = Instant::now();
            let message = match build_index(&index_path) {
                Ok(index) => IndexMessage::Built {
                    index,
                    elapsed: started.elapsed(),
                },
                Err(err) => IndexMessage::Failed(err.to_string()),
            };
            let _ = tx.send(message);
        });

        Ok(Self {
            label: path.display().to_string(),
            index: LineIndex::new(),
            fetcher,
            cache: RwLock::new(ParseCache::default_capacity()),
            parser,
            index_rx: Some(rx),
            index_elapsed: None,
        })
    }

    fn poll(&mut self) -> Vec<SourceEvent> {
        let Some(rx) = &self.index_rx else {
            return Vec::new();
        };
        match rx.try_recv() {
            Ok(IndexMessage::Built { index, elapsed }) => {
                self.index = index;
                self.index_elapsed = Some(elapsed);
                self.index_rx = None;
                vec![SourceEvent::IndexingDone {
                    lines: self.index.len(),
                    elapsed,
                }]
            }
            Ok(IndexMessage::Failed(err)) => {
                self.index_rx = None;
                vec![SourceEvent::IoError(err)]
            }
            Err(TryRecvError::Empty) => Vec::new(),
            Err(TryRecvError::Disconnected) => {
                self.index_rx = None;
                Vec::new()
            }
        }
    }

    fn is_indexing(&self) -> bool {
        self.index_rx.is_some()
    }

    fn record(&self, line: usize) -> Option<Record> {
        // Readers do not block each other: a miss releases the read lock,
        // computes, then takes the write lock only to insert.
        if let Some(record) = self.cache.read().ok()?.get(line) {
            return Some(record);
        }
        let record = self.parse_line(line)?;
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(line, record.clone());
        }
        Some(record)
    }

    fn parse_line(&self, line: usize) -> Option<Record> {
        let bytes = self.fetcher.fetch_line(&self.index, line).ok()?;
        let text = String::from_utf8_lossy(strip_line_terminator(&bytes));
        Some(self.parser.parse(&text, &self.label))
    }

    /// Fetch a window of records, reading uncached lines in as few
    /// positional reads as the index layout allows.
    fn records(&self, lines: &[usize]) -> Vec<Record> {
        let mut out: Vec<Option<Record>> = vec![None; lines.len()];
        let mut missing: Vec<(usize, usize)> = Vec::new();

        if let Ok(cache) = self.cache.read() {
            for (slot, &line) in lines.iter().enumerate() {
                match cache.get(line) {
                    Some(record) => out[slot] = Some(record),
                    None => missing.push((slot, line)),
                }
            }
        } else {
            missing = lines.iter().copied().enumerate().collect();
        }

        if !missing.is_empty() {
            let wanted: Vec<usize> = missing.iter().map(|&(_, line)| line).collect();
            if let Ok(raw) = self.fetcher.fetch(&self.index, &wanted) {
                let mut cache = self.cache.write().ok();
                for ((slot, line), bytes) in missing.into_iter().zip(raw) {
                    let text = String::from_utf8_lossy(strip_line_terminator(&bytes));
                    let record = self.parser.parse(&text, &self.label);
                    if let Some(cache) = cache.as_mut() {
                        cache.insert(line, record.clone());
                    }
                    out[slot] = Some(record);
                }
            }
        }

        out.into_iter().flatten().collect()
    }

    /// One linear pass for a filter rebuild, paged in fixed batches so the
    /// working set stays bounded regardless of file size. Cached records are
    /// reused; fresh parses are not retained.
    fn scan_filter(&self, filter: &CompiledFilter) -> FilterOutcome {
        let mut builder = ViewBuilder::new();
        let total = self.index.len();

        let mut batch_start = 0;
        while batch_start < total {
            let batch_end = (batch_start + REBUILD_BATCH).min(total);
            let lines: Vec<usize> = (batch_start..batch_end).collect();

            let cached: Vec<Option<Record>> = {
                match self.cache.read() {
                    Ok(cache) => lines.iter().map(|&l| cache.get(l)).collect(),
                    Err(_) => vec![None; lines.len()],
                }
            };

            let raw = self.fetcher.fetch(&self.index, &lines).unwrap_or_default();
            for (i, line) in lines.iter().copied().enumerate() {
                let acceptance = if let Some(record) = &cached[i] {
                    filter.evaluate(record)
                } else if let Some(bytes) = raw.get(i) {
                    let text = String::from_utf8_lossy(strip_line_terminator(bytes));
                    let record = self.parser.parse(&text, &self.label);
                    filter.evaluate(&record)
                } else {
                    continue;
                };
                builder.push(line, acceptance);
            }
            batch_start = batch_end;
        }

        builder.finish()
    }
}

/// A pipe-backed source: records are parsed on arrival and held in a capped
/// ring; eviction advances the logical origin.
pub struct PipeSource {
    label: String,
    store: StreamStore,
    rx: Receiver<StreamMessage>,
    complete: bool,
}

impl PipeSource {
    /// Spawn an ingestion thread over any byte stream (stdin in production,
    /// any `Read` in tests).
    pub fn open<R: Read + Send + 'static>(
        reader: R,
        parser: LogParser,
        label: &str,
        max_lines: usize,
    ) -> Self {
        let (tx, rx) = channel();
        spawn_ingester(reader, parser, label.to_string(), tx);
        Self {
            label: label.to_string(),
            store: StreamStore::new(max_lines),
            rx,
            complete: false,
        }
    }

    fn poll(&mut self) -> Vec<SourceEvent> {
        let mut events = Vec::new();
        let mut appended = 0usize;
        loop {
            match self.rx.try_recv() {
                Ok(StreamMessage::Batch(batch)) => {
                    appended += batch.len();
                    self.store.extend(batch);
                }
                Ok(StreamMessage::Complete) => {
                    self.complete = true;
                    events.push(SourceEvent::SourceClosed);
                    break;
                }
                Ok(StreamMessage::Error(err)) => {
                    events.push(SourceEvent::IoError(err));
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.complete {
                        self.complete = true;
                        events.push(SourceEvent::SourceClosed);
                    }
                    break;
                }
            }
        }
        if appended > 0 {
            // One notification per poll regardless of how many batches landed.
            events.insert(0, SourceEvent::BatchReady { appended });
        }
        events
    }

    fn scan_filter(&self, filter: &CompiledFilter) -> FilterOutcome {
        let mut builder = ViewBuilder::new();
        for (line, record) in self.store.iter() {
            builder.push(line, filter.evaluate(record));
        }
        builder.finish()
    }

    #[cfg(test)]
    pub(crate) fn push_for_test(&mut self, record: Record) {
        self.store.push(record);
    }
}

/// A log source is a file or a pipe; both expose the same capability set.
pub enum Source {
    File(FileSource),
    Pipe(PipeSource),
}

impl Source {
    pub fn open_file(path: &Path, parser: LogParser) -> Result<Self> {
        Ok(Source::File(FileSource::open(path, parser)?))
    }

    pub fn open_stdin(parser: LogParser, max_lines: usize) -> Self {
        Source::Pipe(PipeSource::open(
            std::io::stdin(),
            parser,
            "stdin",
            max_lines,
        ))
    }

    pub fn open_pipe<R: Read + Send + 'static>(
        reader: R,
        parser: LogParser,
        label: &str,
        max_lines: usize,
    ) -> Self {
        Source::Pipe(PipeSource::open(reader, parser, label, max_lines))
    }

    pub fn label(&self) -> &str {
        match self {
            Source::File(f) => &f.label,
            Source::Pipe(p) => &p.label,
        }
    }

    /// Total logical lines (including pipe lines already evicted).
    pub fn line_count(&self) -> usize {
        match self {
            Source::File(f) => f.index.len(),
            Source::Pipe(p) => p.store.line_count(),
        }
    }

    /// First addressable logical line (non-zero once a pipe ring wraps).
    pub fn first_line(&self) -> usize {
        match self {
            Source::File(_) => 0,
            Source::Pipe(p) => p.store.origin(),
        }
    }

    pub fn is_indexing(&self) -> bool {
        match self {
            Source::File(f) => f.is_indexing(),
            Source::Pipe(_) => false,
        }
    }

    /// Pipe EOF state; files are always "complete" once indexed.
    pub fn is_live(&self) -> bool {
        match self {
            Source::File(_) => false,
            Source::Pipe(p) => !p.complete,
        }
    }

    pub fn index_elapsed(&self) -> Option<Duration> {
        match self {
            Source::File(f) => f.index_elapsed,
            Source::Pipe(_) => None,
        }
    }

    /// Drain pending ingestion messages, returning typed events for the UI.
    pub fn poll(&mut self) -> Vec<SourceEvent> {
        match self {
            Source::File(f) => f.poll(),
            Source::Pipe(p) => p.poll(),
        }
    }

    pub fn record(&self, line: usize) -> Option<Record> {
        match self {
            Source::File(f) => f.record(line),
            Source::Pipe(p) => p.store.get(line).cloned(),
        }
    }

    /// Fetch the records for a set of sorted line indices.
    pub fn records(&self, lines: &[usize]) -> Vec<Record> {
        match self {
            Source::File(f) => f.records(lines),
            Source::Pipe(p) => lines
                .iter()
                .filter_map(|&l| p.store.get(l).cloned())
                .collect(),
        }
    }

    /// One full filter pass over the source.
    pub fn scan_filter(&self, filter: &CompiledFilter) -> FilterOutcome {
        match self {
            Source::File(f) => f.scan_filter(filter),
            Source::Pipe(p) => p.scan_filter(filter),
        }
    }
}
