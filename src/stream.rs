use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::fetch::strip_line_terminator;
use crate::parser::LogParser;
use crate::record::Record;

/// Default cap on records kept in memory for a pipe source.
pub const DEFAULT_MAX_LINES: usize = 50_000;

const READ_BUFFER_SIZE: usize = 64 * 1024;
/// A single pathological line is truncated rather than ballooning memory.
const MAX_LINE_BYTES: usize = 1024 * 1024;
const BATCH_CAPACITY: usize = 200;
const BATCH_INTERVAL: Duration = Duration::from_millis(30);

/// Messages from an ingestion thread to the UI loop. Batches are the unit of
/// notification so a chatty pipe cannot force per-line redraws.
#[derive(Debug)]
pub enum StreamMessage {
    Batch(Vec<Record>),
    Complete,
    Error(String),
}

/// Capped in-memory store for pipe-mode records.
///
/// When full, the oldest record is evicted and `origin` advances, so the
/// logical line index of a record (`origin + physical position`) stays
/// stable for the life of the record. Filter rebuilds run over logical
/// indices and are recomputed on filter application only.
pub struct StreamStore {
    entries: VecDeque<Record>,
    origin: usize,
    max_lines: usize,
}

impl StreamStore {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_lines.min(4096)),
            origin: 0,
            max_lines: max_lines.max(1),
        }
    }

    pub fn push(&mut self, record: Record) {
        if self.entries.len() == self.max_lines {
            self.entries.pop_front();
            self.origin += 1;
        }
        self.entries.push_back(record);
    }

    pub fn extend(&mut self, batch: Vec<Record>) {
        for record in batch {
            self.push(record);
        }
    }

    /// Physical record count, never above `max_lines`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logical index of the oldest live record.
    pub fn origin(&self) -> usize {
        self.origin
    }

    /// One past the newest logical index.
    pub fn line_count(&self) -> usize {
        self.origin + self.entries.len()
    }

    pub fn get(&self, logical: usize) -> Option<&Record> {
        logical
            .checked_sub(self.origin)
            .and_then(|i| self.entries.get(i))
    }

    /// Records in ingestion order with their logical indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Record)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, r)| (self.origin + i, r))
    }
}

/// Spawn a thread that reads a byte stream line by line, parses each line
/// immediately, and delivers records in coalesced batches. A batch flushes
/// at `BATCH_CAPACITY` entries or after `BATCH_INTERVAL`, whichever comes
/// first.
pub fn spawn_ingester<R>(
    reader: R,
    parser: LogParser,
    source: String,
    tx: Sender<StreamMessage>,
) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let reader = BufReader::with_capacity(READ_BUFFER_SIZE, reader);
        ingest_loop(reader, &parser, &source, &tx);
    })
}

fn ingest_loop<R: BufRead>(
    mut reader: R,
    parser: &LogParser,
    source: &str,
    tx: &Sender<StreamMessage>,
) {
    let mut line_buf: Vec<u8> = Vec::with_capacity(4096);
    let mut batch: Vec<Record> = Vec::with_capacity(BATCH_CAPACITY);
    let mut last_flush = Instant::now();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break,
            Ok(_) => {
                if line_buf.len() > MAX_LINE_BYTES {
                    line_buf.truncate(MAX_LINE_BYTES);
                }
                let text = String::from_utf8_lossy(strip_line_terminator(&line_buf));
                batch.push(parser.parse(&text, source));

                // Flush on a full batch or on the coalescing interval,
                // whichever comes first.
                if batch.len() >= BATCH_CAPACITY || last_flush.elapsed() >= BATCH_INTERVAL {
                    if tx.send(StreamMessage::Batch(std::mem::take(&mut batch))).is_err() {
                        return;
                    }
                    last_flush = Instant::now();
                }
            }
            Err(err) => {
                // Non-fatal: report and keep the records read so far.
                let _ = tx.send(StreamMessage::Error(err.to_string()));
                break;
            }
        }
    }

    if !batch.is_empty() {
        let _ = tx.send(StreamMessage::Batch(batch));
    }
    let _ = tx.send(StreamMessage::Complete);
}
