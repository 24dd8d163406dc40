//! Persisted match records and the ordered writer that keeps the output file
//! in sequence-number order regardless of completion order.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chess::{Game, GameResult};
use serde::{Deserialize, Serialize};

use crate::evaluation::MoveEvaluation;

/// Errors from writing or reading match records.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How much of a match record is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Moves and result only.
    Minimal,
    /// Moves with their evaluations.
    #[default]
    Verbose,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMove {
    pub uci: String,
    pub san: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<MoveEvaluation>,
}

/// Everything persisted about one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub number: u64,
    pub event: String,
    #[serde(default)]
    pub site: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    pub round: u32,
    pub white: String,
    pub black: String,
    pub start_fen: String,
    pub moves: Vec<RecordedMove>,
    pub result: GameResult,
}

impl GameRecord {
    /// Fill in moves from a played game; `evals` is indexed by ply.
    pub fn set_moves(&mut self, game: &Game, evals: &[MoveEvaluation]) {
        self.start_fen = game.start_fen();
        self.moves = game
            .uci_moves()
            .into_iter()
            .zip(game.history())
            .enumerate()
            .map(|(ply, (uci, entry))| RecordedMove {
                uci,
                san: entry.san.clone(),
                eval: evals.get(ply).cloned(),
            })
            .collect();
    }

    /// Copy of the record reduced to what `mode` writes.
    pub fn for_mode(&self, mode: OutputMode) -> GameRecord {
        let mut record = self.clone();
        if mode == OutputMode::Minimal {
            for mv in &mut record.moves {
                mv.eval = None;
            }
        }
        record
    }
}

/// Destination for finished match records.
pub trait RecordSink: Send {
    fn write(&mut self, record: &GameRecord, mode: OutputMode) -> Result<(), OutputError>;
}

/// Appends one JSON document per line.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSink for JsonLinesSink {
    fn write(&mut self, record: &GameRecord, mode: OutputMode) -> Result<(), OutputError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(&record.for_mode(mode))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Read up to `limit` records from the start of a JSON-lines file.
///
/// A missing file yields no records.
pub fn read_records(path: &Path, limit: usize) -> Result<Vec<GameRecord>, OutputError> {
    if !path.exists() {
        return Ok(vec![]);
    }
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        if records.len() >= limit {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Live view of the match in progress. Each write replaces the file.
#[derive(Debug, Clone)]
pub struct LiveOutput {
    path: PathBuf,
    mode: OutputMode,
}

impl LiveOutput {
    pub fn new(path: PathBuf, mode: OutputMode) -> Self {
        Self { path, mode }
    }

    pub fn write(&self, record: &GameRecord) -> Result<(), OutputError> {
        let json = serde_json::to_string_pretty(&record.for_mode(self.mode))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Buffers finished records and writes them in strictly ascending sequence
/// number order. A record waits until all of its predecessors are written;
/// a failed write keeps the record buffered and blocks its successors.
pub struct OrderedOutput {
    sink: Box<dyn RecordSink>,
    mode: OutputMode,
    pending: BTreeMap<u64, GameRecord>,
    saved_count: u64,
}

impl OrderedOutput {
    pub fn new(sink: Box<dyn RecordSink>, mode: OutputMode) -> Self {
        Self {
            sink,
            mode,
            pending: BTreeMap::new(),
            saved_count: 0,
        }
    }

    /// Drop buffered records and start over at sequence number 1.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.saved_count = 0;
    }

    /// Mark the first `count` records as already persisted (resume).
    pub fn skip_saved(&mut self, count: u64) {
        self.saved_count = self.saved_count.max(count);
        self.pending.retain(|&number, _| number > count);
    }

    /// Buffer a finished record and flush whatever is now in order.
    /// Returns the number of records written.
    pub fn push(&mut self, record: GameRecord) -> usize {
        self.pending.insert(record.number, record);
        self.flush()
    }

    /// Write the consecutive run starting at `saved_count + 1`.
    pub fn flush(&mut self) -> usize {
        let mut written = 0;
        while let Some(record) = self.pending.get(&(self.saved_count + 1)) {
            if let Err(e) = self.sink.write(record, self.mode) {
                tracing::warn!(number = record.number, "Can't write match record: {}", e);
                break;
            }
            self.pending.remove(&(self.saved_count + 1));
            self.saved_count += 1;
            written += 1;
        }
        written
    }

    pub fn saved_count(&self) -> u64 {
        self.saved_count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl std::fmt::Debug for OrderedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedOutput")
            .field("mode", &self.mode)
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .field("saved_count", &self.saved_count)
            .finish()
    }
}
