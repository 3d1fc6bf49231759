//! Ephemeral sort store backing [`TempTreeSort`](super::docs::TempTreeSort)
//!
//! Entries are `(key, seq, row)` where `seq` is the insertion counter used to
//! keep equal keys in arrival order and `row` is the encoded document.
//!
//! Entries accumulate in an in-memory ordered map. When its estimated size
//! exceeds the memory budget the map is written to a temporary file as one
//! sorted *run*. Reading merges every run and the in-memory remainder in
//! `(key, seq)` order.
//!
//! # Run record format
//!
//! ```text
//! +------------------+
//! | Body Length      | (u32 LE)
//! +------------------+
//! | Key              | (encoded Value)
//! +------------------+
//! | Sequence         | (u64 LE)
//! +------------------+
//! | Row Length       | (u32 LE)
//! +------------------+
//! | Row              | (encoded Document)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of the body)
//! +------------------+
//! ```
//!
//! # Cleanup
//!
//! Run files are deleted when the [`TempTree`] owning them is dropped, so
//! no temporary state outlives the stage execution that created it, whether
//! it completes, stops early or fails.

use std::cmp::{Ordering, Reverse};
use std::collections::{btree_map, BTreeMap, BinaryHeap};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::mem;
use std::path::PathBuf;

use crc32fast::Hasher;
use tempfile::NamedTempFile;

use crate::observability::Logger;
use crate::types::encoding::{encode_document, encode_value, Decoder};
use crate::types::{Document, Value};

use super::{Flow, StreamError, StreamResult};

/// Default in-memory budget before spilling: 8 MiB
pub const DEFAULT_SORT_MEMORY_BUDGET: usize = 8 * 1024 * 1024;

/// Runs are merged into one once this many exist
const MAX_OPEN_RUNS: usize = 64;

/// Approximate per-entry bookkeeping cost in the in-memory map
const ENTRY_OVERHEAD: usize = 48;

/// Settings of the ephemeral sort store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortConfig {
    /// Estimated in-memory size above which entries spill to disk
    pub memory_budget_bytes: usize,
    /// Directory for run files. `None` uses the system temporary directory.
    pub spill_dir: Option<PathBuf>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            memory_budget_bytes: DEFAULT_SORT_MEMORY_BUDGET,
            spill_dir: None,
        }
    }
}

impl SortConfig {
    pub fn with_memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }
}

/// One stored entry. `run`/`offset` locate where it was read from, for
/// error reporting.
struct Entry {
    key: Value,
    seq: u64,
    row: Vec<u8>,
    run: usize,
    offset: u64,
}

impl Entry {
    fn decode_row(&self) -> StreamResult<Document> {
        Decoder::new(&self.row)
            .read_document()
            .map_err(|e| StreamError::decode(self.run, self.offset, e))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// A sorted run stored in a temporary file
struct Run {
    file: NamedTempFile,
    records: u64,
    bytes: u64,
}

impl Run {
    fn reader(&self, index: usize) -> StreamResult<RunReader> {
        let file = self
            .file
            .reopen()
            .map_err(|e| StreamError::spill(format!("reopen run {}", index), e))?;

        Ok(RunReader {
            reader: BufReader::new(file),
            run: index,
            offset: 0,
            bytes: self.bytes,
            remaining: self.records,
        })
    }
}

struct RunWriter {
    index: usize,
    file: NamedTempFile,
    writer: BufWriter<File>,
    records: u64,
    bytes: u64,
    body: Vec<u8>,
}

impl RunWriter {
    fn create(index: usize, config: &SortConfig) -> StreamResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docstream-sort-").suffix(".run");
        let file = match &config.spill_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| StreamError::spill(format!("create run {}", index), e))?;

        let handle = file
            .as_file()
            .try_clone()
            .map_err(|e| StreamError::spill(format!("open run {}", index), e))?;

        Ok(Self {
            index,
            file,
            writer: BufWriter::new(handle),
            records: 0,
            bytes: 0,
            body: Vec::new(),
        })
    }

    fn push(&mut self, key: &Value, seq: u64, row: &[u8]) -> StreamResult<()> {
        self.body.clear();
        encode_value(&mut self.body, key);
        self.body.extend_from_slice(&seq.to_le_bytes());
        self.body.extend_from_slice(&(row.len() as u32).to_le_bytes());
        self.body.extend_from_slice(row);

        let mut hasher = Hasher::new();
        hasher.update(&self.body);
        let checksum = hasher.finalize();

        let index = self.index;
        let write = |w: &mut BufWriter<File>, body: &[u8]| -> io::Result<()> {
            w.write_all(&(body.len() as u32).to_le_bytes())?;
            w.write_all(body)?;
            w.write_all(&checksum.to_le_bytes())
        };
        write(&mut self.writer, &self.body)
            .map_err(|e| StreamError::spill(format!("write run {}", index), e))?;

        self.records += 1;
        self.bytes += 8 + self.body.len() as u64;
        Ok(())
    }

    fn finish(mut self) -> StreamResult<Run> {
        self.writer
            .flush()
            .map_err(|e| StreamError::spill(format!("flush run {}", self.index), e))?;

        Ok(Run {
            file: self.file,
            records: self.records,
            bytes: self.bytes,
        })
    }
}

struct RunReader {
    reader: BufReader<File>,
    run: usize,
    offset: u64,
    bytes: u64,
    remaining: u64,
}

impl RunReader {
    fn read_exact(&mut self, buf: &mut [u8]) -> StreamResult<()> {
        self.reader.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                StreamError::corrupted(self.run, self.offset, "truncated record")
            } else {
                StreamError::spill(format!("read run {}", self.run), e)
            }
        })
    }

    fn read_u32(&mut self) -> StreamResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn next_entry(&mut self) -> StreamResult<Option<Entry>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let record_offset = self.offset;
        let len = self.read_u32()? as u64;
        if len + 8 > self.bytes - record_offset {
            return Err(StreamError::corrupted(
                self.run,
                record_offset,
                format!("record length {} exceeds run size", len),
            ));
        }

        let mut body = vec![0u8; len as usize];
        self.read_exact(&mut body)?;
        let expected = self.read_u32()?;

        let mut hasher = Hasher::new();
        hasher.update(&body);
        if hasher.finalize() != expected {
            return Err(StreamError::corrupted(
                self.run,
                record_offset,
                "checksum mismatch",
            ));
        }

        let mut decoder = Decoder::new(&body);
        let decode = |e| StreamError::decode(self.run, record_offset, e);
        let key = decoder.read_value().map_err(decode)?;
        let seq = decoder.read_u64().map_err(decode)?;
        let row_len = decoder.read_u32().map_err(decode)? as usize;
        if row_len != decoder.remaining() {
            return Err(StreamError::corrupted(
                self.run,
                record_offset,
                "row length mismatch",
            ));
        }
        let row = body[body.len() - row_len..].to_vec();

        self.offset += 8 + len;
        self.remaining -= 1;

        Ok(Some(Entry {
            key,
            seq,
            row,
            run: self.run,
            offset: record_offset,
        }))
    }
}

/// Input of a merge
enum Source {
    Run(RunReader),
    Memory {
        run: usize,
        entries: btree_map::IntoIter<(Value, u64), Vec<u8>>,
    },
}

impl Source {
    fn next_entry(&mut self) -> StreamResult<Option<Entry>> {
        match self {
            Source::Run(reader) => reader.next_entry(),
            Source::Memory { run, entries } => Ok(entries.next().map(|((key, seq), row)| Entry {
                key,
                seq,
                row,
                run: *run,
                offset: seq,
            })),
        }
    }
}

/// K-way merge of sorted sources
struct Merger {
    sources: Vec<Source>,
    heap: BinaryHeap<Reverse<(Entry, usize)>>,
}

impl Merger {
    fn new(mut sources: Vec<Source>) -> StreamResult<Self> {
        let mut heap = BinaryHeap::with_capacity(sources.len());
        for (i, source) in sources.iter_mut().enumerate() {
            if let Some(entry) = source.next_entry()? {
                heap.push(Reverse((entry, i)));
            }
        }
        Ok(Self { sources, heap })
    }

    fn next_entry(&mut self) -> StreamResult<Option<Entry>> {
        let Some(Reverse((entry, i))) = self.heap.pop() else {
            return Ok(None);
        };
        if let Some(next) = self.sources[i].next_entry()? {
            self.heap.push(Reverse((next, i)));
        }
        Ok(Some(entry))
    }
}

/// Write-once, read-once ordered store of documents keyed by a sort value
pub struct TempTree<'c> {
    config: &'c SortConfig,
    memory: BTreeMap<(Value, u64), Vec<u8>>,
    memory_bytes: usize,
    runs: Vec<Run>,
    next_seq: u64,
    scratch: Vec<u8>,
}

impl<'c> TempTree<'c> {
    pub fn new(config: &'c SortConfig) -> Self {
        Self {
            config,
            memory: BTreeMap::new(),
            memory_bytes: 0,
            runs: Vec::new(),
            next_seq: 0,
            scratch: Vec::new(),
        }
    }

    /// Number of entries inserted so far
    pub fn entry_count(&self) -> u64 {
        self.next_seq
    }

    /// Number of runs currently on disk
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Stores `doc` under `key`, spilling to disk past the memory budget
    pub fn insert(&mut self, key: Value, doc: &Document) -> StreamResult<()> {
        let mut row = Vec::new();
        encode_document(&mut row, doc);

        self.scratch.clear();
        encode_value(&mut self.scratch, &key);
        self.memory_bytes += row.len() + self.scratch.len() + ENTRY_OVERHEAD;

        self.memory.insert((key, self.next_seq), row);
        self.next_seq += 1;

        if self.memory_bytes > self.config.memory_budget_bytes {
            self.spill()?;
        }
        Ok(())
    }

    fn spill(&mut self) -> StreamResult<()> {
        let memory = mem::take(&mut self.memory);
        self.memory_bytes = 0;

        let index = self.runs.len();
        let mut writer = RunWriter::create(index, self.config)?;
        for ((key, seq), row) in memory {
            writer.push(&key, seq, &row)?;
        }
        let run = writer.finish()?;

        let (bytes, records, run_index) = (
            run.bytes.to_string(),
            run.records.to_string(),
            index.to_string(),
        );
        Logger::info(
            "SORT_SPILL",
            &[
                ("bytes", bytes.as_str()),
                ("records", records.as_str()),
                ("run", run_index.as_str()),
            ],
        );
        self.runs.push(run);

        if self.runs.len() >= MAX_OPEN_RUNS {
            self.compact()?;
        }
        Ok(())
    }

    /// Merges every run into a single run
    fn compact(&mut self) -> StreamResult<()> {
        let runs = mem::take(&mut self.runs);
        let sources = runs
            .iter()
            .enumerate()
            .map(|(i, run)| run.reader(i).map(Source::Run))
            .collect::<StreamResult<Vec<_>>>()?;

        let mut merger = Merger::new(sources)?;
        let mut writer = RunWriter::create(0, self.config)?;
        while let Some(entry) = merger.next_entry()? {
            writer.push(&entry.key, entry.seq, &entry.row)?;
        }
        self.runs.push(writer.finish()?);

        let (merged, entries) = (runs.len().to_string(), self.entry_count().to_string());
        Logger::info(
            "SORT_COMPACT",
            &[("runs", merged.as_str()), ("entries", entries.as_str())],
        );
        Ok(())
    }

    /// Calls `f` with every document in `(key, insertion)` order, consuming
    /// the store. Stops at the first error or [`Flow::Stop`].
    pub fn drain(self, mut f: impl FnMut(Document) -> StreamResult<Flow>) -> StreamResult<Flow> {
        let TempTree { memory, runs, .. } = self;

        let mut sources = Vec::with_capacity(runs.len() + 1);
        for (i, run) in runs.iter().enumerate() {
            sources.push(Source::Run(run.reader(i)?));
        }
        sources.push(Source::Memory {
            run: runs.len(),
            entries: memory.into_iter(),
        });

        let mut merger = Merger::new(sources)?;
        while let Some(entry) = merger.next_entry()? {
            if f(entry.decode_row()?)? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }
}
