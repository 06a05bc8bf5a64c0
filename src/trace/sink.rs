use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::trace::error::StreamError;
use crate::trace::record::TraceRecord;

/// Append-only destination for trace records.
///
/// Implementations must preserve call order: the order `append` is called in is
/// the order records appear in the stream.
pub trait TraceSink: Send + Sync {
    fn append(&self, record: &TraceRecord) -> Result<(), StreamError>;
}

/// JSONL trace stream on disk. Every record is flushed as soon as it is written.
pub struct TraceWriter {
    path: PathBuf,
    written: AtomicU64,
    writer: Mutex<BufWriter<File>>,
}

impl TraceWriter {
    /// Create (or truncate) a stream at `path`.
    pub fn create(path: &Path) -> Result<Self, StreamError> {
        let file = File::create(path).map_err(|source| StreamError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_file(path, file))
    }

    /// Open `path` for appending, creating it if needed. Several test binaries
    /// may share one stream this way.
    pub fn append_to(path: &Path) -> Result<Self, StreamError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StreamError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StreamError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_file(path, file))
    }

    fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            written: AtomicU64::new(0),
            writer: Mutex::new(BufWriter::new(file)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records_written(&self) -> u64 {
        self.written.load(Ordering::SeqCst)
    }
}

impl TraceSink for TraceWriter {
    fn append(&self, record: &TraceRecord) -> Result<(), StreamError> {
        let json = record.to_jsonl()?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{json}")?;
        writer.flush()?;
        self.written.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory sink, handy for in-process record/replay and for tests.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<TraceRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl TraceSink for MemorySink {
    fn append(&self, record: &TraceRecord) -> Result<(), StreamError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}
