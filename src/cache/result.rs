use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{CacheError, CacheResult};
use crate::hashing::{CacheKey, cache_key};
use crate::pairs::Pair;

/// One line of the backing log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub result: Value,
}

#[derive(Serialize)]
struct CacheEntryRef<'a> {
    key: &'a CacheKey,
    result: &'a Value,
}

/// Outcome of replaying a backing log.
#[derive(Debug, Default)]
struct Replay {
    entries: HashMap<CacheKey, Value>,
    skipped: usize,
    /// Log is non-empty and does not end in a newline (torn final write).
    torn_tail: bool,
}

struct LogWriter {
    file: File,
    torn_tail: bool,
}

impl LogWriter {
    fn open(path: &Path, torn_tail: bool) -> CacheResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CacheError::io(path, e))?;
        Ok(Self { file, torn_tail })
    }

    fn append(&mut self, line: &[u8]) -> std::io::Result<()> {
        if self.torn_tail {
            self.file.write_all(b"\n")?;
        }
        self.file.write_all(line)?;
        self.file.flush()?;
        self.file.sync_data()
    }
}

/// Persistent, append-only result store keyed by [`CacheKey`].
///
/// Reads are served from memory. Writes go to the log first (flushed and synced) and
/// only then become visible through [`get`](Self::get), so anything a reader can see is
/// already durable. Duplicate keys in the log resolve last-write-wins on replay.
pub struct ResultCache {
    path: PathBuf,
    entries: RwLock<HashMap<CacheKey, Value>>,
    log: Mutex<LogWriter>,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}

impl ResultCache {
    /// Opens (or creates) the log at `path` and replays it into memory.
    pub fn open(path: impl Into<PathBuf>) -> CacheResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CacheError::io(parent, e))?;
        }

        let replay = replay_log(&path)?;
        info!(
            path = %path.display(),
            entries = replay.entries.len(),
            skipped = replay.skipped,
            "Result cache loaded"
        );

        let log = LogWriter::open(&path, replay.torn_tail)?;
        Ok(Self {
            path,
            entries: RwLock::new(replay.entries),
            log: Mutex::new(log),
        })
    }

    /// Re-reads the backing log, replacing the in-memory view.
    ///
    /// Returns the number of distinct keys loaded.
    pub fn load(&self) -> CacheResult<usize> {
        let mut log = self.log.lock();
        let replay = replay_log(&self.path)?;
        let count = replay.entries.len();
        log.torn_tail = replay.torn_tail;
        *self.entries.write() = replay.entries;
        Ok(count)
    }

    /// Returns the cached result for `key`, if any. Never touches the log.
    #[inline]
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    #[inline]
    pub fn get_pair(&self, pair: &Pair) -> Option<Value> {
        self.get(&cache_key(pair))
    }

    #[inline]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Durably appends `key → result`, then publishes it in memory.
    ///
    /// On a log failure the error is returned and the in-memory map is left untouched.
    pub fn put(&self, key: CacheKey, result: Value) -> CacheResult<()> {
        let mut line = serde_json::to_vec(&CacheEntryRef {
            key: &key,
            result: &result,
        })?;
        line.push(b'\n');

        let mut log = self.log.lock();
        if let Err(e) = log.append(&line) {
            log.torn_tail = true;
            return Err(CacheError::io(&self.path, e));
        }
        log.torn_tail = false;
        self.entries.write().insert(key, result);
        debug!(key = %key, "Cache entry committed");
        Ok(())
    }

    #[inline]
    pub fn put_pair(&self, pair: &Pair, result: Value) -> CacheResult<()> {
        self.put(cache_key(pair), result)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point-in-time copy of the in-memory map.
    pub fn snapshot(&self) -> HashMap<CacheKey, Value> {
        self.entries.read().clone()
    }

    /// Rewrites the log with one line per key, atomically replacing the old file.
    ///
    /// Returns the number of lines written.
    pub fn compact(&self) -> CacheResult<usize> {
        let mut log = self.log.lock();
        let entries = self.entries.read().clone();

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;

        let mut keys: Vec<&CacheKey> = entries.keys().collect();
        keys.sort();
        for key in keys.iter().copied() {
            let mut line = serde_json::to_vec(&CacheEntryRef {
                key,
                result: &entries[key],
            })?;
            line.push(b'\n');
            temp.write_all(&line)
                .map_err(|e| CacheError::io(temp.path(), e))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|e| CacheError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| CacheError::CompactionFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        *log = LogWriter::open(&self.path, false)?;
        info!(path = %self.path.display(), entries = keys.len(), "Cache log compacted");
        Ok(keys.len())
    }
}

#[cfg(test)]
impl ResultCache {
    pub(crate) fn replace_log_file(&self, file: File) {
        self.log.lock().file = file;
    }
}

fn replay_log(path: &Path) -> CacheResult<Replay> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "Cache log not found, starting empty");
            return Ok(Replay::default());
        }
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let mut reader = BufReader::new(file);
    let mut replay = Replay::default();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| CacheError::io(path, e))?;
        if read == 0 {
            break;
        }
        line_no += 1;
        replay.torn_tail = buf.last() != Some(&b'\n');

        let line = buf.strip_suffix(b"\n").unwrap_or(&buf);
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<CacheEntry>(line) {
            Ok(entry) => {
                replay.entries.insert(entry.key, entry.result);
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    line = line_no,
                    error = %e,
                    "Skipping corrupted cache line"
                );
                replay.skipped += 1;
            }
        }
    }

    Ok(replay)
}
