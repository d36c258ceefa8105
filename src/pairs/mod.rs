//! Loading and deduplicating evaluation pairs from JSONL sources.
//!
//! Every source line names one instruction, one or more input images (only the first is
//! scored) and one or more output images. Each output image yields one [`Pair`]; pairs
//! collapse across all sources so an identical request is evaluated once.
//!
//! Loading never fails as a whole. Unreadable files and malformed lines are logged,
//! counted in [`LoadStats`] and skipped.

mod record;

#[cfg(test)]
mod tests;

pub use record::{Pair, PairRecord};

use std::collections::HashSet;
use std::collections::hash_set;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
/// Counters gathered while loading sources.
pub struct LoadStats {
    /// Sources that were opened and scanned.
    pub files_read: usize,
    /// Sources that could not be opened or read.
    pub files_failed: usize,
    /// Well-formed records seen (before dedup).
    pub records: usize,
    /// Lines skipped as malformed.
    pub malformed_lines: usize,
}

/// Deduplicated set of pairs plus the stats of how it was built.
#[derive(Debug, Clone, Default)]
pub struct PairSet {
    pairs: HashSet<Pair>,
    stats: LoadStats,
}

impl PairSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every JSONL file in `paths`, skipping what cannot be read.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut set = Self::new();
        for path in paths {
            set.load_file(path.as_ref());
        }
        debug!(
            pairs = set.len(),
            files_read = set.stats.files_read,
            files_failed = set.stats.files_failed,
            malformed = set.stats.malformed_lines,
            "Loaded pair set"
        );
        set
    }

    /// Adds the pairs from one JSONL file. Returns `false` if the file could not be read.
    pub fn load_file(&mut self, path: &Path) -> bool {
        match File::open(path) {
            Ok(file) => {
                self.read_source(&path.display().to_string(), BufReader::new(file));
                true
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open pair source");
                self.stats.files_failed += 1;
                false
            }
        }
    }

    /// Adds the pairs from an already-open source. `name` only appears in logs.
    pub fn read_source<R: BufRead>(&mut self, name: &str, reader: R) {
        for (idx, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!(source = name, line = idx + 1, error = %e, "Failed to read pair source");
                    self.stats.files_failed += 1;
                    return;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_record(&line) {
                Ok(record) => {
                    self.stats.records += 1;
                    self.pairs.extend(record.pairs());
                }
                Err(reason) => {
                    warn!(source = name, line = idx + 1, %reason, "Skipping malformed pair record");
                    self.stats.malformed_lines += 1;
                }
            }
        }
        self.stats.files_read += 1;
    }

    pub fn insert(&mut self, pair: Pair) -> bool {
        self.pairs.insert(pair)
    }

    pub fn contains(&self, pair: &Pair) -> bool {
        self.pairs.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn iter(&self) -> hash_set::Iter<'_, Pair> {
        self.pairs.iter()
    }

    /// Consumes the set, returning pairs in a stable (sorted) order.
    pub fn into_vec(self) -> Vec<Pair> {
        let mut pairs: Vec<Pair> = self.pairs.into_iter().collect();
        pairs.sort();
        pairs
    }
}

impl Extend<Pair> for PairSet {
    fn extend<T: IntoIterator<Item = Pair>>(&mut self, iter: T) {
        self.pairs.extend(iter);
    }
}

impl FromIterator<Pair> for PairSet {
    fn from_iter<T: IntoIterator<Item = Pair>>(iter: T) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
            stats: LoadStats::default(),
        }
    }
}

impl IntoIterator for PairSet {
    type Item = Pair;
    type IntoIter = hash_set::IntoIter<Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Parses one source line into a record that can produce at least one pair.
pub(crate) fn parse_record(line: &str) -> Result<PairRecord, String> {
    let record: PairRecord = serde_json::from_str(line).map_err(|e| e.to_string())?;
    if record.input_images.is_empty() {
        return Err("`input_images` is empty".to_string());
    }
    Ok(record)
}
