//! Per-file reassembly of deduplicated results.
//!
//! Evaluation runs over the deduplicated pair set, so results carry no memory of which
//! file a pair came from. The projector walks each source file again, in order, and
//! looks every output image up through its reconstructed [`Pair`].

pub mod error;

#[cfg(test)]
mod tests;

pub use error::{ProjectError, ProjectResult};

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::pairs::{Pair, parse_record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionStats {
    /// Well-formed records written.
    pub records: usize,
    /// Malformed input lines, each written as a placeholder record.
    pub malformed_lines: usize,
    /// Score slots filled from results.
    pub scored: usize,
    /// Score slots written as `null`.
    pub missing: usize,
}

/// A written output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedFile {
    pub path: PathBuf,
    pub stats: ProjectionStats,
}

/// Result of projecting one source inside [`ResultProjector::project_all`].
#[derive(Debug)]
pub struct ProjectOutcome {
    pub source: PathBuf,
    pub result: ProjectResult<ProjectedFile>,
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<&'a str>,
    instruction: &'a str,
    input_images: &'a [String],
    output_images: &'a [String],
    score: Vec<Value>,
}

/// Stands in for an unparseable source line so output stays line-aligned with input.
#[derive(Serialize)]
struct MalformedRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<&'a str>,
    source_line: usize,
    error: &'a str,
    score: Value,
}

/// Writes one category's scores back into the shape of the source files.
pub struct ResultProjector<'a> {
    results: &'a HashMap<Pair, Value>,
    category: &'a str,
}

impl<'a> ResultProjector<'a> {
    pub fn new(results: &'a HashMap<Pair, Value>, category: &'a str) -> Self {
        Self { results, category }
    }

    pub fn category(&self) -> &str {
        self.category
    }

    /// The category score for `pair`, if evaluated and present.
    fn lookup(&self, pair: &Pair) -> Option<&Value> {
        self.results.get(pair)?.get(self.category)
    }

    /// Writes one line per non-blank line of `reader`.
    ///
    /// Malformed lines become a placeholder carrying the line number, the parse error and
    /// a `null` score.
    pub fn project_reader<R, W>(
        &self,
        reader: R,
        mut writer: W,
        task_type: Option<&str>,
    ) -> ProjectResult<ProjectionStats>
    where
        R: BufRead,
        W: Write,
    {
        let mut stats = ProjectionStats::default();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(ProjectError::Stream)?;
            if line.trim().is_empty() {
                continue;
            }
            let record = match parse_record(&line) {
                Ok(record) => record,
                Err(reason) => {
                    warn!(line = idx + 1, %reason, "Malformed source record, writing placeholder");
                    let placeholder = MalformedRecord {
                        task_type,
                        source_line: idx + 1,
                        error: &reason,
                        score: Value::Null,
                    };
                    serde_json::to_writer(&mut writer, &placeholder)?;
                    writer.write_all(b"\n").map_err(ProjectError::Stream)?;
                    stats.malformed_lines += 1;
                    continue;
                }
            };

            let score: Vec<Value> = record
                .pairs()
                .iter()
                .map(|pair| match self.lookup(pair) {
                    Some(value) => {
                        stats.scored += 1;
                        value.clone()
                    }
                    None => {
                        stats.missing += 1;
                        Value::Null
                    }
                })
                .collect();

            let out = OutputRecord {
                task_type,
                instruction: &record.instruction,
                input_images: &record.input_images,
                output_images: &record.output_images,
                score,
            };
            serde_json::to_writer(&mut writer, &out)?;
            writer.write_all(b"\n").map_err(ProjectError::Stream)?;
            stats.records += 1;
        }

        writer.flush().map_err(ProjectError::Stream)?;
        Ok(stats)
    }

    /// Projects `source` into `save_dir/<file name of source>`.
    ///
    /// The output is staged in a temporary file and renamed into place, so a failure
    /// never leaves a half-written destination behind.
    pub fn project_file(&self, source: &Path, save_dir: &Path) -> ProjectResult<ProjectedFile> {
        let file_name = source
            .file_name()
            .ok_or_else(|| ProjectError::NoFileName(source.to_path_buf()))?;
        let dest = save_dir.join(file_name);

        fs::create_dir_all(save_dir).map_err(|e| ProjectError::io(save_dir, e))?;
        let input = File::open(source).map_err(|e| ProjectError::io(source, e))?;
        let staged =
            tempfile::NamedTempFile::new_in(save_dir).map_err(|e| ProjectError::io(save_dir, e))?;

        let task_type = task_type_of(source);
        let stats = {
            let writer = BufWriter::new(staged.as_file());
            self.project_reader(BufReader::new(input), writer, task_type.as_deref())
                .map_err(|e| match e {
                    ProjectError::Stream(err) => ProjectError::io(&dest, err),
                    other => other,
                })?
        };

        staged
            .persist(&dest)
            .map_err(|e| ProjectError::io(&dest, e.error))?;

        debug!(
            source = %source.display(),
            dest = %dest.display(),
            records = stats.records,
            missing = stats.missing,
            "Projected results"
        );
        Ok(ProjectedFile { path: dest, stats })
    }

    /// Projects each source into `save_dir`. A failing destination does not stop the rest.
    pub fn project_all<P: AsRef<Path>>(&self, sources: &[P], save_dir: &Path) -> Vec<ProjectOutcome> {
        sources
            .iter()
            .map(|source| {
                let source = source.as_ref();
                let result = self.project_file(source, save_dir);
                if let Err(e) = &result {
                    error!(source = %source.display(), error = %e, "Failed to write results");
                }
                ProjectOutcome {
                    source: source.to_path_buf(),
                    result,
                }
            })
            .collect()
    }
}

/// Benchmark sources live at `<task_type>/<category>/<file>.jsonl`.
pub fn task_type_of(source: &Path) -> Option<String> {
    source
        .parent()?
        .parent()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
