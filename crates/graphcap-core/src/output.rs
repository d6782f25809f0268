//! Result writing for caption runs.
//!
//! Records stream out as they complete. JSON Lines writes one object per
//! line; JSON writes a single array that is opened on the first record and
//! closed by [`OutputWriter::finish`].

use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name for results inside an output directory.
pub const CAPTIONS_FILE: &str = "captions.jsonl";

/// File name for the job snapshot written when `store_logs` is set.
pub const JOB_LOG_FILE: &str = "job.json";

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    /// Pick a format from an output file extension, defaulting to JSON Lines.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::JsonLines,
        }
    }
}

/// Streaming writer for result records.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            items_written: 0,
        }
    }

    /// Write one record.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                writeln!(self.writer)?;
            }
            OutputFormat::Json => {
                let sep = if self.items_written == 0 { "[\n  " } else { ",\n  " };
                self.writer.write_all(sep.as_bytes())?;
                serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Get the number of records written.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Close the JSON array (if any) and flush.
    ///
    /// A JSON writer that received no records still produces `[]`.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == OutputFormat::Json {
            let close = if self.items_written == 0 { "[]\n" } else { "\n]\n" };
            self.writer.write_all(close.as_bytes())?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Results path inside an output directory, creating the directory.
pub fn prepare_output_dir(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(CAPTIONS_FILE))
}

/// Write a pretty-printed JSON snapshot of `job` into `dir`.
pub fn write_job_log<T: Serialize>(dir: &Path, job: &T) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(JOB_LOG_FILE);
    let json = serde_json::to_string_pretty(job).map_err(io::Error::other)?;
    fs::write(&path, json)?;
    Ok(path)
}
