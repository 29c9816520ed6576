//! Result-set writers: CSV (default) and JSON. One file per subreddit.

use crate::model::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output format selector for the CLI and config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Errors from the writers. The records passed in are never modified.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot create output file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write JSON {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `{dir}/{subreddit}.{ext}`
pub fn output_path(dir: &Path, subreddit: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", subreddit, format.extension()))
}

/// Write records in the given format, creating parent directories as needed.
pub fn write_records(
    records: &[Record],
    path: &Path,
    format: OutputFormat,
) -> Result<(), ExportError> {
    match format {
        OutputFormat::Csv => write_csv(records, path),
        OutputFormat::Json => write_json(records, path),
    }
}

/// CSV with a header row, even when there are no records.
pub fn write_csv(records: &[Record], path: &Path) -> Result<(), ExportError> {
    let file = create_file(path)?;
    let csv_err = |source: csv::Error| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));
    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for record in records {
        writer.serialize(record).map_err(csv_err)?;
    }
    writer.flush().map_err(|e| csv_err(e.into()))?;
    Ok(())
}

/// Pretty-printed JSON array.
pub fn write_json(records: &[Record], path: &Path) -> Result<(), ExportError> {
    let file = create_file(path)?;
    let json_err = |source: serde_json::Error| ExportError::Json {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, records).map_err(json_err)?;
    writer
        .flush()
        .map_err(|e| json_err(serde_json::Error::io(e)))
}

/// Column names, in [Record] field order.
pub const CSV_HEADER: [&str; 9] = [
    "identifier",
    "ups",
    "downs",
    "upvote_ratio",
    "num_comments",
    "subreddit_subscribers",
    "engagement_ratio",
    "title_length",
    "time",
];

fn create_file(path: &Path) -> Result<File, ExportError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| ExportError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    File::create(path).map_err(|source| ExportError::CreateFile {
        path: path.to_path_buf(),
        source,
    })
}
