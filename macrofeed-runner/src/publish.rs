//! Publishing a pass's tables.
//!
//! `DirectoryPublisher` writes the whole batch into a staging directory and
//! then swaps it in place of the output directory, so a reader sees either
//! the previous pass or the complete new one.

use crate::config::OutputFormat;
use macrofeed_core::data::{CategoryTable, Value, DATE_COLUMN};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("category name '{0}' is not a valid file name")]
    InvalidName(String),

    #[error("output directory {0} has no parent or file name")]
    InvalidOutputDir(PathBuf),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> PublishError + '_ {
    move |source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Every table produced by one pass, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishBatch {
    pub tables: Vec<CategoryTable>,
}

impl PublishBatch {
    pub fn new(tables: Vec<CategoryTable>) -> Self {
        Self { tables }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Receives the complete batch once per pass.
pub trait Publisher: Send + Sync {
    fn publish(&self, batch: &PublishBatch) -> Result<(), PublishError>;
}

pub struct DirectoryPublisher {
    output_dir: PathBuf,
    format: OutputFormat,
}

impl DirectoryPublisher {
    pub fn new(output_dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Sibling path `.{dir}.{suffix}` next to the output directory.
    fn sibling(&self, suffix: &str) -> Result<PathBuf, PublishError> {
        let name = self
            .output_dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PublishError::InvalidOutputDir(self.output_dir.clone()))?;
        let parent = self.output_dir.parent().unwrap_or_else(|| Path::new(""));
        Ok(parent.join(format!(".{name}.{suffix}")))
    }

    fn write_table(&self, dir: &Path, table: &CategoryTable) -> Result<(), PublishError> {
        let file_name = table_file_name(&table.name, self.format)?;
        let path = dir.join(file_name);
        match self.format {
            OutputFormat::Csv => write_csv(&path, table),
            OutputFormat::Json => write_json(&path, table),
        }
    }
}

impl Publisher for DirectoryPublisher {
    fn publish(&self, batch: &PublishBatch) -> Result<(), PublishError> {
        let staging = self.sibling("staging")?;
        let previous = self.sibling("previous")?;

        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
        }
        fs::create_dir_all(&staging).map_err(io_err(&staging))?;

        for table in &batch.tables {
            self.write_table(&staging, table)?;
        }

        replace_dir(&self.output_dir, &staging, &previous, |from, to| fs::rename(from, to))?;

        debug!(dir = %self.output_dir.display(), tables = batch.len(), "published batch");
        Ok(())
    }
}

/// Move `output` aside to `previous`, move `staging` into its place, then
/// drop `previous`. If the second move fails the old output is put back.
fn replace_dir<R>(output: &Path, staging: &Path, previous: &Path, rename: R) -> Result<(), PublishError>
where
    R: Fn(&Path, &Path) -> std::io::Result<()>,
{
    if previous.exists() {
        fs::remove_dir_all(previous).map_err(io_err(previous))?;
    }
    let moved_aside = output.exists();
    if moved_aside {
        rename(output, previous).map_err(io_err(output))?;
    }
    if let Err(source) = rename(staging, output) {
        if moved_aside {
            if let Err(e) = rename(previous, output) {
                warn!(dir = %output.display(), error = %e, "failed to restore previous output");
            }
        }
        return Err(PublishError::Io {
            path: staging.to_path_buf(),
            source,
        });
    }
    if previous.exists() {
        fs::remove_dir_all(previous).map_err(io_err(previous))?;
    }
    Ok(())
}

fn table_file_name(name: &str, format: OutputFormat) -> Result<String, PublishError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0']);
    if !valid {
        return Err(PublishError::InvalidName(name.to_string()));
    }
    Ok(format!("{name}.{}", format.extension()))
}

fn write_csv(path: &Path, table: &CategoryTable) -> Result<(), PublishError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(table.width() + 1);
    header.push(DATE_COLUMN);
    header.extend(table.headers());
    writer.write_record(&header)?;

    for (date, cells) in table.rows() {
        let mut record = Vec::with_capacity(cells.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(
            cells
                .into_iter()
                .map(|c| c.map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush().map_err(io_err(path))?;
    Ok(())
}

/// Array of records, `date` first and columns in table order.
fn write_json(path: &Path, table: &CategoryTable) -> Result<(), PublishError> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = table
        .rows()
        .map(|(date, cells)| {
            let mut record = serde_json::Map::with_capacity(cells.len() + 1);
            record.insert(
                DATE_COLUMN.to_string(),
                serde_json::Value::String(date.format("%Y-%m-%d").to_string()),
            );
            for (header, cell) in table.headers().into_iter().zip(cells) {
                let value = match cell {
                    None => serde_json::Value::Null,
                    Some(Value::Number(n)) => serde_json::Value::from(*n),
                    Some(Value::Text(s)) => serde_json::Value::String(s.clone()),
                };
                record.insert(header.to_string(), value);
            }
            record
        })
        .collect();

    let file = fs::File::create(path).map_err(io_err(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &records)?;
    writer.flush().map_err(io_err(path))?;
    Ok(())
}
