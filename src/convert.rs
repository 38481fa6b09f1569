//! Converter: writes the CSV header once, then for each report file runs the
//! metadata pass followed by the record pass, appending one row per record.
//!
//! Files are processed strictly in the given order and each file is read
//! twice through independent streams, so output rows follow input order and
//! then document order.
//!
//! ```no_run
//! use dmarc_csv::config::ConvertOptions;
//! use dmarc_csv::convert::Converter;
//! # fn main() -> anyhow::Result<()> {
//! let mut converter = Converter::new(ConvertOptions::default());
//! let mut writer = csv::Writer::from_path("reports.csv")?;
//! let summary = converter.convert(&["google.com!example.com!1.xml"], &mut writer)?;
//! println!("{} rows", summary.rows_written());
//! # Ok(())
//! # }
//! ```
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::{ConvertConfig, ConvertOptions, FailurePolicy, Output};
use crate::error::ExtractError;
use crate::fields::{FieldNameCache, Row};
use crate::io::open_auto;
use crate::metadata::{METADATA_TAGS, extract_metadata};
use crate::records::{RECORD_TAGS, RecordStream};
use crate::schema::Schema;
use crate::xml::ElementStream;

/// Rows written for one converted report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub path: PathBuf,
    pub rows: usize,
}

/// Outcome of a completed run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Converted reports in processing order.
    pub converted: Vec<FileSummary>,
    /// Files left out under [`FailurePolicy::Skip`].
    pub skipped: Vec<PathBuf>,
}

impl RunSummary {
    pub fn rows_written(&self) -> usize {
        self.converted.iter().map(|f| f.rows).sum()
    }
}

/// True when `err` is a missing `report_metadata`/`policy_published` failure.
pub fn is_extraction_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ExtractError>()
        .is_some_and(ExtractError::is_missing_metadata)
}

/// Holds the column cache and schema for one batch run.
#[derive(Debug)]
pub struct Converter {
    cache: FieldNameCache,
    schema: Schema,
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        let mut cache = FieldNameCache::new();
        let schema = Schema::build(&mut cache);
        Self {
            cache,
            schema,
            options,
        }
    }

    /// Metadata pass over `path` on its own stream.
    pub fn read_metadata(&mut self, path: &Path) -> Result<Row> {
        let source = open_auto(path, self.options.mmap_threshold)?;
        let elements = ElementStream::new(source, path, METADATA_TAGS);
        let meta = extract_metadata(elements, path, &mut self.cache, self.options.date_zone)?;
        Ok(meta)
    }

    /// Record pass over `path`, writing each row as soon as it is built.
    /// Returns the number of rows written.
    pub fn write_records<W: Write>(
        &mut self,
        path: &Path,
        meta: &Row,
        writer: &mut csv::Writer<W>,
    ) -> Result<usize> {
        let source = open_auto(path, self.options.mmap_threshold)?;
        let elements = ElementStream::new(source, path, RECORD_TAGS);
        let mut written = 0;
        for row in RecordStream::new(elements, &mut self.cache, meta) {
            let row = row?;
            writer
                .write_record(
                    self.schema
                        .columns()
                        .iter()
                        .map(|column| row.get(column).map(String::as_str).unwrap_or("")),
                )
                .with_context(|| format!("write csv row for {}", path.display()))?;
            written += 1;
        }
        Ok(written)
    }

    /// Write the header and every record of `inputs` to `writer`. Rows written
    /// before a fatal error are flushed before the error is returned.
    pub fn convert<W: Write, P: AsRef<Path>>(
        &mut self,
        inputs: &[P],
        writer: &mut csv::Writer<W>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let outcome = self.convert_all(inputs, writer, &mut summary);
        writer.flush().context("flush csv output")?;
        outcome.map(|()| summary)
    }

    fn convert_all<W: Write, P: AsRef<Path>>(
        &mut self,
        inputs: &[P],
        writer: &mut csv::Writer<W>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        writer
            .write_record(self.schema.columns())
            .context("write csv header")?;
        for input in inputs {
            let path = input.as_ref();
            info!("processing {}", path.display());
            let meta = match self.read_metadata(path) {
                Ok(meta) => meta,
                Err(e)
                    if self.options.failure_policy == FailurePolicy::Skip
                        && is_extraction_failure(&e) =>
                {
                    warn!("skipping: {:#}", e);
                    summary.skipped.push(path.to_path_buf());
                    continue;
                }
                Err(e) => return Err(e),
            };
            let rows = self.write_records(path, &meta, writer)?;
            debug!("{}: {} records", path.display(), rows);
            summary.converted.push(FileSummary {
                path: path.to_path_buf(),
                rows,
            });
        }
        Ok(())
    }
}

/// Run a resolved configuration end to end.
pub fn run(config: &ConvertConfig) -> Result<RunSummary> {
    let mut converter = Converter::new(config.options);
    match &config.output {
        Output::File(path) => {
            let mut writer = csv::Writer::from_path(path)
                .with_context(|| format!("create {}", path.display()))?;
            converter.convert(&config.inputs, &mut writer)
        }
        Output::Stdout => {
            let mut writer = csv::Writer::from_writer(io::stdout().lock());
            converter.convert(&config.inputs, &mut writer)
        }
    }
}
