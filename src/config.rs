//! Run configuration: which reports to read, where the CSV goes, and how the
//! driver reacts to bad files.
//!
//! [`ConvertConfig::resolve`] turns raw command-line style inputs into a
//! validated configuration before any output is created. A directory input
//! expands to the `*.xml` files directly inside it, sorted by name.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::DEFAULT_MMAP_THRESHOLD_BYTES;
use crate::metadata::DateZone;

/// Output file used when the only input is a batch directory.
pub const BATCH_OUTPUT_NAME: &str = "processed.csv";

/// Outfile value that selects standard output.
pub const STDOUT_MARKER: &str = "-";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no input files provided")]
    NoInputs,
    #[error("--outfile must be set if more than 1 dmarcfile is to be processed ({count} given)")]
    OutputRequired { count: usize },
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("no .xml files found in directory {}", .0.display())]
    EmptyBatchDir(PathBuf),
    #[error("failed to list directory {}: {source}", .path.display())]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("output {} would overwrite an input file", .0.display())]
    OutputIsInput(PathBuf),
}

/// What to do when a file lacks its `report_metadata`/`policy_published` blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the whole batch at the first such file.
    #[default]
    Abort,
    /// Log the file, leave it out of the output and carry on.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    File(PathBuf),
    Stdout,
}

impl Output {
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == STDOUT_MARKER {
            Output::Stdout
        } else {
            Output::File(arg.to_path_buf())
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Output::File(p) => p.display().to_string(),
            Output::Stdout => "<stdout>".to_string(),
        }
    }
}

/// Knobs that affect how each file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub failure_policy: FailurePolicy,
    pub date_zone: DateZone,
    pub mmap_threshold: u64,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            date_zone: DateZone::Local,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    pub inputs: Vec<PathBuf>,
    pub output: Output,
    pub options: ConvertOptions,
}

impl ConvertConfig {
    pub fn new(inputs: Vec<PathBuf>, output: Output) -> Self {
        Self {
            inputs,
            output,
            options: ConvertOptions::default(),
        }
    }

    /// Validate raw inputs and pick the output destination.
    ///
    /// Without an explicit `outfile`, a single report file writes next to
    /// itself with a `.csv` extension and a single directory writes
    /// [`BATCH_OUTPUT_NAME`] inside it; anything else is an error.
    pub fn resolve(raw_inputs: &[PathBuf], outfile: Option<&Path>) -> Result<Self, ConfigError> {
        let inputs = expand_inputs(raw_inputs)?;
        let output = match outfile {
            Some(arg) => Output::from_arg(arg),
            None => match raw_inputs {
                [dir] if dir.is_dir() => Output::File(dir.join(BATCH_OUTPUT_NAME)),
                [file] => Output::File(derive_output_name(file)),
                _ => {
                    return Err(ConfigError::OutputRequired {
                        count: raw_inputs.len(),
                    });
                }
            },
        };
        if let Output::File(out) = &output {
            if inputs.iter().any(|input| input == out) {
                return Err(ConfigError::OutputIsInput(out.clone()));
            }
        }
        Ok(Self::new(inputs, output))
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }
}

/// Replace the final extension of `input` with `csv` (or append one).
pub fn derive_output_name(input: &Path) -> PathBuf {
    input.with_extension("csv")
}

fn is_xml(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// List the `*.xml` files directly inside `dir`, sorted by file name.
pub fn xml_files_in(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if is_xml(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Expand directories into their report files and check every file exists.
pub fn expand_inputs(raw_inputs: &[PathBuf]) -> Result<Vec<PathBuf>, ConfigError> {
    if raw_inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }
    let mut inputs = Vec::new();
    for raw in raw_inputs {
        if raw.is_dir() {
            let files = xml_files_in(raw)?;
            if files.is_empty() {
                return Err(ConfigError::EmptyBatchDir(raw.clone()));
            }
            inputs.extend(files);
        } else if raw.exists() {
            inputs.push(raw.clone());
        } else {
            return Err(ConfigError::InputNotFound(raw.clone()));
        }
    }
    Ok(inputs)
}
