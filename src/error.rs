use std::path::PathBuf;

/// Failures raised while reading a single report file.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(
        "no valid 'policy_published' and 'report_metadata' xml tags found; file: {}",
        .path.display()
    )]
    MissingMetadata { path: PathBuf },
    #[error("invalid epoch timestamp {value:?} in {field}; file: {}", .path.display())]
    InvalidTimestamp {
        path: PathBuf,
        field: String,
        value: String,
    },
    #[error("malformed xml in {}: {message}", .path.display())]
    Xml { path: PathBuf, message: String },
}

impl ExtractError {
    /// Whether this is an extraction failure (required blocks absent) as
    /// opposed to a syntax or data problem.
    pub fn is_missing_metadata(&self) -> bool {
        matches!(self, ExtractError::MissingMetadata { .. })
    }
}
