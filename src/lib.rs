pub mod config;
pub mod convert;
pub mod error;
pub mod fields;
pub mod io;
pub mod metadata;
pub mod records;
pub mod report;
pub mod schema;
pub mod xml;

pub mod prelude {
    pub use crate::config::{ConvertConfig, ConvertOptions, FailurePolicy, Output};
    pub use crate::convert::{Converter, FileSummary, RunSummary};
    pub use crate::error::ExtractError;
    pub use crate::fields::Row;
    pub use crate::schema::Schema;
}
