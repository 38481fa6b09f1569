//! Field paths read from a DMARC aggregate report and the mapping from each
//! path to the flat column name used in the CSV header.
//!
//! A field path is a slash-separated list of element names relative to the
//! block it is read from (`report_metadata`, `policy_published` or `record`).
//! Column names drop the purely structural segments listed in
//! [`HEADER_EXCLUSIONS`] and join what remains with `_`, so
//! `auth_results/dkim/domain` becomes `dkim_domain`.
use std::collections::HashMap;

/// One flattened output row keyed by column name.
pub type Row = HashMap<String, String>;

/// Value written for a field whose element is absent from the report.
pub const NULL: &str = "NULL";

/// Paths read from the `report_metadata` block.
pub const META_FIELDS: &[&str] = &[
    "org_name",
    "email",
    "extra_contact_info",
    "report_id",
    DATE_BEGIN,
    DATE_END,
];

/// Paths read from the `policy_published` block.
pub const POLICY_FIELDS: &[&str] = &["domain", "adkim", "aspf", "p", "pct"];

/// Paths read from every `record` block.
pub const RECORD_FIELDS: &[&str] = &[
    "row/source_ip",
    "row/count",
    "row/policy_evaluated/disposition",
    "row/policy_evaluated/dkim",
    "row/policy_evaluated/spf",
    "row/policy_evaluated/reason/type",
    "row/policy_evaluated/reason/comment",
    "identifiers/envelope_to",
    "identifiers/header_from",
    "auth_results/dkim/domain",
    "auth_results/dkim/result",
    "auth_results/dkim/human_result",
    "auth_results/spf/domain",
    "auth_results/spf/result",
];

/// Metadata paths holding epoch seconds that are rendered as calendar dates.
pub const DATE_BEGIN: &str = "date_range/begin";
pub const DATE_END: &str = "date_range/end";

/// Path segments that only group other elements and carry no meaning of their own.
pub const HEADER_EXCLUSIONS: &[&str] = &["row", "identifiers", "auth_results"];

/// Derive the column name for a field path. Pure; see [`FieldNameCache`] for
/// the memoized lookup used during a run.
pub fn column_name_for(path: &str) -> String {
    path.split('/')
        .filter(|part| !HEADER_EXCLUSIONS.contains(part))
        .collect::<Vec<_>>()
        .join("_")
}

/// Memoizes [`column_name_for`] per distinct field path for the lifetime of a
/// batch run.
#[derive(Debug, Default, Clone)]
pub struct FieldNameCache {
    names: HashMap<String, String>,
}

impl FieldNameCache {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Return the column name for `path`, computing and caching it on first use.
    pub fn column_name(&mut self, path: &str) -> &str {
        if !self.names.contains_key(path) {
            let name = column_name_for(path);
            self.names.insert(path.to_string(), name);
        }
        &self.names[path]
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self, path: &str) -> bool {
        self.names.contains_key(path)
    }
}
