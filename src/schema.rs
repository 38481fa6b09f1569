//! Output column schema: metadata columns, then policy columns, then record
//! columns, each in declaration order.
use crate::fields::{FieldNameCache, META_FIELDS, POLICY_FIELDS, RECORD_FIELDS};

/// Ordered list of column names shared by every row of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// Build the schema from the fixed field groups. Every path is resolved
    /// through `cache`, so later per-record lookups are cache hits.
    pub fn build(cache: &mut FieldNameCache) -> Self {
        Self::from_groups(cache, &[META_FIELDS, POLICY_FIELDS, RECORD_FIELDS])
    }

    /// Build from arbitrary field groups. The groups are expected to be
    /// disjoint; no deduplication happens here.
    pub fn from_groups(cache: &mut FieldNameCache, groups: &[&[&str]]) -> Self {
        let mut columns = Vec::new();
        for group in groups {
            for path in *group {
                columns.push(cache.column_name(path).to_string());
            }
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}
