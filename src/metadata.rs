//! Per-file metadata: the `report_metadata` and `policy_published` blocks,
//! merged into one row that is joined onto every record of the file.
use std::io::BufRead;
use std::path::Path;

use chrono::TimeZone;

use crate::error::ExtractError;
use crate::fields::{
    DATE_BEGIN, DATE_END, FieldNameCache, META_FIELDS, NULL, POLICY_FIELDS, Row,
};
use crate::xml::{Element, ElementStream};

pub const REPORT_METADATA_TAG: &str = "report_metadata";
pub const POLICY_PUBLISHED_TAG: &str = "policy_published";
pub const METADATA_TAGS: &[&str] = &[REPORT_METADATA_TAG, POLICY_PUBLISHED_TAG];

/// Calendar used to render the report date range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateZone {
    #[default]
    Local,
    Utc,
}

impl DateZone {
    /// Render epoch seconds as `YYYY-MM-DD`. Fractional seconds are floored.
    /// Returns `None` for non-numeric or out-of-range input.
    pub fn format_epoch(self, raw: &str) -> Option<String> {
        let secs = raw.trim().parse::<f64>().ok().filter(|s| s.is_finite())?;
        let secs = secs.floor();
        if secs < i64::MIN as f64 || secs > i64::MAX as f64 {
            return None;
        }
        let secs = secs as i64;
        let formatted = match self {
            DateZone::Local => chrono::Local
                .timestamp_opt(secs, 0)
                .earliest()?
                .format("%Y-%m-%d")
                .to_string(),
            DateZone::Utc => chrono::Utc
                .timestamp_opt(secs, 0)
                .single()?
                .format("%Y-%m-%d")
                .to_string(),
        };
        Some(formatted)
    }
}

/// Read `fields` from `element`, writing `NULL` for any that are absent.
pub fn read_fields(element: &Element, fields: &[&str], cache: &mut FieldNameCache) -> Row {
    fields
        .iter()
        .map(|field| {
            let column = cache.column_name(field).to_string();
            (column, element.find_text_or(field, NULL).to_string())
        })
        .collect()
}

/// Scan `elements` until one `report_metadata` and one `policy_published`
/// block have been seen, then merge them into the file's metadata row with
/// the date range rendered in `zone`.
///
/// The stream is dropped as soon as both blocks are found, so the rest of the
/// document is never read. Fails with [`ExtractError::MissingMetadata`] when
/// the document ends first.
pub fn extract_metadata<R: BufRead>(
    elements: ElementStream<R>,
    path: &Path,
    cache: &mut FieldNameCache,
    zone: DateZone,
) -> Result<Row, ExtractError> {
    let mut report: Option<Row> = None;
    let mut policy: Option<Row> = None;

    for element in elements {
        let element = element?;
        match element.name.as_str() {
            REPORT_METADATA_TAG if report.is_none() => {
                report = Some(read_fields(&element, META_FIELDS, cache));
            }
            POLICY_PUBLISHED_TAG if policy.is_none() => {
                policy = Some(read_fields(&element, POLICY_FIELDS, cache));
            }
            _ => {}
        }
        if report.is_some() && policy.is_some() {
            break;
        }
    }

    let (Some(mut meta), Some(policy)) = (report, policy) else {
        return Err(ExtractError::MissingMetadata {
            path: path.to_path_buf(),
        });
    };
    meta.extend(policy);

    for field in [DATE_BEGIN, DATE_END] {
        let column = cache.column_name(field).to_string();
        let raw = meta.get(&column).map(String::as_str).unwrap_or(NULL);
        let date = zone
            .format_epoch(raw)
            .ok_or_else(|| ExtractError::InvalidTimestamp {
                path: path.to_path_buf(),
                field: column.clone(),
                value: raw.to_string(),
            })?;
        meta.insert(column, date);
    }
    Ok(meta)
}
