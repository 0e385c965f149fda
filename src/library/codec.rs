//! Versioned JSON export/import for animation libraries
//!
//! Three historical shapes exist in the wild and all must keep importing:
//! multi-row maps, a legacy single-row layout nested under risk levels, and
//! the current single-row export with a `__metadata` header. Shape detection
//! is an explicit classification into [`ImportSchema`], each variant with its
//! own migration, rather than ad hoc sniffing at use sites. Malformed
//! animation entries are skipped with a warning; one bad record never sinks
//! a whole import.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::anim::BallAnimation;

/// Current export format version
pub const EXPORT_VERSION: &str = "1.0.0";

/// bucket index -> animations
pub type BucketMap = BTreeMap<u32, Vec<BallAnimation>>;
/// row count -> bucket index -> animations
pub type RowMap = BTreeMap<u32, BucketMap>;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid animation json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized library shape (not multi-row, legacy risk-nested, or current export)")]
    UnrecognizedShape,
}

/// Export file header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMeta {
    pub version: String,
    /// ISO-8601 generation timestamp
    pub generated: String,
    pub row_count: u32,
    pub total_animations: u32,
    pub approved_animations: u32,
}

/// The current on-disk export shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryExport {
    #[serde(rename = "__metadata")]
    pub metadata: ExportMeta,
    pub animations: BucketMap,
}

/// Build the current export shape for one row count
pub fn export_row(row_count: u32, buckets: &BucketMap) -> LibraryExport {
    let total: usize = buckets.values().map(Vec::len).sum();
    let approved: usize = buckets
        .values()
        .flat_map(|animations| animations.iter())
        .filter(|a| a.is_approved())
        .count();
    LibraryExport {
        metadata: ExportMeta {
            version: EXPORT_VERSION.to_string(),
            generated: Utc::now().to_rfc3339(),
            row_count,
            total_animations: total as u32,
            approved_animations: approved as u32,
        },
        animations: buckets.clone(),
    }
}

/// The recognized historical library shapes
#[derive(Debug)]
pub enum ImportSchema {
    /// `{ rowCount: { bucket: [...] } }`
    MultiRow(RowMap),
    /// `{ riskLevel: { bucket: [...] } }`; the risk dimension is obsolete
    /// and gets flattened away
    LegacyRiskNested(BTreeMap<String, BucketMap>),
    /// Current `{ "__metadata": ..., "animations": { bucket: [...] } }`
    SingleRow {
        row_count: u32,
        buckets: BucketMap,
    },
}

/// Classify a parsed JSON document into one of the known shapes
pub fn classify(value: &Value) -> Result<ImportSchema, CodecError> {
    let Some(map) = value.as_object() else {
        return Err(CodecError::UnrecognizedShape);
    };

    if map.contains_key("__metadata") {
        let metadata: ExportMeta = serde_json::from_value(
            map.get("__metadata").cloned().unwrap_or(Value::Null),
        )?;
        let buckets = map
            .get("animations")
            .map(parse_bucket_map)
            .unwrap_or_default();
        return Ok(ImportSchema::SingleRow {
            row_count: metadata.row_count,
            buckets,
        });
    }

    // Both remaining shapes nest object values; bucket-level junk inside
    // them is handled leniently by parse_bucket_map
    if map.is_empty() || !map.values().all(Value::is_object) {
        return Err(CodecError::UnrecognizedShape);
    }

    if map.keys().all(|k| k.parse::<u32>().is_ok()) {
        // Numeric top-level keys: row counts
        let mut rows = RowMap::new();
        for (key, inner) in map {
            let row: u32 = key.parse().expect("checked numeric");
            rows.insert(row, parse_bucket_map(inner));
        }
        return Ok(ImportSchema::MultiRow(rows));
    }

    // Named top-level keys: legacy risk nesting
    let mut levels = BTreeMap::new();
    for (risk, inner) in map {
        levels.insert(risk.clone(), parse_bucket_map(inner));
    }
    Ok(ImportSchema::LegacyRiskNested(levels))
}

/// Migrate any recognized shape into the canonical row map
pub fn migrate(schema: ImportSchema) -> RowMap {
    match schema {
        ImportSchema::MultiRow(rows) => rows,
        ImportSchema::SingleRow { row_count, buckets } => {
            let mut rows = RowMap::new();
            rows.insert(row_count, buckets);
            rows
        }
        ImportSchema::LegacyRiskNested(levels) => {
            // Flatten: the risk dimension is discarded, buckets merged
            let mut rows = RowMap::new();
            for buckets in levels.into_values() {
                for (bucket, animations) in buckets {
                    for animation in animations {
                        let row = animation.metadata.row_count;
                        rows.entry(row)
                            .or_default()
                            .entry(bucket)
                            .or_default()
                            .push(animation);
                    }
                }
            }
            rows
        }
    }
}

/// Parse a library document of any recognized shape
pub fn parse_library(json: &str) -> Result<RowMap, CodecError> {
    let value: Value = serde_json::from_str(json)?;
    Ok(migrate(classify(&value)?))
}

/// Leniently parse `{ bucket: [animation, ...] }`
///
/// Unparseable bucket keys or animation records are logged and skipped.
fn parse_bucket_map(value: &Value) -> BucketMap {
    let mut buckets = BucketMap::new();
    let Some(map) = value.as_object() else {
        log::warn!("bucket map is not an object; ignoring");
        return buckets;
    };
    for (key, entries) in map {
        let Ok(bucket) = key.parse::<u32>() else {
            log::warn!("skipping non-numeric bucket key {key:?}");
            continue;
        };
        let Some(list) = entries.as_array() else {
            log::warn!("bucket {bucket} is not an array; skipping");
            continue;
        };
        let mut animations = Vec::with_capacity(list.len());
        for entry in list {
            match serde_json::from_value::<BallAnimation>(entry.clone()) {
                Ok(animation) => animations.push(animation),
                Err(e) => log::warn!("skipping malformed animation in bucket {bucket}: {e}"),
            }
        }
        buckets.insert(bucket, animations);
    }
    buckets
}
