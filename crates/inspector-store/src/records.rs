//! Typed access to the records the crawler owns.
//!
//! The crawler is the only writer; the `read_*` functions are what the
//! read-only API layer and the CLI use.

use std::collections::BTreeMap;

use crate::error::{StoreError, StoreResult};
use crate::store::SnapshotStore;
use crate::tables::*;
use crate::types::{DateKey, Document, Metric, Totals};

// ── Statistics ─────────────────────────────────────────────────────

/// Upsert every metric's current value into the `statistics` document.
pub fn write_statistics(store: &dyn SnapshotStore, totals: &Totals) -> StoreResult<()> {
    store.update_one(STATISTICS, STATISTICS_DOC, totals.to_fields())
}

/// Latest persisted totals, if the crawler has ever completed a cycle.
pub fn read_statistics(store: &dyn SnapshotStore) -> StoreResult<Option<Totals>> {
    let Some(doc) = store.find_one(STATISTICS, STATISTICS_DOC)? else {
        return Ok(None);
    };
    let totals = serde_json::from_value(serde_json::Value::Object(doc))
        .map_err(|e| malformed(STATISTICS, STATISTICS_DOC, e))?;
    Ok(Some(totals))
}

// ── Time series ────────────────────────────────────────────────────

/// Set one dated point of a metric's time series.
pub fn write_time_series_point(
    store: &dyn SnapshotStore,
    metric: Metric,
    date: DateKey,
    value: u64,
) -> StoreResult<()> {
    let mut fields = Document::new();
    fields.insert(date.to_string(), value.into());
    store.update_one(TIME_SERIES_DATA, metric.name(), fields)
}

/// All points of a metric's time series, ordered by day.
pub fn read_time_series(
    store: &dyn SnapshotStore,
    metric: Metric,
) -> StoreResult<BTreeMap<DateKey, u64>> {
    let Some(doc) = store.find_one(TIME_SERIES_DATA, metric.name())? else {
        return Ok(BTreeMap::new());
    };
    let mut points = BTreeMap::new();
    for (field, value) in doc {
        if field == NAME_FIELD {
            continue;
        }
        let date: DateKey = field
            .parse()
            .map_err(|e| malformed(TIME_SERIES_DATA, metric.name(), e))?;
        let value = value.as_u64().ok_or_else(|| {
            malformed(
                TIME_SERIES_DATA,
                metric.name(),
                format!("point {field} is not a non-negative integer: {value}"),
            )
        })?;
        points.insert(date, value);
    }
    Ok(points)
}

// ── Snapshot marker ────────────────────────────────────────────────

/// The date of the last committed time-series point.
///
/// `None` when no marker has been written yet. A marker that is present
/// but not a `MMDDYY` string is an error, never a silent default.
pub fn read_snapshot_date(store: &dyn SnapshotStore) -> StoreResult<Option<DateKey>> {
    let Some(doc) = store.find_one(INSPECTOR_METADATA, INSPECTOR_METADATA_DOC)? else {
        return Ok(None);
    };
    match doc.get(SNAPSHOT_DATE_FIELD) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|e| malformed(INSPECTOR_METADATA, INSPECTOR_METADATA_DOC, e)),
        Some(other) => Err(malformed(
            INSPECTOR_METADATA,
            INSPECTOR_METADATA_DOC,
            format!("{SNAPSHOT_DATE_FIELD} is not a string: {other}"),
        )),
    }
}

/// Advance the snapshot marker.
pub fn write_snapshot_date(store: &dyn SnapshotStore, date: DateKey) -> StoreResult<()> {
    let mut fields = Document::new();
    fields.insert(SNAPSHOT_DATE_FIELD.to_string(), date.to_string().into());
    store.update_one(INSPECTOR_METADATA, INSPECTOR_METADATA_DOC, fields)
}

fn malformed(collection: &str, name: &str, reason: impl ToString) -> StoreError {
    StoreError::Malformed {
        collection: collection.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
