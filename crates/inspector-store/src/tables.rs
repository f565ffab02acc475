//! Collection and document names shared with the read-side API.
//!
//! Each collection maps to one redb table with `&str` keys (document name)
//! and `&[u8]` values (JSON object).

use redb::TableDefinition;

/// Latest totals, one document named [`STATISTICS_DOC`].
pub const STATISTICS: &str = "statistics";
pub const STATISTICS_DOC: &str = "statistics";

/// Crawler bookkeeping, one document named [`INSPECTOR_METADATA_DOC`].
pub const INSPECTOR_METADATA: &str = "colony-inspector-metadata";
pub const INSPECTOR_METADATA_DOC: &str = "colony-inspector-metadata";

/// Field of the metadata document holding the last committed snapshot date.
pub const SNAPSHOT_DATE_FIELD: &str = "snapshot-date";

/// Daily points, one document per metric name; fields are date keys.
pub const TIME_SERIES_DATA: &str = "time-series-data";

/// Every document carries its own name, mirroring the lookup filter.
pub const NAME_FIELD: &str = "name";

/// Collections created eagerly when a store is opened.
pub const KNOWN_COLLECTIONS: [&str; 3] = [STATISTICS, INSPECTOR_METADATA, TIME_SERIES_DATA];

/// redb table backing a collection.
pub fn collection_table(collection: &str) -> TableDefinition<'_, &'static str, &'static [u8]> {
    TableDefinition::new(collection)
}
