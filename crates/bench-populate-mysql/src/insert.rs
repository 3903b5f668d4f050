//! Batched INSERT construction for MySQL population.

use bench_generator::Lookup;
use chrono::{DateTime, Datelike, Timelike, Utc};
use mysql_async::Value;

/// Parent table name.
pub const LOOKUP_TABLE: &str = "lookup";
/// Flattened identifier child table.
pub const IDENTIFIER_TABLE: &str = "lookup_identifier";

/// Parent-row INSERT statement.
pub fn insert_lookup_sql() -> String {
    format!(
        "INSERT INTO `{LOOKUP_TABLE}` \
         (`id`, `archival_id`, `timestamp`, `created_at`, `archived_at`) \
         VALUES (?, ?, ?, ?, ?)"
    )
}

/// Child-row INSERT statement.
pub fn insert_identifier_sql() -> String {
    format!("INSERT INTO `{IDENTIFIER_TABLE}` (`id`, `name`, `value`) VALUES (?, ?, ?)")
}

/// Bind one parent row.
pub fn bind_lookup_row(lookup: &Lookup) -> Vec<Value> {
    vec![
        Value::from(lookup.id.clone()),
        Value::from(lookup.archival_id),
        datetime_value(lookup.timestamp),
        datetime_value(lookup.created_at),
        lookup.archived_at.map(datetime_value).unwrap_or(Value::NULL),
    ]
}

/// Flatten one record's identifier map into child rows: one `(id, name,
/// value)` triple per scalar value, list entries expanded.
pub fn bind_identifier_rows(lookup: &Lookup) -> Vec<Vec<Value>> {
    let mut rows = Vec::new();
    for (name, value) in &lookup.identifiers {
        for scalar in value.to_vec() {
            rows.push(vec![
                Value::from(lookup.id.clone()),
                Value::from(name.clone()),
                Value::from(scalar.to_string()),
            ]);
        }
    }
    rows
}

/// MySQL DATETIME(6) value from a UTC timestamp (microsecond precision).
fn datetime_value(ts: DateTime<Utc>) -> Value {
    Value::Date(
        ts.year() as u16,
        ts.month() as u8,
        ts.day() as u8,
        ts.hour() as u8,
        ts.minute() as u8,
        ts.second() as u8,
        ts.nanosecond() / 1000,
    )
}

/// DDL for both tables.
pub fn create_table_sql() -> Vec<String> {
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS `{LOOKUP_TABLE}` (\
             `id` VARCHAR(255) NOT NULL PRIMARY KEY, \
             `archival_id` BIGINT NOT NULL UNIQUE, \
             `timestamp` DATETIME(6) NOT NULL, \
             `created_at` DATETIME(6) NOT NULL, \
             `archived_at` DATETIME(6) NULL)"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{IDENTIFIER_TABLE}` (\
             `id` VARCHAR(255) NOT NULL, \
             `name` VARCHAR(64) NOT NULL, \
             `value` VARCHAR(64) NOT NULL, \
             KEY `lookup_identifier_name_value` (`name`, `value`), \
             KEY `lookup_identifier_id` (`id`))"
        ),
    ]
}

pub fn truncate_sql() -> Vec<String> {
    vec![
        format!("TRUNCATE TABLE `{LOOKUP_TABLE}`"),
        format!("TRUNCATE TABLE `{IDENTIFIER_TABLE}`"),
    ]
}

/// Index rebuild; OPTIMIZE recreates the table and its indexes.
pub fn rebuild_index_sql() -> Vec<String> {
    vec![
        format!("OPTIMIZE TABLE `{LOOKUP_TABLE}`"),
        format!("OPTIMIZE TABLE `{IDENTIFIER_TABLE}`"),
    ]
}

/// Join query for a point read by `CHECK_ID`.
pub fn find_by_check_id_sql() -> String {
    format!(
        "SELECT l2.`value` FROM `{LOOKUP_TABLE}` l1 \
         JOIN `{IDENTIFIER_TABLE}` l2 ON l1.`id` = l2.`id` \
         WHERE l2.`name` = 'CHECK_ID' AND l2.`value` = ? LIMIT 1"
    )
}
