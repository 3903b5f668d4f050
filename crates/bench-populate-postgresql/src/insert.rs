//! SQL construction for the PostgreSQL lookup table.

use bench_generator::Lookup;
use tokio_postgres::types::ToSql;

/// Primary table name.
pub const LOOKUP_TABLE: &str = "lookup";

/// Columns in bind order.
const COLUMNS: [&str; 6] = [
    "id",
    "archival_id",
    "timestamp",
    "created_at",
    "archived_at",
    "identifiers",
];

/// Build a multi-row INSERT statement for `row_count` records.
pub fn insert_sql(row_count: usize) -> String {
    let mut placeholders: Vec<String> = Vec::with_capacity(row_count);
    let mut param_idx = 1;
    for _ in 0..row_count {
        let row: Vec<String> = (0..COLUMNS.len())
            .map(|_| {
                let p = format!("${param_idx}");
                param_idx += 1;
                p
            })
            .collect();
        placeholders.push(format!("({})", row.join(", ")));
    }

    format!(
        "INSERT INTO \"{}\" ({}) VALUES {}",
        LOOKUP_TABLE,
        COLUMNS
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders.join(", ")
    )
}

/// Bind one record's column values, in [`insert_sql`] order.
pub fn bind_row(lookup: &Lookup) -> Vec<Box<dyn ToSql + Sync + Send>> {
    vec![
        Box::new(lookup.id.clone()),
        Box::new(lookup.archival_id),
        Box::new(lookup.timestamp),
        Box::new(lookup.created_at),
        Box::new(lookup.archived_at),
        Box::new(lookup.identifiers_json()),
    ]
}

/// DDL for the lookup table.
pub fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{LOOKUP_TABLE}\" (\
         \"id\" TEXT PRIMARY KEY, \
         \"archival_id\" BIGINT NOT NULL UNIQUE, \
         \"timestamp\" TIMESTAMPTZ NOT NULL, \
         \"created_at\" TIMESTAMPTZ NOT NULL, \
         \"archived_at\" TIMESTAMPTZ, \
         \"identifiers\" JSONB NOT NULL)"
    )
}

/// DDL for the containment index backing the read benchmark.
pub fn create_index_sql() -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS lookup_values ON \"{LOOKUP_TABLE}\" USING GIN (\"identifiers\")"
    )
}

pub fn truncate_sql() -> String {
    format!("TRUNCATE TABLE \"{LOOKUP_TABLE}\"")
}

pub fn reindex_sql() -> String {
    format!("REINDEX TABLE \"{LOOKUP_TABLE}\"")
}

/// Containment query for a point read by `CHECK_ID`.
pub fn find_by_check_id_sql() -> String {
    format!("SELECT \"identifiers\" FROM \"{LOOKUP_TABLE}\" WHERE \"identifiers\" @> $1 LIMIT 1")
}
