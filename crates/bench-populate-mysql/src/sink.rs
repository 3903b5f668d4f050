//! MySQL/MariaDB relational sink with a flattened identifier child table.

use crate::error::MySQLSinkError;
use crate::insert::{
    bind_identifier_rows, bind_lookup_row, create_table_sql, find_by_check_id_sql,
    insert_identifier_sql, insert_lookup_sql, rebuild_index_sql, truncate_sql, LOOKUP_TABLE,
};
use async_trait::async_trait;
use bench_generator::Lookup;
use bench_pipeline::sink::{with_transient_retry, BackendSink, SinkError, TransientPolicy};
use mysql_async::prelude::*;
use mysql_async::{Opts, Params, Pool};
use tracing::info;

/// MySQL duplicate-entry error code.
const ER_DUP_ENTRY: u16 = 1062;

/// MySQL sink: one batched execution per table per batch.
///
/// The pool hands each loader its own connection, so concurrent batches do
/// not serialize on a single session. Default transient policy is `Fail`:
/// a batch either fully applies or fails the run.
pub struct MySQLSink {
    pool: Pool,
    policy: TransientPolicy,
}

impl MySQLSink {
    /// Connect and verify the server is reachable.
    pub async fn connect(connection_string: &str) -> Result<Self, MySQLSinkError> {
        let opts = Opts::from_url(connection_string).map_err(mysql_async::Error::from)?;
        let pool = Pool::new(opts);

        // Test connection
        let mut conn = pool.get_conn().await?;
        conn.query_drop("SELECT 1").await?;
        drop(conn);
        info!("MySQL ready");

        Ok(Self {
            pool,
            policy: TransientPolicy::Fail,
        })
    }

    /// Override the transient-failure policy.
    pub fn with_transient_policy(mut self, policy: TransientPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create both tables if missing.
    pub async fn create_tables(&self) -> Result<(), MySQLSinkError> {
        let mut conn = self.pool.get_conn().await?;
        for ddl in create_table_sql() {
            conn.query_drop(ddl).await?;
        }
        Ok(())
    }

    /// Delete all rows from both tables, keeping their indexes.
    pub async fn truncate(&self) -> Result<(), MySQLSinkError> {
        info!("truncating tables: {} and child", LOOKUP_TABLE);
        let mut conn = self.pool.get_conn().await?;
        for sql in truncate_sql() {
            conn.query_drop(sql).await?;
        }
        Ok(())
    }

    /// Rebuild both tables' indexes.
    pub async fn rebuild_indexes(&self) -> Result<(), MySQLSinkError> {
        info!("rebuilding indexes");
        let mut conn = self.pool.get_conn().await?;
        for sql in rebuild_index_sql() {
            conn.query_drop(sql).await?;
        }
        Ok(())
    }

    /// Point read by `CHECK_ID` through the child-table join, verifying the
    /// returned value.
    pub async fn find_by_check_id(&self, check_id: i64) -> Result<(), MySQLSinkError> {
        let mut conn = self.pool.get_conn().await?;
        let found: Option<String> = conn
            .exec_first(find_by_check_id_sql(), (check_id.to_string(),))
            .await?;
        if found.as_deref() != Some(check_id.to_string().as_str()) {
            return Err(MySQLSinkError::ReadMismatch {
                expected: check_id,
                found,
            });
        }
        Ok(())
    }

    /// Number of rows currently in the parent table.
    pub async fn count(&self) -> Result<u64, MySQLSinkError> {
        let mut conn = self.pool.get_conn().await?;
        let count: Option<u64> = conn
            .query_first(format!("SELECT COUNT(*) FROM `{LOOKUP_TABLE}`"))
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Close the pool, flushing idle connections.
    pub async fn disconnect(self) -> Result<(), MySQLSinkError> {
        self.pool.disconnect().await?;
        Ok(())
    }

    async fn insert_once(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        let mut conn = self.pool.get_conn().await.map_err(classify)?;

        conn.exec_batch(
            insert_lookup_sql(),
            batch
                .iter()
                .map(|lookup| Params::Positional(bind_lookup_row(lookup))),
        )
        .await
        .map_err(classify)?;

        conn.exec_batch(
            insert_identifier_sql(),
            batch
                .iter()
                .flat_map(bind_identifier_rows)
                .map(Params::Positional),
        )
        .await
        .map_err(classify)?;

        Ok(batch.len() as u64)
    }
}

fn classify(e: mysql_async::Error) -> SinkError {
    match &e {
        mysql_async::Error::Io(_) => SinkError::Transient(e.to_string()),
        mysql_async::Error::Server(server) if server.code == ER_DUP_ENTRY => {
            SinkError::Conflict(e.to_string())
        }
        _ => SinkError::Backend(e.to_string()),
    }
}

#[async_trait]
impl BackendSink for MySQLSink {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        with_transient_retry(&self.policy, "mysql insert", || self.insert_once(batch)).await
    }
}
