//! PostgreSQL relational sink.

use crate::error::PostgreSQLSinkError;
use crate::insert::{
    bind_row, create_index_sql, create_table_sql, find_by_check_id_sql, insert_sql, reindex_sql,
    truncate_sql, LOOKUP_TABLE,
};
use async_trait::async_trait;
use bench_generator::Lookup;
use bench_pipeline::sink::{with_transient_retry, BackendSink, SinkError, TransientPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info};

/// PostgreSQL sink executing one multi-row INSERT per batch.
///
/// Holds a small set of connections handed out round-robin, so concurrent
/// loaders do not serialize on a single session. The default transient
/// policy is `Fail`: a batched execution either fully applies or fails the
/// run.
pub struct PostgreSQLSink {
    clients: Vec<Client>,
    next_client: AtomicUsize,
    policy: TransientPolicy,
}

impl PostgreSQLSink {
    /// Connect `connections` sessions and verify the server is reachable.
    pub async fn connect(
        connection_string: &str,
        connections: usize,
    ) -> Result<Self, PostgreSQLSinkError> {
        if connections == 0 {
            return Err(PostgreSQLSinkError::Config(
                "connection count must be greater than zero".to_string(),
            ));
        }

        let mut clients = Vec::with_capacity(connections);
        for _ in 0..connections {
            let (client, connection) = tokio_postgres::connect(connection_string, NoTls).await?;

            // Drive the connection until the client is dropped.
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::error!("PostgreSQL connection error: {}", e);
                }
            });

            clients.push(client);
        }

        // Test connection
        clients[0].simple_query("SELECT 1").await?;
        info!("PostgreSQL ready ({connections} connections)");

        Ok(Self {
            clients,
            next_client: AtomicUsize::new(0),
            policy: TransientPolicy::Fail,
        })
    }

    /// Override the transient-failure policy.
    pub fn with_transient_policy(mut self, policy: TransientPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn client(&self) -> &Client {
        let idx = self.next_client.fetch_add(1, Ordering::Relaxed);
        &self.clients[idx % self.clients.len()]
    }

    /// Create the lookup table and its containment index if missing.
    pub async fn create_tables(&self) -> Result<(), PostgreSQLSinkError> {
        let client = self.client();
        info!("creating table: {}", LOOKUP_TABLE);
        debug!("DDL: {}", create_table_sql());
        client.execute(&create_table_sql(), &[]).await?;
        client.execute(&create_index_sql(), &[]).await?;
        Ok(())
    }

    /// Delete all rows, keeping the table and its indexes.
    pub async fn truncate(&self) -> Result<(), PostgreSQLSinkError> {
        info!("truncating table: {}", LOOKUP_TABLE);
        self.client().execute(&truncate_sql(), &[]).await?;
        Ok(())
    }

    /// Rebuild the table's indexes.
    pub async fn rebuild_indexes(&self) -> Result<(), PostgreSQLSinkError> {
        info!("reindexing table: {}", LOOKUP_TABLE);
        self.client().execute(&reindex_sql(), &[]).await?;
        Ok(())
    }

    /// Point read by `CHECK_ID` through JSONB containment, verifying the
    /// returned row.
    pub async fn find_by_check_id(&self, check_id: i64) -> Result<(), PostgreSQLSinkError> {
        let filter = serde_json::json!({ "CHECK_ID": check_id });
        let rows = self
            .client()
            .query(&find_by_check_id_sql(), &[&filter])
            .await?;
        let found = rows
            .first()
            .map(|row| row.get::<_, serde_json::Value>(0))
            .and_then(|identifiers| identifiers.get("CHECK_ID").and_then(|v| v.as_i64()));
        if found != Some(check_id) {
            return Err(PostgreSQLSinkError::ReadMismatch {
                expected: check_id,
                found,
            });
        }
        Ok(())
    }

    /// Number of rows currently in the table.
    pub async fn count(&self) -> Result<u64, PostgreSQLSinkError> {
        let row = self
            .client()
            .query_one(&format!("SELECT COUNT(*) FROM \"{LOOKUP_TABLE}\""), &[])
            .await?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}

fn classify(e: &tokio_postgres::Error) -> SinkError {
    if e.is_closed() {
        return SinkError::Transient(e.to_string());
    }
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        return SinkError::Conflict(e.to_string());
    }
    SinkError::Backend(e.to_string())
}

#[async_trait]
impl BackendSink for PostgreSQLSink {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        let sql = insert_sql(batch.len());
        let params: Vec<Box<dyn ToSql + Sync + Send>> =
            batch.iter().flat_map(bind_row).collect();

        with_transient_retry(&self.policy, "postgresql insert", || async {
            let param_refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();
            self.client()
                .execute(&sql, &param_refs)
                .await
                .map_err(|e| classify(&e))?;
            Ok(batch.len() as u64)
        })
        .await
    }
}
