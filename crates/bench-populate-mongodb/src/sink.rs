//! MongoDB document-bulk sink.

use crate::error::MongoDBSinkError;
use crate::insert::{check_id_query, lookup_to_document, LOOKUP_COLLECTION};
use async_trait::async_trait;
use bench_generator::Lookup;
use bench_pipeline::sink::{with_transient_retry, BackendSink, SinkError, TransientPolicy};
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use tracing::{error, info};

/// MongoDB sink that bulk-writes lookup documents with unordered inserts.
///
/// Transient socket/read timeouts re-attempt the whole batch under the
/// configured [`TransientPolicy`] (unbounded retry by default). A bulk-write
/// conflict, e.g. a duplicate key across the unordered insert, drops the
/// batch: it is logged, reported as zero applied records, and never
/// re-attempted.
pub struct MongoDBSink {
    collection: Collection<Document>,
    policy: TransientPolicy,
}

impl MongoDBSink {
    /// Connect and verify the deployment is reachable.
    pub async fn connect(
        connection_string: &str,
        database_name: &str,
    ) -> Result<Self, MongoDBSinkError> {
        let client = Client::with_uri_str(connection_string).await?;
        let database = client.database(database_name);

        // Test connection
        database.list_collection_names().await?;

        Ok(Self {
            collection: database.collection(LOOKUP_COLLECTION),
            policy: TransientPolicy::Retry(Default::default()),
        })
    }

    /// Override the transient-failure policy.
    pub fn with_transient_policy(mut self, policy: TransientPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Delete every document in the collection, keeping its indexes.
    pub async fn truncate(&self) -> Result<(), MongoDBSinkError> {
        info!("truncating collection: {}", LOOKUP_COLLECTION);
        self.collection.delete_many(doc! {}).await?;
        Ok(())
    }

    /// Create the indexes the read benchmark relies on, if missing: a
    /// wildcard index over the identifier map and a unique index on the
    /// archival sequence.
    pub async fn ensure_indexes(&self) -> Result<(), MongoDBSinkError> {
        let wildcard = IndexModel::builder()
            .keys(doc! { "identifiers.$**": 1 })
            .options(IndexOptions::builder().name("lookup_values".to_string()).build())
            .build();
        let archival = IndexModel::builder()
            .keys(doc! { "archivalId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(wildcard).await?;
        self.collection.create_index(archival).await?;
        Ok(())
    }

    /// Drop and recreate every non-`_id` index, deflating index bloat after
    /// repeated truncate/load cycles.
    pub async fn rebuild_indexes(&self) -> Result<(), MongoDBSinkError> {
        let mut models: Vec<IndexModel> = Vec::new();
        let mut cursor = self.collection.list_indexes().await?;
        while let Some(model) = cursor.try_next().await? {
            let name = model.options.as_ref().and_then(|o| o.name.as_deref());
            if name != Some("_id_") {
                models.push(model);
            }
        }

        info!("rebuilding {} indexes", models.len());
        for model in models {
            if let Some(name) = model.options.as_ref().and_then(|o| o.name.clone()) {
                self.collection.drop_index(name).await?;
            }
            self.collection.create_index(model).await?;
        }
        Ok(())
    }

    /// Point read by `CHECK_ID`, verifying the returned document.
    pub async fn find_by_check_id(&self, check_id: i64) -> Result<(), MongoDBSinkError> {
        let document = self.collection.find_one(check_id_query(check_id)).await?;
        let found = document
            .as_ref()
            .and_then(|d| d.get_document("identifiers").ok())
            .and_then(|identifiers| identifiers.get_i64("CHECK_ID").ok());
        if found != Some(check_id) {
            return Err(MongoDBSinkError::ReadMismatch {
                expected: check_id,
                found,
            });
        }
        Ok(())
    }

    /// Number of documents currently in the collection.
    pub async fn count(&self) -> Result<u64, MongoDBSinkError> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

#[async_trait]
impl BackendSink for MongoDBSink {
    async fn insert_batch(&self, batch: &[Lookup]) -> Result<u64, SinkError> {
        let documents: Vec<Document> = batch.iter().map(lookup_to_document).collect();
        let batch_size = batch.len();

        with_transient_retry(&self.policy, "mongodb insert", || async {
            match self
                .collection
                .insert_many(documents.clone())
                .ordered(false)
                .await
            {
                Ok(result) => Ok(result.inserted_ids.len() as u64),
                Err(e) => match e.kind.as_ref() {
                    ErrorKind::Io(io)
                        if matches!(
                            io.kind(),
                            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                        ) =>
                    {
                        Err(SinkError::Transient(e.to_string()))
                    }
                    ErrorKind::InsertMany(_) | ErrorKind::Write(_) => {
                        error!("bulk write conflict, dropping batch of {batch_size}: {e}");
                        Ok(0)
                    }
                    _ => Err(SinkError::Backend(e.to_string())),
                },
            }
        })
        .await
    }
}
