//! Document conversion for MongoDB bulk writes.

use bench_generator::{IdentifierValue, Lookup};
use bson::{doc, Bson, DateTime as BsonDateTime, Document};

/// Default collection name.
pub const LOOKUP_COLLECTION: &str = "lookup";

/// Convert a lookup record to its BSON document form.
///
/// The record id becomes `_id`; an absent `archived_at` is stored as an
/// explicit null field.
pub fn lookup_to_document(lookup: &Lookup) -> Document {
    let mut document = Document::new();
    document.insert("_id", lookup.id.clone());
    document.insert("archivalId", lookup.archival_id);
    document.insert(
        "archivedAt",
        lookup
            .archived_at
            .map(|ts| Bson::DateTime(BsonDateTime::from_chrono(ts)))
            .unwrap_or(Bson::Null),
    );
    document.insert(
        "createdAt",
        Bson::DateTime(BsonDateTime::from_chrono(lookup.created_at)),
    );
    document.insert(
        "timestamp",
        Bson::DateTime(BsonDateTime::from_chrono(lookup.timestamp)),
    );
    document.insert("identifiers", identifiers_to_document(lookup));
    document
}

fn identifiers_to_document(lookup: &Lookup) -> Document {
    let mut identifiers = Document::new();
    for (name, value) in &lookup.identifiers {
        let bson = match value {
            IdentifierValue::Scalar(v) => Bson::Int64(*v),
            IdentifierValue::List(values) => {
                Bson::Array(values.iter().map(|v| Bson::Int64(*v)).collect())
            }
        };
        identifiers.insert(name, bson);
    }
    identifiers
}

/// Query document for a point read by `CHECK_ID`.
pub fn check_id_query(check_id: i64) -> Document {
    doc! { "identifiers.CHECK_ID": check_id }
}
