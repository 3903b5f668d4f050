//! The `Lookup` record and its identifier map.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Identifier key that is present on every record and unique per run.
pub const CHECK_ID: &str = "CHECK_ID";
/// Optional list-valued identifier key.
pub const PROFILE_ID: &str = "PROFILE_ID";
/// Optional list-valued identifier key.
pub const USER_ID: &str = "USER_ID";

/// A single identifier entry: either one integer or a small list of them.
///
/// Serializes untagged, so a map renders as
/// `{"CHECK_ID": 12345678, "USER_ID": [17, 204419]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum IdentifierValue {
    Scalar(i64),
    List(Vec<i64>),
}

impl IdentifierValue {
    /// The scalar value, if this entry is scalar.
    pub fn as_scalar(&self) -> Option<i64> {
        match self {
            IdentifierValue::Scalar(v) => Some(*v),
            IdentifierValue::List(_) => None,
        }
    }

    /// All values of this entry, flattening a scalar into a one-element list.
    pub fn to_vec(&self) -> Vec<i64> {
        match self {
            IdentifierValue::Scalar(v) => vec![*v],
            IdentifierValue::List(values) => values.clone(),
        }
    }
}

/// One synthetic lookup record.
///
/// Immutable once constructed; loader workers and sinks only read it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lookup {
    /// Globally unique within a run; embeds the correlation id.
    pub id: String,
    /// Strictly increasing sequence number, starting at 1.
    pub archival_id: i64,
    /// Present on roughly three records out of five.
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Event timestamp, randomly offset into the past.
    pub timestamp: DateTime<Utc>,
    /// Identifier-name to value(s); always contains `CHECK_ID`.
    pub identifiers: BTreeMap<String, IdentifierValue>,
}

impl Lookup {
    /// The record's `CHECK_ID` value.
    pub fn check_id(&self) -> i64 {
        self.identifiers
            .get(CHECK_ID)
            .and_then(IdentifierValue::as_scalar)
            .expect("lookup record constructed without a scalar CHECK_ID")
    }

    /// The identifiers map as a JSON value, for backends that store it as
    /// a single JSON column.
    pub fn identifiers_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.identifiers)
            .expect("identifier map serialization cannot fail")
    }
}
