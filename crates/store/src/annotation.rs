use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored annotation record: a key plus its property structure.
///
/// Geometry and other spatial payloads live with the collaborating
/// imaging layers; this store only carries the property side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    /// Arbitrary nested properties, stored as JSON text in the database.
    pub properties: Value,
    pub created_at: DateTime<Utc>,
}

impl Annotation {
    pub fn new(id: impl Into<String>, properties: Value) -> Self {
        Self {
            id: id.into(),
            properties,
            created_at: Utc::now(),
        }
    }
}
