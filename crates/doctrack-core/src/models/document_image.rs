//! Image attached to a receiving record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentImage {
    pub id: Uuid,
    pub receiving_record_id: Uuid,
    pub file_path: String,
    /// Zero-based upload order within the batch.
    pub position: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDocumentImage {
    pub receiving_record_id: Uuid,
    pub file_path: String,
    pub position: u32,
}
