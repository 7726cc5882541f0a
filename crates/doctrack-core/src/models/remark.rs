//! Record remark: append-only audit entry on a receiving record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRemark {
    pub id: Uuid,
    pub receiving_record_id: Uuid,
    pub user_id: Uuid,
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecordRemark {
    pub receiving_record_id: Uuid,
    pub user_id: Uuid,
    pub remark: String,
}
