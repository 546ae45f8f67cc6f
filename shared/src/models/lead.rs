//! Sales lead models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A prospective customer that design requests are raised against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub customer_name: String,
    pub phone: String,
    pub note: Option<String>,
    pub sales_id: Uuid,
    pub created_at: DateTime<Utc>,
}
