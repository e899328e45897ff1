//! Dining Table Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StatusColor, lenient};

/// Dining table entity (桌台)
///
/// The table set is fixed; only `color` changes after provisioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    pub id: String,
    pub table_number: u32,
    /// Explicit color override
    #[serde(default, deserialize_with = "lenient::option")]
    pub color: Option<StatusColor>,
    #[serde(
        default,
        deserialize_with = "lenient::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by_device_id: Option<String>,
}

impl DiningTable {
    pub fn new(table_number: u32) -> Self {
        Self {
            id: super::table_id(table_number),
            table_number,
            color: None,
            updated_at: None,
            updated_by_device_id: None,
        }
    }
}
