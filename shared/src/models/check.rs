//! Check Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StatusColor, lenient};

/// Device id recorded on checks that were never written remotely
pub const LOCAL_DEVICE_ID: &str = "local";

fn default_device_id() -> String {
    LOCAL_DEVICE_ID.to_string()
}

/// Guest check entity (账单)
///
/// Field names follow the `checks` collection documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub check_number: u32,
    /// Assigned table id, `None` = unassigned
    #[serde(default, deserialize_with = "lenient::option")]
    pub table_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::option")]
    pub color: Option<StatusColor>,
    /// Last writer metadata, advisory only
    #[serde(default, deserialize_with = "lenient::option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default = "default_device_id")]
    pub updated_by_device_id: String,
}

impl Check {
    /// Unassigned, uncolored check
    pub fn new(check_number: u32) -> Self {
        Self {
            id: super::check_id(check_number),
            check_number,
            table_id: None,
            color: None,
            updated_at: None,
            updated_by_device_id: default_device_id(),
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.table_id.is_some()
    }

    pub fn is_assigned_to(&self, table_id: &str) -> bool {
        self.table_id.as_deref() == Some(table_id)
    }
}
