//! AppState - 前场设备的完整状态快照

use serde::{Deserialize, Serialize};

use super::{Check, DiningTable, default_checks, default_tables};

/// Aggregate of all checks, all tables and the two transient selections
///
/// 进程内唯一实例，启动时为默认值，由缓存加载和订阅快照逐字段替换
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub checks: Vec<Check>,
    pub tables: Vec<DiningTable>,
    /// Selected check id (UI only, never persisted)
    #[serde(skip)]
    pub selected_check: Option<String>,
    /// Selected table id (UI only, never persisted)
    #[serde(skip)]
    pub selected_table: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            checks: default_checks(),
            tables: default_tables(),
            selected_check: None,
            selected_table: None,
        }
    }
}

impl AppState {
    pub fn check(&self, id: &str) -> Option<&Check> {
        self.checks.iter().find(|c| c.id == id)
    }

    pub fn table(&self, id: &str) -> Option<&DiningTable> {
        self.tables.iter().find(|t| t.id == id)
    }

    pub fn check_by_number(&self, check_number: u32) -> Option<&Check> {
        self.checks.iter().find(|c| c.check_number == check_number)
    }

    pub fn table_by_number(&self, table_number: u32) -> Option<&DiningTable> {
        self.tables.iter().find(|t| t.table_number == table_number)
    }

    /// Checks assigned to `table_id`, sorted by check number
    pub fn assigned_checks(&self, table_id: &str) -> Vec<&Check> {
        let mut assigned: Vec<&Check> = self
            .checks
            .iter()
            .filter(|c| c.is_assigned_to(table_id))
            .collect();
        assigned.sort_by_key(|c| c.check_number);
        assigned
    }

    /// All checks sorted by check number
    pub fn checks_sorted(&self) -> Vec<&Check> {
        let mut checks: Vec<&Check> = self.checks.iter().collect();
        checks.sort_by_key(|c| c.check_number);
        checks
    }

    /// Table a check is assigned to, `None` when unassigned or dangling
    pub fn table_of(&self, check: &Check) -> Option<&DiningTable> {
        check.table_id.as_deref().and_then(|id| self.table(id))
    }

    pub fn selected_check(&self) -> Option<&Check> {
        self.selected_check.as_deref().and_then(|id| self.check(id))
    }

    pub fn selected_table(&self) -> Option<&DiningTable> {
        self.selected_table.as_deref().and_then(|id| self.table(id))
    }
}
