//! 楼面视图模型 (Tables 页和 Checks 页)

use serde::Serialize;
use shared::models::{AppState, SECTIONS};

use super::context::LoadStatus;
use super::derive::{self, Fill, TableBadges};

/// 楼面上的一个桌台
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub id: String,
    pub table_number: u32,
    pub fill: Fill,
    pub badges: TableBadges,
    pub label: String,
    pub assigned: usize,
}

/// 一个区域
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    pub name: &'static str,
    pub cols: usize,
    pub tables: Vec<TableView>,
}

/// Checks 页中的一个账单
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckView {
    pub id: String,
    pub check_number: u32,
    pub fill: Fill,
    /// 已分配桌台的桌号 (未分配或桌台不存在时为 `None`)
    pub table_number: Option<u32>,
    pub assigned: bool,
}

/// 按区域排列的桌台；快照中不存在的桌号跳过
pub fn floor_plan(state: &AppState) -> Vec<SectionView> {
    SECTIONS
        .iter()
        .map(|section| SectionView {
            name: section.name,
            cols: section.cols,
            tables: section
                .tables
                .iter()
                .filter_map(|&n| state.table_by_number(n))
                .map(|table| {
                    let assigned = state.assigned_checks(&table.id);
                    let badges = derive::table_badges(table, &assigned);
                    TableView {
                        id: table.id.clone(),
                        table_number: table.table_number,
                        fill: derive::table_fill(table, &assigned),
                        label: derive::table_label(&badges),
                        badges,
                        assigned: assigned.len(),
                    }
                })
                .collect(),
        })
        .collect()
}

/// 按编号排列的账单
pub fn checks_grid(state: &AppState) -> Vec<CheckView> {
    state
        .checks_sorted()
        .into_iter()
        .map(|check| {
            let table = state.table_of(check);
            CheckView {
                id: check.id.clone(),
                check_number: check.check_number,
                fill: derive::check_fill(check, table),
                table_number: table.map(|t| t.table_number),
                assigned: check.is_assigned(),
            }
        })
        .collect()
}

/// "No data found" 页: 两个集合都已加载且任一为空
pub fn empty_state(state: &AppState, status: &LoadStatus) -> bool {
    status.checks_loaded
        && status.tables_loaded
        && (state.checks.is_empty() || state.tables.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::StatusColor;

    #[test]
    fn test_floor_plan_sections_in_order() {
        let state = AppState::default();
        let plan = floor_plan(&state);
        let names: Vec<&str> = plan.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["A", "B", "C", "D", "E", "F", "G", "H"]);
        assert_eq!(plan.iter().map(|s| s.tables.len()).sum::<usize>(), 44);
        assert!(plan[0].tables.iter().all(|t| t.fill == Fill::Neutral));
    }

    #[test]
    fn test_floor_plan_skips_missing_tables() {
        let mut state = AppState::default();
        state.tables.retain(|t| t.table_number != 10);
        let plan = floor_plan(&state);
        let b: Vec<u32> = plan[1].tables.iter().map(|t| t.table_number).collect();
        assert_eq!(b, vec![11]);
    }

    #[test]
    fn test_floor_plan_labels() {
        let mut state = AppState::default();
        for n in [12, 3] {
            let check = state.checks.iter_mut().find(|c| c.check_number == n).unwrap();
            check.table_id = Some("table-20".into());
        }
        let plan = floor_plan(&state);
        let t20 = plan[2].tables.iter().find(|t| t.table_number == 20).unwrap();
        assert_eq!(t20.label, "#3, 12");
        assert_eq!(t20.assigned, 2);
        assert_eq!(t20.fill, Fill::Status(StatusColor::Blue));
    }

    #[test]
    fn test_checks_grid() {
        let mut state = AppState::default();
        state.checks.reverse();
        state.checks.iter_mut().find(|c| c.check_number == 7).unwrap().table_id =
            Some("table-20".into());
        state.tables.iter_mut().find(|t| t.table_number == 20).unwrap().color =
            Some(StatusColor::Green);

        let grid = checks_grid(&state);
        assert_eq!(grid[0].check_number, 1);
        assert_eq!(grid[6].table_number, Some(20));
        assert_eq!(grid[6].fill, Fill::Status(StatusColor::Green));
        assert_eq!(grid[7].fill, Fill::Neutral);
    }

    #[test]
    fn test_empty_state() {
        let mut state = AppState::default();
        let mut status = LoadStatus::default();
        state.tables.clear();
        assert!(!empty_state(&state, &status));
        status.checks_loaded = true;
        status.tables_loaded = true;
        assert!(empty_state(&state, &status));
        assert!(!empty_state(&AppState::default(), &status));
    }
}
