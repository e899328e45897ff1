//! Section Model and floor layout
//!
//! The floor topology is fixed configuration: 8 sections, 44 tables with
//! non-contiguous numbering, and 100 checks.

use serde::Serialize;

use super::{Check, DiningTable};

/// Number of provisioned checks (1..=CHECK_COUNT)
pub const CHECK_COUNT: u32 = 100;

/// Section entity (区域)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Section {
    pub name: &'static str,
    /// Table numbers in display order
    pub tables: &'static [u32],
    /// Grid column count
    pub cols: usize,
}

pub const SECTIONS: [Section; 8] = [
    Section { name: "A", tables: &[1, 2, 3, 4, 5, 6], cols: 2 },
    Section { name: "B", tables: &[10, 11], cols: 2 },
    Section { name: "C", tables: &[20, 21, 22, 23], cols: 4 },
    Section { name: "D", tables: &[24, 25, 26, 27, 28], cols: 5 },
    Section { name: "E", tables: &[30, 31, 32, 33, 34], cols: 5 },
    Section { name: "F", tables: &[40, 41, 43, 44, 50, 51, 53, 54], cols: 4 },
    Section { name: "G", tables: &[60, 61, 62, 63, 64], cols: 5 },
    Section { name: "H", tables: &[70, 71, 72, 73, 74, 75, 76, 77, 78], cols: 5 },
];

/// All provisioned table numbers, ascending
pub const TABLE_NUMBERS: [u32; 44] = [
    1, 2, 3, 4, 5, 6, 10, 11, 20, 21, 22, 23, 24, 25, 26, 27, 28, 30, 31, 32, 33, 34, 40, 41, 43,
    44, 50, 51, 53, 54, 60, 61, 62, 63, 64, 70, 71, 72, 73, 74, 75, 76, 77, 78,
];

/// Document id of check `n`: `check-{n}`
pub fn check_id(check_number: u32) -> String {
    format!("check-{}", check_number)
}

/// Document id of table `n`: `table-{n}`
pub fn table_id(table_number: u32) -> String {
    format!("table-{}", table_number)
}

/// Default check set (before the first cache read or feed event)
pub fn default_checks() -> Vec<Check> {
    (1..=CHECK_COUNT).map(Check::new).collect()
}

/// Default table set
pub fn default_tables() -> Vec<DiningTable> {
    TABLE_NUMBERS.iter().copied().map(DiningTable::new).collect()
}
