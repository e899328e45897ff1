//! Derivation Layer - 渲染用的派生值
//!
//! 纯函数，每次渲染调用。数据量在百条以内，不做增量维护。

use serde::Serialize;
use shared::models::{Check, DiningTable, StatusColor};

/// 圆形填充样式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "color", rename_all = "lowercase")]
pub enum Fill {
    /// 未分配 (白底灰边)
    Neutral,
    /// 状态色填充
    Status(StatusColor),
}

/// 桌台的有效颜色
///
/// 显式颜色优先 (即使没有分配账单)；否则恰好一个账单时取该账单的颜色
pub fn effective_table_color(table: &DiningTable, assigned: &[&Check]) -> Option<StatusColor> {
    if let Some(color) = table.color {
        return Some(color);
    }
    match assigned {
        [only] => only.color,
        _ => None,
    }
}

/// 账单的有效颜色
///
/// 已分配: 桌台显式颜色优先，否则账单颜色；未分配时不显示颜色
pub fn effective_check_color(check: &Check, table: Option<&DiningTable>) -> Option<StatusColor> {
    if !check.is_assigned() {
        return None;
    }
    table.and_then(|t| t.color).or(check.color)
}

pub fn table_fill(table: &DiningTable, assigned: &[&Check]) -> Fill {
    match effective_table_color(table, assigned) {
        Some(color) => Fill::Status(color),
        None if !assigned.is_empty() => Fill::Status(StatusColor::Blue),
        None => Fill::Neutral,
    }
}

pub fn check_fill(check: &Check, table: Option<&DiningTable>) -> Fill {
    if !check.is_assigned() {
        return Fill::Neutral;
    }
    Fill::Status(effective_check_color(check, table).unwrap_or(StatusColor::Blue))
}

/// 桌台圆内最多显示的账单号数量
///
/// 全部一位数 5 个，一位两位混合 4 个，全部两位及以上 3 个
pub fn max_visible_checks(assigned: &[&Check]) -> usize {
    let has_single = assigned.iter().any(|c| c.check_number < 10);
    let has_multi = assigned.iter().any(|c| c.check_number >= 10);
    match (has_single, has_multi) {
        (true, true) => 4,
        (false, true) => 3,
        _ => 5,
    }
}

/// 桌台圆内的一个账单号
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckBadge {
    pub check_number: u32,
    /// 小色点，仅多账单且颜色与桌台不同时显示
    pub badge: Option<StatusColor>,
}

/// 桌台圆内的账单号列表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableBadges {
    pub visible: Vec<CheckBadge>,
    /// 超出显示数量
    pub overflow: bool,
}

pub fn table_badges(table: &DiningTable, assigned: &[&Check]) -> TableBadges {
    let mut sorted: Vec<&Check> = assigned.to_vec();
    sorted.sort_by_key(|c| c.check_number);

    let table_color = effective_table_color(table, assigned);
    let max_visible = max_visible_checks(assigned);
    let many = assigned.len() > 1;

    let visible = sorted
        .iter()
        .take(max_visible)
        .map(|check| CheckBadge {
            check_number: check.check_number,
            badge: check
                .color
                .filter(|color| many && Some(*color) != table_color),
        })
        .collect();

    TableBadges {
        visible,
        overflow: sorted.len() > max_visible,
    }
}

/// `#3, 9, 12...`
pub fn table_label(badges: &TableBadges) -> String {
    if badges.visible.is_empty() {
        return String::new();
    }
    let numbers: Vec<String> = badges
        .visible
        .iter()
        .map(|b| b.check_number.to_string())
        .collect();
    let mut label = format!("#{}", numbers.join(", "));
    if badges.overflow {
        label.push_str("...");
    }
    label
}
