//! 分配流程 - 网关之上的视图级状态
//!
//! 冲突确认 (账单已分配到其他桌台) 属于视图层：
//! 网关本身无条件执行分配。

use super::context::AppContext;
use super::error::{AppError, AppResult};
use super::gateway::PendingWrite;

/// 移动确认: 账单已分配到其他桌台
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveConfirmation {
    pub check_id: String,
    pub check_number: u32,
    pub from_table_id: String,
    /// 原桌台号 (引用的桌台不存在时为 `None`)
    pub from_table_number: Option<u32>,
    pub to_table_id: String,
    pub to_table_number: Option<u32>,
}

impl MoveConfirmation {
    pub fn title(&self) -> &'static str {
        "Move Check?"
    }

    /// 确认提示文本
    pub fn prompt(&self) -> String {
        format!(
            "Check #{} is already assigned to Table {}. Move it to Table {}?",
            self.check_number,
            table_text(self.from_table_number, &self.from_table_id),
            table_text(self.to_table_number, &self.to_table_id),
        )
    }
}

fn table_text(number: Option<u32>, id: &str) -> String {
    match number {
        Some(n) => n.to_string(),
        None => id.to_string(),
    }
}

/// 选择桌台后的结果
#[derive(Debug)]
pub enum AssignOutcome {
    /// 已分配
    Assigned(PendingWrite),
    /// 选择了当前桌台，取消分配
    Cleared(PendingWrite),
    /// 需要确认移动，尚未调用网关
    NeedsConfirmation(MoveConfirmation),
}

/// 账单的分配面板 (点击账单后打开)
#[derive(Debug, Clone)]
pub struct AssignSheet {
    ctx: AppContext,
    check_id: String,
}

impl AssignSheet {
    pub fn open(ctx: &AppContext, check_id: impl Into<String>) -> AppResult<Self> {
        let check_id = check_id.into();
        if ctx.check(&check_id).is_none() {
            return Err(AppError::CheckNotFound(check_id));
        }
        ctx.set_selected_check(Some(&check_id));
        Ok(Self {
            ctx: ctx.clone(),
            check_id,
        })
    }

    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    /// 选择桌台
    ///
    /// - 当前桌台: 取消分配
    /// - 已分配到其他桌台: 返回移动确认，不调用网关
    /// - 未分配: 直接分配
    pub fn select_table(&self, table_id: &str) -> AppResult<AssignOutcome> {
        let check = self
            .ctx
            .check(&self.check_id)
            .ok_or_else(|| AppError::CheckNotFound(self.check_id.clone()))?;

        match check.table_id.as_deref() {
            Some(current) if current == table_id => {
                Ok(AssignOutcome::Cleared(self.ctx.clear_check(&self.check_id)))
            }
            Some(current) => Ok(AssignOutcome::NeedsConfirmation(MoveConfirmation {
                check_id: check.id.clone(),
                check_number: check.check_number,
                from_table_id: current.to_string(),
                from_table_number: self.ctx.table(current).map(|t| t.table_number),
                to_table_id: table_id.to_string(),
                to_table_number: self.ctx.table(table_id).map(|t| t.table_number),
            })),
            None => Ok(AssignOutcome::Assigned(
                self.ctx.assign_check_to_table(&self.check_id, table_id),
            )),
        }
    }

    /// 确认移动；取消只需丢弃确认
    pub fn confirm_move(&self, confirmation: MoveConfirmation) -> PendingWrite {
        self.ctx
            .assign_check_to_table(&confirmation.check_id, &confirmation.to_table_id)
    }

    /// 关闭面板
    pub fn close(self) {
        self.ctx.set_selected_check(None);
    }
}

/// 桌台详情面板中点击账单: 已在本桌则取消，否则直接分配 (不确认)
pub fn toggle_check_at_table(ctx: &AppContext, check_id: &str, table_id: &str) -> PendingWrite {
    let here = ctx
        .check(check_id)
        .is_some_and(|check| check.is_assigned_to(table_id));
    if here {
        ctx.clear_check(check_id)
    } else {
        ctx.assign_check_to_table(check_id, table_id)
    }
}
