use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::{layout::SheetLayout, role::Role};
use crate::services::{
    access::{resolve_role, visible_rows},
    loader::Dataset,
    reconcile::{project, reconcile, sort_rows},
};

/// What the dashboard shows one viewer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReviewView {
    pub role: Role,
    /// "全スタッフ" for administrators, "承認対象スタッフ" for approvers.
    pub label: String,
    pub count: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Shown instead of the table when there is nothing to list.
    pub message: Option<String>,
}

/// Load → role → join → filter → sort → project for one viewer.
pub fn build_view(dataset: &Dataset, identity: &str, layout: &SheetLayout) -> AppResult<ReviewView> {
    let role = resolve_role(identity, &dataset.staff);
    if !role.grants_access() {
        return Err(AppError::AccessDenied);
    }

    let joined = reconcile(&dataset.attendance, &dataset.staff, layout);
    let mut rows = visible_rows(role, identity, joined.rows);
    sort_rows(&mut rows);
    let (columns, table) = project(&joined.headers, &rows, layout);

    let label = if role.sees_everyone() {
        "全スタッフ"
    } else {
        "承認対象スタッフ"
    };
    let message = table.is_empty().then(|| {
        if role.sees_everyone() {
            "表示する勤怠データがありません。".to_string()
        } else {
            "承認対象のスタッフがいません。第一承認者として割り当てられているスタッフのデータのみ表示されます。"
                .to_string()
        }
    });

    info!(viewer = identity, ?role, rows = table.len(), "review view built");

    Ok(ReviewView {
        role,
        label: label.to_string(),
        count: table.len(),
        columns,
        rows: table,
        message,
    })
}
