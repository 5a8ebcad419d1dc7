use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::error::{AppError, AppResult};
use crate::google::SpreadsheetSource;
use crate::model::{
    attendance::AttendanceSheet, layout::SheetLayout, staff::StaffRecord, table::Table,
};

/// Snapshot of both sheets as read at `fetched_at`.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub attendance: AttendanceSheet,
    pub staff: Vec<StaffRecord>,
    pub fetched_at: DateTime<Utc>,
}

/// Reads the attendance and staff sheets.
///
/// Both sheets must exist before anything is read, so a misconfigured
/// spreadsheet never yields partial data.
#[instrument(name = "load_dataset", skip_all)]
pub async fn load_dataset(
    source: &dyn SpreadsheetSource,
    layout: &SheetLayout,
) -> AppResult<Dataset> {
    let titles = source.sheet_titles().await?;
    for sheet in [&layout.attendance_sheet, &layout.staff_sheet] {
        if !titles.iter().any(|t| t == sheet) {
            return Err(AppError::MissingSheet(sheet.clone()));
        }
    }

    let attendance = Table::from_values(source.read_values(&layout.attendance_sheet).await?);
    let attendance = AttendanceSheet::from_table(attendance, layout)?;

    let staff = Table::from_values(source.read_values(&layout.staff_sheet).await?);
    let staff = StaffRecord::from_table(&staff, layout)?;

    info!(
        attendance_rows = attendance.len(),
        staff_rows = staff.len(),
        "spreadsheet loaded"
    );

    Ok(Dataset {
        attendance,
        staff,
        fetched_at: Utc::now(),
    })
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeSpreadsheet, walkthrough};
    use super::*;

    #[actix_web::test]
    async fn loads_both_sheets_and_drops_blank_ids() {
        let dataset = load_dataset(&walkthrough(), &SheetLayout::default())
            .await
            .unwrap();
        assert_eq!(dataset.attendance.len(), 3);
        assert_eq!(dataset.staff.len(), 6);
        // duplicate 名前 header kept under a suffixed label
        assert!(dataset.attendance.headers().contains(&"名前_1".to_string()));
    }

    #[actix_web::test]
    async fn missing_sheet_is_named_and_nothing_is_read() {
        let source = FakeSpreadsheet::default().with_sheet("社員一覧", &[&["ログインID"]]);
        let err = load_dataset(&source, &SheetLayout::default())
            .await
            .unwrap_err();
        match err {
            AppError::MissingSheet(name) => assert_eq!(name, "勤怠確認シート(打刻管理)"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(source.reads.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn unreachable_backend_is_a_remote_error() {
        let source = FakeSpreadsheet {
            offline: true,
            ..walkthrough()
        };
        let err = load_dataset(&source, &SheetLayout::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RemoteAccess { .. }));
    }
}
