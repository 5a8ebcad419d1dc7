use crate::error::AppError;
use crate::model::{layout::SheetLayout, table::Table};

/// Attendance sheet for one reporting period.
///
/// Keeps the sheet's own column order; every metric stays as text and is only
/// interpreted when the view is reconciled.
#[derive(Clone, Debug, PartialEq)]
pub struct AttendanceSheet {
    table: Table,
    id_column: usize,
}

impl AttendanceSheet {
    /// Wraps the raw sheet, dropping rows with a blank employee number.
    pub fn from_table(mut table: Table, layout: &SheetLayout) -> Result<Self, AppError> {
        let id_column = table
            .column_index(&layout.employee_id)
            .ok_or_else(|| AppError::MissingColumn {
                sheet: layout.attendance_sheet.clone(),
                column: layout.employee_id.clone(),
            })?;
        table.retain_non_blank(&layout.employee_id);
        Ok(Self { table, id_column })
    }

    pub fn headers(&self) -> &[String] {
        self.table.headers()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = AttendanceRecord<'_>> {
        self.table.rows().iter().map(move |cells| AttendanceRecord {
            employee_id: cells[self.id_column].trim(),
            cells,
        })
    }
}

/// Borrowed view of one attendance row.
#[derive(Clone, Copy, Debug)]
pub struct AttendanceRecord<'a> {
    pub employee_id: &'a str,
    pub cells: &'a [String],
}
