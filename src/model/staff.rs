use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::{layout::SheetLayout, role::Role, table::Table};

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StaffRecord {
    pub employee_id: String,
    /// Google account the staff member signs in with.
    pub login_id: String,
    pub surname: String,
    pub given_name: String,
    pub role: Role,
    /// Login ID of the staff member who approves this employee's attendance.
    pub first_approver: Option<String>,
}

impl StaffRecord {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.surname, self.given_name)
            .trim()
            .to_string()
    }

    /// Reads roster records out of the staff sheet.
    ///
    /// Login ID, employee ID, role and first approver columns are required;
    /// name columns are optional.
    pub fn from_table(table: &Table, layout: &SheetLayout) -> Result<Vec<Self>, AppError> {
        let required = |name: &str| {
            table
                .column_index(name)
                .ok_or_else(|| AppError::MissingColumn {
                    sheet: layout.staff_sheet.clone(),
                    column: name.to_string(),
                })
        };
        let employee_id = required(&layout.employee_id)?;
        let login_id = required(&layout.login_id)?;
        let role = required(&layout.role)?;
        let first_approver = required(&layout.first_approver)?;
        let surname = table.column_index(&layout.surname);
        let given_name = table.column_index(&layout.given_name);

        let cell = |row: &[String], idx: Option<usize>| {
            idx.map(|i| row[i].trim().to_string()).unwrap_or_default()
        };

        Ok(table
            .rows()
            .iter()
            .map(|row| {
                let approver = row[first_approver].trim();
                StaffRecord {
                    employee_id: row[employee_id].trim().to_string(),
                    login_id: row[login_id].trim().to_string(),
                    surname: cell(row, surname),
                    given_name: cell(row, given_name),
                    role: Role::from_label(&row[role]),
                    first_approver: (!approver.is_empty()).then(|| approver.to_string()),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_roster_rows() {
        let table = Table::from_values(vec![
            row(&["ログインID", "社員番号", "姓", "名", "権限", "第一承認者"]),
            row(&["mgr@example.com", " E9 ", "山田", "花子", "4. 承認者", ""]),
            row(&["a@example.com", "E1", "田中", "一郎", "", "mgr@example.com"]),
        ]);
        let staff = StaffRecord::from_table(&table, &SheetLayout::default()).unwrap();

        assert_eq!(staff.len(), 2);
        assert_eq!(staff[0].employee_id, "E9");
        assert_eq!(staff[0].role, Role::Approver);
        assert_eq!(staff[0].first_approver, None);
        assert_eq!(staff[0].display_name(), "山田 花子");
        assert_eq!(staff[1].role, Role::Other);
        assert_eq!(staff[1].first_approver.as_deref(), Some("mgr@example.com"));
    }

    #[test]
    fn missing_role_column_is_reported_by_name() {
        let table = Table::from_values(vec![
            row(&["ログインID", "社員番号", "第一承認者"]),
            row(&["a@example.com", "E1", ""]),
        ]);
        let err = StaffRecord::from_table(&table, &SheetLayout::default()).unwrap_err();
        match err {
            AppError::MissingColumn { column, .. } => assert_eq!(column, "権限"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn name_columns_are_optional() {
        let table = Table::from_values(vec![
            row(&["ログインID", "社員番号", "権限", "第一承認者"]),
            row(&["a@example.com", "E1", "2. システム管理者", ""]),
        ]);
        let staff = StaffRecord::from_table(&table, &SheetLayout::default()).unwrap();
        assert_eq!(staff[0].display_name(), "");
        assert_eq!(staff[0].role, Role::SystemAdministrator);
    }
}
