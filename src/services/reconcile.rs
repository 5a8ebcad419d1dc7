use std::collections::HashMap;

use tracing::debug;

use crate::model::{
    attendance::AttendanceSheet, layout::SheetLayout, staff::StaffRecord, table::dedupe_headers,
};

/// Attendance row joined with its roster entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow {
    pub employee_id: String,
    /// First approver from the roster; `None` when the employee is not on it.
    pub approver: Option<String>,
    /// Raw cells in [`Joined::headers`] order, approver column included.
    pub cells: Vec<String>,
    pub deficit: f64,
    pub discrepancy: f64,
}

/// Result of joining attendance to the roster.
#[derive(Debug, Clone)]
pub struct Joined {
    pub headers: Vec<String>,
    pub rows: Vec<ReconciledRow>,
}

/// Lenient numeric read of a sheet cell.
///
/// Blank, `-`, unparsable and non-finite values all become zero.
pub fn normalize_numeric(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        // + 0.0 folds -0 into 0
        Ok(v) if v.is_finite() => v + 0.0,
        _ => {
            debug!(value = trimmed, "non-numeric cell counted as zero");
            0.0
        }
    }
}

/// Renders a normalized value the way the dashboard shows it.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Left-joins attendance to the roster on employee number.
///
/// Employees missing from the roster keep a blank approver; no row is ever
/// dropped. When the roster lists an employee twice the first entry wins.
pub fn reconcile(
    attendance: &AttendanceSheet,
    staff: &[StaffRecord],
    layout: &SheetLayout,
) -> Joined {
    let mut approvers: HashMap<&str, Option<&str>> = HashMap::with_capacity(staff.len());
    for record in staff {
        approvers
            .entry(record.employee_id.as_str())
            .or_insert(record.first_approver.as_deref());
    }

    let mut labels: Vec<&str> = attendance.headers().iter().map(String::as_str).collect();
    labels.push(&layout.approver);
    let headers = dedupe_headers(&labels);

    let column = |name: &str| attendance.headers().iter().position(|h| h == name);
    let deficit_col = column(&layout.attendance_deficit);
    let discrepancy_col = column(&layout.clock_discrepancy);

    let rows = attendance
        .records()
        .map(|record| {
            let approver = approvers
                .get(record.employee_id)
                .copied()
                .flatten()
                .map(String::from);
            let numeric = |col: Option<usize>| col.map_or(0.0, |i| normalize_numeric(&record.cells[i]));

            let mut cells = record.cells.to_vec();
            cells.push(approver.clone().unwrap_or_default());

            ReconciledRow {
                employee_id: record.employee_id.to_string(),
                approver,
                cells,
                deficit: numeric(deficit_col),
                discrepancy: numeric(discrepancy_col),
            }
        })
        .collect();

    Joined { headers, rows }
}

/// Stable sort by attendance deficit, then clock discrepancy, both ascending.
pub fn sort_rows(rows: &mut [ReconciledRow]) {
    rows.sort_by(|a, b| {
        a.deficit
            .total_cmp(&b.deficit)
            .then(a.discrepancy.total_cmp(&b.discrepancy))
    });
}

/// Display columns present in the joined table, in display order, with the
/// two sort fields replaced by their normalized values.
pub fn project(
    headers: &[String],
    rows: &[ReconciledRow],
    layout: &SheetLayout,
) -> (Vec<String>, Vec<Vec<String>>) {
    let selected: Vec<(usize, &String)> = layout
        .display_columns
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name).map(|i| (i, name)))
        .collect();

    let table = rows
        .iter()
        .map(|row| {
            selected
                .iter()
                .map(|&(idx, name)| {
                    if *name == layout.attendance_deficit {
                        format_number(row.deficit)
                    } else if *name == layout.clock_discrepancy {
                        format_number(row.discrepancy)
                    } else {
                        row.cells[idx].clone()
                    }
                })
                .collect()
        })
        .collect();

    (selected.into_iter().map(|(_, name)| name.clone()).collect(), table)
}
