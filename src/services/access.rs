use crate::model::{role::Role, staff::StaffRecord};
use crate::services::reconcile::ReconciledRow;

/// Login IDs match only when identical; roster cells are trimmed at load.
fn same_login(a: &str, b: &str) -> bool {
    !a.is_empty() && a == b
}

/// The roster entry a viewer signs in as: the first one with their login ID
/// and a role that grants access.
pub fn find_viewer<'a>(identity: &str, staff: &'a [StaffRecord]) -> Option<&'a StaffRecord> {
    staff
        .iter()
        .find(|s| s.role.grants_access() && same_login(&s.login_id, identity))
}

/// Role of `identity` according to the roster; `Other` when absent.
pub fn resolve_role(identity: &str, staff: &[StaffRecord]) -> Role {
    find_viewer(identity, staff)
        .map(|s| s.role)
        .unwrap_or(Role::Other)
}

/// Rows the viewer may see.
///
/// Administrators see everything, approvers only the employees whose first
/// approver they are, anyone else nothing. Input order is preserved.
pub fn visible_rows(role: Role, identity: &str, rows: Vec<ReconciledRow>) -> Vec<ReconciledRow> {
    match role {
        Role::SystemAdministrator => rows,
        Role::Approver | Role::UserAndApprover => rows
            .into_iter()
            .filter(|row| {
                row.approver
                    .as_deref()
                    .is_some_and(|approver| same_login(approver, identity))
            })
            .collect(),
        Role::Other => Vec::new(),
    }
}
