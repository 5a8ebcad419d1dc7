use std::str::FromStr;

use serde::Serialize;
use strum_macros::EnumString;
use utoipa::ToSchema;

/// Approval role as recorded in the roster's role column.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[strum(serialize = "2. システム管理者")]
    SystemAdministrator,
    #[strum(serialize = "3. 利用者・承認者")]
    UserAndApprover,
    #[strum(serialize = "4. 承認者")]
    Approver,
    /// Anything else, including no roster entry at all. Grants no access.
    #[strum(disabled)]
    Other,
}

impl Role {
    pub const VALID: [Role; 3] = [
        Role::SystemAdministrator,
        Role::UserAndApprover,
        Role::Approver,
    ];

    /// Maps a roster cell to a role; unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        Role::from_str(label.trim()).unwrap_or(Role::Other)
    }

    pub fn grants_access(self) -> bool {
        self != Role::Other
    }

    pub fn sees_everyone(self) -> bool {
        self == Role::SystemAdministrator
    }

    /// Label as written in the roster sheet.
    pub fn label(self) -> &'static str {
        match self {
            Role::SystemAdministrator => "2. システム管理者",
            Role::UserAndApprover => "3. 利用者・承認者",
            Role::Approver => "4. 承認者",
            Role::Other => "",
        }
    }
}
