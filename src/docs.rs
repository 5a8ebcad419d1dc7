use crate::api::import::ImportRequest;
use crate::auth::handlers::{RosterEntry, RosterLoginRequest, SignInResponse};
use crate::auth::session::SessionContext;
use crate::model::role::Role;
use crate::services::import::ImportReport;
use crate::services::review::ReviewView;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Review API",
        version = "1.0.0",
        description = r#"
## Attendance Review Dashboard

Shows administrators and approvers the attendance records they are
responsible for, read from the shared Google spreadsheet.

### Key Features
- **Sign-in** with Google or by picking an authorized roster entry
- **Review**: rows joined to the staff roster, filtered by role, sorted by
  attendance deficit then clock discrepancy
- **Import**: copies the timesheet CSV from Drive into the staging sheet

### Security
Dashboard endpoints need a session, sent as the `review_session` cookie or
as a Bearer token.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::callback,
        crate::auth::handlers::roster_candidates,
        crate::auth::handlers::roster_login,
        crate::auth::handlers::logout,

        crate::api::dashboard::me,
        crate::api::dashboard::attendance_view,

        crate::api::import::import_timesheet
    ),
    components(
        schemas(
            Role,
            SessionContext,
            RosterEntry,
            RosterLoginRequest,
            SignInResponse,
            ReviewView,
            ImportRequest,
            ImportReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in and sessions"),
        (name = "Dashboard", description = "Attendance review"),
        (name = "Import", description = "Timesheet CSV import"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/auth/login",
            "/auth/callback",
            "/auth/roster",
            "/auth/logout",
            "/api/v1/me",
            "/api/v1/attendance",
            "/api/v1/import",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}
