use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::auth::auth::SessionUser;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::services::{
    access::resolve_role,
    import::{ImportReport, run_import},
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ImportRequest {
    /// Overrides the configured file name.
    pub filename: Option<String>,
}

/// Copies the timesheet CSV from Drive into the staging sheet.
#[utoipa::path(
    post,
    path = "/api/v1/import",
    request_body(content = ImportRequest, description = "Optional file name override"),
    responses(
        (status = 200, description = "Staging sheet replaced", body = ImportReport),
        (status = 400, description = "Drive folder not configured"),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "System administrators only"),
        (status = 404, description = "No file with that name in the folder"),
        (status = 422, description = "File is not CP932 or UTF-8 text"),
        (status = 502, description = "Google Drive or Sheets unreachable")
    ),
    security(("bearer_auth" = [])),
    tag = "Import"
)]
pub async fn import_timesheet(
    user: SessionUser,
    body: Option<web::Json<ImportRequest>>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let dataset = state.dataset().await?;
    if resolve_role(&user.identity, &dataset.staff) != Role::SystemAdministrator {
        warn!(viewer = %user.identity, "import refused");
        return Err(AppError::AccessDenied);
    }

    let filename = body
        .and_then(|b| b.into_inner().filename)
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| config.import.filename.clone());

    let report = run_import(
        state.files.as_ref(),
        state.writer.as_ref(),
        &config.import.drive_folder_id,
        &filename,
        &state.layout,
    )
    .await?;

    // The attendance sheet is derived from the staging sheet.
    state.dataset.invalidate();
    info!(viewer = %user.identity, rows = report.rows, "import finished");

    Ok(HttpResponse::Ok().json(report))
}
