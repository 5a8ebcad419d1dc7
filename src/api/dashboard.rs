use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::IntoParams;

use crate::auth::{auth::SessionUser, session::SessionContext};
use crate::error::AppResult;
use crate::services::review::{ReviewView, build_view};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ViewQuery {
    /// Drop the cached spreadsheet snapshot and read it again.
    #[serde(default)]
    pub refresh: bool,
}

/// Reconciled attendance rows visible to the signed-in viewer.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(ViewQuery),
    responses(
        (status = 200, description = "Rows the viewer may review", body = ReviewView),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Account has no dashboard role"),
        (status = 500, description = "Spreadsheet layout does not match"),
        (status = 502, description = "Google Sheets unreachable")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn attendance_view(
    user: SessionUser,
    query: web::Query<ViewQuery>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    if query.refresh {
        info!(viewer = %user.identity, "spreadsheet snapshot refresh requested");
        state.dataset.invalidate();
    }
    let dataset = state.dataset().await?;
    let view = build_view(&dataset, &user.identity, &state.layout)?;
    Ok(HttpResponse::Ok().json(view))
}

/// The current session.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Signed-in viewer", body = SessionContext),
        (status = 401, description = "Not signed in")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn me(user: SessionUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0)
}
