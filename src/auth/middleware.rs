use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use tracing::debug;

use crate::auth::auth::session_token;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;

fn unauthorized(req: ServiceRequest) -> ServiceResponse<BoxBody> {
    req.into_response(AppError::Unauthorized.error_response())
}

/// Resolves the session token to a live session and stores it in the
/// request extensions. Requests without one stop here with 401.
pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;
    let state = req
        .app_data::<Data<AppState>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App state missing"))?;
    let secret = config.session_secret.clone();
    let sessions = state.sessions.clone();

    let Some(token) = session_token(req.request()) else {
        return Ok(unauthorized(req));
    };

    let claims = match verify_token(&token, &secret) {
        Ok(c) => c,
        Err(e) => {
            debug!(error = %e, "rejected session token");
            return Ok(unauthorized(req));
        }
    };

    let session = match sessions.get(&claims.sid).await {
        Some(s) if s.identity == claims.sub => s,
        _ => {
            debug!(sid = %claims.sid, "session expired or ended");
            return Ok(unauthorized(req));
        }
    };

    req.extensions_mut().insert(session);

    next.call(req).await
}
