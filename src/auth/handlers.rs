use actix_web::{
    HttpRequest, HttpResponse,
    cookie::{Cookie, SameSite, time::Duration},
    http::header::LOCATION,
    web,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    auth::{
        auth::{SESSION_COOKIE, session_token},
        jwt::{generate_session_token, verify_token},
        session::SessionContext,
        strategy::{GoogleRedirect, IdentityStrategy, RosterSelection},
    },
    config::{AuthMode, Config},
    error::{AppError, AppResult},
    model::role::Role,
    services::access::find_viewer,
    state::AppState,
};

/// Cookie holding the CSRF state of a pending Google sign-in.
const STATE_COOKIE: &str = "review_oauth_state";

#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Google when the viewer cancels or consent fails.
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RosterLoginRequest {
    pub login_id: String,
}

/// One selectable entry in roster mode.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterEntry {
    pub login_id: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    pub token: String,
    pub session: SessionContext,
}

fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::seconds(config.session_ttl as i64))
        .finish()
}

fn removal(name: &'static str, path: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path(path).finish();
    cookie.make_removal();
    cookie
}

/// Resolves the identity, checks it against the current roster and opens a session.
async fn establish(
    strategy: &dyn IdentityStrategy,
    state: &AppState,
    config: &Config,
) -> AppResult<(SessionContext, String)> {
    let identity = strategy.resolve_identity().await?;
    let dataset = state.dataset().await?;

    let Some(viewer) = find_viewer(&identity.login_id, &dataset.staff) else {
        warn!(identity = %identity.login_id, "signed in but not authorized in the roster");
        return Err(AppError::AccessDenied);
    };

    let name = identity
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| viewer.display_name());
    let session = state
        .sessions
        .create(&identity.login_id, &name, viewer.role)
        .await;

    let token = generate_session_token(
        &session.id,
        &session.identity,
        &config.session_secret,
        config.session_ttl as usize,
    )
    .map_err(|e| AppError::AuthFailure(format!("could not issue session token: {e}")))?;

    info!(identity = %session.identity, role = ?session.role, "session opened");
    Ok((session, token))
}

/// Redirects to Google's consent screen.
#[utoipa::path(
    get,
    path = "/auth/login",
    responses(
        (status = 302, description = "Redirect to Google authorization"),
        (status = 400, description = "Google sign-in is not enabled")
    ),
    tag = "Auth"
)]
pub async fn login(state: web::Data<AppState>, config: web::Data<Config>) -> AppResult<HttpResponse> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Google sign-in is not enabled".into()))?;

    let csrf = Uuid::new_v4().to_string();
    let cookie = Cookie::build(STATE_COOKIE, csrf.clone())
        .path("/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::minutes(10))
        .finish();

    Ok(HttpResponse::Found()
        .insert_header((LOCATION, oauth.authorization_url(&csrf)))
        .cookie(cookie)
        .finish())
}

/// Completes a Google sign-in and sends the viewer back to the dashboard.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Signed in, redirect to /"),
        (status = 401, description = "Sign-in failed or state mismatch"),
        (status = 403, description = "Account has no dashboard role")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_callback", skip_all)]
pub async fn callback(
    req: HttpRequest,
    query: web::Query<CallbackQuery>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let oauth = state
        .oauth
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("Google sign-in is not enabled".into()))?;

    if let Some(error) = &query.error {
        return Err(AppError::AuthFailure(format!("sign-in was not completed: {error}")));
    }

    let expected = req.cookie(STATE_COOKIE).map(|c| c.value().to_string());
    if expected.is_none() || expected != query.state {
        return Err(AppError::AuthFailure(
            "sign-in state mismatch, start again from the login page".into(),
        ));
    }

    let strategy = GoogleRedirect {
        oauth,
        code: query.code.clone().unwrap_or_default(),
    };
    let (_, token) = establish(&strategy, &state, &config).await?;

    // Redirecting drops the one-time code from the address bar.
    Ok(HttpResponse::Found()
        .insert_header((LOCATION, "/"))
        .cookie(session_cookie(token, &config))
        .cookie(removal(STATE_COOKIE, "/auth"))
        .finish())
}

fn require_roster_mode(config: &Config) -> AppResult<()> {
    if config.auth_mode == AuthMode::Roster {
        Ok(())
    } else {
        Err(AppError::BadRequest("roster sign-in is not enabled".into()))
    }
}

/// Lists the roster entries that may sign in.
#[utoipa::path(
    get,
    path = "/auth/roster",
    responses(
        (status = 200, description = "Selectable roster entries", body = [RosterEntry]),
        (status = 400, description = "Roster sign-in is not enabled")
    ),
    tag = "Auth"
)]
pub async fn roster_candidates(
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    require_roster_mode(&config)?;
    let dataset = state.dataset().await?;

    let entries: Vec<RosterEntry> = dataset
        .staff
        .iter()
        .filter(|s| s.role.grants_access() && !s.login_id.trim().is_empty())
        .map(|s| RosterEntry {
            login_id: s.login_id.clone(),
            name: s.display_name(),
            role: s.role,
        })
        .collect();

    Ok(HttpResponse::Ok().json(entries))
}

/// Signs in as the selected roster entry.
#[utoipa::path(
    post,
    path = "/auth/roster",
    request_body = RosterLoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Roster sign-in is not enabled"),
        (status = 401, description = "Not an authorized roster entry")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_roster", skip_all, fields(login_id = %body.login_id))]
pub async fn roster_login(
    body: web::Json<RosterLoginRequest>,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    require_roster_mode(&config)?;
    let dataset = state.dataset().await?;

    let strategy = RosterSelection {
        selected: body.login_id.clone(),
        roster: &dataset.staff,
    };
    let (session, token) = establish(&strategy, &state, &config).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token.clone(), &config))
        .json(SignInResponse { token, session }))
}

/// Ends the current session. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Signed out")),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    config: web::Data<Config>,
) -> HttpResponse {
    if let Some(claims) = session_token(&req).and_then(|t| verify_token(&t, &config.session_secret).ok()) {
        state.sessions.end(&claims.sid).await;
        info!(identity = %claims.sub, "session closed");
    }

    HttpResponse::NoContent()
        .cookie(removal(SESSION_COOKIE, "/"))
        .finish()
}
