use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod docs;
mod error;
mod google;
mod model;
mod routes;
mod services;
mod state;
mod utils;

use config::{AuthMode, Config};
use state::AppState;

use crate::docs::ApiDoc;
use crate::google::{
    CredentialProvider, DriveClient, FileStore, GoogleOAuth, SERVICE_SCOPES, SheetWriter,
    SheetsClient, SpreadsheetSource, TokenProvider, Unavailable,
};
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Google clients for the configured spreadsheet, or stand-ins that report
/// the credential problem on every call.
fn google_backend(
    config: &Config,
    http: &reqwest::Client,
) -> anyhow::Result<(
    Arc<dyn SpreadsheetSource>,
    Arc<dyn SheetWriter>,
    Arc<dyn FileStore>,
)> {
    let key = match CredentialProvider::from_settings(&config.credentials).resolve() {
        Ok(key) => key,
        Err(e) => {
            error!(error = %e, "service credential unavailable");
            let unavailable = Arc::new(Unavailable::new(e.to_string()));
            let sheets: Arc<dyn SpreadsheetSource> = unavailable.clone();
            let writer: Arc<dyn SheetWriter> = unavailable.clone();
            let files: Arc<dyn FileStore> = unavailable;
            return Ok((sheets, writer, files));
        }
    };

    let tokens = Arc::new(TokenProvider::new(http.clone(), key, &SERVICE_SCOPES));
    info!(service_account = tokens.client_email(), "service credential loaded");

    let sheets = Arc::new(
        SheetsClient::new(http.clone(), tokens.clone(), &config.spreadsheet_url)
            .context("SPREADSHEET_URL")?,
    );
    let writer: Arc<dyn SheetWriter> = sheets.clone();
    let source: Arc<dyn SpreadsheetSource> = sheets;
    let files: Arc<dyn FileStore> = Arc::new(DriveClient::new(http.clone(), tokens));
    Ok((source, writer, files))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance-review.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(auth_mode = ?config.auth_mode, "Server starting...");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let (sheets, writer, files) = google_backend(&config, &http)?;
    let oauth = match (config.auth_mode, &config.oauth) {
        (AuthMode::OAuth, Some(settings)) => Some(GoogleOAuth::new(http.clone(), settings.clone())),
        _ => None,
    };

    let state = Data::new(AppState::new(&config, sheets, writer, files, oauth));
    let config_data = Data::new(config.clone());
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config_data.clone())
            .service(api::pages::index)
            .service(api::pages::health)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::Value;

    use crate::config::{AuthMode, Config};
    use crate::google::{AUTHORIZE_URL, FileStore, GoogleOAuth};
    use crate::google::oauth::fake::google;
    use actix_web::cookie::Cookie;
    use actix_web::http::header::{LOCATION, SET_COOKIE};
    use crate::services::import::fake::{FakeDrive, RecordingSheet, csv_file};
    use crate::services::loader::fake::{FakeSpreadsheet, walkthrough};
    use crate::state::AppState;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn app_state(config: &Config, sheets: FakeSpreadsheet, drive: FakeDrive) -> Data<AppState> {
        let files: Arc<dyn FileStore> = Arc::new(drive);
        Data::new(AppState::new(
            config,
            Arc::new(sheets),
            Arc::new(RecordingSheet::default()),
            files,
            None,
        ))
    }

    fn oauth_state(config: &Config, oauth: GoogleOAuth) -> Data<AppState> {
        let files: Arc<dyn FileStore> = Arc::new(FakeDrive::default());
        Data::new(AppState::new(
            config,
            Arc::new(walkthrough()),
            Arc::new(RecordingSheet::default()),
            files,
            Some(oauth),
        ))
    }

    macro_rules! app {
        ($config:expr, $state:expr) => {{
            let config = $config.clone();
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .app_data(Data::new(config.clone()))
                    .service(crate::api::pages::index)
                    .service(crate::api::pages::health)
                    .configure(|cfg| crate::routes::configure(cfg, config.clone())),
            )
            .await
        }};
    }

    macro_rules! sign_in {
        ($app:expr, $login_id:expr) => {{
            let req = test::TestRequest::post()
                .uri("/auth/roster")
                .peer_addr(peer())
                .set_json(serde_json::json!({ "login_id": $login_id }))
                .to_request();
            let resp = test::call_service(&$app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: SignInResponseBody = test::read_body_json(resp).await;
            body.token
        }};
    }

    #[derive(serde::Deserialize)]
    struct SignInResponseBody {
        token: String,
    }

    fn get(uri: &str, token: Option<&str>) -> test::TestRequest {
        let req = test::TestRequest::get().uri(uri).peer_addr(peer());
        match token {
            Some(token) => req.insert_header(("Authorization", format!("Bearer {token}"))),
            None => req,
        }
    }

    #[actix_web::test]
    async fn health_and_index_are_public() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);

        let resp = test::call_service(&app, get("/health", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = test::call_service(&app, get("/", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn dashboard_requires_a_session() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);

        let resp = test::call_service(&app, get("/api/v1/attendance", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = test::call_service(&app, get("/api/v1/attendance", Some("garbage")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn approver_sees_assigned_rows_in_priority_order() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);
        let token = sign_in!(app, "mgr@example.com");

        let resp = test::call_service(&app, get("/api/v1/attendance", Some(&token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["label"], "承認対象スタッフ");
        assert_eq!(body["count"], 2);
        assert_eq!(body["rows"][0][0], "E3");
        assert_eq!(body["rows"][1][0], "E1");

        let resp = test::call_service(&app, get("/api/v1/me", Some(&token)).to_request()).await;
        let me: Value = test::read_body_json(resp).await;
        assert_eq!(me["identity"], "mgr@example.com");
        assert_eq!(me["role"], "approver");
    }

    #[actix_web::test]
    async fn roster_entry_without_a_role_cannot_sign_in() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);

        let req = test::TestRequest::post()
            .uri("/auth/roster")
            .peer_addr(peer())
            .set_json(serde_json::json!({ "login_id": "e1@example.com" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn roster_candidates_list_only_authorized_entries() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);

        let resp = test::call_service(&app, get("/auth/roster", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["login_id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["admin@example.com", "mgr@example.com", "other@example.com"]);
    }

    #[actix_web::test]
    async fn roster_sign_in_is_disabled_in_oauth_mode() {
        let config = Config::for_tests(AuthMode::OAuth);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);

        let resp = test::call_service(&app, get("/auth/roster", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn role_revoked_after_sign_in_is_denied() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);
        let token = sign_in!(app, "mgr@example.com");

        // Swap in a roster where mgr has lost the approver role.
        let mut dataset = (*state.dataset().await.unwrap()).clone();
        for staff in &mut dataset.staff {
            if staff.login_id == "mgr@example.com" {
                staff.role = crate::model::role::Role::Other;
            }
        }
        state.dataset.store(dataset, chrono::Utc::now());

        let resp = test::call_service(&app, get("/api/v1/attendance", Some(&token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "ACCESS_DENIED");
    }

    #[actix_web::test]
    async fn logout_ends_the_session() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);
        let token = sign_in!(app, "admin@example.com");

        let req = test::TestRequest::post()
            .uri("/auth/logout")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = test::call_service(&app, get("/api/v1/me", Some(&token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn import_is_limited_to_administrators() {
        let config = Config::for_tests(AuthMode::Roster);
        let drive = FakeDrive {
            files: vec![csv_file("kintai.csv", "社員番号,所定内勤務時間\nE1,'7:30\n".as_bytes().to_vec())],
        };
        let state = app_state(&config, walkthrough(), drive);
        let app = app!(config, state);

        let approver = sign_in!(app, "mgr@example.com");
        let req = test::TestRequest::post()
            .uri("/api/v1/import")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {approver}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let admin = sign_in!(app, "admin@example.com");
        let req = test::TestRequest::post()
            .uri("/api/v1/import")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {admin}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["rows"], 1);
        assert_eq!(body["encoding"], "UTF-8");
    }

    #[actix_web::test]
    async fn import_of_a_missing_file_is_not_found() {
        let config = Config::for_tests(AuthMode::Roster);
        let state = app_state(&config, walkthrough(), FakeDrive::default());
        let app = app!(config, state);
        let admin = sign_in!(app, "admin@example.com");

        let req = test::TestRequest::post()
            .uri("/api/v1/import")
            .peer_addr(peer())
            .insert_header(("Authorization", format!("Bearer {admin}")))
            .set_json(serde_json::json!({ "filename": "other.csv" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "NOT_FOUND");
    }

    fn set_cookies(resp: &actix_web::dev::ServiceResponse) -> Vec<String> {
        resp.headers()
            .get_all(SET_COOKIE)
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect()
    }

    #[actix_web::test]
    async fn login_redirects_to_google_with_a_state_cookie() {
        let config = Config::for_tests(AuthMode::OAuth);
        let oauth = GoogleOAuth::new(reqwest::Client::new(), config.oauth.clone().unwrap());
        let state = oauth_state(&config, oauth);
        let app = app!(config, state);

        let resp = test::call_service(&app, get("/auth/login", None).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        let location = resp.headers().get(LOCATION).unwrap().to_str().unwrap().to_string();
        assert!(location.starts_with(AUTHORIZE_URL));

        let cookies = set_cookies(&resp);
        let csrf = cookies
            .iter()
            .find_map(|c| c.strip_prefix("review_oauth_state="))
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert!(!csrf.is_empty());
        assert!(location.contains(&format!("state={csrf}")));
    }

    #[actix_web::test]
    async fn callback_with_mismatched_state_is_rejected() {
        let config = Config::for_tests(AuthMode::OAuth);
        let oauth = GoogleOAuth::new(reqwest::Client::new(), config.oauth.clone().unwrap());
        let state = oauth_state(&config, oauth);
        let app = app!(config, state);

        let req = get("/auth/callback?code=c1&state=forged", None)
            .cookie(Cookie::new("review_oauth_state", "expected"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "AUTH_FAILURE");

        // No state cookie at all.
        let req = get("/auth/callback?code=c1&state=expected", None).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn callback_opens_a_session_for_a_roster_approver() {
        let config = Config::for_tests(AuthMode::OAuth);
        let oauth = google(
            200,
            r#"{"access_token":"ya29.x"}"#,
            r#"{"email":"mgr@example.com","name":"山田 花子"}"#,
        )
        .await;
        let state = oauth_state(&config, oauth);
        let app = app!(config, state);

        let req = get("/auth/callback?code=c1&state=s1", None)
            .cookie(Cookie::new("review_oauth_state", "s1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(LOCATION).unwrap().to_str().unwrap(), "/");
        let token = set_cookies(&resp)
            .iter()
            .find_map(|c| c.strip_prefix("review_session="))
            .and_then(|rest| rest.split(';').next())
            .map(String::from)
            .unwrap();

        let resp = test::call_service(&app, get("/api/v1/me", Some(&token)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let me: Value = test::read_body_json(resp).await;
        assert_eq!(me["identity"], "mgr@example.com");
    }

    #[actix_web::test]
    async fn callback_for_an_account_outside_the_roster_is_denied() {
        let config = Config::for_tests(AuthMode::OAuth);
        let oauth = google(
            200,
            r#"{"access_token":"ya29.x"}"#,
            r#"{"email":"Mgr@example.com"}"#,
        )
        .await;
        let state = oauth_state(&config, oauth);
        let app = app!(config, state);

        let req = get("/auth/callback?code=c1&state=s1", None)
            .cookie(Cookie::new("review_oauth_state", "s1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
