use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use dotenvy::dotenv;

use crate::model::layout::SheetLayout;

/// How viewers prove who they are.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthMode {
    /// Google authorization-code redirect.
    OAuth,
    /// Direct selection from the authorized roster entries.
    Roster,
}

#[derive(Clone, Debug)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Clone, Debug)]
pub struct CredentialSettings {
    /// Name of the env var carrying an inline service-account key.
    pub inline_var: String,
    /// Mounted secret file (docker / k8s secrets).
    pub secret_file: PathBuf,
    /// Local key file.
    pub key_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ImportSettings {
    pub drive_folder_id: String,
    pub filename: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub spreadsheet_url: String,
    pub session_secret: String,
    pub session_ttl: u64,
    pub cache_ttl: u64,
    pub cookie_secure: bool,

    pub auth_mode: AuthMode,
    pub oauth: Option<OAuthSettings>,
    pub credentials: CredentialSettings,
    pub import: ImportSettings,
    pub layout: SheetLayout,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
    pub log_level: tracing::Level,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let auth_mode = match env_or("AUTH_MODE", "oauth").to_lowercase().as_str() {
            "oauth" | "google" => AuthMode::OAuth,
            "roster" => AuthMode::Roster,
            other => bail!("unknown AUTH_MODE {other:?} (expected oauth or roster)"),
        };

        let oauth = match auth_mode {
            AuthMode::OAuth => Some(OAuthSettings {
                client_id: required("GOOGLE_CLIENT_ID")?,
                client_secret: required("GOOGLE_CLIENT_SECRET")?,
                redirect_uri: required("REDIRECT_URI")?,
            }),
            AuthMode::Roster => None,
        };

        let mut layout = SheetLayout::default();
        if let Ok(name) = env::var("ATTENDANCE_SHEET") {
            layout.attendance_sheet = name;
        }
        if let Ok(name) = env::var("STAFF_SHEET") {
            layout.staff_sheet = name;
        }
        if let Ok(name) = env::var("STAGING_SHEET") {
            layout.staging_sheet = name;
        }
        if let Ok(list) = env::var("DISPLAY_COLUMNS") {
            layout.display_columns = split_list(&list);
        }
        if let Ok(list) = env::var("TIME_COLUMNS") {
            layout.time_columns = split_list(&list);
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            spreadsheet_url: required("SPREADSHEET_URL")?,
            session_secret: required("SESSION_SECRET")?,
            session_ttl: parse_or("SESSION_TTL", 28_800)?, // 8 hours
            cache_ttl: parse_or("CACHE_TTL", 300)?,
            cookie_secure: parse_flag("COOKIE_SECURE", true),

            auth_mode,
            oauth,
            credentials: CredentialSettings {
                inline_var: "GOOGLE_SERVICE_ACCOUNT_JSON".to_string(),
                secret_file: env_or("GOOGLE_SECRET_FILE", "/run/secrets/google_service_account.json")
                    .into(),
                key_file: env_or("GOOGLE_APPLICATION_CREDENTIALS", "service_account.json").into(),
            },
            import: ImportSettings {
                drive_folder_id: env_or("DRIVE_FOLDER_ID", ""),
                filename: env_or("IMPORT_FILENAME", "kintai.csv"),
            },
            layout,

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env_or("API_PREFIX", "/api"),
            log_dir: env_or("LOG_DIR", "logs"),
            log_level: env_or("LOG_LEVEL", "debug")
                .parse()
                .map_err(|_| anyhow!("LOG_LEVEL must be one of trace, debug, info, warn, error"))?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {key}: {e}")),
        Err(_) => Ok(default),
    }
}

fn parse_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

#[cfg(test)]
impl Config {
    /// Configuration for in-process HTTP tests; no env vars involved.
    pub fn for_tests(auth_mode: AuthMode) -> Self {
        Self {
            server_addr: "127.0.0.1:0".to_string(),
            spreadsheet_url: "https://docs.google.com/spreadsheets/d/test-sheet/edit".to_string(),
            session_secret: "test-secret".to_string(),
            session_ttl: 600,
            cache_ttl: 300,
            cookie_secure: false,
            auth_mode,
            oauth: (auth_mode == AuthMode::OAuth).then(|| OAuthSettings {
                client_id: "client-id".to_string(),
                client_secret: "client-secret".to_string(),
                redirect_uri: "http://localhost:8080/auth/callback".to_string(),
            }),
            credentials: CredentialSettings {
                inline_var: "GOOGLE_SERVICE_ACCOUNT_JSON".to_string(),
                secret_file: PathBuf::from("/nonexistent/secret.json"),
                key_file: PathBuf::from("/nonexistent/key.json"),
            },
            import: ImportSettings {
                drive_folder_id: "folder-1".to_string(),
                filename: "kintai.csv".to_string(),
            },
            layout: SheetLayout::default(),
            rate_login_per_min: 60,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
        }
    }
}
