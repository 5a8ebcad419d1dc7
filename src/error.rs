use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Every condition that halts an interaction.
///
/// Malformed cells, duplicate headers and unmatched join keys are normalized
/// where they occur and never show up here.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("no usable service credential: {0}")]
    Credential(String),

    #[error("could not reach {service}: {detail}")]
    RemoteAccess {
        service: &'static str,
        detail: String,
    },

    #[error("sheet {0:?} not found; check the spreadsheet URL and that it is shared with the service account")]
    MissingSheet(String),

    #[error("column {column:?} not found in sheet {sheet:?}")]
    MissingColumn { sheet: String, column: String },

    #[error(
        "access denied: the signed-in account needs the role \"2. システム管理者\", \"3. 利用者・承認者\" or \"4. 承認者\" in the roster"
    )]
    AccessDenied,

    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("not signed in")]
    Unauthorized,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("could not decode {0}")]
    Decode(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Credential(_) => "CREDENTIAL",
            AppError::RemoteAccess { .. } => "REMOTE_ACCESS",
            AppError::MissingSheet(_) | AppError::MissingColumn { .. } => "SCHEMA_MISMATCH",
            AppError::AccessDenied => "ACCESS_DENIED",
            AppError::AuthFailure(_) => "AUTH_FAILURE",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::FileNotFound(_) => "NOT_FOUND",
            AppError::Decode(_) => "DECODE",
            AppError::BadRequest(_) => "BAD_REQUEST",
        }
    }

    pub fn remote(service: &'static str, err: impl std::fmt::Display) -> Self {
        AppError::RemoteAccess {
            service,
            detail: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let (host, path) = err
            .url()
            .map(|u| (u.host_str().unwrap_or_default().to_string(), u.path().to_string()))
            .unwrap_or_default();
        let service = if host.starts_with("sheets.") {
            "Google Sheets"
        } else if host.starts_with("accounts.") || host.starts_with("oauth2.") || path.starts_with("/oauth2") {
            "Google sign-in"
        } else if path.starts_with("/drive") {
            "Google Drive"
        } else {
            "Google APIs"
        };
        AppError::remote(service, err)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Credential(_) | AppError::MissingSheet(_) | AppError::MissingColumn { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::RemoteAccess { .. } => StatusCode::BAD_GATEWAY,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::AuthFailure(_) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }))
    }
}
