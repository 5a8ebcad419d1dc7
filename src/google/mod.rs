//! Thin clients for the Google APIs the service talks to.

pub mod credentials;
pub mod drive;
pub mod oauth;
pub mod sheets;
pub mod token;
pub mod unavailable;

pub use credentials::{CredentialProvider, ServiceAccountKey};
pub use drive::{DriveClient, DriveFile, FileStore};
pub use oauth::{GoogleOAuth, UserInfo};
pub use sheets::{SheetWriter, SheetsClient, SpreadsheetSource};
pub use token::TokenProvider;
pub use unavailable::Unavailable;

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const DRIVE_API: &str = "https://www.googleapis.com/drive/v3/files";
pub const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested for the service account.
pub const SERVICE_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];

/// Reads the body of a failed response so it can be surfaced to the viewer.
pub(crate) async fn error_body(resp: reqwest::Response) -> String {
    let status = resp.status();
    match resp.text().await {
        Ok(body) if !body.is_empty() => format!("{status}: {body}"),
        _ => status.to_string(),
    }
}
