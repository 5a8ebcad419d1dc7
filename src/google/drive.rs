use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{DRIVE_API, TokenProvider, error_body};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Where timesheet exports are stored.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Non-trashed files in `folder_id` whose name is exactly `name`.
    async fn find_by_name(&self, folder_id: &str, name: &str) -> AppResult<Vec<DriveFile>>;

    async fn download(&self, file_id: &str) -> AppResult<Vec<u8>>;
}

fn escape_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Drive search expression for an exact name inside one folder.
pub fn name_query(folder_id: &str, name: &str) -> String {
    format!(
        "name = '{}' and '{}' in parents and trashed = false",
        escape_literal(name),
        escape_literal(folder_id)
    )
}

pub struct DriveClient {
    http: reqwest::Client,
    tokens: Arc<TokenProvider>,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, tokens: Arc<TokenProvider>) -> Self {
        Self { http, tokens }
    }

    async fn checked(&self, resp: reqwest::Response) -> AppResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(AppError::remote(
            "Google Drive",
            format!(
                "{} (is the folder shared with {}?)",
                error_body(resp).await,
                self.tokens.client_email()
            ),
        ))
    }
}

#[async_trait]
impl FileStore for DriveClient {
    #[instrument(name = "drive_find", skip(self))]
    async fn find_by_name(&self, folder_id: &str, name: &str) -> AppResult<Vec<DriveFile>> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(DRIVE_API)
            .query(&[
                ("q", name_query(folder_id, name).as_str()),
                ("spaces", "drive"),
                ("fields", "files(id, name)"),
            ])
            .bearer_auth(token)
            .send()
            .await?;
        let list: FileList = self.checked(resp).await?.json().await?;
        debug!(matches = list.files.len(), "drive search finished");
        Ok(list.files)
    }

    #[instrument(name = "drive_download", skip(self))]
    async fn download(&self, file_id: &str) -> AppResult<Vec<u8>> {
        let token = self.tokens.access_token().await?;
        let resp = self
            .http
            .get(format!("{DRIVE_API}/{}", urlencoding::encode(file_id)))
            .query(&[("alt", "media")])
            .bearer_auth(token)
            .send()
            .await?;
        let bytes = self.checked(resp).await?.bytes().await?;
        debug!(bytes = bytes.len(), "file downloaded");
        Ok(bytes.to_vec())
    }
}
