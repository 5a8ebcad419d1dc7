use serde::Deserialize;
use tracing::{debug, warn};

use super::{AUTHORIZE_URL, TOKEN_URL, USERINFO_URL, error_body};
use crate::config::OAuthSettings;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodeExchange {
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Google authorization-code flow for signing viewers in.
#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    settings: OAuthSettings,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuth {
    pub fn new(http: reqwest::Client, settings: OAuthSettings) -> Self {
        Self {
            http,
            settings,
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }

    /// Points the code exchange and profile lookup at other endpoints.
    pub fn with_endpoints(mut self, token_url: &str, userinfo_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.userinfo_url = userinfo_url.to_string();
        self
    }

    /// Where to send the browser; `state` comes back on the callback.
    pub fn authorization_url(&self, state: &str) -> String {
        format!(
            "{AUTHORIZE_URL}?client_id={}&redirect_uri={}&scope={}&response_type=code&access_type=offline&state={}",
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            urlencoding::encode("email profile"),
            urlencoding::encode(state),
        )
    }

    /// Exchanges an authorization code for the signed-in user's profile.
    pub async fn user_info(&self, code: &str) -> AppResult<UserInfo> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(AppError::remote("Google sign-in", error_body(resp).await));
        }
        if !status.is_success() {
            let body = error_body(resp).await;
            warn!(%status, "code exchange rejected");
            return Err(AppError::AuthFailure(format!("code exchange rejected: {body}")));
        }
        let exchange: CodeExchange = resp.json().await?;
        let Some(access_token) = exchange.access_token else {
            warn!(error = ?exchange.error, "code exchange returned no access token");
            return Err(AppError::AuthFailure(
                exchange
                    .error
                    .unwrap_or_else(|| "no access token issued".to_string()),
            ));
        };

        debug!("fetching user info");
        let resp = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AppError::AuthFailure(error_body(resp).await));
        }
        Ok(resp.json().await?)
    }
}
