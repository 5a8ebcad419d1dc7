use std::sync::{PoisonError, RwLock};

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServiceAccountKey;
use crate::error::{AppError, AppResult};
use crate::utils::load_cache::CacheEntry;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Mints and caches service-account access tokens.
pub struct TokenProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
    scope: String,
    cached: RwLock<Option<CacheEntry<String>>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey, scopes: &[&str]) -> Self {
        Self {
            http,
            key,
            scope: scopes.join(" "),
            cached: RwLock::new(None),
        }
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed RS256 assertion exchanged at the key's token URI.
    fn assertion(&self, now: i64) -> AppResult<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| AppError::Credential(format!("unreadable private key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| AppError::Credential(format!("could not sign assertion: {e}")))
    }

    pub async fn access_token(&self) -> AppResult<String> {
        let now = Utc::now();
        {
            let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = cached.as_ref().filter(|e| !e.is_stale(now)) {
                return Ok(entry.value.clone());
            }
        }

        debug!(account = %self.key.client_email, "requesting service access token");
        let assertion = self.assertion(now.timestamp())?;
        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AppError::Credential(format!(
                "token exchange rejected: {}",
                super::error_body(resp).await
            )));
        }
        let token: TokenResponse = resp.json().await?;

        let lifetime = Duration::seconds((token.expires_in - EXPIRY_MARGIN_SECS).max(0));
        let mut cached = self.cached.write().unwrap_or_else(PoisonError::into_inner);
        *cached = Some(CacheEntry::new(token.access_token.clone(), now, lifetime));
        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "svc@review.iam.gserviceaccount.com".into(),
            private_key: private_key.into(),
            token_uri: crate::google::TOKEN_URL.into(),
            project_id: None,
        }
    }

    #[test]
    fn scopes_are_space_separated() {
        let provider = TokenProvider::new(reqwest::Client::new(), key("x"), &crate::google::SERVICE_SCOPES);
        assert_eq!(
            provider.scope,
            "https://www.googleapis.com/auth/spreadsheets https://www.googleapis.com/auth/drive.readonly"
        );
    }

    #[test]
    fn garbage_private_key_is_a_credential_error() {
        let provider = TokenProvider::new(reqwest::Client::new(), key("not a pem"), &["scope"]);
        let err = provider.assertion(0).unwrap_err();
        assert!(matches!(err, AppError::Credential(_)));
    }

    #[actix_web::test]
    async fn cached_token_is_reused_without_network() {
        let provider = TokenProvider::new(reqwest::Client::new(), key("not a pem"), &["scope"]);
        *provider.cached.write().unwrap() = Some(CacheEntry::new(
            "cached-token".to_string(),
            Utc::now(),
            Duration::seconds(600),
        ));
        assert_eq!(provider.access_token().await.unwrap(), "cached-token");
    }
}
