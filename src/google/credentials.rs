use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::CredentialSettings;
use crate::error::{AppError, AppResult};

fn default_token_uri() -> String {
    super::TOKEN_URL.to_string()
}

/// The fields of a service-account key file the service needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let key: Self = serde_json::from_str(raw).map_err(|e| format!("invalid key JSON: {e}"))?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err("key is missing client_email or private_key".into());
        }
        Ok(key)
    }
}

/// One place a service-account key may come from.
#[derive(Clone, Debug)]
pub enum CredentialSource {
    /// Key JSON held directly in an environment variable.
    Inline { var: String, value: Option<String> },
    /// Secret mounted into the container.
    SecretFile(PathBuf),
    /// Key file on local disk.
    KeyFile(PathBuf),
}

impl CredentialSource {
    fn describe(&self) -> String {
        match self {
            CredentialSource::Inline { var, .. } => format!("env {var}"),
            CredentialSource::SecretFile(path) => format!("secret {}", path.display()),
            CredentialSource::KeyFile(path) => format!("file {}", path.display()),
        }
    }

    /// `Ok(None)` when the source is simply absent.
    fn load(&self) -> Result<Option<ServiceAccountKey>, String> {
        let raw = match self {
            CredentialSource::Inline { value, .. } => match value {
                Some(v) if !v.trim().is_empty() => v.clone(),
                _ => return Ok(None),
            },
            CredentialSource::SecretFile(path) | CredentialSource::KeyFile(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                std::fs::read_to_string(path).map_err(|e| e.to_string())?
            }
        };
        ServiceAccountKey::from_json(&raw).map(Some)
    }
}

/// Resolves the service credential from the first usable source.
#[derive(Clone, Debug)]
pub struct CredentialProvider {
    sources: Vec<CredentialSource>,
}

impl CredentialProvider {
    pub fn new(sources: Vec<CredentialSource>) -> Self {
        Self { sources }
    }

    pub fn from_settings(settings: &CredentialSettings) -> Self {
        Self::new(vec![
            CredentialSource::Inline {
                var: settings.inline_var.clone(),
                value: std::env::var(&settings.inline_var).ok(),
            },
            CredentialSource::SecretFile(settings.secret_file.clone()),
            CredentialSource::KeyFile(settings.key_file.clone()),
        ])
    }

    pub fn resolve(&self) -> AppResult<ServiceAccountKey> {
        let mut tried = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.load() {
                Ok(Some(key)) => {
                    info!(source = %source.describe(), account = %key.client_email, "service credential resolved");
                    return Ok(key);
                }
                Ok(None) => tried.push(format!("{} (absent)", source.describe())),
                Err(reason) => {
                    debug!(source = %source.describe(), %reason, "credential source unusable");
                    tried.push(format!("{} ({reason})", source.describe()));
                }
            }
        }
        Err(AppError::Credential(format!("tried {}", tried.join(", "))))
    }
}
