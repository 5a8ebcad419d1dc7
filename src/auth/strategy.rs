use async_trait::async_trait;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::google::GoogleOAuth;
use crate::model::staff::StaffRecord;
use crate::services::access::find_viewer;

/// Who the viewer turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub login_id: String,
    pub display_name: Option<String>,
}

/// A way of establishing the viewer's login ID.
///
/// Failing to establish one is always `AppError::AuthFailure`.
#[async_trait]
pub trait IdentityStrategy: Send + Sync {
    async fn resolve_identity(&self) -> AppResult<ResolvedIdentity>;
}

/// Google authorization-code redirect.
pub struct GoogleRedirect<'a> {
    pub oauth: &'a GoogleOAuth,
    pub code: String,
}

#[async_trait]
impl IdentityStrategy for GoogleRedirect<'_> {
    async fn resolve_identity(&self) -> AppResult<ResolvedIdentity> {
        if self.code.trim().is_empty() {
            return Err(AppError::AuthFailure("missing authorization code".into()));
        }
        let info = self.oauth.user_info(&self.code).await?;
        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| AppError::AuthFailure("identity provider returned no email".into()))?;
        info!(identity = %email, "google sign-in");
        Ok(ResolvedIdentity {
            login_id: email,
            display_name: info.name,
        })
    }
}

/// Direct pick from the authorized roster entries.
pub struct RosterSelection<'a> {
    pub selected: String,
    pub roster: &'a [StaffRecord],
}

#[async_trait]
impl IdentityStrategy for RosterSelection<'_> {
    async fn resolve_identity(&self) -> AppResult<ResolvedIdentity> {
        let entry = find_viewer(&self.selected, self.roster).ok_or_else(|| {
            AppError::AuthFailure(format!("{:?} is not an authorized roster entry", self.selected))
        })?;
        info!(identity = %entry.login_id, "roster sign-in");
        Ok(ResolvedIdentity {
            login_id: entry.login_id.clone(),
            display_name: Some(entry.display_name()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuthSettings;
    use crate::model::role::Role;

    fn roster() -> Vec<StaffRecord> {
        vec![
            StaffRecord {
                employee_id: "M1".into(),
                login_id: "mgr@example.com".into(),
                surname: "山田".into(),
                given_name: "花子".into(),
                role: Role::Approver,
                first_approver: None,
            },
            StaffRecord {
                employee_id: "E1".into(),
                login_id: "e1@example.com".into(),
                surname: "田中".into(),
                given_name: "一郎".into(),
                role: Role::Other,
                first_approver: Some("mgr@example.com".into()),
            },
        ]
    }

    #[actix_web::test]
    async fn roster_selection_accepts_authorized_entries() {
        let roster = roster();
        let strategy = RosterSelection {
            selected: "mgr@example.com".into(),
            roster: &roster,
        };
        let identity = strategy.resolve_identity().await.unwrap();
        assert_eq!(identity.login_id, "mgr@example.com");
        assert_eq!(identity.display_name.as_deref(), Some("山田 花子"));
    }

    #[actix_web::test]
    async fn roster_selection_rejects_entries_without_a_role() {
        let roster = roster();
        for selected in ["e1@example.com", "nobody@example.com"] {
            let strategy = RosterSelection {
                selected: selected.into(),
                roster: &roster,
            };
            let err = strategy.resolve_identity().await.unwrap_err();
            assert!(matches!(err, AppError::AuthFailure(_)), "{selected}");
        }
    }

    #[actix_web::test]
    async fn google_profile_without_email_is_an_auth_failure() {
        let oauth = crate::google::oauth::fake::google(
            200,
            r#"{"access_token":"ya29.x"}"#,
            r#"{"name":"山田 花子"}"#,
        )
        .await;
        let strategy = GoogleRedirect {
            oauth: &oauth,
            code: "code-1".into(),
        };
        let err = strategy.resolve_identity().await.unwrap_err();
        assert!(matches!(err, AppError::AuthFailure(_)), "{err:?}");
    }

    #[actix_web::test]
    async fn google_profile_with_email_resolves_the_login() {
        let oauth = crate::google::oauth::fake::google(
            200,
            r#"{"access_token":"ya29.x"}"#,
            r#"{"email":"mgr@example.com","name":"山田 花子"}"#,
        )
        .await;
        let strategy = GoogleRedirect {
            oauth: &oauth,
            code: "code-1".into(),
        };
        let identity = strategy.resolve_identity().await.unwrap();
        assert_eq!(identity.login_id, "mgr@example.com");
    }

    #[actix_web::test]
    async fn blank_code_fails_without_calling_google() {
        let oauth = GoogleOAuth::new(
            reqwest::Client::new(),
            OAuthSettings {
                client_id: "id".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://localhost/auth/callback".into(),
            },
        );
        let strategy = GoogleRedirect {
            oauth: &oauth,
            code: " ".into(),
        };
        let err = strategy.resolve_identity().await.unwrap_err();
        assert!(matches!(err, AppError::AuthFailure(_)));
    }
}
