use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::role::Role;

/// Everything known about a signed-in viewer.
///
/// Created at sign-in, dropped at logout or when the session TTL runs out.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionContext {
    pub id: String,
    /// Login ID checked against the roster.
    pub identity: String,
    pub display_name: String,
    /// Role at sign-in; requests re-resolve it against the current roster.
    pub role: Role,
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTime<Utc>,
}

/// Live sessions, keyed by session ID.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, SessionContext>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn create(&self, identity: &str, display_name: &str, role: Role) -> SessionContext {
        let session = SessionContext {
            id: Uuid::new_v4().to_string(),
            identity: identity.to_string(),
            display_name: display_name.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.sessions
            .insert(session.id.clone(), session.clone())
            .await;
        session
    }

    pub async fn get(&self, id: &str) -> Option<SessionContext> {
        self.sessions.get(id).await
    }

    pub async fn end(&self, id: &str) {
        self.sessions.invalidate(id).await;
    }
}
