use std::ops::Deref;

use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::auth::session::SessionContext;
use crate::error::AppError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "review_session";

/// Session token from the session cookie, or from an `Authorization: Bearer` header.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The signed-in viewer, as placed in the request by the session middleware.
pub struct SessionUser(pub SessionContext);

impl Deref for SessionUser {
    type Target = SessionContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for SessionUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<SessionContext>() {
            Some(session) => ready(Ok(SessionUser(session.clone()))),
            None => ready(Err(AppError::Unauthorized.into())),
        }
    }
}
