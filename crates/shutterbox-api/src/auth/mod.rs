//! API-key authentication.
//!
//! Every protected route runs behind [`auth_middleware`], which resolves a
//! bearer token (or an `api_key` query parameter, for browser `<img>` tags
//! that cannot set headers) to a [`User`] row and stores it as a request
//! extension. Keys are opaque credentials issued once by the `create-user`
//! binary and compared by indexed lookup.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};

use shutterbox_core::{AppError, User};
use shutterbox_db::UserRepository;

use crate::error::HttpAppError;

const API_KEY_PREFIX: &str = "sb_";

/// Generate a fresh API key: `sb_` + 40 hex chars.
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let random_bytes: Vec<u8> = (0..20).map(|_| rng.random()).collect();
    format!("{}{}", API_KEY_PREFIX, hex::encode(random_bytes))
}

/// The authenticated account, inserted by the middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized("Missing authentication".to_string()))
            })
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub users: UserRepository,
}

/// Token from the `Authorization: Bearer <key>` header.
fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Token from an `api_key=<key>` query parameter.
fn query_api_key(request: &Request) -> Option<String> {
    request.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == "api_key" && !value.is_empty()).then(|| value.to_string())
        })
    })
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request).or_else(|| query_api_key(&request)) {
        Some(token) => token,
        None => {
            return HttpAppError(AppError::Unauthorized("Invalid API key".to_string()))
                .into_response();
        }
    };

    match auth_state.users.find_by_api_key(&token).await {
        Ok(Some(user)) => {
            tracing::debug!(user_id = user.id, username = %user.username, "Authenticated");
            request.extensions_mut().insert(CurrentUser(user));
            next.run(request).await
        }
        Ok(None) => {
            HttpAppError(AppError::Unauthorized("Invalid API key".to_string())).into_response()
        }
        Err(err) => HttpAppError(err).into_response(),
    }
}
