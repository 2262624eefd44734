use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;
use uuid::Uuid;

use founderhub_types::api::Claims;

use crate::AppState;

/// Caller identity on routes where auth is optional.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<Uuid>);

fn bearer_claims(headers: &HeaderMap, secret: &str) -> Result<Option<Claims>, StatusCode> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let token = auth_header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(Some(token_data.claims))
}

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = bearer_claims(req.headers(), &state.jwt_secret)?.ok_or(StatusCode::UNAUTHORIZED)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Attach a `Viewer` to the request. A missing or unreadable token is
/// treated as anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let viewer = match bearer_claims(req.headers(), &state.jwt_secret) {
        Ok(claims) => claims.map(|c| c.sub),
        Err(_) => {
            debug!("Ignoring invalid bearer token on {}", req.uri().path());
            None
        }
    };
    req.extensions_mut().insert(Viewer(viewer));
    next.run(req).await
}
