use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use querydeck_types::api::Claims;

use crate::auth::{AppState, AppStateInner};
use crate::error::ApiError;

/// Extract and validate the bearer token, then hand its claims to the handler.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(ApiError::AuthRequired)?;

    let claims = authenticate(&state, bearer.token()).await?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// A token is accepted only if its signature and expiry check out and the
/// session it names is still live.
pub async fn authenticate(state: &AppStateInner, token: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        debug!("Rejected token: {}", e);
        ApiError::AuthRequired
    })?;

    let claims = token_data.claims;
    match state.sessions.get(claims.sid).await {
        Some(session) if session.user_id == claims.sub => Ok(claims),
        _ => Err(ApiError::AuthRequired),
    }
}
