use std::convert::Infallible;
use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{DateTime, Utc};
use futures_util::stream::Stream;
use jsonwebtoken::{EncodingKey, Header, encode};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use querydeck_db::Database;
use querydeck_types::api::{
    AuthResponse, Claims, SessionResponse, SessionUser, SignInRequest, SignUpRequest,
};
use querydeck_types::events::SessionEvent;

use crate::error::ApiError;
use crate::middleware::authenticate;
use crate::policy::{EmailPolicy, check_password};
use crate::run_blocking;
use crate::session::SessionProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionProvider,
    pub jwt_secret: String,
    pub email_policy: EmailPolicy,
    pub page_size: u32,
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(req): Json<SignUpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.email_policy.check(&req.email)?;
    check_password(&req.password)?;

    let email = normalize_email(&req.email);
    let user_id = Uuid::new_v4();

    let uid = user_id.to_string();
    let em = email.clone();
    let password = req.password;
    run_blocking(&state, move |db| {
        let password_hash = hash_password(&password)?;
        db.create_user(&uid, &em, &password_hash)?;
        Ok::<_, ApiError>(())
    })
    .await?;

    info!("New account {}", email);
    let response = issue_session(&state, user_id, email).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    state.email_policy.check(&req.email)?;

    let email = normalize_email(&req.email);
    let password = req.password;
    let user = run_blocking(&state, move |db| {
        let user = db
            .get_user_by_email(&email)?
            .ok_or(ApiError::InvalidCredentials)?;
        verify_password(&password, &user.password)?;
        Ok::<_, ApiError>(user)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(format!("corrupt user id '{}': {}", user.id, e)))?;

    info!("User {} signed in", user.email);
    Ok(Json(issue_session(&state, user_id, user.email).await?))
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> StatusCode {
    if state.sessions.close(claims.sid).await {
        info!("User {} signed out", claims.email);
    }
    StatusCode::NO_CONTENT
}

/// Issue a new token for the caller's session and push its expiry forward.
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AuthResponse>, ApiError> {
    let session = state
        .sessions
        .refresh(claims.sid)
        .await
        .ok_or(ApiError::AuthRequired)?;

    let token = create_token(
        &state.jwt_secret,
        claims.sub,
        claims.sid,
        &session.email,
        session.expires_at,
    )?;

    Ok(Json(AuthResponse {
        user_id: claims.sub,
        email: session.email,
        token,
        expires_at: session.expires_at,
    }))
}

/// The signed-in user, or `null` when the request carries no live session.
pub async fn current_session(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
) -> Json<SessionResponse> {
    let user = match bearer {
        Some(TypedHeader(Authorization(bearer))) => authenticate(&state, bearer.token())
            .await
            .ok()
            .map(|claims| SessionUser {
                id: claims.sub,
                email: claims.email,
            }),
        None => None,
    };

    Json(SessionResponse { user })
}

/// Server-sent stream of the caller's session events. Ends once the session
/// it was opened with signs out.
pub async fn session_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.sessions.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) if event.user_id() == claims.sub => {
                    let closes = matches!(event, SessionEvent::SignedOut { .. })
                        && event.session_id() == claims.sid;
                    match serde_json::to_string(&event) {
                        Ok(data) => {
                            yield Ok(Event::default().event(event.name()).data(data));
                        }
                        Err(e) => warn!("Failed to encode session event: {}", e),
                    }
                    if closes {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Session event stream for {} lagged by {}", claims.sub, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn issue_session(
    state: &AppStateInner,
    user_id: Uuid,
    email: String,
) -> Result<AuthResponse, ApiError> {
    let (session_id, session) = state.sessions.open(user_id, email.clone()).await;
    let token = create_token(&state.jwt_secret, user_id, session_id, &email, session.expires_at)?;

    Ok(AuthResponse {
        user_id,
        email,
        token,
        expires_at: session.expires_at,
    })
}

fn create_token(
    secret: &str,
    user_id: Uuid,
    session_id: Uuid,
    email: &str,
    expires_at: DateTime<Utc>,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        sid: session_id,
        email: email.to_string(),
        exp: usize::try_from(expires_at.timestamp()).unwrap_or_default(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token creation failed: {e}")))
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    // Argon2id with a random salt
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> Result<(), ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(format!("corrupt password hash: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ApiError::InvalidCredentials)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn emails_are_normalised() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
