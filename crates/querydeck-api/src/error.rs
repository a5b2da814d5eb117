use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use querydeck_db::DbError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Authentication required")]
    AuthRequired,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Duplicate(String),
    #[error("Data unavailable: {0}")]
    Unavailable(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthRequired | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Duplicate(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Backend details stay in the log
        let message = match &self {
            ApiError::Unavailable(detail) => {
                error!("Backend failure: {}", detail);
                "Data unavailable".to_string()
            }
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(msg) => ApiError::Validation(msg),
            DbError::NotFound(what) => ApiError::NotFound(what),
            DbError::Duplicate(msg) => ApiError::Duplicate(msg),
            DbError::Unavailable(e) => ApiError::Unavailable(e.to_string()),
            DbError::Poisoned => ApiError::Internal(DbError::Poisoned.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_errors_keep_their_category() {
        assert!(matches!(
            ApiError::from(DbError::Duplicate("Query is already in this collection".into())),
            ApiError::Duplicate(_)
        ));

        let db = querydeck_db::Database::open_in_memory().unwrap();
        let backend = db
            .with_conn(|conn| {
                conn.execute("DELETE FROM missing_table", [])?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(ApiError::from(backend), ApiError::Unavailable(_)));
    }

    #[test]
    fn status_codes() {
        let cases = [
            (ApiError::Validation("Title is required".into()), StatusCode::BAD_REQUEST),
            (ApiError::AuthRequired, StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("Query 1".into()), StatusCode::NOT_FOUND),
            (ApiError::Duplicate("dup".into()), StatusCode::CONFLICT),
            (ApiError::Unavailable("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
