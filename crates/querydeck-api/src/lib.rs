pub mod auth;
pub mod collections;
pub mod convert;
pub mod error;
pub mod favorites;
pub mod middleware;
pub mod policy;
pub mod queries;
pub mod session;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
};
use tracing::error;

use querydeck_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Build the HTTP surface. Read-only listing routes are public; everything
/// that mutates or is scoped to a user requires a live session.
pub fn router(state: AppState) -> Router {
    let require = from_fn_with_state(state.clone(), require_auth);

    Router::new()
        // Auth
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/session", get(auth::current_session))
        .route("/auth/signout", post(auth::sign_out).route_layer(require.clone()))
        .route("/auth/refresh", post(auth::refresh).route_layer(require.clone()))
        .route("/auth/events", get(auth::session_events).route_layer(require.clone()))
        // Queries
        .route(
            "/queries",
            get(queries::list_queries).merge(post(queries::create_query).route_layer(require.clone())),
        )
        .route(
            "/queries/{id}",
            get(queries::get_query).merge(
                put(queries::update_query)
                    .delete(queries::delete_query)
                    .route_layer(require.clone()),
            ),
        )
        .route("/tags", get(queries::list_tags))
        // Collections
        .route(
            "/collections",
            get(collections::list_collections)
                .post(collections::create_collection)
                .route_layer(require.clone()),
        )
        .route(
            "/collections/{id}",
            get(collections::get_collection).route_layer(require.clone()),
        )
        .route(
            "/collections/{id}/queries",
            post(collections::add_query).route_layer(require.clone()),
        )
        .route(
            "/collections/{id}/queries/{query_id}",
            delete(collections::remove_query).route_layer(require.clone()),
        )
        // Favorites
        .route(
            "/favorites",
            get(favorites::list_favorites).route_layer(require.clone()),
        )
        .route(
            "/favorites/{query_id}",
            get(favorites::favorite_state)
                .post(favorites::toggle_favorite)
                .route_layer(require),
        )
        .with_state(state)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_blocking<F, T, E>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<ApiError> + Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(Into::into)
}
