use axum::{
    Extension, Json,
    extract::{Path, State},
};

use querydeck_types::api::{Claims, FavoriteResponse, FavoriteState};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{convert, run_blocking};

pub async fn list_favorites(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<FavoriteResponse>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| db.list_favorites(&user_id)).await?;

    let favorites = rows
        .into_iter()
        .map(|row| FavoriteResponse {
            created_at: convert::parse_timestamp(
                &row.created_at,
                "favorite created_at",
                &row.query.id.to_string(),
            ),
            query: convert::query(row.query),
        })
        .collect();

    Ok(Json(favorites))
}

pub async fn favorite_state(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FavoriteState>, ApiError> {
    let query_id = convert::query_id(&query_id)?;
    let user_id = claims.sub.to_string();
    let favorited = run_blocking(&state, move |db| db.is_favorite(&user_id, query_id)).await?;
    Ok(Json(FavoriteState { favorited }))
}

/// Toggle a favorite: removes if exists, inserts if not.
pub async fn toggle_favorite(
    State(state): State<AppState>,
    Path(query_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FavoriteState>, ApiError> {
    let query_id = convert::query_id(&query_id)?;
    let user_id = claims.sub.to_string();
    let favorited = run_blocking(&state, move |db| db.toggle_favorite(&user_id, query_id)).await?;
    Ok(Json(FavoriteState { favorited }))
}
