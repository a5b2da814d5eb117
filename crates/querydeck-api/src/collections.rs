use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use querydeck_db::models::CollectionDraft;
use querydeck_types::api::{
    AddToCollectionRequest, Claims, CollectionDetailResponse, CreateCollectionRequest,
};
use querydeck_types::models::Collection;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{convert, run_blocking};

pub async fn list_collections(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Collection>>, ApiError> {
    let user_id = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| db.list_collections(&user_id)).await?;
    Ok(Json(rows.into_iter().map(convert::collection).collect()))
}

pub async fn create_collection(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = CollectionDraft {
        name: req.name,
        description: req.description,
    };
    let user_id = claims.sub.to_string();

    let row = run_blocking(&state, move |db| db.create_collection(&user_id, draft)).await?;
    Ok((StatusCode::CREATED, Json(convert::collection(row))))
}

/// A collection and the queries in it. Two reads with no transaction between
/// them; a query removed in between simply drops out.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CollectionDetailResponse>, ApiError> {
    let id = convert::collection_id(&id)?.to_string();
    let user_id = claims.sub.to_string();

    let (collection, queries) = run_blocking(&state, move |db| {
        let collection = db.get_collection(&id, &user_id)?;
        let queries = db.collection_queries(&id, &user_id)?;
        Ok::<_, ApiError>((collection, queries))
    })
    .await?;

    Ok(Json(CollectionDetailResponse {
        collection: convert::collection(collection),
        queries: queries.into_iter().map(convert::query).collect(),
    }))
}

pub async fn add_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddToCollectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = convert::collection_id(&id)?;
    let user_id = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        db.add_query_to_collection(&id.to_string(), req.query_id, &user_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(convert::membership(row))))
}

pub async fn remove_query(
    State(state): State<AppState>,
    Path((id, query_id)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let id = convert::collection_id(&id)?;
    let query_id = convert::query_id(&query_id)?;
    let user_id = claims.sub.to_string();
    run_blocking(&state, move |db| {
        db.remove_query_from_collection(&id.to_string(), query_id, &user_id)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
