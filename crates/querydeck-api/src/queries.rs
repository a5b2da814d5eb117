use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;

use querydeck_db::models::QueryDraft;
use querydeck_types::api::{
    Claims, CreateQueryRequest, ListQuery, QueryListResponse, TagsResponse, UpdateQueryRequest,
};
use querydeck_types::filter::total_pages;
use querydeck_types::url_state::UrlState;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::{convert, run_blocking};

/// GET /queries?page=&q=&tags=: one page of the filtered listing.
pub async fn list_queries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<QueryListResponse>, ApiError> {
    let params = UrlState::from(query).to_list_params(state.page_size);
    debug!(
        "Listing page {} (search: {:?}, tags: {:?})",
        params.page,
        params.search.as_ref().map(|s| &s.term),
        params.tags
    );

    let page = params.page;
    let page_size = params.page_size;
    let result = run_blocking(&state, move |db| db.list_queries(&params))
        .await?
        .map(convert::query);

    Ok(Json(QueryListResponse {
        total_pages: total_pages(result.total_count, page_size),
        total_count: result.total_count,
        items: result.items,
        page,
        page_size,
    }))
}

pub async fn get_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = convert::query_id(&id)?;
    let row = run_blocking(&state, move |db| db.get_query(id)).await?;
    Ok(Json(convert::query(row)))
}

pub async fn create_query(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateQueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = QueryDraft {
        title: req.title,
        content: req.content,
        description: req.description,
        tags: req.tags,
    };
    let user_id = claims.sub.to_string();

    let row = run_blocking(&state, move |db| db.create_query(&user_id, draft)).await?;
    debug!("Query {} created by {}", row.id, claims.email);

    Ok((StatusCode::CREATED, Json(convert::query(row))))
}

pub async fn update_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateQueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = convert::query_id(&id)?;
    let draft = QueryDraft {
        title: req.title,
        content: req.content,
        description: req.description,
        tags: req.tags,
    };
    let user_id = claims.sub.to_string();

    let row = run_blocking(&state, move |db| db.update_query(id, &user_id, draft)).await?;
    Ok(Json(convert::query(row)))
}

pub async fn delete_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let id = convert::query_id(&id)?;
    let user_id = claims.sub.to_string();
    run_blocking(&state, move |db| db.delete_query(id, &user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tags: every tag in use, sorted for display.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsResponse>, ApiError> {
    let tags = run_blocking(&state, |db| db.all_tags()).await?;
    Ok(Json(TagsResponse { tags }))
}
