//! Photo handlers: listing, single record, metadata update, image bytes.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::super::AppState;
use super::super::error::AppError;
use super::super::extract::{ApiJson, ApiQuery};
use crate::error::Error;
use crate::library::PhotoPage;
use crate::photo::{Photo, parse_last_modified, validate_patch};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MetadataUpdate {
    metadata: Value,
    last_modified: Option<String>,
}

/// Parses a path id; anything that is not a UUID names no photo.
fn photo_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError(Error::PhotoNotFound { id: Uuid::nil() }))
}

/// GET /photos - List photos with pagination.
pub(crate) async fn list_photos(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<PhotoPage>, AppError> {
    let page = state.library.list_photos(query.limit, query.offset).await?;
    Ok(Json(page))
}

/// GET /photos/{id} - Get a photo record.
pub(crate) async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Photo>, AppError> {
    let photo = state.library.get_photo(photo_id(&id)?).await?;
    Ok(Json(photo))
}

/// PATCH /photos/{id}/metadata - Merge metadata if `last_modified` matches.
pub(crate) async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<MetadataUpdate>,
) -> Result<Json<Photo>, AppError> {
    let id = photo_id(&id)?;
    let patch = validate_patch(req.metadata)?;
    let expected = req
        .last_modified
        .as_deref()
        .map(parse_last_modified)
        .transpose()?;

    let photo = state.library.set_metadata(id, patch, expected).await?;
    Ok(Json(photo))
}

/// GET /photos/{id}/image - Stream the photo's blob from the provider.
pub(crate) async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let photo = state.library.get_photo(photo_id(&id)?).await?;
    let blob = state.library.fetch_blob(&photo.object_key).await?;

    Ok((
        [
            (header::CONTENT_TYPE, blob.content_type),
            (header::CONTENT_LENGTH, blob.size.to_string()),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        Body::from_stream(blob.stream),
    ))
}
