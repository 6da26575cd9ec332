use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use homestead_types::{AppError, AttachPhotoRequest, DeliveryPhoto, UserRole};

use crate::auth::extractors::{AdminRequired, AuthRequired};
use crate::config::feature_flags;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

/// Photo row plus its derived URL, which depends on the bucket endpoint
/// and is never stored.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PhotoView {
    #[serde(flatten)]
    pub photo: DeliveryPhoto,
    pub url: String,
}

impl From<DeliveryPhoto> for PhotoView {
    fn from(photo: DeliveryPhoto) -> Self {
        let url = crate::s3::photo_url(&photo.object_key);
        Self { photo, url }
    }
}

/// Ask for a presigned upload slot.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct PhotoUploadRequest {
    /// MIME type of the image (`image/jpeg`, `image/png`, or `image/webp`).
    pub content_type: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UploadUrlResponse {
    /// Key to pass back when attaching the photo after the upload.
    pub object_key: String,
    /// Presigned PUT URL the client writes the image bytes to.
    pub upload_url: String,
}

/// Staff may touch photos on any delivery; drivers only on their own haul.
async fn require_photo_access(
    pool: &Pool<Postgres>,
    delivery_id: i64,
    claims: &crate::auth::jwt::Claims,
) -> Result<(), AppError> {
    let role = UserRole::from_str_or_default(&claims.role);
    if role.satisfies(&UserRole::Admin) {
        return Ok(());
    }
    let is_assigned = role == UserRole::Driver
        && repo::assignment::is_assigned_driver(pool, delivery_id, claims.sub).await?;
    if !is_assigned {
        return Err(AppError::forbidden(
            "Only admins or the assigned driver can attach photos",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/photos/upload-url",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = PhotoUploadRequest,
    responses(
        (status = 200, description = "Presigned upload slot", body = UploadUrlResponse),
        (status = 400, description = "Photo storage disabled or unsupported content type", body = AppError),
        (status = 403, description = "Not assigned to this delivery", body = AppError),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "photos",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, auth, payload))]
pub async fn create_upload_url(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<PhotoUploadRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    if !feature_flags().s3 {
        return Err(AppError::bad_request("Photo storage is not enabled"));
    }

    repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;
    require_photo_access(&pool, id, &auth.0).await?;

    let (object_key, upload_url) = crate::s3::presign_photo_upload(id, &payload.content_type)
        .await
        .map_err(AppError::bad_request)?;

    Ok(Json(UploadUrlResponse {
        object_key,
        upload_url,
    }))
}

#[utoipa::path(
    post,
    path = "/api/deliveries/{id}/photos",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = AttachPhotoRequest,
    responses(
        (status = 201, description = "Photo attached", body = PhotoView),
        (status = 403, description = "Not assigned to this delivery", body = AppError),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "photos",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, auth, payload))]
pub async fn attach_photo(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<AttachPhotoRequest>,
) -> Result<(StatusCode, Json<PhotoView>), AppError> {
    payload.validate_request()?;

    repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;
    require_photo_access(&pool, id, &auth.0).await?;

    let photo = repo::photo::attach(&pool, id, auth.0.sub, payload).await?;
    Ok((StatusCode::CREATED, Json(photo.into())))
}

#[utoipa::path(
    get,
    path = "/api/deliveries/{id}/photos",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Photos for the delivery", body = Vec<PhotoView>),
        (status = 404, description = "Delivery not found", body = AppError)
    ),
    tag = "photos",
    security(("bearer_auth" = []))
)]
pub async fn list_photos(
    State(pool): State<Pool<Postgres>>,
    _auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PhotoView>>, AppError> {
    repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;

    let photos = repo::photo::list_for_delivery(&pool, id).await?;
    Ok(Json(photos.into_iter().map(PhotoView::from).collect()))
}

#[utoipa::path(
    delete,
    path = "/api/deliveries/{id}/photos/{photo_id}",
    params(
        ("id" = i64, Path, description = "Delivery ID"),
        ("photo_id" = i64, Path, description = "Photo ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "Photo deleted"),
        (status = 404, description = "Not found", body = AppError)
    ),
    tag = "photos",
    security(("bearer_auth" = []))
)]
pub async fn delete_photo(
    State(pool): State<Pool<Postgres>>,
    _admin: AdminRequired,
    dealer: DealerId,
    Path((id, photo_id)): Path<(i64, i64)>,
) -> Result<StatusCode, AppError> {
    repo::delivery::find_by_id(&pool, &dealer.0, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Delivery {} not found", id)))?;

    let deleted = repo::photo::delete(&pool, id, photo_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("Photo {} not found", photo_id)))
    }
}
