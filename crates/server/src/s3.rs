use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    Client,
};

/// How long a presigned upload URL stays valid.
const UPLOAD_URL_EXPIRY_SECS: u64 = 900;

/// Read an env var, trying the primary name first then a fallback.
pub fn env_or(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .or_else(|| std::env::var(fallback).ok())
}

/// Resolve the S3 endpoint, if configured.
/// Hosted deployments set `AWS_ENDPOINT_URL_S3`, local dev uses `S3_ENDPOINT`.
fn endpoint() -> Option<String> {
    env_or("AWS_ENDPOINT_URL_S3", "S3_ENDPOINT")
}

/// Resolve the delivery-photo bucket name.
fn bucket_name() -> String {
    env_or("BUCKET_NAME", "S3_BUCKET").unwrap_or_else(|| "delivery-photos".to_string())
}

/// Build an S3-compatible client from environment variables.
///
/// Supports both hosted (`AWS_*`) and local MinIO (`S3_*`) naming:
///   - `AWS_ENDPOINT_URL_S3` / `S3_ENDPOINT`
///   - `AWS_ACCESS_KEY_ID`   / `S3_ACCESS_KEY`
///   - `AWS_SECRET_ACCESS_KEY` / `S3_SECRET_KEY`
///   - `AWS_REGION`          / `S3_REGION`
pub fn s3_client() -> Client {
    let endpoint = endpoint().expect("AWS_ENDPOINT_URL_S3 or S3_ENDPOINT must be set");
    let access_key = env_or("AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY")
        .expect("AWS_ACCESS_KEY_ID or S3_ACCESS_KEY must be set");
    let secret_key = env_or("AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY")
        .expect("AWS_SECRET_ACCESS_KEY or S3_SECRET_KEY must be set");
    let region = env_or("AWS_REGION", "S3_REGION").unwrap_or_else(|| "us-east-1".to_string());

    let creds = Credentials::new(&access_key, &secret_key, None, None, "env");

    let config = aws_sdk_s3::Config::builder()
        .endpoint_url(&endpoint)
        .region(Region::new(region))
        .credentials_provider(creds)
        .force_path_style(true)
        .behavior_version_latest()
        .build();

    Client::from_conf(config)
}

/// Create the delivery-photo bucket if it doesn't already exist.
pub async fn ensure_bucket() {
    let bucket = bucket_name();
    let client = s3_client();

    let bucket_exists = client.head_bucket().bucket(&bucket).send().await.is_ok();

    if !bucket_exists {
        tracing::info!("Creating S3 bucket '{}'...", bucket);
        match client.create_bucket().bucket(&bucket).send().await {
            Ok(_) => tracing::info!("S3 bucket '{}' created", bucket),
            Err(e) => tracing::warn!("Failed to create S3 bucket '{}': {}", bucket, e),
        }
    } else {
        tracing::info!("S3 bucket '{}' already exists", bucket);
    }
}

/// Build the URL for a stored photo. Path style works for MinIO and
/// generic S3-compatible stores. Without an endpoint configured the path
/// is relative, which keeps listings usable when storage is disabled.
pub fn photo_url(key: &str) -> String {
    match endpoint() {
        Some(ep) => format!("{}/{}/{}", ep, bucket_name(), key),
        None => format!("/{}/{}", bucket_name(), key),
    }
}

/// Presign a photo upload so the client writes straight to the bucket.
///
/// Objects are stored at `{delivery_id}/{uuid}.{ext}`. Returns the object
/// key (to record once the upload finishes) and the presigned PUT URL.
pub async fn presign_photo_upload(
    delivery_id: i64,
    content_type: &str,
) -> Result<(String, String), String> {
    let ext = match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => return Err(format!("Unsupported content type: {}", content_type)),
    };

    let file_id = uuid::Uuid::new_v4();
    let key = format!("{}/{}.{}", delivery_id, file_id, ext);

    let presigning = PresigningConfig::expires_in(std::time::Duration::from_secs(
        UPLOAD_URL_EXPIRY_SECS,
    ))
    .map_err(|e| format!("Invalid presigning config: {}", e))?;

    let client = s3_client();
    let request = client
        .put_object()
        .bucket(bucket_name())
        .key(&key)
        .content_type(content_type)
        .presigned(presigning)
        .await
        .map_err(|e| format!("S3 presign failed: {}", e))?;

    Ok((key, request.uri().to_string()))
}
