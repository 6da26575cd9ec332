use homestead_types::AppError;
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres};

// --- Environment helpers ---

fn twilio_account_sid() -> Result<String, String> {
    std::env::var("TWILIO_ACCOUNT_SID")
        .map_err(|_| "TWILIO_ACCOUNT_SID is not configured".to_string())
}

fn twilio_auth_token() -> Result<String, String> {
    std::env::var("TWILIO_AUTH_TOKEN")
        .map_err(|_| "TWILIO_AUTH_TOKEN is not configured".to_string())
}

fn twilio_from_number() -> Result<String, String> {
    std::env::var("TWILIO_FROM_NUMBER")
        .map_err(|_| "TWILIO_FROM_NUMBER is not configured".to_string())
}

fn app_name() -> String {
    std::env::var("APP_NAME").unwrap_or_else(|_| "Homestead".to_string())
}

// --- Core SMS sending ---

/// Send an SMS message via Twilio REST API.
#[tracing::instrument(skip(message))]
pub async fn send_sms(to: &str, message: &str) -> Result<(), String> {
    let sid = twilio_account_sid()?;
    let auth_token = twilio_auth_token()?;
    let from = twilio_from_number()?;

    let url = format!(
        "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
        sid
    );

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .basic_auth(&sid, Some(&auth_token))
        .form(&[
            ("From", from),
            ("To", to.to_string()),
            ("Body", message.to_string()),
        ])
        .send()
        .await
        .map_err(|e| format!("Twilio request failed: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Twilio API error ({}): {}", status, body));
    }

    tracing::info!(to = to, "SMS sent successfully");
    Ok(())
}

// --- Phone verification ---

const MAX_CODES_PER_HOUR: i64 = 3;
const MAX_VERIFY_ATTEMPTS: i32 = 5;
const CODE_EXPIRY_MINUTES: i64 = 10;

/// Send a verification code to a phone number.
/// Rate-limited to MAX_CODES_PER_HOUR per phone number.
#[tracing::instrument(skip(pool))]
pub async fn send_verification_code(
    pool: &Pool<Postgres>,
    user_id: i64,
    phone: &str,
) -> Result<(), AppError> {
    // Rate limit check
    let recent_count: Option<i64> = sqlx::query_scalar(
        r#"SELECT COUNT(*) FROM sms_verifications
           WHERE phone_number = $1 AND created_at > NOW() - INTERVAL '1 hour'"#,
    )
    .bind(phone)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::internal(e.to_string()))?;

    if recent_count.unwrap_or(0) >= MAX_CODES_PER_HOUR {
        return Err(AppError::validation(
            "Too many verification codes sent. Please try again later.",
            Default::default(),
        ));
    }

    // Generate 6-digit code
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    let code_str = code.to_string();
    let code_hash = hash_code(&code_str);

    let expires_at = chrono::Utc::now() + chrono::Duration::minutes(CODE_EXPIRY_MINUTES);

    // Store hashed code
    sqlx::query("INSERT INTO sms_verifications (phone_number, code_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(phone)
        .bind(&code_hash)
        .bind(expires_at)
        .execute(pool)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;

    // Send SMS
    let message = format!("Your {} verification code is: {}", app_name(), code_str);
    send_sms(phone, &message).await.map_err(AppError::internal)?;

    tracing::debug!(user_id, "Verification code issued");
    Ok(())
}

/// Verify a phone number with a code.
/// Updates the user's profile phone_number and phone_verified on success.
#[tracing::instrument(skip(pool, code))]
pub async fn verify_code(
    pool: &Pool<Postgres>,
    user_id: i64,
    phone: &str,
    code: &str,
) -> Result<(), AppError> {
    // Find the latest unexpired, unverified code for this phone
    let record: Option<(i64, String, i32)> = sqlx::query_as(
        r#"SELECT id, code_hash, attempts FROM sms_verifications
           WHERE phone_number = $1 AND expires_at > NOW() AND verified = false
           ORDER BY created_at DESC LIMIT 1"#,
    )
    .bind(phone)
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::internal(e.to_string()))?;

    let (record_id, code_hash_stored, attempts) = record.ok_or_else(|| {
        AppError::validation(
            "No pending verification code found. Please request a new one.",
            Default::default(),
        )
    })?;

    // Check attempt limit
    if attempts >= MAX_VERIFY_ATTEMPTS {
        return Err(AppError::validation(
            "Too many failed attempts. Please request a new code.",
            Default::default(),
        ));
    }

    // Increment attempts
    sqlx::query("UPDATE sms_verifications SET attempts = attempts + 1 WHERE id = $1")
        .bind(record_id)
        .execute(pool)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;

    // Verify code hash
    if hash_code(code) != code_hash_stored {
        return Err(AppError::validation(
            "Invalid verification code.",
            Default::default(),
        ));
    }

    // Mark as verified
    sqlx::query("UPDATE sms_verifications SET verified = true WHERE id = $1")
        .bind(record_id)
        .execute(pool)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?;

    // Update the profile's phone info
    sqlx::query(
        "UPDATE user_profiles SET phone_number = $2, phone_verified = true, updated_at = now() WHERE user_id = $1",
    )
    .bind(user_id)
    .bind(phone)
    .execute(pool)
    .await
    .map_err(|e| AppError::internal(e.to_string()))?;

    Ok(())
}

// --- Notification helpers ---

/// Send a delivery status SMS to a user's verified phone number, honoring
/// their notification settings. Failures are logged, never surfaced.
pub async fn send_delivery_alert(pool: &Pool<Postgres>, user_id: i64, message: &str) {
    if !sms_enabled_for(pool, user_id).await {
        tracing::debug!(user_id, "SMS notifications disabled, skipping alert");
        return;
    }
    match get_verified_phone(pool, user_id).await {
        Some(phone) => {
            let msg = format!("[{}] {}", app_name(), message);
            if let Err(e) = send_sms(&phone, &msg).await {
                tracing::error!(error = %e, user_id, "Failed to send delivery alert SMS");
            }
        }
        None => {
            tracing::debug!(user_id, "No verified phone for delivery alert");
        }
    }
}

// --- Internal helpers ---

async fn sms_enabled_for(pool: &Pool<Postgres>, user_id: i64) -> bool {
    // Missing settings row means the default: SMS off.
    sqlx::query_scalar::<_, bool>(
        "SELECT sms_enabled FROM notification_settings WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
    .unwrap_or(false)
}

async fn get_verified_phone(pool: &Pool<Postgres>, user_id: i64) -> Option<String> {
    sqlx::query_scalar::<_, Option<String>>(
        "SELECT phone_number FROM user_profiles WHERE user_id = $1 AND phone_verified = true",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
    .flatten()
}

fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    format!("{:x}", hasher.finalize())
}
