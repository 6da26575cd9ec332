use sqlx::{Pool, Postgres};
use tracing;

use crate::auth::jwt::hash_token;

// --- Environment helpers ---

fn mailgun_api_key() -> Result<String, String> {
    std::env::var("MAILGUN_API_KEY").map_err(|_| "MAILGUN_API_KEY is not configured".to_string())
}

fn mailgun_domain() -> Result<String, String> {
    std::env::var("MAILGUN_DOMAIN").map_err(|_| "MAILGUN_DOMAIN is not configured".to_string())
}

fn mailgun_from() -> Result<String, String> {
    match std::env::var("MAILGUN_FROM") {
        Ok(v) => Ok(v),
        Err(_) => Ok(format!("{} <noreply@{}>", app_name(), mailgun_domain()?)),
    }
}

fn app_base_url() -> String {
    std::env::var("APP_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

fn app_name() -> String {
    std::env::var("APP_NAME").unwrap_or_else(|_| "Homestead".to_string())
}

// --- Core email sending ---

#[tracing::instrument(skip(html_body))]
pub async fn send_email(to: &str, subject: &str, html_body: &str) -> Result<(), String> {
    let domain = mailgun_domain()?;
    let url = format!("https://api.mailgun.net/v3/{}/messages", domain);

    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .basic_auth("api", Some(mailgun_api_key()?))
        .form(&[
            ("from", mailgun_from()?),
            ("to", to.to_string()),
            ("subject", subject.to_string()),
            ("html", html_body.to_string()),
        ])
        .send()
        .await
        .map_err(|e| format!("Mailgun request failed: {}", e))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("Mailgun API error ({}): {}", status, body));
    }

    tracing::info!(to = to, subject = subject, "Email sent successfully");
    Ok(())
}

// --- Higher-level helpers ---

pub async fn send_welcome_email(to: &str, display_name: &str) {
    let html = templates::welcome_html(display_name, &app_name());
    if let Err(e) = send_email(to, &format!("Welcome to {}", app_name()), &html).await {
        tracing::error!(error = %e, to = to, "Failed to send welcome email");
    }
}

pub async fn send_password_reset_email(to: &str, token: &str) {
    let html = templates::password_reset_html(token, &app_base_url());
    if let Err(e) = send_email(to, "Reset your password", &html).await {
        tracing::error!(error = %e, to = to, "Failed to send password reset email");
    }
}

pub async fn send_account_approved_email(to: &str, display_name: &str) {
    let html = templates::account_approved_html(display_name, &app_name(), &app_base_url());
    if let Err(e) = send_email(to, "Your account has been approved", &html).await {
        tracing::error!(error = %e, to = to, "Failed to send approval email");
    }
}

pub async fn send_delivery_status_email(to: &str, home_description: &str, status: &str) {
    let html = templates::delivery_status_html(home_description, status, &app_base_url());
    let subject = format!("Delivery update: {}", status.replace('_', " "));
    if let Err(e) = send_email(to, &subject, &html).await {
        tracing::error!(error = %e, to = to, "Failed to send delivery status email");
    }
}

pub async fn send_estimate_email(to: &str, home_description: &str, quoted_price: f64) {
    let html = templates::estimate_html(home_description, quoted_price, &app_base_url());
    if let Err(e) = send_email(to, "Your home estimate is ready", &html).await {
        tracing::error!(error = %e, to = to, "Failed to send estimate email");
    }
}

pub async fn send_tracking_link_email(to: &str, home_description: &str, token: &str) {
    let html = templates::tracking_link_html(home_description, token, &app_base_url());
    if let Err(e) = send_email(to, "Track your home delivery", &html).await {
        tracing::error!(error = %e, to = to, "Failed to send tracking link email");
    }
}

// --- Password reset token ---

pub async fn create_password_reset_token(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<String, String> {
    let token = uuid::Uuid::new_v4().to_string();
    let token_hash = hash_token(&token);
    let expires_at = chrono::Utc::now() + chrono::Duration::hours(1);

    sqlx::query("INSERT INTO password_resets (user_id, token_hash, expires_at) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(pool)
        .await
        .map_err(|e| format!("Failed to create reset token: {}", e))?;

    Ok(token)
}

/// Consume a reset token, returning the user it belongs to. Single-use:
/// the row is marked used in the same statement that validates it.
pub async fn consume_password_reset_token(
    pool: &Pool<Postgres>,
    token: &str,
) -> Result<i64, String> {
    let token_hash = hash_token(token);

    let user_id: Option<i64> = sqlx::query_scalar(
        r#"UPDATE password_resets
           SET used_at = NOW()
           WHERE token_hash = $1 AND expires_at > NOW() AND used_at IS NULL
           RETURNING user_id"#,
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await
    .map_err(|e| format!("Database error: {}", e))?;

    user_id.ok_or_else(|| "Invalid or expired reset token".to_string())
}

// --- Webhook verification ---

pub fn verify_webhook_signature(
    signing_key: &str,
    timestamp: &str,
    token: &str,
    signature: &str,
) -> bool {
    use hmac::{Hmac, Mac};
    type HmacSha256 = Hmac<sha2::Sha256>;

    let Ok(mut mac) = HmacSha256::new_from_slice(signing_key.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(token.as_bytes());

    let expected = hex::encode(mac.finalize().into_bytes());
    expected == signature.to_lowercase()
}

// --- Templates ---

pub mod templates {
    pub fn welcome_html(display_name: &str, app_name: &str) -> String {
        format!(
            r#"<h2>Welcome to {app_name}, {display_name}!</h2>
<p>Your account has been created and is awaiting approval by your dealership.
You'll receive another email as soon as it's ready.</p>"#
        )
    }

    pub fn account_approved_html(display_name: &str, app_name: &str, base_url: &str) -> String {
        format!(
            r#"<h2>You're all set, {display_name}!</h2>
<p>Your {app_name} account has been approved.</p>
<p><a href="{base_url}/login">Sign in to get started</a></p>"#
        )
    }

    pub fn password_reset_html(token: &str, base_url: &str) -> String {
        format!(
            r#"<h2>Reset your password</h2>
<p>Click the link below to choose a new password. This link expires in one hour.</p>
<p><a href="{base_url}/reset-password?token={token}">Reset password</a></p>
<p>If you didn't request this, you can safely ignore this email.</p>"#
        )
    }

    pub fn delivery_status_html(home_description: &str, status: &str, base_url: &str) -> String {
        let status_text = status.replace('_', " ");
        format!(
            r#"<h2>Delivery update</h2>
<p>Your home <strong>{home_description}</strong> is now <strong>{status_text}</strong>.</p>
<p><a href="{base_url}/deliveries">View details</a></p>"#
        )
    }

    pub fn estimate_html(home_description: &str, quoted_price: f64, base_url: &str) -> String {
        format!(
            r#"<h2>Your estimate is ready</h2>
<p>We've priced <strong>{home_description}</strong> at <strong>${quoted_price:.2}</strong>.</p>
<p><a href="{base_url}/estimates">Review your estimate</a></p>"#
        )
    }

    pub fn tracking_link_html(home_description: &str, token: &str, base_url: &str) -> String {
        format!(
            r#"<h2>Track your delivery</h2>
<p>Follow your home <strong>{home_description}</strong> on its way to you:</p>
<p><a href="{base_url}/track/{token}">Live tracking</a></p>"#
        )
    }
}
