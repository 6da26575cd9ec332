use homestead_types::{AppError, ChatMessage, Conversation, UnreadCount};
use sqlx::{Pool, Postgres};

use crate::error_convert::SqlxErrorExt;

const CONVERSATION_COLUMNS: &str =
    "id, dealer_id, customer_id, subject, last_message_at, created_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, body, read, created_at";

pub async fn start_conversation(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    customer_id: i64,
    subject: Option<&str>,
) -> Result<Conversation, AppError> {
    let sql = format!(
        "INSERT INTO conversations (dealer_id, customer_id, subject) \
         VALUES ($1, $2, $3) RETURNING {CONVERSATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, Conversation>(&sql)
        .bind(dealer_id)
        .bind(customer_id)
        .bind(subject)
        .fetch_one(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

pub async fn find_conversation(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    id: i64,
) -> Result<Option<Conversation>, AppError> {
    let sql =
        format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1 AND dealer_id = $2");
    let row = sqlx::query_as::<_, Conversation>(&sql)
        .bind(id)
        .bind(dealer_id)
        .fetch_optional(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(row)
}

/// Conversations for a dealership, most recently active first. Customers
/// see only their own; staff pass `customer_id = None` for all.
pub async fn list_conversations(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    customer_id: Option<i64>,
) -> Result<Vec<Conversation>, AppError> {
    let sql = format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations \
         WHERE dealer_id = $1 AND ($2::bigint IS NULL OR customer_id = $2) \
         ORDER BY last_message_at DESC NULLS LAST, created_at DESC"
    );
    let rows = sqlx::query_as::<_, Conversation>(&sql)
        .bind(dealer_id)
        .bind(customer_id)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

/// Post a message and bump the conversation's last_message_at.
pub async fn send_message(
    pool: &Pool<Postgres>,
    conversation_id: i64,
    sender_id: i64,
    body: &str,
) -> Result<ChatMessage, AppError> {
    let mut tx = pool.begin().await.map_err(SqlxErrorExt::into_app_error)?;

    let sql = format!(
        "INSERT INTO chat_messages (conversation_id, sender_id, body) \
         VALUES ($1, $2, $3) RETURNING {MESSAGE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(conversation_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    sqlx::query("UPDATE conversations SET last_message_at = now() WHERE id = $1")
        .bind(conversation_id)
        .execute(&mut *tx)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    tx.commit().await.map_err(SqlxErrorExt::into_app_error)?;
    Ok(row)
}

pub async fn list_messages(
    pool: &Pool<Postgres>,
    conversation_id: i64,
) -> Result<Vec<ChatMessage>, AppError> {
    let sql = format!(
        "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE conversation_id = $1 ORDER BY created_at"
    );
    let rows = sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(conversation_id)
        .fetch_all(pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}

/// Mark every message not sent by `reader_id` as read.
pub async fn mark_read(
    pool: &Pool<Postgres>,
    conversation_id: i64,
    reader_id: i64,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE chat_messages SET read = true \
         WHERE conversation_id = $1 AND sender_id <> $2 AND read = false",
    )
    .bind(conversation_id)
    .bind(reader_id)
    .execute(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(result.rows_affected())
}

/// Unread counts per conversation for one reader.
pub async fn unread_counts(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    reader_id: i64,
) -> Result<Vec<UnreadCount>, AppError> {
    let rows = sqlx::query_as::<_, UnreadCount>(
        r#"
        SELECT m.conversation_id, COUNT(*) AS unread
        FROM chat_messages m
        JOIN conversations c ON c.id = m.conversation_id
        WHERE c.dealer_id = $1 AND m.sender_id <> $2 AND m.read = false
        GROUP BY m.conversation_id
        "#,
    )
    .bind(dealer_id)
    .bind(reader_id)
    .fetch_all(pool)
    .await
    .map_err(SqlxErrorExt::into_app_error)?;

    Ok(rows)
}
