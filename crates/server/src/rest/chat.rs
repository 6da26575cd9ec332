use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::{Pool, Postgres};

use homestead_types::{
    AppError, ChatMessage, Conversation, SendMessageRequest, StartConversationRequest,
    UnreadCount, UserRole,
};

use crate::auth::extractors::AuthRequired;
use crate::error_convert::ValidateRequest;
use crate::repo;
use crate::tenant::DealerId;

fn is_staff(claims: &crate::auth::jwt::Claims) -> bool {
    UserRole::from_str_or_default(&claims.role).satisfies(&UserRole::Admin)
}

/// Load a conversation and confirm the caller may see it. Customers only
/// reach their own conversations; staff reach all of the dealership's.
async fn require_participant(
    pool: &Pool<Postgres>,
    dealer_id: &str,
    conversation_id: i64,
    claims: &crate::auth::jwt::Claims,
) -> Result<Conversation, AppError> {
    let conversation = repo::chat::find_conversation(pool, dealer_id, conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Conversation {} not found", conversation_id)))?;

    if !is_staff(claims) && conversation.customer_id != claims.sub {
        return Err(AppError::not_found(format!(
            "Conversation {} not found",
            conversation_id
        )));
    }

    Ok(conversation)
}

#[utoipa::path(
    post,
    path = "/api/conversations",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    request_body = StartConversationRequest,
    responses(
        (status = 201, description = "Conversation started", body = Conversation)
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(pool, auth, payload))]
pub async fn start_conversation(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Json(payload): Json<StartConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let conversation = repo::chat::start_conversation(
        &pool,
        &dealer.0,
        auth.0.sub,
        payload.subject.as_deref(),
    )
    .await?;

    if let Some(message) = payload.message.as_deref().filter(|m| !m.is_empty()) {
        repo::chat::send_message(&pool, conversation.id, auth.0.sub, message).await?;
    }

    Ok((StatusCode::CREATED, Json(conversation)))
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    responses(
        (status = 200, description = "Conversations visible to the caller", body = Vec<Conversation>)
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn list_conversations(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let customer_filter = if is_staff(&auth.0) {
        None
    } else {
        Some(auth.0.sub)
    };
    let conversations = repo::chat::list_conversations(&pool, &dealer.0, customer_filter).await?;
    Ok(Json(conversations))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    params(
        ("id" = i64, Path, description = "Conversation ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = ChatMessage),
        (status = 404, description = "Conversation not found", body = AppError)
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    payload.validate_request()?;
    require_participant(&pool, &dealer.0, id, &auth.0).await?;

    let message = repo::chat::send_message(&pool, id, auth.0.sub, &payload.body).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}/messages",
    params(
        ("id" = i64, Path, description = "Conversation ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 200, description = "Messages, oldest first", body = Vec<ChatMessage>),
        (status = 404, description = "Conversation not found", body = AppError)
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn list_messages(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    require_participant(&pool, &dealer.0, id, &auth.0).await?;
    let messages = repo::chat::list_messages(&pool, id).await?;
    Ok(Json(messages))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/read",
    params(
        ("id" = i64, Path, description = "Conversation ID"),
        ("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")
    ),
    responses(
        (status = 204, description = "Messages marked read"),
        (status = 404, description = "Conversation not found", body = AppError)
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_participant(&pool, &dealer.0, id, &auth.0).await?;
    repo::chat::mark_read(&pool, id, auth.0.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/conversations/unread",
    params(("X-Dealer-ID" = String, Header, description = "Dealership tenant ID")),
    responses(
        (status = 200, description = "Unread counts per conversation", body = Vec<UnreadCount>)
    ),
    tag = "chat",
    security(("bearer_auth" = []))
)]
pub async fn unread_counts(
    State(pool): State<Pool<Postgres>>,
    auth: AuthRequired,
    dealer: DealerId,
) -> Result<Json<Vec<UnreadCount>>, AppError> {
    let counts = repo::chat::unread_counts(&pool, &dealer.0, auth.0.sub).await?;
    Ok(Json(counts))
}
