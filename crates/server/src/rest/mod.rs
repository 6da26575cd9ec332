pub mod admin;
pub mod analytics;
pub mod assignment;
pub mod auth;
pub mod chat;
pub mod delivery;
pub mod estimate;
pub mod faq;
pub mod gps;
pub mod markup;
pub mod photo;
pub mod pricing;
pub mod sessions;
pub mod settings;
pub mod tracking;
pub mod users;
pub mod webhooks;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::db::AppState;

/// Build the REST API router for the dealership platform.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        // Session registry
        .route(
            "/api/sessions",
            get(sessions::list_sessions)
                .post(sessions::add_session)
                .delete(sessions::clear_sessions),
        )
        .route("/api/sessions/switch", post(sessions::switch_session))
        .route("/api/sessions/{user_id}", delete(sessions::remove_session))
        // Users
        .route("/api/users", get(users::list_users))
        .route("/api/users/approve", post(users::approve_users))
        .route(
            "/api/users/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Markup configuration and pricing
        .route("/api/markups", get(markup::list_markups).post(markup::upsert_markup))
        .route("/api/markups/{user_id}", delete(markup::delete_markup))
        .route("/api/pricing/quote", post(pricing::quote))
        // Deliveries
        .route(
            "/api/deliveries",
            get(delivery::list_deliveries).post(delivery::create_delivery),
        )
        .route(
            "/api/deliveries/{id}",
            get(delivery::get_delivery)
                .put(delivery::update_delivery)
                .delete(delivery::delete_delivery),
        )
        .route("/api/deliveries/{id}/status", patch(delivery::update_delivery_status))
        // Driver assignment
        .route(
            "/api/deliveries/{id}/assignment",
            get(assignment::get_assignment)
                .post(assignment::assign_driver)
                .delete(assignment::unassign_driver),
        )
        // Delivery photos
        .route(
            "/api/deliveries/{id}/photos",
            get(photo::list_photos).post(photo::attach_photo),
        )
        .route(
            "/api/deliveries/{id}/photos/upload-url",
            post(photo::create_upload_url),
        )
        .route("/api/deliveries/{id}/photos/{photo_id}", delete(photo::delete_photo))
        // GPS
        .route(
            "/api/deliveries/{id}/gps",
            get(gps::get_trail).post(gps::submit_gps_batch),
        )
        // Tracking links (issue is staff-only; track is public)
        .route("/api/deliveries/{id}/tracking-link", post(tracking::issue_tracking_link))
        .route("/api/track/{token}", get(tracking::track_delivery))
        // Estimates
        .route(
            "/api/estimates",
            get(estimate::list_estimates).post(estimate::create_estimate),
        )
        .route(
            "/api/estimates/{id}",
            get(estimate::get_estimate)
                .put(estimate::update_estimate)
                .delete(estimate::delete_estimate),
        )
        // FAQs
        .route("/api/faqs", get(faq::list_faqs).post(faq::create_faq))
        .route("/api/faqs/{id}", put(faq::update_faq).delete(faq::delete_faq))
        // Chat
        .route(
            "/api/conversations",
            get(chat::list_conversations).post(chat::start_conversation),
        )
        .route("/api/conversations/unread", get(chat::unread_counts))
        .route(
            "/api/conversations/{id}/messages",
            get(chat::list_messages).post(chat::send_message),
        )
        .route("/api/conversations/{id}/read", post(chat::mark_read))
        // Analytics
        .route("/api/analytics/events", post(analytics::track_event))
        .route("/api/analytics/summary", get(analytics::summary))
        // Notification settings and phone verification
        .route(
            "/api/settings/notifications",
            get(settings::get_settings).put(settings::update_settings),
        )
        .route("/api/settings/phone", post(settings::send_phone_code))
        .route("/api/settings/phone/verify", post(settings::verify_phone_code))
        // Provider webhooks (signature-authenticated, no session)
        .route("/api/webhooks/mailgun", post(webhooks::mailgun_webhook))
        // Tenant administration
        .route("/api/admin/dealers", post(admin::init_dealer))
        .route("/api/admin/dealers/stats", get(admin::dealer_stats))
}

/// Build the REST API router with rate limiting applied.
pub fn api_router_with_rate_limit(
    rate_limit: crate::rate_limit::RateLimitState,
) -> Router<AppState> {
    api_router().layer(axum::middleware::from_fn_with_state(
        rate_limit,
        crate::rate_limit::rate_limit_middleware,
    ))
}
