use axum::Router;
use homestead_types::{
    // Auth and session types
    AddSessionRequest, AppError, AppErrorKind, AuthResponse, AuthUser, ForgotPasswordRequest,
    LoginRequest, RegisterRequest, ResetPasswordRequest, SessionRegistryView, SessionView,
    SwitchSessionRequest, SwitchSessionResponse,
    // User types
    BulkApproveRequest, BulkApproveResponse, UpdateProfileRequest, UserProfile, UserRole,
    // Pricing types
    CustomerMarkup, PricingTier, QuoteLine, QuoteRequest, QuoteResponse, UpsertMarkupRequest,
    // Delivery types
    AssignDriverRequest, AttachPhotoRequest, CreateDeliveryRequest, Delivery, DeliveryAssignment,
    DeliveryPhoto, DeliveryStatus, GpsBatchRequest, GpsBatchResponse, GpsPing, GpsPingRequest,
    TrackingLinkResponse, TrackingPosition, TrackingView, UpdateDeliveryRequest,
    UpdateDeliveryStatusRequest,
    // Estimate types
    CreateEstimateRequest, Estimate, UpdateEstimateRequest,
    // FAQ types
    CreateFaqRequest, Faq, UpdateFaqRequest,
    // Chat types
    ChatMessage, Conversation, SendMessageRequest, StartConversationRequest, UnreadCount,
    // Analytics types
    AnalyticsEvent, AnalyticsSummary, EventCount, TrackEventRequest,
    // Settings types
    NotificationSettings, SendPhoneCodeRequest, UpdateNotificationSettingsRequest,
    VerifyPhoneRequest,
    // Common types
    Dealer, DealerStats, InitDealerRequest, PaginatedResponse, PaginationMeta,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::db::AppState;
use crate::health;
use crate::rest;
use crate::rest::photo::{PhotoUploadRequest, PhotoView, UploadUrlResponse};
use crate::rest::webhooks::{MailgunEventData, MailgunSignature, MailgunWebhookPayload};

/// OpenAPI documentation for the API.
#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth
        rest::auth::register,
        rest::auth::login,
        rest::auth::logout,
        rest::auth::me,
        rest::auth::forgot_password,
        rest::auth::reset_password,
        // Session registry
        rest::sessions::list_sessions,
        rest::sessions::add_session,
        rest::sessions::switch_session,
        rest::sessions::remove_session,
        rest::sessions::clear_sessions,
        // Users
        rest::users::list_users,
        rest::users::get_user,
        rest::users::update_user,
        rest::users::approve_users,
        rest::users::delete_user,
        // Markup and pricing
        rest::markup::upsert_markup,
        rest::markup::list_markups,
        rest::markup::delete_markup,
        rest::pricing::quote,
        // Deliveries
        rest::delivery::create_delivery,
        rest::delivery::list_deliveries,
        rest::delivery::get_delivery,
        rest::delivery::update_delivery,
        rest::delivery::update_delivery_status,
        rest::delivery::delete_delivery,
        // Driver assignment
        rest::assignment::assign_driver,
        rest::assignment::get_assignment,
        rest::assignment::unassign_driver,
        // Delivery photos
        rest::photo::create_upload_url,
        rest::photo::attach_photo,
        rest::photo::list_photos,
        rest::photo::delete_photo,
        // GPS
        rest::gps::submit_gps_batch,
        rest::gps::get_trail,
        // Tracking links
        rest::tracking::issue_tracking_link,
        rest::tracking::track_delivery,
        // Estimates
        rest::estimate::create_estimate,
        rest::estimate::list_estimates,
        rest::estimate::get_estimate,
        rest::estimate::update_estimate,
        rest::estimate::delete_estimate,
        // FAQs
        rest::faq::create_faq,
        rest::faq::list_faqs,
        rest::faq::update_faq,
        rest::faq::delete_faq,
        // Chat
        rest::chat::start_conversation,
        rest::chat::list_conversations,
        rest::chat::send_message,
        rest::chat::list_messages,
        rest::chat::mark_read,
        rest::chat::unread_counts,
        // Analytics
        rest::analytics::track_event,
        rest::analytics::summary,
        // Notification settings and phone verification
        rest::settings::get_settings,
        rest::settings::update_settings,
        rest::settings::send_phone_code,
        rest::settings::verify_phone_code,
        // Provider webhooks
        rest::webhooks::mailgun_webhook,
        // Tenant administration
        rest::admin::init_dealer,
        rest::admin::dealer_stats,
        health::health_check,
    ),
    components(schemas(
        // Auth and session schemas
        AppError, AppErrorKind, AuthUser, AuthResponse, UserRole,
        LoginRequest, RegisterRequest, ForgotPasswordRequest, ResetPasswordRequest,
        SessionView, SessionRegistryView, AddSessionRequest,
        SwitchSessionRequest, SwitchSessionResponse,
        // User schemas
        UserProfile, UpdateProfileRequest, BulkApproveRequest, BulkApproveResponse,
        PaginatedResponse<UserProfile>,
        // Pricing schemas
        CustomerMarkup, UpsertMarkupRequest, PricingTier,
        QuoteRequest, QuoteLine, QuoteResponse,
        // Delivery schemas
        Delivery, DeliveryStatus, CreateDeliveryRequest, UpdateDeliveryRequest,
        UpdateDeliveryStatusRequest, PaginatedResponse<Delivery>,
        DeliveryAssignment, AssignDriverRequest,
        DeliveryPhoto, AttachPhotoRequest, PhotoView,
        PhotoUploadRequest, UploadUrlResponse,
        GpsPing, GpsPingRequest, GpsBatchRequest, GpsBatchResponse,
        TrackingLinkResponse, TrackingView, TrackingPosition,
        // Estimate schemas
        Estimate, CreateEstimateRequest, UpdateEstimateRequest,
        PaginatedResponse<Estimate>,
        // FAQ schemas
        Faq, CreateFaqRequest, UpdateFaqRequest,
        // Chat schemas
        Conversation, ChatMessage, StartConversationRequest, SendMessageRequest, UnreadCount,
        // Analytics schemas
        AnalyticsEvent, TrackEventRequest, EventCount, AnalyticsSummary,
        // Settings schemas
        NotificationSettings, UpdateNotificationSettingsRequest,
        SendPhoneCodeRequest, VerifyPhoneRequest,
        // Webhook schemas
        MailgunWebhookPayload, MailgunSignature, MailgunEventData,
        // Common schemas
        Dealer, DealerStats, InitDealerRequest, PaginationMeta,
        health::HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and password reset endpoints"),
        (name = "sessions", description = "Per-device multi-session registry"),
        (name = "users", description = "User profile management endpoints"),
        (name = "markups", description = "Tiered markup configuration endpoints"),
        (name = "pricing", description = "Price quoting endpoints"),
        (name = "deliveries", description = "Home delivery lifecycle endpoints"),
        (name = "assignments", description = "Driver assignment endpoints"),
        (name = "photos", description = "Delivery photo endpoints"),
        (name = "gps", description = "Driver GPS ingestion and trail endpoints"),
        (name = "tracking", description = "Customer-facing delivery tracking links"),
        (name = "estimates", description = "Sales estimate endpoints"),
        (name = "faqs", description = "Dealership FAQ endpoints"),
        (name = "chat", description = "Customer support chat endpoints"),
        (name = "analytics", description = "Event tracking and dashboard summary"),
        (name = "settings", description = "Notification preference and phone verification endpoints"),
        (name = "webhooks", description = "Inbound provider webhooks"),
        (name = "admin", description = "Tenant administration endpoints"),
        (name = "health", description = "Health check endpoint")
    ),
    info(
        title = "Homestead API",
        description = "Multi-tenant mobile home sales and delivery platform API",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build an Axum router that serves the API docs at `/docs`
/// and the REST API at `/api/*`.
pub fn api_router(state: AppState) -> Router {
    let rate_limit = crate::rate_limit::RateLimitState::new(
        std::env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(300),
        std::time::Duration::from_secs(60),
    );

    Router::new()
        .merge(rest::api_router_with_rate_limit(rate_limit))
        .route("/health", axum::routing::get(health::health_check))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::middleware::auth_middleware,
        ))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
