use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reseller tier determining how many markup layers apply to a price.
///
/// - `User` — retail customer of an admin reseller; parent + own markup apply.
/// - `Admin` — dealer-level reseller under a super admin; parent + own markup apply.
/// - `SuperAdmin` — top of the hierarchy; only its own markup applies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, utoipa::ToSchema)]
pub enum PricingTier {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl PricingTier {
    /// Parse a tier string, defaulting to the base tier for unknown values.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => PricingTier::Admin,
            "super_admin" => PricingTier::SuperAdmin,
            _ => PricingTier::User,
        }
    }

    /// Lowercase string for database / JWT storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingTier::User => "user",
            PricingTier::Admin => "admin",
            PricingTier::SuperAdmin => "super_admin",
        }
    }
}

/// Application role controlling access to dealer operations.
///
/// - `Customer` — browses homes, requests estimates, tracks deliveries.
/// - `Driver` — sees assigned deliveries, posts GPS pings and photos.
/// - `Admin` — manages users, deliveries, FAQ, chat for a dealership.
/// - `SuperAdmin` — full access across the reseller hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, utoipa::ToSchema)]
pub enum UserRole {
    #[default]
    Customer,
    Driver,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Parse from a JWT `role` claim. Unknown values default to Customer.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "driver" => UserRole::Driver,
            "admin" => UserRole::Admin,
            "super_admin" => UserRole::SuperAdmin,
            _ => UserRole::Customer,
        }
    }

    /// Lowercase string for database / JWT storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Driver => "driver",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
        }
    }

    /// Returns true if this role satisfies the `required` role.
    /// SuperAdmin satisfies everything; Admin satisfies Driver + Customer;
    /// Driver satisfies itself + Customer.
    pub fn satisfies(&self, required: &UserRole) -> bool {
        match self {
            UserRole::SuperAdmin => true,
            UserRole::Admin => !matches!(required, UserRole::SuperAdmin),
            UserRole::Driver => matches!(required, UserRole::Driver | UserRole::Customer),
            UserRole::Customer => matches!(required, UserRole::Customer),
        }
    }
}

/// Account row (credentials live server-side only).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub tier: String,
    pub created_at: DateTime<Utc>,
}

/// Profile row for a user, cached by the session manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema, sqlx::FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub dealer_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    pub markup_percentage: f64,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Authenticated user info (safe to send to clients).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: String,
    pub tier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub approved: bool,
}
