use axum::{extract::FromRequestParts, http::request::Parts};
use homestead_types::{AppError, UserRole};

use super::jwt::Claims;

/// Extractor that requires authentication. Returns 401 if no valid token.
#[derive(Debug)]
pub struct AuthRequired(pub Claims);

impl<S: Send + Sync> FromRequestParts<S> for AuthRequired {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthRequired)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

/// Extractor that optionally extracts auth claims. Never fails.
#[derive(Debug)]
pub struct MaybeAuth(pub Option<Claims>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeAuth(parts.extensions.get::<Claims>().cloned()))
    }
}

/// Extractor that requires authentication AND a specific role.
/// Returns 401 if unauthenticated, 403 if the user's role does not satisfy
/// the required role.
///
/// Role constants (match `UserRole` variants):
/// - 0 = Customer  (any authenticated user)
/// - 1 = Driver
/// - 2 = Admin
/// - 3 = SuperAdmin
#[derive(Debug)]
pub struct RoleRequired<const ROLE: u8>(pub Claims);

impl<const ROLE: u8, S: Send + Sync> FromRequestParts<S> for RoleRequired<ROLE> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))?;

        let user_role = UserRole::from_str_or_default(&claims.role);
        let required_role = match ROLE {
            1 => UserRole::Driver,
            2 => UserRole::Admin,
            3 => UserRole::SuperAdmin,
            _ => UserRole::Customer,
        };

        if !user_role.satisfies(&required_role) {
            return Err(AppError::forbidden(format!(
                "{} role or higher required",
                required_role.as_str()
            )));
        }

        Ok(RoleRequired(claims))
    }
}

/// Convenience aliases used by handlers.
pub type DriverRequired = RoleRequired<1>;
pub type AdminRequired = RoleRequired<2>;
pub type SuperAdminRequired = RoleRequired<3>;
