//! Access guard: one middleware, one declarative table.
//!
//! Protected path prefixes map to the roles allowed through. The guard
//! resolves the principal from the signed cookie (`access_token` for
//! users, `manager_access_token` for manager paths), re-checks that the
//! identity still exists in the store, and attaches it to the request.
//! Handlers pull it back out with [`CurrentUser`] / [`CurrentManager`];
//! if the guard never ran for a route that needs one, that surfaces as a
//! 500 `internal_misconfiguration`, not a silent pass.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

use crate::api::auth::{decode_token, ACCESS_COOKIE, MANAGER_COOKIE};
use crate::api::error::ApiError;
use crate::store::{Manager, Role, User};
use crate::AppState;

/// Path prefix -> roles allowed through. First match wins; unlisted
/// paths are public.
const PROTECTED_PREFIXES: &[(&str, &[Role])] = &[
    ("/auth/me", &[Role::Customer, Role::Driver]),
    ("/users", &[Role::Customer, Role::Driver]),
    ("/customers", &[Role::Customer]),
    ("/drivers", &[Role::Driver]),
    ("/orders", &[Role::Customer]),
    ("/reviews", &[Role::Customer]),
];

/// Manager paths that must stay reachable without a token.
const MANAGER_PUBLIC: &[&str] = &["/manager/login", "/manager/logout"];

fn required_roles(path: &str) -> Option<&'static [Role]> {
    PROTECTED_PREFIXES
        .iter()
        .find(|(prefix, _)| path.starts_with(prefix))
        .map(|(_, roles)| *roles)
}

/// The single authorization middleware, layered over the whole router.
pub async fn access_guard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let path = request.uri().path().to_string();

    if path.starts_with("/manager/") || path == "/manager" {
        if MANAGER_PUBLIC.contains(&path.as_str()) {
            return Ok(next.run(request).await);
        }
        let manager = resolve_manager(&state, &jar)?;
        request.extensions_mut().insert(manager);
        return Ok(next.run(request).await);
    }

    let Some(roles) = required_roles(&path) else {
        return Ok(next.run(request).await);
    };

    let user = resolve_user(&state, &jar)?;
    if !roles.contains(&user.role) {
        return Err(ApiError::forbidden("Insufficient permissions"));
    }
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn resolve_user(state: &AppState, jar: &CookieJar) -> Result<User, ApiError> {
    let token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

    let user_id = decode_token(&state.config.auth.jwt_secret, &token)
        .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

    state
        .store
        .read(|db| db.users.iter().find(|u| u.id == user_id).cloned())
        .ok_or_else(|| ApiError::unauthenticated("User no longer exists"))
}

fn resolve_manager(state: &AppState, jar: &CookieJar) -> Result<Manager, ApiError> {
    let token = jar
        .get(MANAGER_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

    let manager_id = decode_token(&state.config.auth.jwt_secret, &token)
        .ok_or_else(|| ApiError::unauthenticated("Not authenticated"))?;

    state
        .store
        .read(|db| db.managers.iter().find(|m| m.id == manager_id).cloned())
        .ok_or_else(|| ApiError::unauthenticated("Manager no longer exists"))
}

/// Extractor for the end-user principal the guard attached.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                ApiError::misconfiguration(
                    "Access guard did not attach a user principal; check the middleware order",
                )
            })
    }
}

/// Extractor for the manager principal the guard attached.
pub struct CurrentManager(pub Manager);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentManager {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Manager>()
            .cloned()
            .map(CurrentManager)
            .ok_or_else(|| {
                ApiError::misconfiguration(
                    "Access guard did not attach a manager principal; check the middleware order",
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_table_routes_roles() {
        assert_eq!(required_roles("/auth/me"), Some(&[Role::Customer, Role::Driver][..]));
        assert_eq!(required_roles("/customers/orders/current"), Some(&[Role::Customer][..]));
        assert_eq!(required_roles("/drivers/orders/available"), Some(&[Role::Driver][..]));
        assert_eq!(required_roles("/users/42"), Some(&[Role::Customer, Role::Driver][..]));
        assert_eq!(required_roles("/orders"), Some(&[Role::Customer][..]));
    }

    #[test]
    fn public_paths_have_no_required_roles() {
        assert_eq!(required_roles("/auth/login"), None);
        assert_eq!(required_roles("/auth/register/customer"), None);
        assert_eq!(required_roles("/auth/driver-applications"), None);
        assert_eq!(required_roles("/health"), None);
    }
}
