//! End-user authentication: password hashing, token issuance and the
//! public /auth endpoints (login, customer registration, driver
//! application submission, logout, me).

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::engine::applications::{self, NewApplication};
use crate::store::{Role, User, UserResponse};
use crate::AppState;

/// Cookie carrying the end-user token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie carrying the manager token.
pub const MANAGER_COOKIE: &str = "manager_access_token";

/// Hash a password using Argon2 with a per-user salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Token claims: the identity id and an expiry, nothing else.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Sign a token for the identity `subject`, valid for 7 days.
pub fn issue_token(secret: &str, subject: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: subject.to_string(),
        exp: (Utc::now() + Duration::days(7)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "Failed to sign token");
        ApiError::internal("Failed to sign token")
    })
}

/// Decode and verify a token, returning the identity id it names.
pub fn decode_token(secret: &str, token: &str) -> Option<String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims.sub)
}

/// Build the auth cookie: HttpOnly session cookie, scoped to the whole
/// site, Lax, Secure behind TLS.
pub fn auth_cookie(name: &'static str, token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let mut v = ValidationErrorBuilder::new();
    v.require("email", &request.email);
    v.require("password", &request.password);
    v.require("role", &request.role);
    v.finish()?;

    let role = Role::from_str(&request.role)
        .map_err(|_| ApiError::validation_field("role", "Unknown role"))?;

    let user: Option<User> = state.store.read(|db| {
        db.users
            .iter()
            .find(|u| u.email == request.email && u.role == role)
            .cloned()
    });

    let user = user.ok_or_else(|| ApiError::unauthenticated("Invalid email or password"))?;
    if !verify_password(&request.password, &user.password_hash) {
        return Err(ApiError::unauthenticated("Invalid email or password"));
    }

    let token = issue_token(&state.config.auth.jwt_secret, &user.id)?;
    let jar = jar.add(auth_cookie(
        ACCESS_COOKIE,
        token,
        state.config.auth.secure_cookies,
    ));

    tracing::info!(user_id = %user.id, role = %user.role.as_str(), "User logged in");
    Ok((jar, Json(LoginResponse { user: user.into() })))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
}

/// POST /auth/register/customer
pub async fn register_customer(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    validate_registration(&request)?;

    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to hash password")
    })?;

    let user = state
        .store
        .write(|db| {
            let taken = db
                .users
                .iter()
                .any(|u| u.email == request.email && u.role == Role::Customer);
            if taken {
                return Err(ApiError::conflict("Email already taken"));
            }

            let user = User {
                id: uuid::Uuid::new_v4().to_string(),
                email: request.email.clone(),
                name: request.name.clone(),
                role: Role::Customer,
                phone: request.phone.clone(),
                password_hash: password_hash.clone(),
            };
            db.users.push(user.clone());
            Ok(user)
        })??;

    let token = issue_token(&state.config.auth.jwt_secret, &user.id)?;
    let jar = jar.add(auth_cookie(
        ACCESS_COOKIE,
        token,
        state.config.auth.secure_cookies,
    ));

    tracing::info!(user_id = %user.id, "Customer registered");
    Ok((jar, Json(LoginResponse { user: user.into() })))
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// POST /auth/driver-applications
pub async fn submit_driver_application(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<OkResponse>, ApiError> {
    validate_registration(&request)?;

    let password_hash = hash_password(&request.password).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash password");
        ApiError::internal("Failed to hash password")
    })?;

    state
        .store
        .write(|db| {
            applications::submit_application(
                db,
                NewApplication {
                    email: request.email.clone(),
                    name: request.name.clone(),
                    phone: request.phone.clone(),
                    password_hash: password_hash.clone(),
                },
            )
        })?
        .map_err(ApiError::from)?;

    Ok(Json(OkResponse { ok: true }))
}

/// POST /auth/logout
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<OkResponse>) {
    let jar = jar.remove(removal_cookie(ACCESS_COOKIE));
    (jar, Json(OkResponse { ok: true }))
}

/// GET /auth/me
pub async fn me(user: super::guard::CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user.0))
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    let mut v = ValidationErrorBuilder::new();
    v.require("email", &request.email);
    v.require("password", &request.password);
    v.require("name", &request.name);
    v.require("phone", &request.phone);
    if !request.email.trim().is_empty() && !request.email.contains('@') {
        v.add("email", "Invalid email address");
    }
    v.finish()
}
