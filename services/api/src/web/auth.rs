//! services/api/src/web/auth.rs
//!
//! Authentication endpoints (signup, login, whoami) and the bearer-token
//! primitives shared with the auth middleware.

use crate::error::ApiError;
use crate::web::state::AppState;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use chrono::{Duration, Utc};
use gendoc_core::domain::AuthContext;
use gendoc_core::ports::PortError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

/// How long an issued token stays valid.
const TOKEN_TTL_DAYS: i64 = 7;

//=========================================================================================
// Token Primitives
//=========================================================================================

/// Claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    /// Subject - user ID (standard JWT `sub` claim).
    sub: String,
    /// User email.
    email: String,
    /// Expiry (unix timestamp).
    exp: i64,
    /// Issued at (unix timestamp).
    iat: i64,
}

/// Signs a 7-day bearer token for the given identity.
pub fn issue_token(
    user_id: Uuid,
    email: &str,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verifies a presented token and extracts the identity it carries.
/// Expired, malformed, or mis-signed tokens all fail here.
pub fn verify_token(token: &str, secret: &str) -> Result<AuthContext, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Forbidden)?;

    let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::Forbidden)?;
    Ok(AuthContext {
        user_id,
        email: data.claims.email,
    })
}

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub name: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /signup - Create a new user account
#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate inputs
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".to_string()));
    }

    // 2. Hash the password; the plaintext goes no further than this frame
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })?
        .to_string();

    // 3. Create the user; a duplicate email surfaces as Conflict
    let user = state
        .db
        .create_user(req.email.trim(), &password_hash)
        .await
        .map_err(|e| match e {
            PortError::Conflict(_) => ApiError::Conflict("Email already registered".to_string()),
            other => {
                error!("Failed to create user: {:?}", other);
                ApiError::from(other)
            }
        })?;

    // 4. Issue a bearer token
    let token = issue_token(user.user_id, &user.email, &state.config.jwt_secret).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        ApiError::Internal("Failed to sign token".to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User created".to_string(),
            token,
        }),
    ))
}

/// POST /login - Login with existing account
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validate inputs
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation("Email and password required".to_string()));
    }

    // 2. Look up the account. An unknown email and a wrong password must be
    //    indistinguishable to the caller.
    let creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::InvalidCredentials,
            other => {
                error!("Failed to get user: {:?}", other);
                ApiError::from(other)
            }
        })?;

    // 3. Verify the password against the stored hash
    let parsed_hash = PasswordHash::new(&creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    // 4. Issue a bearer token
    let token = issue_token(creds.user_id, &creds.email, &state.config.jwt_secret).map_err(|e| {
        error!("Failed to sign token: {:?}", e);
        ApiError::Internal("Failed to sign token".to_string())
    })?;

    Ok(Json(AuthResponse {
        message: "Logged in".to_string(),
        token,
    }))
}

/// GET /auth/me - Display name for the authenticated user
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "No credential supplied"),
        (status = 403, description = "Credential rejected"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(auth.user_id)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            other => {
                error!("Failed to load user: {:?}", other);
                ApiError::from(other)
            }
        })?;

    // The display name is the local part of the email.
    let name = user.email.split('@').next().unwrap_or_default().to_string();
    Ok(Json(MeResponse { name }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips_identity() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "dev@example.com", SECRET).unwrap();
        let ctx = verify_token(&token, SECRET).unwrap();
        assert_eq!(ctx.user_id, user_id);
        assert_eq!(ctx.email, "dev@example.com");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), "dev@example.com", "other-secret").unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            email: "dev@example.com".to_string(),
            exp: (now - Duration::hours(1)).timestamp(),
            iat: (now - Duration::days(8)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(matches!(
            verify_token(&token, SECRET),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            verify_token("not-a-jwt", SECRET),
            Err(ApiError::Forbidden)
        ));
    }
}
