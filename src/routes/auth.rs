/// Authentication Routes
///
/// Registration, login, refresh-token rotation and logout.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{
    find_refresh_token_hash, revoke_refresh_token, rotate_refresh_token, save_refresh_token,
    validate_refresh_token, verify_credentials, IssuedTokens, PasswordVerifier, TokenIssuer, ACCESS_TOKEN_TTL_SECS,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, ErrorContext, LedgerError};
use crate::middleware::{AuthenticatedUser, ACCESS_TOKEN_COOKIE};
use crate::users::{generate_referral_code, get_user, insert_user, NewUser};
use crate::validators::{is_valid_email, is_valid_name, is_valid_referral_code};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    /// Chosen referral code; one is generated when absent
    pub referral_code: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: i32,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub user_id: i32,
    pub refresh_token: String,
}

/// Token pair handed to the client
#[derive(Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(message: &str, tokens: IssuedTokens) -> Self {
        Self {
            message: message.to_string(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_TTL_SECS,
        }
    }
}

fn access_token_cookie(access_token: &str) -> Cookie<'static> {
    Cookie::build(ACCESS_TOKEN_COOKIE, access_token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Strict)
        .max_age(Duration::seconds(ACCESS_TOKEN_TTL_SECS))
        .finish()
}

fn session_response(message: &str, tokens: IssuedTokens) -> HttpResponse {
    let cookie = access_token_cookie(&tokens.access_token);

    HttpResponse::Ok()
        .cookie(cookie)
        .json(AuthResponse::new(message, tokens))
}

/// Issue a token pair for `user_id`, persist the refresh-token hash and
/// build the response carrying the cookie.
async fn issue_session(
    pool: &PgPool,
    issuer: &TokenIssuer,
    jwt_config: &JwtSettings,
    user_id: i32,
    message: &str,
) -> Result<HttpResponse, AppError> {
    let tokens = issuer.issue(user_id, &jwt_config.secret)?;

    save_refresh_token(
        pool,
        user_id,
        &tokens.hashed_refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    Ok(session_response(message, tokens))
}

/// POST /auth/register
///
/// Creates an account with a zero balance and returns its id.
///
/// # Errors
/// - 400: invalid e-mail, name, referral code or a password under 8 chars
/// - 409: e-mail or referral code already taken
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    verifier: web::Data<PasswordVerifier>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let email = is_valid_email(&form.email)?;
    let first_name = is_valid_name("first_name", &form.first_name)?;
    let last_name = is_valid_name("last_name", &form.last_name)?;
    let referral_code = match form.referral_code.as_deref() {
        Some(code) => is_valid_referral_code(code)?,
        None => generate_referral_code(),
    };
    let password_hash = verifier.hash(&form.password)?;

    let new_user = NewUser {
        email,
        first_name,
        last_name,
        password_hash,
        referral_code,
    };

    let id = insert_user(pool.get_ref(), &new_user)
        .await
        .map_err(|e| context.log_error(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(RegisterResponse { id }))
}

/// POST /auth/login
///
/// On success sets the `accessToken` cookie and returns both tokens. Only
/// the refresh token's hash is stored.
///
/// # Errors
/// - 401: unknown e-mail or wrong password (same response for both)
/// - 403: account is inactive
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    verifier: web::Data<PasswordVerifier>,
    issuer: web::Data<TokenIssuer>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email = is_valid_email(&form.email)?;
    let user = verify_credentials(pool.get_ref(), verifier.get_ref(), &email, &form.password).await?;

    let response = issue_session(
        pool.get_ref(),
        issuer.get_ref(),
        jwt_config.get_ref(),
        user.id,
        "Login successful",
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "User logged in successfully"
    );

    Ok(response)
}

/// POST /auth/refresh
///
/// Exchanges a refresh token for a new pair. The stored hash is swapped
/// only while it still matches the one just verified, so a refresh token
/// works once even under concurrent use.
///
/// # Errors
/// - 401: no live refresh token for the user, or it does not match
/// - 403: account is inactive
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    issuer: web::Data<TokenIssuer>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh").with_user_id(form.user_id);

    let stored_hash = find_refresh_token_hash(pool.get_ref(), form.user_id)
        .await?
        .ok_or_else(|| context.log_error(AppError::Auth(AuthError::InvalidRefreshToken)))?;

    validate_refresh_token(&stored_hash, &form.refresh_token)
        .map_err(|e| context.log_error(e))?;

    let user = match get_user(pool.get_ref(), form.user_id).await {
        Err(AppError::Ledger(LedgerError::UserNotFound)) => {
            return Err(AppError::Auth(AuthError::InvalidRefreshToken))
        }
        other => other?,
    };
    if !user.active {
        return Err(AppError::Auth(AuthError::AccountInactive));
    }

    let tokens = issuer.issue(user.id, &jwt_config.secret)?;
    let rotated = rotate_refresh_token(
        pool.get_ref(),
        user.id,
        &stored_hash,
        &tokens.hashed_refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;
    if !rotated {
        return Err(context.log_error(AppError::Auth(AuthError::InvalidRefreshToken)));
    }

    tracing::info!(
        request_id = %context.request_id,
        user_id = user.id,
        "Token refreshed successfully"
    );

    Ok(session_response("Token refreshed", tokens))
}

/// POST /auth/logout
///
/// Drops the caller's stored refresh token and expires the cookie.
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = user.id();

    revoke_refresh_token(pool.get_ref(), user_id).await?;

    let mut cookie = access_token_cookie("");
    cookie.make_removal();

    tracing::info!(user_id = user_id, "User logged out");

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(serde_json::json!({ "message": "Logged out" })))
}
