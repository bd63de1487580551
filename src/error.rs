/// Application Error Handling
///
/// Small domain enums folded into one `AppError`:
/// - `ValidationError`: bad input shape, reported back in detail (400)
/// - `LedgerError`: missing accounts/codes (generic 404) and rejected
///   redemptions (400/409)
/// - `AuthError`: credential and token failures, reported uniformly (401/403)
/// - `DatabaseError`, `Transient`: storage and random-source failures;
///   timeouts and pool exhaustion are retry-eligible (503)
/// - `ConfigError`, `Internal`: never detailed to the client (500)

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// SQLSTATE for `unique_violation`.
const PG_UNIQUE_VIOLATION: &str = "23505";
const PG_SERIALIZATION_FAILURE: &str = "40001";
const PG_DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    SuspiciousContent(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} must not be empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} must be at least {} characters", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} must be at most {} characters", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} is not valid", field),
            ValidationError::SuspiciousContent(field) => {
                write!(f, "{} contains characters that are not allowed", field)
            }
        }
    }
}

impl StdError for ValidationError {}

/// Points ledger and referral errors
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerError {
    UserNotFound,
    ReferrerNotFound,
    SelfRedemption,
    AlreadyRedeemed,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::UserNotFound => write!(f, "User does not exist"),
            LedgerError::ReferrerNotFound => write!(f, "Referral code does not exist"),
            LedgerError::SelfRedemption => write!(f, "Cannot redeem your own referral code"),
            LedgerError::AlreadyRedeemed => write!(f, "Referral code already redeemed"),
        }
    }
}

impl StdError for LedgerError {}

#[derive(Debug)]
pub enum DatabaseError {
    UniqueConstraintViolation(String),
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    /// Deadlock or serialization failure; the transaction was rolled back
    Contention(String),
    Timeout,
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::UniqueConstraintViolation(what) => write!(f, "{} already exists", what),
            DatabaseError::NotFound(what) => write!(f, "{} not found", what),
            DatabaseError::QueryExecution(msg) => write!(f, "Query failed: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database unavailable: {}", msg),
            DatabaseError::Contention(msg) => write!(f, "Transaction aborted by contention: {}", msg),
            DatabaseError::Timeout => write!(f, "Database call timed out"),
            DatabaseError::UnexpectedError(msg) => write!(f, "Unexpected database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(key) => write!(f, "{} is not configured", key),
            ConfigError::InvalidValue(msg) => write!(f, "Bad configuration value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// Authentication errors
///
/// `TokenInvalid` and `TokenExpired` render the same HTTP body; the split
/// only exists for logs and callers that need to tell them apart.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    MissingToken,
    InvalidRefreshToken,
    AccountInactive,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            AuthError::InvalidCredentials => "Invalid credentials",
            AuthError::TokenExpired => "Access token expired",
            AuthError::TokenInvalid => "Access token rejected",
            AuthError::MissingToken => "No access token presented",
            AuthError::InvalidRefreshToken => "Invalid refresh token",
            AuthError::AccountInactive => "Account is inactive",
        };
        f.write_str(msg)
    }
}

impl StdError for AuthError {}

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Ledger(LedgerError),
    Database(DatabaseError),
    Auth(AuthError),
    Config(ConfigError),
    /// Retry-eligible failure outside the database (e.g. the OS random source)
    Transient(String),
    Internal(String),
}

impl AppError {
    /// Whether the caller may safely retry the operation.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Transient(_)
                | AppError::Database(DatabaseError::Timeout)
                | AppError::Database(DatabaseError::ConnectionPool(_))
                | AppError::Database(DatabaseError::Contention(_))
        )
    }

    /// Status, machine-readable code and client-facing message.
    fn http_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            // Not-found responses never say which party was missing
            AppError::Ledger(LedgerError::UserNotFound | LedgerError::ReferrerNotFound)
            | AppError::Database(DatabaseError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string())
            }
            AppError::Ledger(e @ LedgerError::SelfRedemption) => {
                (StatusCode::BAD_REQUEST, "SELF_REDEMPTION", e.to_string())
            }
            AppError::Ledger(e @ LedgerError::AlreadyRedeemed) => {
                (StatusCode::CONFLICT, "ALREADY_REDEEMED", e.to_string())
            }

            AppError::Database(e @ DatabaseError::UniqueConstraintViolation(_)) => {
                (StatusCode::CONFLICT, "DUPLICATE_ENTRY", e.to_string())
            }
            AppError::Database(
                DatabaseError::ConnectionPool(_) | DatabaseError::Contention(_) | DatabaseError::Timeout,
            )
            | AppError::Transient(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable, retry later".to_string(),
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error occurred".to_string(),
            ),

            AppError::Auth(AuthError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            AppError::Auth(AuthError::TokenExpired | AuthError::TokenInvalid) => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired token".to_string(),
            ),
            AppError::Auth(e @ AuthError::MissingToken) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string())
            }
            AppError::Auth(e @ AuthError::InvalidRefreshToken) => {
                (StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN", e.to_string())
            }
            AppError::Auth(e @ AuthError::AccountInactive) => {
                (StatusCode::FORBIDDEN, "ACCOUNT_INACTIVE", e.to_string())
            }

            AppError::Config(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => fmt::Display::fmt(e, f),
            AppError::Ledger(e) => fmt::Display::fmt(e, f),
            AppError::Database(e) => fmt::Display::fmt(e, f),
            AppError::Auth(e) => fmt::Display::fmt(e, f),
            AppError::Config(e) => fmt::Display::fmt(e, f),
            AppError::Transient(msg) => write!(f, "Temporarily unavailable: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record".to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DatabaseError::ConnectionPool(err.to_string()),
            sqlx::Error::Database(db_err) => {
                classify_sqlstate(db_err.code().as_deref(), db_err.message())
            }
            _ => DatabaseError::UnexpectedError(err.to_string()),
        };
        AppError::Database(classified)
    }
}

/// Map a Postgres SQLSTATE onto the database error taxonomy.
fn classify_sqlstate(code: Option<&str>, message: &str) -> DatabaseError {
    match code {
        Some(PG_UNIQUE_VIOLATION) => {
            DatabaseError::UniqueConstraintViolation("Email or referral code".to_string())
        }
        Some(PG_DEADLOCK_DETECTED | PG_SERIALIZATION_FAILURE) => {
            DatabaseError::Contention(message.to_string())
        }
        _ => DatabaseError::QueryExecution(message.to_string()),
    }
}

/// JSON body of every error response
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Correlates the response with the server-side log line
    pub error_id: String,
    pub message: String,
    pub code: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: &str, status: StatusCode, code: &str, message: String) -> Self {
        Self {
            error_id: error_id.to_string(),
            message,
            code: code.to_string(),
            status: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Rendering and logging of errors under a request id
pub trait ErrorHandler {
    fn render(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_with(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn render(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, message) = self.http_parts();
        (status, ErrorResponse::new(request_id, status, code, message))
    }

    fn log_with(&self, request_id: &str) {
        match self {
            AppError::Validation(_) | AppError::Ledger(_) | AppError::Auth(_) => {
                tracing::warn!(request_id = request_id, error = %self, "Request rejected");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Duplicate entry attempt");
            }
            _ if self.is_transient() => {
                tracing::error!(request_id = request_id, error = %self, retryable = true, "Transient failure");
            }
            _ => {
                tracing::error!(request_id = request_id, error = %self, "Request failed");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_with(&request_id);

        let (status, body) = self.render(&request_id);
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.http_parts().0
    }
}

/// Per-operation context attached to handler-level error logs
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<i32>,
    pub operation: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn with_user_id(mut self, user_id: i32) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Log a failed operation with this context and hand the error back.
    pub fn log_error(&self, error: AppError) -> AppError {
        let elapsed_ms = (chrono::Utc::now() - self.timestamp).num_milliseconds();

        match &error {
            AppError::Validation(_) | AppError::Ledger(_) | AppError::Auth(_) => {
                tracing::warn!(
                    request_id = %self.request_id,
                    operation = %self.operation,
                    user_id = ?self.user_id,
                    elapsed_ms = elapsed_ms,
                    error = %error,
                    "Operation rejected"
                );
            }
            _ => {
                tracing::error!(
                    request_id = %self.request_id,
                    operation = %self.operation,
                    user_id = ?self.user_id,
                    elapsed_ms = elapsed_ms,
                    error = %error,
                    "Operation failed"
                );
            }
        }

        error
    }
}
