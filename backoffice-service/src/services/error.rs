use service_core::error::AppError;
use thiserror::Error;

use crate::authz::AccessDenial;
use crate::services::token::TokenError;

/// Reason codes returned by the refresh endpoint. Each failure class gets
/// its own stable code so clients can distinguish "log in again" from a
/// retryable fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    NoToken,
    Blacklisted,
    Invalid,
    Failed,
}

impl RefreshReason {
    pub fn code(&self) -> &'static str {
        match self {
            RefreshReason::NoToken => "NO_TOKEN",
            RefreshReason::Blacklisted => "TOKEN_BLACKLISTED",
            RefreshReason::Invalid => "INVALID_TOKEN",
            RefreshReason::Failed => "REFRESH_FAILED",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Wrong token kind for this operation")]
    TokenKindMismatch,

    #[error("Access denied: {0}")]
    AccessDenied(AccessDenial),

    #[error("Refresh rejected: {}", .0.code())]
    RefreshRejected(RefreshReason),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ServiceError::TokenExpired,
            TokenError::Revoked => ServiceError::TokenRevoked,
            TokenError::WrongKind { .. } => ServiceError::TokenKindMismatch,
            TokenError::Malformed(_) => ServiceError::Unauthenticated,
            TokenError::Internal(e) => ServiceError::Internal(e),
        }
    }
}

impl From<AccessDenial> for ServiceError {
    fn from(denial: AccessDenial) -> Self {
        ServiceError::AccessDenied(denial)
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            // Authentication failures: 401, the client should re-login or refresh.
            ServiceError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("INVALID_CREDENTIALS: invalid credentials"))
            }
            ServiceError::AccountInactive => {
                AppError::AuthError(anyhow::anyhow!("ACCOUNT_INACTIVE: account is inactive"))
            }
            ServiceError::Unauthenticated => AppError::AuthError(anyhow::anyhow!(
                "UNAUTHENTICATED: missing or malformed token"
            )),
            ServiceError::TokenExpired => {
                AppError::AuthError(anyhow::anyhow!("TOKEN_EXPIRED: token expired"))
            }
            ServiceError::TokenRevoked => {
                AppError::AuthError(anyhow::anyhow!("TOKEN_REVOKED: token has been revoked"))
            }
            ServiceError::TokenKindMismatch => AppError::AuthError(anyhow::anyhow!(
                "TOKEN_KIND_MISMATCH: wrong token kind for this operation"
            )),
            ServiceError::RefreshRejected(reason) => {
                AppError::AuthError(anyhow::anyhow!("{}: refresh rejected", reason.code()))
            }
            // Authorization failures: 403, re-authenticating will not help.
            ServiceError::AccessDenied(denial) => {
                AppError::Forbidden(anyhow::anyhow!("FORBIDDEN: {}", denial.reason()))
            }
            ServiceError::NotFound(what) => AppError::NotFound(anyhow::anyhow!(what)),
            ServiceError::Conflict(what) => AppError::Conflict(anyhow::anyhow!(what)),
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
        }
    }
}
