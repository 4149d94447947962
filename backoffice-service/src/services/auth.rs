use mongodb::bson::doc;

use crate::dtos::auth::LoginRequest;
use crate::services::{
    error::RefreshReason, MongoDb, ServiceError, TokenError, TokenResponse, TokenService,
};
use crate::utils::{verify_password, Password, PasswordHashString};

/// Session flows: credentials in, token pair out, plus logout and refresh.
#[derive(Clone)]
pub struct AuthService {
    db: MongoDb,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(db: MongoDb, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    pub async fn login(
        &self,
        req: LoginRequest,
        ip_address: String,
    ) -> Result<TokenResponse, ServiceError> {
        let user = self
            .db
            .users()
            .find_one(doc! { "email": &req.email }, None)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        verify_password(
            &Password::new(req.password),
            &PasswordHashString::new(user.password_hash.clone()),
        )
        .map_err(|_| ServiceError::InvalidCredentials)?;

        if !user.active {
            return Err(ServiceError::AccountInactive);
        }

        let principal = user.principal();
        let pair = self.tokens.issue(&principal)?;

        tracing::info!(user_id = %user.id, role = %user.role, ip = %ip_address, "User logged in");
        Ok(pair)
    }

    /// Revoke whichever tokens the caller presented. Zero, one or two
    /// tokens are all fine; logout never fails the request path.
    pub async fn logout(&self, access_token: Option<String>, refresh_token: Option<String>) {
        if let Some(token) = access_token.as_deref() {
            self.tokens.revoke(token).await;
        }
        if let Some(token) = refresh_token.as_deref() {
            self.tokens.revoke(token).await;
        }
        tracing::info!(
            revoked_access = access_token.is_some(),
            revoked_refresh = refresh_token.is_some(),
            "Logout processed"
        );
    }

    /// Rotate a refresh token into a new pair. Each failure class carries
    /// its own stable reason code.
    pub async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> Result<TokenResponse, ServiceError> {
        let token = refresh_token.ok_or(ServiceError::RefreshRejected(RefreshReason::NoToken))?;

        self.tokens.refresh(&token).await.map_err(|e| {
            let reason = match e {
                TokenError::Revoked => RefreshReason::Blacklisted,
                TokenError::Expired | TokenError::Malformed(_) | TokenError::WrongKind { .. } => {
                    RefreshReason::Invalid
                }
                TokenError::Internal(ref err) => {
                    tracing::error!(error = %err, "Token rotation failed");
                    RefreshReason::Failed
                }
            };
            ServiceError::RefreshRejected(reason)
        })
    }
}
