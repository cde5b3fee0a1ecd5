use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Malformed input (bad national ID, bad email, short password)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Email or national ID already bound to an account.
    /// Deliberately does not say which one.
    #[error("Account already exists")]
    Conflict,

    /// Action forbidden by fixed policy (top-tier self-registration)
    #[error("Policy violation: {0}")]
    Policy(String),

    /// Generic login failure: unknown account, wrong password, or an
    /// account that may not log in all look the same
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Rank hierarchy violation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Operation not valid for the account's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Refresh token absent, revoked, or expired; also bad access tokens
    #[error("Invalid token")]
    InvalidToken,

    /// Owner of a refresh token is no longer active
    #[error("Account not active: {0}")]
    AccountState(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("JWT error: {0}")]
    Jwt(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IdentityError {
    /// Stable machine-readable code for outer layers
    pub fn code(&self) -> &'static str {
        match self {
            IdentityError::Validation(_) => "validation_error",
            IdentityError::Conflict => "conflict",
            IdentityError::Policy(_) => "policy_violation",
            IdentityError::InvalidCredentials => "invalid_credentials",
            IdentityError::Forbidden(_) => "forbidden",
            IdentityError::InvalidState(_) => "invalid_state",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::InvalidToken => "invalid_token",
            IdentityError::AccountState(_) => "account_not_active",
            IdentityError::Database(_) | IdentityError::Jwt(_) | IdentityError::Internal(_) => {
                "internal"
            }
        }
    }

    /// Infrastructure failures are opaque to callers and never retried here
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            IdentityError::Database(_) | IdentityError::Jwt(_) | IdentityError::Internal(_)
        )
    }

    /// Message safe to hand to an end user
    pub fn public_message(&self) -> String {
        if self.is_infrastructure() {
            // Don't leak internal details in production
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

// Conversions from external error types
impl From<sqlx::Error> for IdentityError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        IdentityError::Database(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("JWT error: {}", err);
        IdentityError::Jwt(err.to_string())
    }
}

impl From<anyhow::Error> for IdentityError {
    fn from(err: anyhow::Error) -> Self {
        let msg = err.to_string();
        // Map JWT validation failures from crypto-core
        if msg.contains("Token validation failed") {
            IdentityError::InvalidToken
        } else if msg.contains("Failed to generate token") {
            IdentityError::Jwt(msg)
        } else {
            IdentityError::Internal(msg)
        }
    }
}

impl From<validator::ValidationErrors> for IdentityError {
    fn from(err: validator::ValidationErrors) -> Self {
        IdentityError::Validation(err.to_string())
    }
}
