/// Shared JWT module for APS Digital services
///
/// Tokens are signed with HS256 using a single opaque secret supplied at
/// process start. The module is generic over the claims type so each service
/// owns its own claim layout.
///
/// ## Security Design
///
/// - **HS256 ONLY**: validation pins the algorithm, so a token with a
///   different `alg` header is rejected
/// - **No hardcoded keys**: the secret comes from configuration
/// - **Expiry always checked**: `exp` is a required claim
///
/// ## Usage
///
/// ```rust
/// use crypto_core::jwt::JwtKeys;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct MyClaims {
///     sub: String,
///     exp: i64,
/// }
///
/// let keys = JwtKeys::from_secret(b"a-long-random-secret").unwrap();
/// let token = keys
///     .encode(&MyClaims { sub: "42".into(), exp: chrono::Utc::now().timestamp() + 60 })
///     .unwrap();
/// let data = keys.decode::<MyClaims>(&token).unwrap();
/// assert_eq!(data.claims.sub, "42");
/// ```
use anyhow::{anyhow, Result};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{de::DeserializeOwned, Serialize};

/// JWT algorithm used by every APS Digital service
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

/// Minimum secret length accepted for HMAC signing
const MIN_SECRET_LEN: usize = 16;

/// Signing and verification keys derived from one shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: Option<String>,
    leeway_secs: u64,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    /// Build keys from a raw HMAC secret
    ///
    /// ## Errors
    ///
    /// Returns error if the secret is shorter than 16 bytes
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(anyhow!(
                "JWT secret must be at least {MIN_SECRET_LEN} bytes, got {}",
                secret.len()
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: None,
            leeway_secs: 0,
        })
    }

    /// Require (on decode) and stamp (by the caller) an `iss` claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Clock-skew tolerance applied to `exp` during validation
    pub fn with_leeway(mut self, leeway_secs: u64) -> Self {
        self.leeway_secs = leeway_secs;
        self
    }

    /// Sign claims into a compact JWT
    pub fn encode<C: Serialize>(&self, claims: &C) -> Result<String> {
        encode(&Header::new(JWT_ALGORITHM), claims, &self.encoding)
            .map_err(|e| anyhow!("Failed to generate token: {e}"))
    }

    /// Validate and decode a JWT
    ///
    /// ## Security Guarantees
    ///
    /// - Verifies the HS256 signature
    /// - Checks token expiration
    /// - Checks the issuer when one is configured
    ///
    /// ## Errors
    ///
    /// Returns error if the signature is invalid, the token is expired, or
    /// the token is malformed
    pub fn decode<C: DeserializeOwned>(&self, token: &str) -> Result<TokenData<C>> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        decode::<C>(token, &self.decoding, &validation)
            .map_err(|e| anyhow!("Token validation failed: {e}"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-unit-tests-only";

    #[derive(Debug, Serialize, Deserialize)]
    struct TestClaims {
        sub: String,
        iss: String,
        exp: i64,
    }

    fn claims(exp_offset: i64) -> TestClaims {
        TestClaims {
            sub: "user-1".to_string(),
            iss: "tests".to_string(),
            exp: Utc::now().timestamp() + exp_offset,
        }
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(JwtKeys::from_secret(b"short").is_err());
    }

    #[test]
    fn test_encode_and_decode() {
        let keys = JwtKeys::from_secret(TEST_SECRET).unwrap().with_issuer("tests");
        let token = keys.encode(&claims(60)).expect("Failed to generate token");
        assert_eq!(token.matches('.').count(), 2); // JWT has 3 parts

        let data = keys.decode::<TestClaims>(&token).expect("token should validate");
        assert_eq!(data.claims.sub, "user-1");
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::from_secret(TEST_SECRET).unwrap();
        let token = keys.encode(&claims(-10)).unwrap();
        assert!(keys.decode::<TestClaims>(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = JwtKeys::from_secret(TEST_SECRET).unwrap();
        let other = JwtKeys::from_secret(b"another-secret-of-enough-length").unwrap();
        let token = keys.encode(&claims(60)).unwrap();
        assert!(other.decode::<TestClaims>(&token).is_err());
    }

    #[test]
    fn test_issuer_mismatch_rejected() {
        let keys = JwtKeys::from_secret(TEST_SECRET).unwrap().with_issuer("someone-else");
        let token = keys.encode(&claims(60)).unwrap();
        assert!(keys.decode::<TestClaims>(&token).is_err());
    }

    #[test]
    fn test_validate_invalid_token() {
        let keys = JwtKeys::from_secret(TEST_SECRET).unwrap();
        let result = keys.decode::<TestClaims>("invalid.token.here");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Token validation failed"));
    }
}
