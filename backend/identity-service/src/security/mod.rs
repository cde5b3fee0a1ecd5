/// Security module for authentication and authorization
///
/// Provides core security primitives for identity-service:
/// - National ID checksum validation and normalization
/// - Password hashing and verification (Argon2id)
/// - Rank tiers and the authorization table
/// - Access token signing (HS256 via crypto-core) and refresh sessions
///
/// ## Architecture
///
/// - **crypto-core::jwt**: Shared JWT implementation (HS256 only)
/// - **password**: Argon2id password hashing
/// - **rank**: Explicit per-tier permission table and the acting `Actor`
/// - **tokens**: Token issuance, rotation and revocation
pub use crypto_core::jwt;

pub mod national_id;
pub mod password;
pub mod rank;
pub mod tokens;

pub use national_id::{format_national_id, normalize_national_id, validate_national_id, NationalId};
pub use password::{hash_password, verify_password};
pub use rank::{can_authorize, Actor, Tier};
pub use tokens::{Claims, TokenIssuer, TokenPair};
