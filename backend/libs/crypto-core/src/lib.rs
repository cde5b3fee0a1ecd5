//! Shared cryptographic primitives for APS Digital services.
//!
//! - `jwt`: HMAC-signed JWT encoding and validation, generic over the claims type
//! - `hash`: SHA-256 digests used to store bearer secrets at rest
//! - `token`: cryptographically random opaque tokens
pub mod hash;
pub mod jwt;
pub mod token;

pub use hash::{sha256, sha256_hex};
pub use token::generate_opaque_token;
