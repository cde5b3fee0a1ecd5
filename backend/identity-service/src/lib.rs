/// Identity Service Library
///
/// Credential verification, dual-token sessions and rank-gated account
/// approval for APS Digital.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Store contracts with PostgreSQL and in-memory implementations
/// - `error`: Error types
/// - `models`: Data models
/// - `security`: National ID checks, password hashing, rank tiers, tokens
/// - `services`: Account lifecycle, authentication facade, housekeeping
/// - `validators`: Input validation
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod security;
pub mod services;
pub mod validators;

// Re-export commonly used types
pub use error::{IdentityError, Result};
pub use security::{Actor, Tier, TokenIssuer};
pub use services::{AccountLifecycle, AuthService};
