/// Service layer for identity-service
///
/// Provides the business logic:
/// - Account lifecycle (registration, approval, rejection)
/// - Authentication facade (login, refresh, logout)
/// - Expired session housekeeping
pub mod auth;
pub mod housekeeping;
pub mod lifecycle;

pub use auth::{AuthService, LoginResponse};
pub use housekeeping::spawn_session_sweeper;
pub use lifecycle::AccountLifecycle;
