/// Data models for identity and authorization
pub mod account;
pub mod authorization;
pub mod role;
pub mod session;

pub use account::{Account, AccountStatus, LoginRequest, NewAccount, RegisterRequest};
pub use authorization::{AuthorizationDecision, AuthorizationRecord, StatusChange};
pub use role::Role;
pub use session::{NewSession, RefreshSession};
