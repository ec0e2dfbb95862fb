//! Authentication module.
//!
//! Password hashing, session token issuance and validation, and the
//! register / login / current-user / logout flow built on them.

pub mod handlers;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use password::PasswordHasher;
pub use service::{AuthService, IssuedSession};
pub use token::{SessionClaim, TokenCodec, SESSION_TTL_HOURS};
