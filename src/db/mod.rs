//! User Directory: storage and lookup of user records.
//!
//! The auth core only talks to the [`UserDirectory`] trait. Production uses
//! the PostgreSQL implementation in [`operations`]; tests and local runs can
//! use the in-memory one.

pub mod directory;
pub mod models;
pub mod operations;

pub use directory::{InMemoryUserDirectory, UserDirectory};
pub use models::{normalize_email, Credentials, NewUser, RegisterRequest, UserProfile, UserRecord};
pub use operations::DbOperations;
