//! # auth-adapters
//!
//! Credential handling: Argon2 password hashing for the `PasswordHasher`
//! port and P-256 key generation for Web Push (VAPID).

pub mod password;
pub mod vapid;

pub use password::Argon2PasswordHasher;
pub use vapid::VapidKeys;
