pub mod identity_service;
pub mod provider_service;
pub mod user_service;

pub use identity_service::{FirebaseVerifier, IdentityVerifier};
