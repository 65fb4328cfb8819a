//! Scratch files and per-user cookie jars

pub mod cookies;
pub mod scratch;

// Re-exports for convenience
pub use cookies::{CredentialRecord, CredentialStore, FileCredentialStore};
pub use scratch::ScratchDir;
