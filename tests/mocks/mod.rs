//! Mock implementations for resolution tests
//!
//! Scripted providers and an in-memory credential store, so engine and pool
//! behaviour can be checked without real upstream services.

pub mod mock_provider;

#[allow(unused_imports)]
pub use mock_provider::{MemoryCredentialStore, MockBehavior, MockProvider};
