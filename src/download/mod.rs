//! Link resolution: platform detection, provider chains, fetching

pub mod engine;
pub mod error;
pub mod fetch;
pub mod platform;
pub mod pool;
pub mod source;
pub mod types;
pub mod ytdlp;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use engine::ResolutionEngine;
pub use error::{DownloadFailure, FailureReason};
pub use fetch::StreamingFetcher;
pub use platform::{classify, PlatformKind};
pub use pool::{ResolutionHandle, ResolutionPool};
pub use source::{MediaProvider, ProviderOutcome, ProviderRegistry};
pub use types::{CredentialHandle, DownloadRequest, DownloadResult, DownloadedMedia, MediaLocator, UserId};
