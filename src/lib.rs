//! Vidfetch - multi-provider video resolution for YouTube, TikTok and Instagram
//!
//! Turns a shared link into a local media file by trying an ordered chain of
//! providers per platform, then streaming the winner into a scratch
//! directory under a hard size cap.
//!
//! # Module Structure
//!
//! - `core`: Configuration, errors, logging and small utilities
//! - `download`: Platform detection, providers, resolution engine and worker pool
//! - `storage`: Scratch directory and per-user cookie jars
//! - `cli`: Command-line front-end

pub mod cli;
pub mod core;
pub mod download;
pub mod storage;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError};
pub use download::{DownloadFailure, DownloadRequest, FailureReason, ResolutionEngine, ResolutionPool};
pub use storage::{CredentialStore, FileCredentialStore, ScratchDir};
