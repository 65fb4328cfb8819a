use thiserror::Error;

/// Infrastructure error type for the crate
///
/// Adapters, the fetcher and the credential store use this internally; it is
/// normalised into a [`crate::download::error::DownloadFailure`] before it
/// reaches a caller of the resolution engine.
///
/// # Example
///
/// ```no_run
/// use vidfetch::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     eprintln!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Download/yt-dlp errors
    #[error("Download error: {0}")]
    Download(String),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A child process or bounded operation ran past its budget
    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(std::time::Duration),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err = AppError::Timeout(std::time::Duration::from_secs(90));
        assert_eq!(err.to_string(), "Timed out after 90s");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: AppError = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
