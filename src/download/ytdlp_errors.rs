//! Модуль для анализа ошибок yt-dlp
//!
//! Определяет тип ошибки по stderr и переводит его в причину отказа,
//! которую видит вызывающая сторона.

use crate::download::error::FailureReason;
use crate::download::platform::PlatformKind;

/// Типы ошибок yt-dlp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YtDlpErrorType {
    /// Cookies недействительны, устарели или требуется вход
    InvalidCookies,
    /// Платформа обнаружила бота / заблокировала запрос
    BotDetection,
    /// Видео недоступно (приватное, удалено, региональные ограничения)
    VideoUnavailable,
    /// Проблемы с сетью (таймауты, соединение)
    NetworkError,
    /// Неизвестная ошибка
    Unknown,
}

/// Анализирует stderr yt-dlp и определяет тип ошибки
///
/// # Параметры
/// - `stderr`: содержимое stderr от yt-dlp
///
/// # Возвращает
/// - `YtDlpErrorType`: тип определенной ошибки
pub fn analyze_ytdlp_error(stderr: &str) -> YtDlpErrorType {
    let stderr_lower = stderr.to_lowercase();

    // Проверяем ошибки связанные с cookies и входом
    if stderr_lower.contains("cookies are no longer valid")
        || stderr_lower.contains("cookies have likely been rotated")
        || stderr_lower.contains("sign in to confirm")
        || stderr_lower.contains("please sign in")
        || stderr_lower.contains("sign in to view")
        || stderr_lower.contains("confirm your age")
        || stderr_lower.contains("age-restricted")
        || stderr_lower.contains("age restricted")
        || stderr_lower.contains("use --cookies-from-browser")
        || stderr_lower.contains("use --cookies for the authentication")
    {
        return YtDlpErrorType::InvalidCookies;
    }

    // Проверяем недоступное видео
    if stderr_lower.contains("private video")
        || stderr_lower.contains("video is private")
        || stderr_lower.contains("this post is private")
        || stderr_lower.contains("video unavailable")
        || stderr_lower.contains("this video is not available")
        || stderr_lower.contains("video is not available")
        || stderr_lower.contains("video has been removed")
        || stderr_lower.contains("this video does not exist")
        || stderr_lower.contains("content is not available")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    // Проверяем bot detection
    if stderr_lower.contains("bot detection")
        || stderr_lower.contains("http error 403")
        || stderr_lower.contains("http error 429")
        || stderr_lower.contains("unable to extract")
        || stderr_lower.contains("signature extraction failed")
    {
        return YtDlpErrorType::BotDetection;
    }

    // Проверяем сетевые ошибки
    if stderr_lower.contains("timed out")
        || stderr_lower.contains("timeout")
        || stderr_lower.contains("connection")
        || stderr_lower.contains("network is unreachable")
        || stderr_lower.contains("name resolution")
        || stderr_lower.contains("failed to connect")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// Возвращает причину отказа, если ошибка окончательная для всей цепочки.
///
/// `None` означает, что провайдер просто не справился и цепочка может
/// продолжаться (или завершиться как AllProvidersExhausted).
pub fn terminal_reason(error_type: YtDlpErrorType, platform: PlatformKind) -> Option<FailureReason> {
    match error_type {
        YtDlpErrorType::InvalidCookies if platform == PlatformKind::YouTube => {
            Some(FailureReason::CredentialsExpiredOrInvalid)
        }
        YtDlpErrorType::VideoUnavailable => Some(FailureReason::PrivateOrUnavailable),
        _ => None,
    }
}

/// Берёт из stderr строку `ERROR: ...` для короткой диагностики
pub fn summarize_stderr(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()))
        .map(|l| l.trim().to_string())
        .unwrap_or_default()
}
