use lazy_regex::regex;

/// Извлекает первую http(s)-ссылку из текста сообщения.
///
/// Ссылка заканчивается на пробеле или на символах, которые не
/// встречаются в URL без экранирования (`<>"{}|\^` и т.п.).
///
/// # Example
///
/// ```
/// use vidfetch::core::utils::extract_url;
///
/// assert_eq!(
///     extract_url("look https://youtu.be/abc now"),
///     Some("https://youtu.be/abc")
/// );
/// assert_eq!(extract_url("no links here"), None);
/// ```
pub fn extract_url(text: &str) -> Option<&str> {
    regex!(r#"https?://[^\s<>"{}|\\^`\[\]]+"#)
        .find(text)
        .map(|m| m.as_str())
}

/// Обрезает строку до `max_chars` символов (не байтов).
///
/// Безопасно для многобайтовых символов: граница никогда не попадает
/// внутрь UTF-8 последовательности.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Форматирует размер в байтах для логов ("12.34 MB").
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.2} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
