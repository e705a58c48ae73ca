use std::sync::OnceLock;

use regex::Regex;
use url::Url;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect::<String>();

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / BYTES_PER_MB)
}

fn playlist_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(PL|UU|LL|FL|OL|RD|UC)[A-Za-z0-9_-]{10,}$").expect("valid playlist id regex")
    })
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid video id regex"))
}

/// Turns a user-supplied link or bare id into a URL the resolvers accept.
///
/// Full URLs pass through unchanged. Bare YouTube playlist and video ids are
/// expanded to their canonical URLs. Anything else is rejected.
pub fn normalize_link(link: &str) -> Option<String> {
    let link = link.trim();
    if link.is_empty() {
        return None;
    }

    if let Ok(url) = Url::parse(link) {
        return matches!(url.scheme(), "http" | "https").then(|| url.to_string());
    }

    if playlist_id_pattern().is_match(link) {
        Some(format!("https://www.youtube.com/playlist?list={}", link))
    } else if video_id_pattern().is_match(link) {
        Some(format!("https://www.youtube.com/watch?v={}", link))
    } else {
        None
    }
}
