//! Display formatting for resolved track metadata.

use std::sync::LazyLock;

use regex::Regex;

/// Cover shown when the metadata provider gives none, or it fails to load.
pub const DEFAULT_COVER_URL: &str = "https://images.unsplash.com/photo-1493225457124-a3eb161ffa5f?w=640&h=640&fit=crop&crop=face";

/// Cover edge length requested from the metadata provider.
pub const DEFAULT_COVER_SIZE: u32 = 640;

const SIZE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

#[allow(clippy::expect_used)]
static SIZE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\?size=\d+").expect("size regex is valid"));

/// Formats a duration in seconds as `M:SS`.
///
/// Missing, zero, negative and non-finite values yield `"Unknown"`.
///
/// ```
/// use trackgrab_core::format::format_duration;
///
/// assert_eq!(format_duration(Some(125.0)), "2:05");
/// assert_eq!(format_duration(Some(f64::NAN)), "Unknown");
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|s| s.is_finite() && *s > 0.0) else {
        return "Unknown".to_string();
    };
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Formats a byte count, scaling through B, KB, MB and GB.
///
/// Bytes are printed whole; larger units get one decimal place. Missing,
/// zero and non-finite values yield `"High Quality"`.
///
/// ```
/// use trackgrab_core::format::format_file_size;
///
/// assert_eq!(format_file_size(Some(1536.0)), "1.5 KB");
/// assert_eq!(format_file_size(Some(0.0)), "High Quality");
/// ```
#[must_use]
pub fn format_file_size(bytes: Option<f64>) -> String {
    let Some(bytes) = bytes.filter(|b| b.is_finite() && *b != 0.0) else {
        return "High Quality".to_string();
    };

    let mut size = bytes;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    // Halves round away from zero, not to even.
    if unit == 0 {
        format!("{:.0} {}", size.round(), SIZE_UNITS[unit])
    } else {
        format!("{:.1} {}", (size * 10.0).round() / 10.0, SIZE_UNITS[unit])
    }
}

/// Rewrites or appends the `size` query parameter on a provider cover URL.
///
/// Empty or missing input yields [`DEFAULT_COVER_URL`].
#[must_use]
pub fn optimize_cover_url(url: Option<&str>, size: u32) -> String {
    let Some(url) = url.filter(|u| !u.is_empty()) else {
        return DEFAULT_COVER_URL.to_string();
    };

    if url.contains("?size=") {
        return SIZE_PARAM
            .replace(url, format!("?size={size}").as_str())
            .into_owned();
    }
    if url.contains('?') {
        return format!("{url}&size={size}");
    }
    format!("{url}?size={size}")
}
