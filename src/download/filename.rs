//! Filename sanitization and path resolution for downloads.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tokio::fs::{File, OpenOptions};

/// Longest filename component produced by [`sanitize_filename`], in UTF-16
/// code units. Characters outside the Basic Multilingual Plane count twice.
pub const MAX_FILENAME_UNITS: usize = 100;

/// Placeholder for empty names.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Extension given to downloaded tracks.
pub const TRACK_EXTENSION: &str = "mp3";

const UNKNOWN_TRACK: &str = "Unknown Track";
const UNKNOWN_ARTIST: &str = "Unknown Artist";

#[allow(clippy::expect_used)]
static ILLEGAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]+"#).expect("illegal-char regex is valid"));

#[allow(clippy::expect_used)]
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex is valid"));

/// Makes a metadata string safe to use in a filename.
///
/// Runs of `<>:"/\|?*` become a single `_`, whitespace runs collapse to one
/// space, the result is trimmed and cut to [`MAX_FILENAME_UNITS`]. Missing or
/// empty input yields `"Unknown"`.
///
/// ```
/// use trackgrab_core::download::sanitize_filename;
///
/// assert_eq!(sanitize_filename(Some("AC/DC:  Live")), "AC_DC_ Live");
/// assert_eq!(sanitize_filename(None), "Unknown");
/// ```
#[must_use]
pub fn sanitize_filename(name: Option<&str>) -> String {
    let Some(name) = name.filter(|n| !n.is_empty()) else {
        return UNKNOWN_NAME.to_string();
    };

    let replaced = ILLEGAL_RUN.replace_all(name, "_");
    let collapsed = WHITESPACE_RUN.replace_all(&replaced, " ");
    let truncated = truncate_utf16(collapsed.trim(), MAX_FILENAME_UNITS);

    if truncated.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        truncated
    }
}

/// Longest prefix of `text` that fits in `max_units` UTF-16 code units.
/// A surrogate pair that would straddle the limit is dropped whole.
fn truncate_utf16(text: &str, max_units: usize) -> String {
    let mut units = 0;
    text.chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= max_units
        })
        .collect()
}

/// Builds the `Artist - Title.mp3` filename for a track.
#[must_use]
pub fn track_filename(title: Option<&str>, artist: Option<&str>) -> String {
    let title = sanitize_filename(Some(title.filter(|t| !t.is_empty()).unwrap_or(UNKNOWN_TRACK)));
    let artist =
        sanitize_filename(Some(artist.filter(|a| !a.is_empty()).unwrap_or(UNKNOWN_ARTIST)));
    format!("{artist} - {title}.{TRACK_EXTENSION}")
}

/// Returns `filename` when it is a single plain path component, else a fallback.
pub(crate) fn safe_file_name(filename: &str) -> String {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name.to_string_lossy().into_owned(),
        _ => format!("download.{TRACK_EXTENSION}"),
    }
}

/// Creates a new, empty file in `dir`, adding a numeric suffix while the name is taken.
///
/// Example: `a.mp3`, then `a_2.mp3`, `a_3.mp3`, ...
///
/// The file is created with `create_new`, so two concurrent callers never
/// receive the same path.
pub(crate) async fn reserve_unique_path(
    dir: &Path,
    filename: &str,
) -> std::io::Result<(PathBuf, File)> {
    let filename = safe_file_name(filename);
    let (stem, ext) = match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename.as_str(), ""),
    };

    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let candidates = std::iter::once(filename.clone())
        .chain((2..1000).map(|i| format!("{stem}_{i}{ext}")))
        .chain(std::iter::once(format!("{stem}_{timestamp}{ext}")));

    let mut last_error = None;
    for candidate in candidates {
        let path = dir.join(candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(error) if error.kind() == ErrorKind::AlreadyExists => last_error = Some(error),
            Err(error) => return Err(error),
        }
    }
    Err(last_error.unwrap_or_else(|| ErrorKind::AlreadyExists.into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    #[test]
    fn test_sanitize_filename_replaces_illegal_runs() {
        assert_eq!(sanitize_filename(Some("a/b")), "a_b");
        assert_eq!(sanitize_filename(Some("a<>:b")), "a_b");
        assert_eq!(sanitize_filename(Some(r#"what?"*"#)), "what_");
    }

    #[test]
    fn test_sanitize_filename_collapses_whitespace_and_trims() {
        assert_eq!(sanitize_filename(Some("  a \t\n b  ")), "a b");
    }

    #[test]
    fn test_sanitize_filename_truncates_to_limit() {
        let long = "x".repeat(250);
        assert_eq!(sanitize_filename(Some(&long)).chars().count(), MAX_FILENAME_UNITS);
        let wide = "日".repeat(150);
        assert_eq!(sanitize_filename(Some(&wide)).chars().count(), MAX_FILENAME_UNITS);
    }

    #[test]
    fn test_sanitize_filename_counts_astral_chars_as_two_units() {
        let emoji = "🎵".repeat(60);
        let out = sanitize_filename(Some(&emoji));
        assert_eq!(out.chars().count(), 50);
        assert_eq!(out.encode_utf16().count(), MAX_FILENAME_UNITS);

        let straddling = format!("{}🎵", "a".repeat(99));
        assert_eq!(sanitize_filename(Some(&straddling)), "a".repeat(99));
    }

    #[test]
    fn test_sanitize_filename_unknown_for_empty() {
        assert_eq!(sanitize_filename(None), "Unknown");
        assert_eq!(sanitize_filename(Some("")), "Unknown");
        assert_eq!(sanitize_filename(Some("   ")), "Unknown");
    }

    #[test]
    fn test_sanitize_filename_output_never_contains_illegal_chars() {
        let inputs = [
            "Song: Part 1/2",
            r#"<<"quoted">>"#,
            "C:\\Music\\track?.mp3",
            "pipe|star*question?",
            "normal name",
        ];
        for input in inputs {
            let out = sanitize_filename(Some(input));
            assert!(!out.contains(ILLEGAL), "illegal char survived in {out:?}");
            assert!(out.encode_utf16().count() <= MAX_FILENAME_UNITS);
        }
    }

    #[test]
    fn test_track_filename_formats_artist_and_title() {
        assert_eq!(track_filename(Some("Song"), Some("Band")), "Band - Song.mp3");
        assert_eq!(
            track_filename(None, None),
            "Unknown Artist - Unknown Track.mp3"
        );
        assert_eq!(
            track_filename(Some("A/B"), Some("C:D")),
            "C_D - A_B.mp3"
        );
    }

    #[test]
    fn test_safe_file_name_rejects_path_components() {
        assert_eq!(safe_file_name("a.mp3"), "a.mp3");
        assert_eq!(safe_file_name("../a.mp3"), "download.mp3");
        assert_eq!(safe_file_name(".."), "download.mp3");
        assert_eq!(safe_file_name("dir/a.mp3"), "download.mp3");
    }

    #[tokio::test]
    async fn test_reserve_unique_path_adds_suffix() {
        let temp = TempDir::new().unwrap();
        let (first, _) = reserve_unique_path(temp.path(), "a.mp3").await.unwrap();
        assert_eq!(first, temp.path().join("a.mp3"));
        assert!(first.exists());

        let (second, _) = reserve_unique_path(temp.path(), "a.mp3").await.unwrap();
        assert_eq!(second, temp.path().join("a_2.mp3"));

        let (third, _) = reserve_unique_path(temp.path(), "a.mp3").await.unwrap();
        assert_eq!(third, temp.path().join("a_3.mp3"));
    }

    #[tokio::test]
    async fn test_reserve_unique_path_keeps_existing_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.mp3"), b"old").unwrap();

        let (path, _) = reserve_unique_path(temp.path(), "a.mp3").await.unwrap();

        assert_eq!(path, temp.path().join("a_2.mp3"));
        assert_eq!(std::fs::read(temp.path().join("a.mp3")).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_reserve_unique_path_without_extension() {
        let temp = TempDir::new().unwrap();
        reserve_unique_path(temp.path(), "track").await.unwrap();
        let (path, _) = reserve_unique_path(temp.path(), "track").await.unwrap();
        assert_eq!(path, temp.path().join("track_2"));
    }
}
