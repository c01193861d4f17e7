//! Search names

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\.(part\d{1,4}\.rar|vol\d{1,4}[+-]\d{1,4}\.par2|par2|r\d{2,3}|rar|nfo|sfv|nzb|zip|7z|\d{3}|mkv|avi|mp4|m4v|wmv|ts|iso|img|bin|cue|mp3|flac|m4a|epub|mobi|pdf|exe)$",
    )
    .expect("extension pattern is valid")
});

/// Clean a Binary name into the Release search name
///
/// Quotes and a trailing file extension are dropped, dots and underscores
/// become spaces and runs of whitespace collapse to one.
pub fn clean_release_name(name: &str) -> String {
    let unquoted: String = name.chars().filter(|c| !matches!(c, '"' | '\'')).collect();
    let trimmed = unquoted.trim();
    let stem = EXTENSION.replace(trimmed, "");
    let spaced = stem.replace(['.', '_'], " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
