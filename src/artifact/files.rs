//! Classification of the files inside a posting

use regex::Regex;
use std::sync::LazyLock;

/// What a posted file is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// RAR volume, first (`.rar`, `.part01.rar`) or sequential (`.r00`, `.001`)
    Archive,
    /// Compressed container (`.zip`, `.7z`)
    Container,
    /// Info or readme file
    Info,
    /// PAR2 index file
    RepairIndex,
    /// PAR2 recovery volume
    RepairVolume,
    /// Anything else (media, nzb, sfv, ...)
    Other,
}

struct Patterns {
    quoted: Regex,
    metadata: Regex,
    archive: Regex,
    container: Regex,
    info: Regex,
    repair_volume: Regex,
    repair_index: Regex,
}

#[allow(clippy::expect_used)]
static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| {
    let re = |pattern: &str| Regex::new(pattern).expect("file pattern is valid");
    Patterns {
        quoted: re(r#""([^"]+)""#),
        metadata: re(r"(?i)\.(par2|nfo|sfv|nzb|srr|srs|jpe?g|png|txt|url)$"),
        archive: re(r"(?i)(\.part\d{1,4}\.rar|\.rar|\.r\d{2,3}|\.\d{3})$"),
        container: re(r"(?i)\.(zip|7z)(\.\d{3})?$"),
        info: re(r"(?i)(\.nfo$|\breadme\b)"),
        repair_volume: re(r"(?i)\.vol\d{1,4}[+-]\d{1,4}\.par2$"),
        repair_index: re(r"(?i)\.par2$"),
    }
});

/// The filename carried by a subject: the quoted part when present, else the
/// whole subject trimmed of a trailing `yEnc`
pub fn filename(subject: &str) -> &str {
    if let Some(captures) = PATTERNS.quoted.captures(subject)
        && let Some(name) = captures.get(1)
    {
        return name.as_str().trim();
    }
    let trimmed = subject.trim();
    trimmed
        .strip_suffix("yEnc")
        .map(str::trim_end)
        .unwrap_or(trimmed)
}

/// Classify one file by name
pub fn classify(file: &str) -> FileKind {
    let p = &*PATTERNS;
    if p.repair_volume.is_match(file) {
        FileKind::RepairVolume
    } else if p.repair_index.is_match(file) {
        FileKind::RepairIndex
    } else if p.info.is_match(file) {
        FileKind::Info
    } else if p.metadata.is_match(file) {
        FileKind::Other
    } else if p.container.is_match(file) {
        FileKind::Container
    } else if p.archive.is_match(file) {
        FileKind::Archive
    } else {
        FileKind::Other
    }
}
