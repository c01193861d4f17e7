//! Part subject → Binary key

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::rules::{RuleMatch, RuleSet};
use crate::db::PartRow;
use crate::types::{Binary, BinaryPart, CategoryId};

#[allow(clippy::expect_used)]
static BARE_PARTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,4})\s*/\s*(\d{1,4})\b").expect("bare parts pattern is valid")
});

/// Where a Part belongs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryKey {
    /// Resolved Binary name
    pub name: String,
    /// Request id capture
    pub req_id: Option<String>,
    /// Rule that produced the key
    pub rule_id: i64,
    /// The rule's category hint
    pub category_hint: Option<CategoryId>,
    /// This Part's number within the Binary
    pub part_number: u32,
    /// Declared number of parts (0 when the posting has no counter)
    pub total_parts: u32,
}

impl BinaryKey {
    /// A single-part Binary holding `part`
    pub fn into_binary(self, part: &PartRow) -> Binary {
        let posted = part.posted_at();
        let mut parts = BTreeMap::new();
        parts.insert(
            self.part_number,
            BinaryPart {
                subject: part.subject.clone(),
                total_segments: part.total_segments.max(0) as u32,
                posted,
                sources: [part.id].into_iter().collect(),
            },
        );
        Binary {
            name: self.name,
            group_name: part.group_name.clone(),
            poster: part.poster.clone(),
            posted,
            category_hint: self.category_hint,
            rule_id: Some(self.rule_id),
            req_id: self.req_id,
            total_parts: self.total_parts,
            parts,
        }
    }
}

/// Outcome of resolving one Part
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The Part joins this Binary
    Resolved(BinaryKey),
    /// No rule matched, or the match yielded neither a name nor a request id
    Unmatched,
    /// No part counter yet and the Part is too young to assume a single part
    Deferred,
}

/// Normalize a `parts` capture into (current, total)
///
/// Accepts `03/15`, `3 of 15`, `03-15`, `03~15` and any of those wrapped in
/// brackets.
pub fn parse_parts(raw: &str) -> Option<(u32, u32)> {
    let normalized = raw
        .to_ascii_lowercase()
        .replace(" of ", "/")
        .replace(['-', '~'], "/");
    let normalized: String = normalized
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | '(' | ')' | '{' | '}'))
        .collect();

    let mut pieces = normalized.split('/').map(str::trim).filter(|p| !p.is_empty());
    let current = pieces.next()?.parse().ok()?;
    let total = pieces.next()?.parse().ok()?;
    Some((current, total))
}

fn bare_parts(subject: &str) -> Option<(u32, u32)> {
    let captures = BARE_PARTS.captures(subject)?;
    Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
}

/// Part number for a posting without a counter
///
/// Each such Part keeps its own slot, keyed by its store id, so files of an
/// uncounted multi-file posting are never folded into one another.
fn uncounted_part_number(part: &PartRow) -> u32 {
    u32::try_from(part.id).unwrap_or(u32::MAX)
}

/// Resolve a Part against the rule set
pub fn resolve(
    rules: &RuleSet,
    part: &PartRow,
    now: DateTime<Utc>,
    missing_parts_grace: Duration,
    retired: &mut Vec<i64>,
) -> Resolution {
    let Some(RuleMatch {
        rule_id,
        category_hint,
        name,
        req_id,
        parts,
    }) = rules.find(&part.subject, &part.group_name, retired)
    else {
        return Resolution::Unmatched;
    };

    let Some(name) = name.or_else(|| req_id.clone()) else {
        return Resolution::Unmatched;
    };

    let counter = parts
        .as_deref()
        .and_then(parse_parts)
        .or_else(|| bare_parts(&part.subject));

    let (part_number, total_parts) = match counter {
        Some(counter) => counter,
        None if now - part.posted_at() > missing_parts_grace => (uncounted_part_number(part), 0),
        None => return Resolution::Deferred,
    };

    Resolution::Resolved(BinaryKey {
        name,
        req_id,
        rule_id,
        category_hint,
        part_number,
        total_parts,
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::rules::{Rule, Scope};
    use crate::assembler::DEFAULT_RULES;
    use crate::db::part_state;

    fn default_rules() -> RuleSet {
        RuleSet::new(
            DEFAULT_RULES
                .iter()
                .enumerate()
                .map(|(i, r)| Rule::new(i as i64 + 1, Scope::Any, r.pattern, r.ordinal, None))
                .collect(),
        )
    }

    fn part(subject: &str, age_hours: i64, now: DateTime<Utc>) -> PartRow {
        PartRow {
            id: 1,
            subject: subject.to_string(),
            group_name: "alt.binaries.teevee".to_string(),
            poster: "poster@example.com".to_string(),
            posted: (now - Duration::hours(age_hours)).timestamp(),
            total_segments: 10,
            binary_id: None,
            part_number: None,
            state: part_state::UNASSIGNED,
            updated_at: now.timestamp(),
        }
    }

    fn resolve_subject(subject: &str, age_hours: i64) -> Resolution {
        let now = Utc::now();
        let mut retired = Vec::new();
        resolve(
            &default_rules(),
            &part(subject, age_hours, now),
            now,
            Duration::hours(3),
            &mut retired,
        )
    }

    fn key(resolution: Resolution) -> BinaryKey {
        match resolution {
            Resolution::Resolved(key) => key,
            other => panic!("expected a key, got {other:?}"),
        }
    }

    #[test]
    fn parts_forms_normalize() {
        assert_eq!(parse_parts("03/15"), Some((3, 15)));
        assert_eq!(parse_parts("3 of 15"), Some((3, 15)));
        assert_eq!(parse_parts("3 OF 15"), Some((3, 15)));
        assert_eq!(parse_parts("[03-15]"), Some((3, 15)));
        assert_eq!(parse_parts("03~15"), Some((3, 15)));
        assert_eq!(parse_parts("(1/1)"), Some((1, 1)));
        assert_eq!(parse_parts("part"), None);
        assert_eq!(parse_parts("7"), None);
    }

    #[test]
    fn volumes_of_one_posting_share_a_name() {
        let names: Vec<String> = [
            r#"[01/05] - "Show.S01E01.720p.HDTV.x264-GRP.rar" yEnc"#,
            r#"[02/05] - "Show.S01E01.720p.HDTV.x264-GRP.r00" yEnc"#,
            r#"[03/05] - "Show.S01E01.720p.HDTV.x264-GRP.r01" yEnc"#,
            r#"[04/05] - "Show.S01E01.720p.HDTV.x264-GRP.par2" yEnc"#,
            r#"[05/05] - "Show.S01E01.720p.HDTV.x264-GRP.vol00+01.par2" yEnc"#,
        ]
        .iter()
        .map(|s| key(resolve_subject(s, 0)).name)
        .collect();

        assert!(names.iter().all(|n| n == "Show.S01E01.720p.HDTV.x264-GRP"), "{names:?}");
    }

    #[test]
    fn part_counter_comes_from_capture() {
        let k = key(resolve_subject(
            r#"Show.S01E01 [03/15] - "Show.S01E01.part03.rar" yEnc"#,
            0,
        ));
        assert_eq!((k.part_number, k.total_parts), (3, 15));
        assert_eq!(k.name, "Show.S01E01");
    }

    #[test]
    fn request_id_substitutes_for_missing_name() {
        let set = RuleSet::new(vec![Rule::new(
            1,
            Scope::Any,
            r"^\[(?P<reqid>\d+)\](?P<name>)\s*\[(?P<parts>\d+/\d+)\]",
            1,
            None,
        )]);
        let now = Utc::now();
        let mut retired = Vec::new();

        let k = key(resolve(
            &set,
            &part("[123456] [1/2] yEnc", 0, now),
            now,
            Duration::hours(3),
            &mut retired,
        ));

        assert_eq!(k.name, "123456");
        assert_eq!(k.req_id.as_deref(), Some("123456"));
    }

    #[test]
    fn reqid_postings_resolve_with_both_captures() {
        let k = key(resolve_subject(
            r#"[612345]-[FULL]-[#a.b.teevee@EFNet]-[ Show.S01E01.720p.HDTV.x264-GRP ]-[02/30] - "show.r00" yEnc"#,
            0,
        ));
        assert_eq!(k.name, "Show.S01E01.720p.HDTV.x264-GRP");
        assert_eq!(k.req_id.as_deref(), Some("612345"));
        assert_eq!((k.part_number, k.total_parts), (2, 30));
    }

    #[test]
    fn missing_counter_waits_then_becomes_single_part() {
        let subject = r#""Holiday.Video.2013.mkv" yEnc"#;

        assert_eq!(resolve_subject(subject, 1), Resolution::Deferred);

        let k = key(resolve_subject(subject, 4));
        assert_eq!((k.part_number, k.total_parts), (1, 0));
        assert_eq!(k.name, "Holiday.Video.2013.mkv");
    }

    #[test]
    fn uncounted_files_of_one_posting_keep_separate_slots() {
        let now = Utc::now();
        let mut retired = Vec::new();
        let mut rar = part(r#""Holiday.Video.2013.rar" yEnc"#, 4, now);
        rar.id = 7;
        let mut r00 = part(r#""Holiday.Video.2013.r00" yEnc"#, 4, now);
        r00.id = 8;

        let first = key(resolve(&default_rules(), &rar, now, Duration::hours(3), &mut retired));
        let second = key(resolve(&default_rules(), &r00, now, Duration::hours(3), &mut retired));

        assert_eq!(first.name, second.name);
        assert_ne!(first.part_number, second.part_number);
        assert_eq!((first.total_parts, second.total_parts), (0, 0));
    }

    #[test]
    fn unnamed_match_is_unmatched() {
        let set = RuleSet::new(vec![Rule::new(1, Scope::Any, r"^(?P<parts>\d+/\d+)", 1, None)]);
        let now = Utc::now();
        let mut retired = Vec::new();

        let resolution = resolve(&set, &part("1/2 thing", 0, now), now, Duration::hours(3), &mut retired);

        assert_eq!(resolution, Resolution::Unmatched);
    }
}
