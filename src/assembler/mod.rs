//! Binary assembly
//!
//! Parts waiting in the store are matched against the rule set and merged
//! into Binaries keyed by resolved name. Each page of parts is merged in
//! memory first, then written with one upsert per Binary.

pub mod resolve;
pub mod rules;

pub use resolve::{BinaryKey, Resolution, parse_parts};
pub use rules::{Rule, RuleMatch, RuleSet, Scope};

use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::db::Database;
use crate::merge::Merge;
use crate::types::{AssemblyStats, Binary};
use crate::{Error, Result};

/// Parts loaded per assembly page
const PAGE_SIZE: i64 = 1000;

// Optional trailing volume extension, kept out of the `name` capture so every
// volume of a posting resolves to the same Binary.
macro_rules! volume_extension {
    () => {
        r"(?:\.(?:part\d{1,4}\.rar|vol\d{1,4}\+\d{1,4}\.par2|par2|r\d{2,3}|rar|nfo|sfv|nzb|zip|7z|\d{3}))?"
    };
}

/// A rule seeded into a fresh database
#[derive(Debug, Clone, Copy)]
pub struct DefaultRule {
    /// Pattern with named captures
    pub pattern: &'static str,
    /// Evaluation order
    pub ordinal: i64,
    /// What the rule recognizes
    pub description: &'static str,
}

/// Wildcard rules covering the common posting styles
pub const DEFAULT_RULES: &[DefaultRule] = &[
    DefaultRule {
        pattern: r"^\[(?P<reqid>\d{4,8})\]-\[.*?\]-\[.*?\]-\[ ?(?P<name>.+?) ?\]-\[(?P<parts>\d{1,4}/\d{1,4})\]",
        ordinal: 10,
        description: "request-id postings: [reqid]-[tag]-[channel]-[ name ]-[nn/nn]",
    },
    DefaultRule {
        pattern: concat!(
            r#"^.*?[\[(]?(?P<parts>\d{1,4}\s*(?:/|of)\s*\d{1,4})[\])]?.*?"(?P<name>.+?)"#,
            volume_extension!(),
            r#"""#
        ),
        ordinal: 100,
        description: "part counter followed by a quoted filename",
    },
    DefaultRule {
        pattern: concat!(r#""(?P<name>.+?)"#, volume_extension!(), r#"""#),
        ordinal: 200,
        description: "quoted filename without a part counter",
    },
    DefaultRule {
        pattern: concat!(
            r#"^(?P<name>[^"\[\]]+?)"#,
            volume_extension!(),
            r"(?:\s+yEnc)?\s*$"
        ),
        ordinal: 300,
        description: "bare subject used as the name",
    },
];

/// Matches store Parts to Binaries
pub struct Assembler {
    rules: RuleSet,
    missing_parts_grace: Duration,
}

impl Assembler {
    /// Create an assembler over an already loaded rule set
    pub fn new(rules: RuleSet, missing_parts_grace: std::time::Duration) -> Result<Self> {
        let missing_parts_grace = Duration::from_std(missing_parts_grace).map_err(|e| {
            Error::config("postprocess.missing_parts_grace", e.to_string())
        })?;
        Ok(Self {
            rules,
            missing_parts_grace,
        })
    }

    /// Load the active rules from the store
    pub async fn load(db: &Database, missing_parts_grace: std::time::Duration) -> Result<Self> {
        let rules = db
            .active_regexes()
            .await?
            .into_iter()
            .map(Rule::from)
            .collect();
        Self::new(RuleSet::new(rules), missing_parts_grace)
    }

    /// The rule set in use
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run one assembly pass over every unassigned Part
    ///
    /// Store write failures abort the pass; parts already attached stay
    /// attached and the rest are picked up by the next pass.
    pub async fn assemble(&self, db: &Database) -> Result<AssemblyStats> {
        let mut stats = AssemblyStats::default();
        let now = Utc::now();
        let mut cursor = 0;

        loop {
            let page = db.unassigned_parts(cursor, PAGE_SIZE).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = last.id;

            let mut binaries: BTreeMap<String, Binary> = BTreeMap::new();
            let mut unmatched = Vec::new();
            let mut retired = Vec::new();

            for part in &page {
                stats.parts_seen += 1;
                match resolve::resolve(
                    &self.rules,
                    part,
                    now,
                    self.missing_parts_grace,
                    &mut retired,
                ) {
                    Resolution::Resolved(key) => {
                        stats.parts_assembled += 1;
                        let binary = key.into_binary(part);
                        match binaries.entry(binary.name.clone()) {
                            Entry::Occupied(mut existing) => existing.get_mut().merge(binary),
                            Entry::Vacant(slot) => {
                                slot.insert(binary);
                            }
                        }
                    }
                    Resolution::Unmatched => {
                        tracing::debug!(subject = %part.subject, group = %part.group_name, "no rule matched part");
                        unmatched.push(part.id);
                    }
                    Resolution::Deferred => stats.deferred += 1,
                }
            }

            for rule_id in retired {
                db.disable_regex(rule_id).await?;
                stats.rules_retired += 1;
            }

            for binary in binaries.values() {
                let binary_id = db.upsert_binary(binary).await?;
                db.attach_parts(binary_id, &binary.parts).await?;
                stats.binaries += 1;
            }

            stats.unmatched += unmatched.len() as u64;
            db.mark_parts_unmatched(&unmatched).await?;
        }

        tracing::info!(
            parts = stats.parts_seen,
            assembled = stats.parts_assembled,
            unmatched = stats.unmatched,
            deferred = stats.deferred,
            binaries = stats.binaries,
            rules_retired = stats.rules_retired,
            "assembly pass complete"
        );

        Ok(stats)
    }
}
