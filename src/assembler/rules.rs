//! Assembly rule set
//!
//! Rules are loaded once per cycle and never mutated except for the retired
//! flag: a rule whose pattern cannot be compiled is tombstoned in place and
//! reported so the store can disable it for good.

use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::db::RegexRow;
use crate::types::CategoryId;

/// Group scope of a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Applies to every group (`*`)
    Any,
    /// Applies to one exact group name
    Group(String),
}

impl Scope {
    fn parse(group: &str) -> Self {
        if group == "*" {
            Scope::Any
        } else {
            Scope::Group(group.to_string())
        }
    }

    fn applies_to(&self, group: &str) -> bool {
        match self {
            Scope::Any => true,
            Scope::Group(name) => name == group,
        }
    }
}

/// A subject-parsing rule with named captures `name`, `reqid` and `parts`
#[derive(Debug)]
pub struct Rule {
    /// Store id
    pub id: i64,
    /// Group scope
    pub scope: Scope,
    /// Evaluation order, ascending
    pub ordinal: i64,
    /// Category hint recorded on Binaries this rule creates
    pub category_hint: Option<CategoryId>,
    pattern: String,
    compiled: OnceLock<Option<Regex>>,
    retired: AtomicBool,
}

impl Rule {
    /// Build a rule; the pattern is compiled on first use
    pub fn new(
        id: i64,
        scope: Scope,
        pattern: impl Into<String>,
        ordinal: i64,
        category_hint: Option<CategoryId>,
    ) -> Self {
        Self {
            id,
            scope,
            ordinal,
            category_hint,
            pattern: pattern.into(),
            compiled: OnceLock::new(),
            retired: AtomicBool::new(false),
        }
    }

    /// Whether the rule has been tombstoned
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Relaxed)
    }

    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| {
                match RegexBuilder::new(&self.pattern).case_insensitive(true).build() {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        tracing::warn!(
                            rule_id = self.id,
                            pattern = %self.pattern,
                            error = %e,
                            "assembly rule failed to compile, retiring it"
                        );
                        None
                    }
                }
            })
            .as_ref()
    }
}

impl From<RegexRow> for Rule {
    fn from(row: RegexRow) -> Self {
        Rule::new(
            row.id,
            Scope::parse(&row.group_name),
            row.pattern,
            row.ordinal,
            row.category_id,
        )
    }
}

/// Captures produced by the first matching rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Rule that matched
    pub rule_id: i64,
    /// Category hint of that rule
    pub category_hint: Option<CategoryId>,
    /// `name` capture, trimmed, if non-empty
    pub name: Option<String>,
    /// `reqid` capture, if non-empty
    pub req_id: Option<String>,
    /// Raw `parts` capture, if non-empty
    pub parts: Option<String>,
}

/// Ordered, immutable collection of assembly rules
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set, ordering rules by ordinal then id
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|rule| (rule.ordinal, rule.id));
        Self { rules }
    }

    /// Number of rules, retired ones included
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set has no rules at all
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Try every applicable rule in order; the first match wins
    ///
    /// Rules that fail to compile are retired and their ids pushed onto
    /// `retired`; matching continues with the next rule.
    pub fn find(&self, subject: &str, group: &str, retired: &mut Vec<i64>) -> Option<RuleMatch> {
        for rule in &self.rules {
            if rule.is_retired() || !rule.scope.applies_to(group) {
                continue;
            }

            let Some(regex) = rule.regex() else {
                if !rule.retired.swap(true, Ordering::Relaxed) {
                    retired.push(rule.id);
                }
                continue;
            };

            let Some(captures) = regex.captures(subject) else {
                continue;
            };

            let capture = |key: &str| {
                captures
                    .name(key)
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|s| !s.is_empty())
            };

            return Some(RuleMatch {
                rule_id: rule.id,
                category_hint: rule.category_hint,
                name: capture("name"),
                req_id: capture("reqid"),
                parts: capture("parts"),
            });
        }
        None
    }
}
