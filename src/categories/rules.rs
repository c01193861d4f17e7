//! Rule sets and the interpreter that evaluates them

use regex::{Regex, RegexBuilder};

use crate::types::CategoryId;
use crate::{Error, Result};

/// Compile a case-insensitive category pattern
pub(crate) fn compile(pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::config("categories", format!("bad pattern {pattern:?}: {e}")))
}

/// One entry of a leaf's rule set
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Succeeds when the pattern is found in the name
    Pattern(Regex),
    /// Succeeds when finding the pattern equals the expectation
    Expect(Regex, bool),
    /// Succeeds when every pattern's presence equals its expectation
    All(Vec<(Regex, bool)>),
}

impl Matcher {
    /// Bare pattern
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(Matcher::Pattern(compile(pattern)?))
    }

    /// Pattern that must (or must not) be present
    pub fn expect(pattern: &str, must_match: bool) -> Result<Self> {
        Ok(Matcher::Expect(compile(pattern)?, must_match))
    }

    /// Conjunction of expectations
    pub fn all(terms: &[(&str, bool)]) -> Result<Self> {
        let terms = terms
            .iter()
            .map(|(pattern, expected)| Ok((compile(pattern)?, *expected)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Matcher::All(terms))
    }

    /// Evaluate against a release name
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(name),
            Matcher::Expect(re, must_match) => re.is_match(name) == *must_match,
            Matcher::All(terms) => terms
                .iter()
                .all(|(re, expected)| re.is_match(name) == *expected),
        }
    }
}

/// A leaf's rule set succeeds when any of its entries does
pub(crate) fn rule_set_matches(rules: &[Matcher], name: &str) -> bool {
    rules.iter().any(|rule| rule.matches(name))
}

/// A candidate leaf under a parent gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Candidate {
    /// Returned only if the leaf's rule set succeeds
    Checked(CategoryId),
    /// Returned without testing; only meaningful last in a list
    CatchAll(CategoryId),
}

/// A parent-level pattern selecting an ordered candidate list
#[derive(Debug, Clone)]
pub struct Gate {
    pub(crate) pattern: Regex,
    pub(crate) candidates: Vec<Candidate>,
}

impl Gate {
    /// Build a gate from a pattern and its candidates
    pub fn new(pattern: &str, candidates: Vec<Candidate>) -> Result<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            candidates,
        })
    }
}
