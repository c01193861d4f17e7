//! Category classification
//!
//! Maps a release name, optionally with the group it was posted to, onto a
//! leaf of the two-level taxonomy in [`taxonomy`]. Evaluation order:
//!
//! 1. Names that are an opaque hex hash go straight to Misc/Other.
//! 2. Groups matching a suggestion pattern are tried against the suggested
//!    categories in order. A suggested parent runs its gates; a suggested leaf
//!    is returned once its rule set confirms the name, or directly when it has
//!    no rule set.
//! 3. Every parent's gates are tried in the fixed global order.
//! 4. Misc/Other.
//!
//! The tables are immutable once built and shared behind an `Arc`.

pub mod rules;
mod tables;
pub mod taxonomy;

pub use rules::{Candidate, Gate, Matcher};

use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::Result;
use crate::types::CategoryId;

/// Immutable classification tables
#[derive(Debug, Clone, Default)]
pub struct CategoryRules {
    suggestions: Vec<(Regex, Vec<CategoryId>)>,
    parent_order: Vec<CategoryId>,
    gates: HashMap<CategoryId, Vec<Gate>>,
    leaves: HashMap<CategoryId, Vec<Matcher>>,
}

impl CategoryRules {
    /// Empty tables; everything classifies as Misc/Other
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in tables
    pub fn builtin() -> Result<Self> {
        tables::builtin()
    }

    /// Suggest categories for groups matching `group_pattern`
    pub fn suggest(&mut self, group_pattern: &str, categories: &[CategoryId]) -> Result<()> {
        self.suggestions
            .push((rules::compile(group_pattern)?, categories.to_vec()));
        Ok(())
    }

    /// Append a gate to a parent; the first gate registered fixes the parent's
    /// position in the global order
    pub fn gate(&mut self, parent: CategoryId, gate: Gate) {
        if !self.parent_order.contains(&parent) {
            self.parent_order.push(parent);
        }
        self.gates.entry(parent).or_default().push(gate);
    }

    /// Set a leaf's rule set
    pub fn leaf(&mut self, leaf: CategoryId, rules: Vec<Matcher>) {
        self.leaves.insert(leaf, rules);
    }

    fn confirm(&self, leaf: CategoryId, name: &str) -> bool {
        self.leaves
            .get(&leaf)
            .is_some_and(|set| rules::rule_set_matches(set, name))
    }

    fn resolve_parent(&self, parent: CategoryId, name: &str) -> Option<CategoryId> {
        let gate = self
            .gates
            .get(&parent)?
            .iter()
            .find(|gate| gate.pattern.is_match(name))?;

        gate.candidates.iter().find_map(|candidate| match candidate {
            Candidate::Checked(leaf) => self.confirm(*leaf, name).then_some(*leaf),
            Candidate::CatchAll(leaf) => Some(*leaf),
        })
    }

    fn resolve_suggestion(&self, suggested: CategoryId, name: &str) -> Option<CategoryId> {
        if self.gates.contains_key(&suggested) || taxonomy::is_parent(suggested) {
            return self.resolve_parent(suggested, name);
        }
        match self.leaves.get(&suggested) {
            Some(set) => rules::rule_set_matches(set, name).then_some(suggested),
            None => Some(suggested),
        }
    }
}

/// Hierarchical category classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<CategoryRules>,
    hex_run: Regex,
}

impl Classifier {
    /// Create a classifier over the given tables
    pub fn new(rules: CategoryRules) -> Result<Self> {
        Ok(Self {
            rules: Arc::new(rules),
            hex_run: rules::compile(r"[0-9a-f]{16,}")?,
        })
    }

    /// Classifier over the built-in tables
    pub fn builtin() -> Result<Self> {
        Self::new(CategoryRules::builtin()?)
    }

    /// Resolve a name (and optionally its group) to a leaf category
    pub fn classify(&self, name: &str, group: Option<&str>) -> CategoryId {
        let category = self.resolve(name, group);
        tracing::trace!(name, group, category = %category, "classified");
        category
    }

    fn resolve(&self, name: &str, group: Option<&str>) -> CategoryId {
        if self.is_hash(name) {
            return taxonomy::MISC_OTHER;
        }

        if let Some(group) = group {
            for (pattern, suggested) in &self.rules.suggestions {
                if !pattern.is_match(group) {
                    continue;
                }
                for category in suggested {
                    if let Some(leaf) = self.rules.resolve_suggestion(*category, name) {
                        return leaf;
                    }
                }
            }
        }

        self.rules
            .parent_order
            .iter()
            .find_map(|parent| self.rules.resolve_parent(*parent, name))
            .unwrap_or(taxonomy::MISC_OTHER)
    }

    /// Opaque hash: no word separators and a long run of hex digits
    fn is_hash(&self, name: &str) -> bool {
        let name = name.trim();
        !name.is_empty()
            && !name.contains(['.', ' ', '_', '-'])
            && self.hex_run.is_match(name)
    }
}
