//! Keyword categorization rules
//!
//! Rules are applied in order; each matching rule overwrites the concept and
//! essential flag, so the last matching rule wins.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Transaction, DEFAULT_CONCEPT};
use crate::recurrence::{flag_recurring, RecurrenceConfig};

/// Embedded default rules (compiled into binary)
const DEFAULT_RULES: &str = include_str!("../../../config/rules.toml");

/// A category with the description keywords that select it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub concept: String,
    /// Lowercased; matched as substrings of the lowercased description
    pub keywords: Vec<String>,
    pub is_essential: bool,
}

impl CategoryRule {
    pub fn new(concept: impl Into<String>, keywords: &[&str], is_essential: bool) -> Self {
        Self {
            concept: concept.into(),
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            is_essential,
        }
    }

    /// Whether `description` (already lowercased) contains any keyword
    fn matches_lower(&self, description: &str) -> bool {
        self.keywords.iter().any(|k| description.contains(k.as_str()))
    }

    pub fn matches(&self, description: &str) -> bool {
        self.matches_lower(&description.to_lowercase())
    }
}

/// Ordered list of categorization rules
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: Vec<CategoryRule>,
}

#[derive(Debug, Deserialize)]
struct RawRuleFile {
    #[serde(default)]
    rules: Vec<RawRule>,
}

#[derive(Debug, Deserialize)]
struct RawRule {
    concept: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    is_essential: bool,
}

impl RuleSet {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        Self { rules }
    }

    /// The built-in rule set
    pub fn default_rules() -> Result<Self> {
        Self::parse(DEFAULT_RULES)
    }

    /// Load rules from a TOML file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read rules {}: {}", path.display(), e))
        })?;
        let rules = Self::parse(&content)?;
        info!("Loaded {} rules from {}", rules.len(), path.display());
        Ok(rules)
    }

    /// Override file when given, built-in rules otherwise
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        match override_path {
            Some(path) => Self::from_path(path),
            None => Self::default_rules(),
        }
    }

    /// Parse rules from TOML content
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawRuleFile = toml::from_str(content)
            .map_err(|e| Error::InvalidData(format!("Invalid rules TOML: {}", e)))?;

        let mut rules = Vec::with_capacity(raw.rules.len());
        for rule in raw.rules {
            if rule.concept.trim().is_empty() {
                return Err(Error::InvalidData("Rule with empty concept".into()));
            }
            let keywords: Vec<&str> = rule.keywords.iter().map(String::as_str).collect();
            let parsed = CategoryRule::new(rule.concept.trim(), &keywords, rule.is_essential);
            if parsed.keywords.is_empty() {
                debug!("Rule '{}' has no keywords and never matches", parsed.concept);
            }
            rules.push(parsed);
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule that decides the category of `description` (last match)
    pub fn classify(&self, description: &str) -> Option<&CategoryRule> {
        let lower = description.to_lowercase();
        self.rules.iter().rev().find(|r| r.matches_lower(&lower))
    }
}

/// Annotate a normalized batch with recurrence, essential flag and concept
///
/// Returns a new batch; the input is left untouched.
pub fn apply_fixed_rules(
    batch: &[Transaction],
    rules: &RuleSet,
    recurrence: &RecurrenceConfig,
) -> Vec<Transaction> {
    let recurring = flag_recurring(batch, recurrence);

    let annotated: Vec<Transaction> = batch
        .iter()
        .zip(recurring)
        .map(|(tx, is_recurring)| {
            let mut tx = tx.clone();
            tx.is_recurring = is_recurring;
            match rules.classify(&tx.description) {
                Some(rule) => {
                    tx.concept = rule.concept.clone();
                    tx.is_essential = rule.is_essential;
                }
                None => {
                    tx.concept = DEFAULT_CONCEPT.to_string();
                    tx.is_essential = false;
                }
            }
            tx
        })
        .collect();

    debug!(
        "Categorized {} of {} rows",
        annotated.iter().filter(|t| t.concept != DEFAULT_CONCEPT).count(),
        annotated.len()
    );
    annotated
}
