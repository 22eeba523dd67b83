//! Substitution rules
//!
//! A rule replaces one exact word with another. Matching is whole-word
//! (ASCII word boundaries, like `\b` in browser regular expressions) and
//! case-exact: each case variant the reader wants rewritten gets its own
//! rule. Rules are applied in order.

use std::borrow::Cow;

use regex_lite::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a rule or rule set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Substitution rule has an empty word")]
    EmptyWord,

    /// Word contains characters that cannot sit between word boundaries
    #[error("'{word}' is not a single word (only ASCII letters, digits and '_' are allowed)")]
    NotAWord { word: String },

    #[error("Invalid pattern for '{word}': {details}")]
    Pattern { word: String, details: String },

    /// Rewriting already-rewritten text would change it again
    #[error("Rules are not idempotent: '{word}' keeps changing ('{first}' then '{second}')")]
    NotIdempotent {
        word: String,
        first: String,
        second: String,
    },
}

/// Serializable form of a rule, as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub word: String,
    pub replacement: String,
}

impl RuleSpec {
    pub fn new(word: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            replacement: replacement.into(),
        }
    }
}

/// A compiled whole-word substitution
#[derive(Debug, Clone)]
pub struct SubstitutionRule {
    word: String,
    replacement: String,
    pattern: Regex,
}

impl SubstitutionRule {
    pub fn new(word: impl Into<String>, replacement: impl Into<String>) -> Result<Self, RuleError> {
        let word = word.into();
        if word.is_empty() {
            return Err(RuleError::EmptyWord);
        }
        if !word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(RuleError::NotAWord { word });
        }

        let pattern = Regex::new(&format!(r"\b{}\b", regex_lite::escape(&word))).map_err(|e| {
            RuleError::Pattern {
                word: word.clone(),
                details: e.to_string(),
            }
        })?;

        Ok(Self {
            word,
            replacement: replacement.into(),
            pattern,
        })
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    /// Replace every whole-word occurrence in `text`
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern
            .replace_all(text, NoExpand(self.replacement.as_str()))
    }
}

impl TryFrom<&RuleSpec> for SubstitutionRule {
    type Error = RuleError;

    fn try_from(spec: &RuleSpec) -> Result<Self, Self::Error> {
        Self::new(spec.word.clone(), spec.replacement.clone())
    }
}

/// Ordered, immutable set of rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<SubstitutionRule>,
}

impl RuleSet {
    /// Build a rule set, rejecting sets whose output would change on a second pass
    pub fn new(rules: Vec<SubstitutionRule>) -> Result<Self, RuleError> {
        let set = Self { rules };
        set.check_idempotent()?;
        Ok(set)
    }

    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, RuleError> {
        let rules = specs
            .iter()
            .map(SubstitutionRule::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(rules)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubstitutionRule> {
        self.rules.iter()
    }

    /// Apply every rule in order
    ///
    /// Returns `Cow::Borrowed` when nothing matched.
    pub fn rewrite<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(text);
        for rule in &self.rules {
            let changed = match rule.apply(&current) {
                Cow::Borrowed(_) => None,
                Cow::Owned(changed) => Some(changed),
            };
            if let Some(changed) = changed {
                current = Cow::Owned(changed);
            }
        }
        current
    }

    fn check_idempotent(&self) -> Result<(), RuleError> {
        for rule in &self.rules {
            for word in [rule.word(), rule.replacement()] {
                let first = self.rewrite(word).into_owned();
                let second = self.rewrite(&first).into_owned();
                if second != first {
                    return Err(RuleError::NotIdempotent {
                        word: word.to_string(),
                        first,
                        second,
                    });
                }
            }
        }
        Ok(())
    }
}
