use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Keyword lists shipped with the binary, used when the config file has no
/// `[categories]` table.
pub const DEFAULT_RULES_TOML: &str = include_str!("../default_rules.toml");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new<S: Into<String>>(name: &str, keywords: impl IntoIterator<Item = S>) -> Self {
        CategoryRule {
            name: name.to_string(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-sensitive substring match against any keyword.
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|kw| text.contains(kw.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification<'a> {
    Category(&'a str),
    Unmatched,
    /// Two or more distinct categories matched.
    Ambiguous(Vec<&'a str>),
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Category '{0}' is defined more than once")]
    DuplicateCategory(String),
    #[error("Category '{0}' has no keywords")]
    NoKeywords(String),
    #[error("Category '{0}' has an empty keyword")]
    EmptyKeyword(String),
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct RulesFile {
    categories: BTreeMap<String, Vec<String>>,
}

/// Category → keyword table. Immutable once built.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, RuleError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(RuleError::DuplicateCategory(rule.name.clone()));
            }
            if rule.keywords.is_empty() {
                return Err(RuleError::NoKeywords(rule.name.clone()));
            }
            // "" is a substring of every description.
            if rule.keywords.iter().any(|kw| kw.is_empty()) {
                return Err(RuleError::EmptyKeyword(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn from_map(categories: BTreeMap<String, Vec<String>>) -> Result<Self, RuleError> {
        let rules = categories
            .into_iter()
            .map(|(name, keywords)| CategoryRule { name, keywords })
            .collect();
        Self::new(rules)
    }

    /// Parses a document with a `[categories]` table of `name = [keywords]`.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RulesFile = toml::from_str(toml_content)?;
        Self::from_map(file.categories)
    }

    pub fn default_rules() -> Result<Self, RuleError> {
        Self::from_toml(DEFAULT_RULES_TOML)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Every category with at least one keyword found in `text`.
    pub fn matched_categories(&self, text: &str) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(text))
            .map(|rule| rule.name.as_str())
            .collect()
    }

    /// The single matching category, or `None` when nothing or more than one
    /// category matched. Stops scanning at the second distinct match.
    pub fn classify(&self, text: &str) -> Option<&str> {
        let mut matched = self.rules.iter().filter(|rule| rule.matches(text));
        let first = matched.next()?;
        match matched.next() {
            Some(_) => None,
            None => Some(first.name.as_str()),
        }
    }

    pub fn explain(&self, text: &str) -> Classification<'_> {
        let matched = self.matched_categories(text);
        match matched.len() {
            0 => Classification::Unmatched,
            1 => Classification::Category(matched[0]),
            _ => Classification::Ambiguous(matched),
        }
    }
}
