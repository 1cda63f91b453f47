//! Credential extraction engine
//!
//! Entry pages are produced by a page builder and mark credentials up
//! inconsistently. The engine runs an ordered cascade of strategies over
//! progressively larger scopes and merges their results:
//!
//! 1. [`LabeledPairStrategy`]: innermost elements holding both labels
//! 2. [`ContainerClassStrategy`]: page builder text blocks
//! 3. [`LoginControlStrategy`]: `LOGIN` controls and their neighbours
//! 4. [`DocumentFallbackStrategy`]: the whole document, only if nothing else matched
//!
//! Results are merged by case-insensitive username; the first pair found for
//! a username wins.

mod patterns;
mod strategies;
mod validate;

pub use strategies::{
    ContainerClassStrategy, DocumentFallbackStrategy, ExtractionStrategy, LabeledPairStrategy,
    LoginControlStrategy,
};
pub use validate::{is_placeholder, is_valid_password, is_valid_username, PLACEHOLDERS};

use crate::config::ExtractionConfig;
use crate::ConfigError;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::HashSet;

/// How a username was matched to its password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Both values captured by one labeled match
    Labeled,
    /// Separate value lists of equal length, paired by index
    Positional,
    /// Separate value lists of unequal length, paired against the shorter list's first value
    Mismatched,
}

/// A validated credential pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedCredential {
    pub username: String,
    pub password: String,
    pub confidence: Confidence,
    /// Name of the strategy that produced the pair
    pub strategy: &'static str,
}

impl ExtractedCredential {
    pub fn new(username: &str, password: &str, confidence: Confidence, strategy: &'static str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            confidence,
            strategy,
        }
    }
}

/// Output of a strategy, and of the engine as a whole
///
/// `unpaired_usernames` holds valid usernames for which no password was
/// found. The engine keeps them only when no strategy found a complete pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub credentials: Vec<ExtractedCredential>,
    pub unpaired_usernames: Vec<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty() && self.unpaired_usernames.is_empty()
    }

    fn absorb(&mut self, other: Extraction) {
        self.credentials.extend(other.credentials);
        self.unpaired_usernames.extend(other.unpaired_usernames);
    }
}

/// Runs the strategy cascade
pub struct ExtractionEngine {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ExtractionEngine {
    /// Builds the default cascade from configuration
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let selectors = config
            .container_selectors
            .iter()
            .map(|s| {
                Selector::parse(s).map_err(|e| {
                    ConfigError::Validation(format!("Invalid container selector '{}': {:?}", s, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::with_strategies(vec![
            Box::new(LabeledPairStrategy),
            Box::new(ContainerClassStrategy::new(selectors)),
            Box::new(LoginControlStrategy::new(config.login_lookahead)),
            Box::new(DocumentFallbackStrategy),
        ]))
    }

    /// Builds an engine from an explicit, ordered strategy list
    pub fn with_strategies(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Extracts credentials from raw entry page markup
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_sync::config::ExtractionConfig;
    /// use catalog_sync::ExtractionEngine;
    ///
    /// let engine = ExtractionEngine::new(&ExtractionConfig::default()).unwrap();
    /// let found = engine.extract("<p>USER: coolgamer99\nPASS: Xk9#mQ2p</p>");
    /// assert_eq!(found.credentials[0].username, "coolgamer99");
    /// ```
    pub fn extract(&self, html: &str) -> Extraction {
        let document = Html::parse_document(html);
        self.extract_document(&document)
    }

    /// Extracts credentials from a parsed document
    pub fn extract_document(&self, document: &Html) -> Extraction {
        let mut credentials: Vec<ExtractedCredential> = Vec::new();
        let mut seen = HashSet::new();
        let mut unpaired: Vec<String> = Vec::new();

        for strategy in &self.strategies {
            if strategy.is_fallback() && !credentials.is_empty() {
                continue;
            }

            let output = strategy.try_extract(document);
            tracing::trace!(
                "Strategy {} found {} pairs, {} unpaired",
                strategy.name(),
                output.credentials.len(),
                output.unpaired_usernames.len()
            );

            for credential in output.credentials {
                if seen.insert(credential.username.to_lowercase()) {
                    if credential.confidence == Confidence::Mismatched {
                        tracing::warn!(
                            "Best-effort pairing for {} from {} (value counts differ)",
                            credential.username,
                            credential.strategy
                        );
                    }
                    credentials.push(credential);
                }
            }

            if !strategy.is_fallback() {
                unpaired.extend(output.unpaired_usernames);
            }
        }

        let unpaired_usernames = if credentials.is_empty() {
            let mut held = HashSet::new();
            unpaired
                .into_iter()
                .filter(|u| held.insert(u.to_lowercase()))
                .collect()
        } else {
            Vec::new()
        };

        Extraction {
            credentials,
            unpaired_usernames,
        }
    }
}
