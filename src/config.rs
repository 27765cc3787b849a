//! Matcher configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! JSON file, then `SCHEMA_MATCH_*` environment variables (a `.env` file is
//! honoured by the binary).
//!
//! ```json
//! {
//!   "similarity_threshold": 70,
//!   "exact_threshold": 90,
//!   "scorer": "indel",
//!   "extra_aliases": { "instructor": ["mentor", "coach"] }
//! }
//! ```

use crate::error::{MatchError, Result};
use crate::similarity::ScorerBackend;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum weighted-ratio score for a name-level fuzzy match.
    pub similarity_threshold: f64,
    /// Fuzzy scores at or above this are reported as `exact`.
    pub exact_threshold: f64,
    /// Context-text matching uses `max(context_floor, similarity_threshold - context_offset)`.
    pub context_floor: f64,
    pub context_offset: f64,
    /// Result count when the caller does not pass one.
    pub default_top_n: usize,
    /// Best-match score at which a token counts as resolved.
    pub accept_score: f64,
    /// Preprocessing suggestions carry the score when below this.
    pub annotate_below: f64,
    /// Tokens whose best match scores above this are rewritten in place.
    pub rewrite_above: f64,
    pub scorer: ScorerBackend,
    /// Canonical term -> additional synonyms.
    pub extra_aliases: BTreeMap<String, Vec<String>>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 70.0,
            exact_threshold: 90.0,
            context_floor: 60.0,
            context_offset: 10.0,
            default_top_n: 5,
            accept_score: 95.0,
            annotate_below: 85.0,
            rewrite_above: 80.0,
            scorer: ScorerBackend::Indel,
            extra_aliases: BTreeMap::new(),
        }
    }
}

impl MatcherConfig {
    /// Threshold applied to context (search text) matches.
    pub fn context_threshold(&self) -> f64 {
        self.context_floor.max(self.similarity_threshold - self.context_offset)
    }

    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| MatchError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `SCHEMA_MATCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(v) = env_f64("SCHEMA_MATCH_SIMILARITY_THRESHOLD")? {
            self.similarity_threshold = v;
        }
        if let Some(v) = env_f64("SCHEMA_MATCH_EXACT_THRESHOLD")? {
            self.exact_threshold = v;
        }
        if let Some(v) = env_f64("SCHEMA_MATCH_ACCEPT_SCORE")? {
            self.accept_score = v;
        }
        if let Ok(raw) = env::var("SCHEMA_MATCH_TOP_N") {
            self.default_top_n = raw.trim().parse().map_err(|_| {
                MatchError::Config(format!("SCHEMA_MATCH_TOP_N must be a non-negative integer, got '{}'", raw))
            })?;
        }
        if let Ok(raw) = env::var("SCHEMA_MATCH_SCORER") {
            self.scorer = raw.parse().map_err(MatchError::Config)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let scores = [
            ("similarity_threshold", self.similarity_threshold),
            ("exact_threshold", self.exact_threshold),
            ("context_floor", self.context_floor),
            ("accept_score", self.accept_score),
            ("annotate_below", self.annotate_below),
            ("rewrite_above", self.rewrite_above),
        ];
        for (name, value) in scores {
            if !(0.0..=100.0).contains(&value) {
                return Err(MatchError::Config(format!("{} must be within 0-100, got {}", name, value)));
            }
        }
        if self.exact_threshold < self.similarity_threshold {
            return Err(MatchError::Config(format!(
                "exact_threshold ({}) is below similarity_threshold ({})",
                self.exact_threshold, self.similarity_threshold
            )));
        }
        Ok(())
    }
}

fn env_f64(key: &str) -> Result<Option<f64>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| MatchError::Config(format!("{} must be a number, got '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}
