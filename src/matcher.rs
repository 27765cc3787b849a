//! Column match engine.
//!
//! Ranks catalog columns for a single term in four phases:
//! 1. exact: case-insensitive name equality (100)
//! 2. alias: the term is a known synonym and the canonical term occurs in the name (95)
//! 3. fuzzy: weighted ratio against names, then partial ratio against search text
//! 4. pattern: custom-field suffix (90) and compound-word parts (80)
//!
//! Phases 3 and 4 only run while fewer than `top_n` matches have been found.
//! A (column, table) pair is reported once; the first phase to find it keeps
//! it, except that the custom-field suffix rule replaces a weaker fuzzy hit on
//! the same column.

use crate::catalog::{build_catalog, ColumnDescriptor, CUSTOM_FIELD_SUFFIX};
use crate::config::MatcherConfig;
use crate::schema::SchemaMap;
use crate::similarity::{extract, PartialRatio, Scorer, WeightedRatio};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const EXACT_SCORE: f64 = 100.0;
const ALIAS_SCORE: f64 = 95.0;
const SUFFIX_SCORE: f64 = 90.0;
const PARTIAL_WORD_SCORE: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Alias,
    Fuzzy,
    Pattern,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchType::Exact => "exact",
            MatchType::Alias => "alias",
            MatchType::Fuzzy => "fuzzy",
            MatchType::Pattern => "pattern",
        };
        f.write_str(name)
    }
}

/// A ranked candidate column for a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMatch {
    /// The term as the caller passed it.
    pub original_term: String,
    pub matched_column: String,
    pub table_name: String,
    /// 0-100
    pub similarity_score: f64,
    pub match_type: MatchType,
    /// Why the column matched; `None` for plain exact matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ColumnMatch {
    /// `Table.Column`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.table_name, self.matched_column)
    }

    fn is_same_column(&self, column: &ColumnDescriptor) -> bool {
        self.matched_column == column.name && self.table_name == column.table
    }
}

/// Collects matches in discovery order, one per (column, table) pair.
struct Accumulator<'a> {
    term: &'a str,
    matches: Vec<ColumnMatch>,
}

impl<'a> Accumulator<'a> {
    fn new(term: &'a str) -> Self {
        Self {
            term,
            matches: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.matches.len()
    }

    fn position(&self, column: &ColumnDescriptor) -> Option<usize> {
        self.matches.iter().position(|m| m.is_same_column(column))
    }

    fn build(&self, column: &ColumnDescriptor, score: f64, match_type: MatchType, suggestion: Option<String>) -> ColumnMatch {
        ColumnMatch {
            original_term: self.term.to_string(),
            matched_column: column.name.clone(),
            table_name: column.table.clone(),
            similarity_score: score,
            match_type,
            suggestion,
        }
    }

    /// Adds the match unless the pair is already present.
    fn add(&mut self, column: &ColumnDescriptor, score: f64, match_type: MatchType, suggestion: Option<String>) {
        if self.position(column).is_none() {
            let found = self.build(column, score, match_type, suggestion);
            self.matches.push(found);
        }
    }

    /// Adds the match, or replaces an existing entry for the pair that scored lower.
    fn add_or_upgrade(&mut self, column: &ColumnDescriptor, score: f64, match_type: MatchType, suggestion: Option<String>) {
        match self.position(column) {
            Some(idx) if self.matches[idx].similarity_score < score => {
                self.matches[idx] = self.build(column, score, match_type, suggestion);
            }
            Some(_) => {}
            None => {
                let found = self.build(column, score, match_type, suggestion);
                self.matches.push(found);
            }
        }
    }

    fn finish(mut self, top_n: usize) -> Vec<ColumnMatch> {
        // sort_by is stable: equal scores keep discovery order.
        self.matches.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.matches.truncate(top_n);
        self.matches
    }
}

/// Fuzzy column matcher. Holds only read-only state, so one instance can
/// serve concurrent callers.
pub struct ColumnMatcher {
    config: MatcherConfig,
    vocabulary: Vocabulary,
    name_scorer: Box<dyn Scorer>,
    context_scorer: Box<dyn Scorer>,
}

impl Default for ColumnMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

impl ColumnMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        let vocabulary = Vocabulary::with_extra_aliases(config.extra_aliases.clone());
        Self::with_vocabulary(config, vocabulary)
    }

    pub fn with_vocabulary(config: MatcherConfig, vocabulary: Vocabulary) -> Self {
        let backend = config.scorer;
        Self {
            config,
            vocabulary,
            name_scorer: Box::new(WeightedRatio { backend }),
            context_scorer: Box::new(PartialRatio { backend }),
        }
    }

    /// Replace the similarity scorers. The thresholds in the config must suit them.
    pub fn with_scorers(mut self, name_scorer: Box<dyn Scorer>, context_scorer: Box<dyn Scorer>) -> Self {
        self.name_scorer = name_scorer;
        self.context_scorer = context_scorer;
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Index `schema` and rank columns for `term`. At most `top_n` results,
    /// best first. An empty result means nothing matched.
    pub fn find_matches(&self, term: &str, schema: &SchemaMap, top_n: usize) -> Vec<ColumnMatch> {
        let catalog = build_catalog(schema, &self.vocabulary);
        self.find_matches_in_catalog(term, &catalog, top_n)
    }

    /// Same as [`find_matches`](Self::find_matches) with the configured default count.
    pub fn find_default_matches(&self, term: &str, schema: &SchemaMap) -> Vec<ColumnMatch> {
        self.find_matches(term, schema, self.config.default_top_n)
    }

    /// Rank columns of an already built catalog.
    pub fn find_matches_in_catalog(&self, term: &str, catalog: &[ColumnDescriptor], top_n: usize) -> Vec<ColumnMatch> {
        let term_lower = term.trim().to_lowercase();
        let mut found = Accumulator::new(term);

        self.exact_phase(&term_lower, catalog, &mut found);
        self.alias_phase(&term_lower, catalog, &mut found);
        let after_lookup = found.len();

        if found.len() < top_n {
            self.fuzzy_phase(&term_lower, catalog, top_n, &mut found);
        }
        let after_fuzzy = found.len();

        if found.len() < top_n {
            self.pattern_phase(&term_lower, catalog, &mut found);
        }

        debug!(
            term,
            catalog = catalog.len(),
            lookup = after_lookup,
            fuzzy = after_fuzzy - after_lookup,
            pattern = found.len() - after_fuzzy,
            "Ranked column candidates"
        );
        found.finish(top_n)
    }

    fn exact_phase(&self, term: &str, catalog: &[ColumnDescriptor], found: &mut Accumulator) {
        for column in catalog.iter().filter(|c| c.normalized_name == term) {
            found.add(column, EXACT_SCORE, MatchType::Exact, None);
        }
    }

    fn alias_phase(&self, term: &str, catalog: &[ColumnDescriptor], found: &mut Accumulator) {
        let Some(canonical) = self.vocabulary.canonical_for(term) else {
            return;
        };
        for column in catalog.iter().filter(|c| c.normalized_name.contains(canonical)) {
            let suggestion = format!(
                "'{}' is an alias of '{}', matched as '{}'",
                found.term, canonical, column.name
            );
            found.add(column, ALIAS_SCORE, MatchType::Alias, Some(suggestion));
        }
    }

    fn fuzzy_phase(&self, term: &str, catalog: &[ColumnDescriptor], top_n: usize, found: &mut Accumulator) {
        let names: Vec<&str> = catalog.iter().map(|c| c.normalized_name.as_str()).collect();
        for (idx, score) in extract(term, &names, self.name_scorer.as_ref(), top_n * 3) {
            if score < self.config.similarity_threshold {
                continue;
            }
            let column = &catalog[idx];
            if score >= self.config.exact_threshold {
                found.add(column, score, MatchType::Exact, None);
            } else {
                let suggestion = format!("Did you mean '{}'?", column.name);
                found.add(column, score, MatchType::Fuzzy, Some(suggestion));
            }
        }

        if found.len() >= top_n {
            return;
        }

        let threshold = self.config.context_threshold();
        let texts: Vec<&str> = catalog.iter().map(|c| c.search_text.as_str()).collect();
        for (idx, score) in extract(term, &texts, self.context_scorer.as_ref(), top_n * 2) {
            if score < threshold {
                continue;
            }
            let column = &catalog[idx];
            let suggestion = format!("Did you mean '{}'? (context match)", column.name);
            found.add(column, score, MatchType::Fuzzy, Some(suggestion));
        }
    }

    fn pattern_phase(&self, term: &str, catalog: &[ColumnDescriptor], found: &mut Accumulator) {
        if !term.ends_with(CUSTOM_FIELD_SUFFIX) {
            let custom_name = format!("{}{}", term, CUSTOM_FIELD_SUFFIX);
            for column in catalog.iter().filter(|c| c.normalized_name == custom_name) {
                let suggestion = format!(
                    "Custom field naming: '{}' -> '{}'",
                    found.term, column.name
                );
                found.add_or_upgrade(column, SUFFIX_SCORE, MatchType::Pattern, Some(suggestion));
            }
        }

        for column in catalog {
            if column.name_parts().iter().any(|part| part.contains(term)) {
                let suggestion = format!("Partial match: '{}' found in '{}'", found.term, column.name);
                found.add(column, PARTIAL_WORD_SCORE, MatchType::Pattern, Some(suggestion));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnInfo;
    use std::collections::HashSet;

    fn schema(tables: &[(&str, &[&str])]) -> SchemaMap {
        tables
            .iter()
            .map(|(table, columns)| {
                (
                    table.to_string(),
                    columns.iter().map(|c| ColumnInfo::new(*c)).collect(),
                )
            })
            .collect()
    }

    struct Never;

    impl Scorer for Never {
        fn score(&self, _: &str, _: &str) -> f64 {
            0.0
        }
    }

    fn crm_schema() -> SchemaMap {
        schema(&[
            ("Account", &["Id", "Name", "Type", "Record_Type_Name__c"]),
            ("Contact", &["Id", "FirstName", "LastName", "Email", "AccountId"]),
            ("Session", &["Name", "Session_Date__c", "Status", "Weekday_Short__c"]),
            (
                "ProgramInstructorAvailability",
                &["Account_Name__c", "Instructor_Name__c", "Monday_Start_Time__c"],
            ),
        ])
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let matcher = ColumnMatcher::default();
        let results = matcher.find_matches("EMAIL", &crm_schema(), 5);
        assert_eq!(results[0].matched_column, "Email");
        assert_eq!(results[0].table_name, "Contact");
        assert_eq!(results[0].similarity_score, 100.0);
        assert_eq!(results[0].match_type, MatchType::Exact);
        assert_eq!(results[0].suggestion, None);
        assert_eq!(results[0].original_term, "EMAIL");
    }

    #[test]
    fn test_exact_match_across_tables() {
        let matcher = ColumnMatcher::default();
        let results = matcher.find_matches("name", &crm_schema(), 5);
        let exact: Vec<_> = results
            .iter()
            .filter(|m| m.similarity_score == 100.0)
            .map(|m| m.table_name.as_str())
            .collect();
        assert_eq!(exact, vec!["Account", "Session"]);
    }

    #[test]
    fn test_alias_match() {
        let matcher = ColumnMatcher::default();
        let schema = schema(&[("ProgramInstructorAvailability", &["Instructor_Name__c"])]);
        let results = matcher.find_matches("teacher", &schema, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].match_type, MatchType::Alias);
        assert_eq!(results[0].similarity_score, 95.0);
        assert_eq!(results[0].matched_column, "Instructor_Name__c");
        assert!(results[0].suggestion.as_deref().unwrap().contains("instructor"));
    }

    #[test]
    fn test_table_context_can_outrank_alias() {
        // The availability table's context words include "teacher", so its
        // other columns surface as context matches scoring 100.
        let matcher = ColumnMatcher::default();
        let results = matcher.find_matches("teacher", &crm_schema(), 10);
        let alias = results
            .iter()
            .find(|m| m.matched_column == "Instructor_Name__c")
            .expect("instructor column");
        assert_eq!(alias.match_type, MatchType::Alias);
        assert_eq!(alias.similarity_score, 95.0);
        assert!(results
            .iter()
            .any(|m| m.matched_column == "Account_Name__c" && m.similarity_score == 100.0));
    }

    #[test]
    fn test_typo_is_fuzzy() {
        let matcher = ColumnMatcher::default();
        let results = matcher.find_matches("Sttaus", &crm_schema(), 3);
        assert_eq!(results[0].matched_column, "Status");
        assert_eq!(results[0].match_type, MatchType::Fuzzy);
        assert!(results[0].similarity_score >= 70.0 && results[0].similarity_score < 90.0);
        assert_eq!(results[0].suggestion.as_deref(), Some("Did you mean 'Status'?"));
    }

    #[test]
    fn test_custom_suffix_pattern() {
        let matcher = ColumnMatcher::default();
        let schema = schema(&[("Session", &["Session_Date__c"])]);
        let results = matcher.find_matches("Session_Date", &schema, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_column, "Session_Date__c");
        assert_eq!(results[0].match_type, MatchType::Pattern);
        assert_eq!(results[0].similarity_score, 90.0);
    }

    #[test]
    fn test_partial_word_pattern() {
        let matcher = ColumnMatcher::default();
        let schema = schema(&[("Session", &["Weekday_Short__c", "Status"])]);
        let results = matcher.find_matches("weekday", &schema, 5);
        let partial = results
            .iter()
            .find(|m| m.matched_column == "Weekday_Short__c")
            .unwrap();
        assert!(partial.similarity_score >= 80.0);
    }

    #[test]
    fn test_partial_word_fills_remaining_slots() {
        // Partial-word matching only gets a say when the scorers leave room.
        let matcher = ColumnMatcher::default().with_scorers(Box::new(Never), Box::new(Never));
        let schema = schema(&[("Widget", &["Created_By_Id", "Last_Created_Batch"])]);
        let results = matcher.find_matches("by", &schema, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_column, "Created_By_Id");
        assert_eq!(results[0].match_type, MatchType::Pattern);
        assert_eq!(results[0].similarity_score, 80.0);
    }

    #[test]
    fn test_empty_schema() {
        let matcher = ColumnMatcher::default();
        assert!(matcher.find_matches("anything", &SchemaMap::new(), 5).is_empty());
        assert!(matcher.find_matches("", &SchemaMap::new(), 5).is_empty());
    }

    #[test]
    fn test_empty_term_matches_every_name_part() {
        // The empty string is contained in every name part.
        let matcher = ColumnMatcher::default();
        let small = schema(&[("Session", &["Status", "Name"])]);
        let results = matcher.find_matches("", &small, 5);
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|m| m.match_type == MatchType::Pattern && m.similarity_score == 80.0));
        assert_eq!(results[0].matched_column, "Status");

        let crm = crm_schema();
        let total: usize = crm.values().map(Vec::len).sum();
        for top_n in [0, 3, 5, 50] {
            let results = matcher.find_matches("", &crm, top_n);
            assert_eq!(results.len(), top_n.min(total));
            assert!(results.iter().all(|m| m.similarity_score == 80.0));
        }
    }

    #[test]
    fn test_top_n_bound_and_ordering() {
        let matcher = ColumnMatcher::default();
        let schema = crm_schema();
        for term in ["name", "id", "teacher", "date", "acount", "time", "x"] {
            for k in 0..6 {
                let results = matcher.find_matches(term, &schema, k);
                assert!(results.len() <= k, "{} top {}", term, k);
                assert!(results
                    .windows(2)
                    .all(|w| w[0].similarity_score >= w[1].similarity_score));
                let pairs: HashSet<_> = results
                    .iter()
                    .map(|m| (m.table_name.clone(), m.matched_column.clone()))
                    .collect();
                assert_eq!(pairs.len(), results.len());
            }
        }
    }

    #[test]
    fn test_duplicate_catalog_entries_deduplicated() {
        let matcher = ColumnMatcher::default();
        let schema = schema(&[("Contact", &["Email", "Email"])]);
        let results = matcher.find_matches("email", &schema, 5);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_extra_aliases_from_config() {
        let mut config = MatcherConfig::default();
        config
            .extra_aliases
            .insert("instructor".to_string(), vec!["mentor".to_string()]);
        let matcher = ColumnMatcher::new(config);
        let results = matcher.find_matches("mentor", &crm_schema(), 5);
        assert_eq!(results[0].matched_column, "Instructor_Name__c");
        assert_eq!(results[0].match_type, MatchType::Alias);
    }

    #[test]
    fn test_custom_scorer() {
        let matcher = ColumnMatcher::default().with_scorers(Box::new(Never), Box::new(Never));
        let results = matcher.find_matches("Sttaus", &crm_schema(), 5);
        assert!(results.is_empty());
    }

    #[test]
    fn test_match_type_serializes_lowercase() {
        let json = serde_json::to_string(&MatchType::Pattern).unwrap();
        assert_eq!(json, "\"pattern\"");
        assert_eq!(MatchType::Alias.to_string(), "alias");
    }
}
