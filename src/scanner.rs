//! Query-text scanning: pulls column-like tokens out of natural-language
//! questions and generated SQL, then checks them against the schema.
//!
//! Both extractors are pattern based, not parsers. They are meant to catch
//! the common shapes ("show email", "where status is", `SELECT a, b FROM`),
//! and the matcher decides what the tokens actually refer to.

use crate::catalog::build_catalog;
use crate::matcher::ColumnMatcher;
use crate::schema::SchemaMap;
use crate::vocabulary::Vocabulary;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Lookup depth for every scanned token.
const SCAN_TOP_N: usize = 3;

lazy_static! {
    /// Phrasal cues that usually sit next to a column name.
    static ref COLUMN_CUES: Vec<Regex> = [
        r"by (\w+)",
        r"where (\w+)",
        r"select (\w+)",
        r"show (\w+)",
        r"find (\w+)",
        r"with (\w+)",
        r"(\w+) is",
        r"(\w+) equals",
        r"(\w+) contains",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    /// Clause regions that hold column references.
    static ref SQL_COLUMN_REGIONS: Vec<Regex> = [
        r"(?is)SELECT\s+(.+?)\s+FROM",
        r"(?is)WHERE\s+([^=<>!]+?)(?:\s*[=<>!]|\s+LIKE|\s+IN)",
        r"(?is)ORDER\s+BY\s+([^,\s]+)",
        r"(?is)GROUP\s+BY\s+([^,\s]+)",
        r"(?is)JOIN\s+\w+\s+ON\s+([^=\s]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref SORT_DIRECTION: Regex = Regex::new(r"(?i)\s*(ASC|DESC)\s*$").unwrap();
    static ref NUMERIC_LITERAL: Regex = Regex::new(r"^[\d.+\-]+$").unwrap();
}

/// Column-like words in a natural-language question.
///
/// Union of words found next to phrasal cues and the common field words
/// that appear anywhere in the text, minus short words, stop words and
/// anything that is not purely alphabetic.
pub fn extract_candidate_tokens(text: &str, vocabulary: &Vocabulary) -> BTreeSet<String> {
    let lower = text.to_lowercase();
    let mut candidates: HashSet<String> = HashSet::new();

    for cue in COLUMN_CUES.iter() {
        for caps in cue.captures_iter(&lower) {
            if let Some(word) = caps.get(1) {
                candidates.insert(word.as_str().to_string());
            }
        }
    }

    for field in vocabulary.common_fields() {
        if lower.contains(field) {
            candidates.insert(field.to_string());
        }
    }

    candidates
        .into_iter()
        .filter(|word| word.chars().count() > 2)
        .filter(|word| !vocabulary.is_stop_word(word))
        .filter(|word| word.chars().all(char::is_alphabetic))
        .collect()
}

/// Column references in a SQL string, in clause order, without keywords,
/// function calls or literals. Repeated references are reported once.
pub fn extract_sql_column_refs(sql: &str, vocabulary: &Vocabulary) -> Vec<String> {
    let mut refs = Vec::new();
    for region in SQL_COLUMN_REGIONS.iter() {
        for caps in region.captures_iter(sql) {
            let Some(list) = caps.get(1) else { continue };
            for item in list.as_str().split(',') {
                let cleaned = SORT_DIRECTION.replace(item.trim(), "");
                let cleaned = cleaned
                    .trim_matches(|c: char| c == '`' || c == '"' || c == '\'')
                    .trim();
                if cleaned.is_empty() || is_sql_keyword_or_function(cleaned, vocabulary) {
                    continue;
                }
                refs.push(cleaned.to_string());
            }
        }
    }
    refs.into_iter().unique().collect()
}

/// Keywords, function calls, numeric literals and quoted strings are not columns.
pub fn is_sql_keyword_or_function(term: &str, vocabulary: &Vocabulary) -> bool {
    let lower = term.trim().to_lowercase();
    if vocabulary.is_sql_keyword(&lower) {
        return true;
    }
    if term.contains('(') || term.contains(')') {
        return true;
    }
    if NUMERIC_LITERAL.is_match(&lower) {
        return true;
    }
    let quoted = |q: char| term.len() >= 2 && term.starts_with(q) && term.ends_with(q);
    quoted('\'') || quoted('"')
}

/// Outcome of checking a SQL string's column references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlValidation {
    pub is_valid: bool,
    /// Display lines: a header per suspicious column, up to three candidates, a blank line.
    pub suggestions: Vec<String>,
}

/// Natural-language query with column hints applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessedQuery {
    /// The query with confidently matched tokens replaced by `Table.Column`.
    pub enhanced_query: String,
    pub suggestions: Vec<String>,
}

impl ColumnMatcher {
    /// Candidate column words in a natural-language question.
    pub fn extract_candidate_tokens(&self, text: &str) -> BTreeSet<String> {
        extract_candidate_tokens(text, self.vocabulary())
    }

    /// Candidate column references in a SQL string.
    pub fn extract_sql_column_refs(&self, sql: &str) -> Vec<String> {
        extract_sql_column_refs(sql, self.vocabulary())
    }

    /// Flag column references that do not exist in `schema` and have no
    /// near-certain replacement. References with no candidate at all are left alone.
    ///
    /// A reference repeated in the statement is checked once, so it yields a
    /// single suggestion block however often it occurs.
    pub fn validate_sql_columns(&self, sql: &str, schema: &SchemaMap) -> SqlValidation {
        let catalog = build_catalog(schema, self.vocabulary());
        let known: HashSet<String> = catalog
            .iter()
            .flat_map(|c| {
                [
                    c.normalized_name.clone(),
                    format!("{}.{}", c.table.to_lowercase(), c.normalized_name),
                ]
            })
            .collect();

        let mut flagged = 0usize;
        let mut suggestions = Vec::new();

        for reference in self.extract_sql_column_refs(sql) {
            if known.contains(&reference.to_lowercase()) {
                continue;
            }
            let matches = self.find_matches_in_catalog(&reference, &catalog, SCAN_TOP_N);
            let Some(best) = matches.first() else {
                debug!(column = %reference, "No candidates for SQL column reference");
                continue;
            };
            if best.similarity_score >= self.config().accept_score {
                continue;
            }

            warn!(
                column = %reference,
                best = %best.qualified_name(),
                score = best.similarity_score,
                "SQL references an unknown column"
            );
            flagged += 1;
            suggestions.push(format!("Potential issue with column '{}':", reference));
            for m in &matches {
                suggestions.push(format!(
                    "  • Did you mean {}? (similarity: {:.1}%)",
                    m.qualified_name(),
                    m.similarity_score
                ));
            }
            suggestions.push(String::new());
        }

        let is_valid = flagged == 0;
        info!(is_valid, flagged, "Validated SQL columns");
        SqlValidation { is_valid, suggestions }
    }

    /// Suggest schema columns for words in a question before it is sent for
    /// SQL generation, rewriting the words whose best match is strong enough.
    pub fn preprocess_query(&self, query: &str, schema: &SchemaMap) -> PreprocessedQuery {
        let catalog = build_catalog(schema, self.vocabulary());
        let config = self.config();
        let mut enhanced_query = query.to_string();
        let mut suggestions = Vec::new();

        for token in self.extract_candidate_tokens(query) {
            let matches = self.find_matches_in_catalog(&token, &catalog, SCAN_TOP_N);
            let Some(best) = matches.first() else { continue };
            if best.similarity_score >= config.accept_score {
                continue;
            }

            let mut suggestion = format!("For '{}', consider: {}", token, best.qualified_name());
            if best.similarity_score < config.annotate_below {
                suggestion.push_str(&format!(" (similarity: {:.1}%)", best.similarity_score));
            }
            suggestions.push(suggestion);

            if best.similarity_score > config.rewrite_above {
                enhanced_query = enhanced_query.replace(&token, &best.qualified_name());
            }
        }

        debug!(suggestions = suggestions.len(), "Preprocessed query");
        PreprocessedQuery {
            enhanced_query,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnInfo;

    fn vocab() -> Vocabulary {
        Vocabulary::standard()
    }

    fn contact_schema() -> SchemaMap {
        let mut schema = SchemaMap::new();
        schema.insert(
            "Contact".to_string(),
            ["Name", "Email", "LastName", "Status"]
                .iter()
                .map(|c| ColumnInfo::new(*c))
                .collect(),
        );
        schema
    }

    #[test]
    fn test_candidate_tokens_from_question() {
        let tokens = extract_candidate_tokens(
            "Show me the email of every instructor where status is active",
            &vocab(),
        );
        let expected: BTreeSet<String> = ["active", "email", "instructor", "status"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_candidate_tokens_cues_and_fields() {
        let tokens = extract_candidate_tokens("List students by semester with grade above 90", &vocab());
        let expected: BTreeSet<String> = ["grade", "semester", "student"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(tokens, expected);
    }

    #[test]
    fn test_candidate_tokens_filters() {
        let tokens = extract_candidate_tokens("find x1 with it where that is", &vocab());
        // "it" is short, "that" is a stop word, "x1" is not alphabetic.
        assert!(tokens.is_empty(), "{:?}", tokens);
    }

    #[test]
    fn test_sql_column_refs() {
        let refs = extract_sql_column_refs(
            "SELECT Name, COUNT(*) AS total, Emial FROM Contact WHERE Stauts = 'Active' ORDER BY LastName DESC",
            &vocab(),
        );
        assert_eq!(refs, vec!["Name", "Emial", "Stauts", "LastName"]);
    }

    #[test]
    fn test_sql_refs_skip_keywords_and_literals() {
        let refs = extract_sql_column_refs("SELECT count, DISTINCT, `status`, 42 FROM t ORDER BY 1", &vocab());
        assert_eq!(refs, vec!["status"]);
    }

    #[test]
    fn test_sql_refs_join_and_group() {
        let refs = extract_sql_column_refs(
            "SELECT c.Email FROM Contact c JOIN Account ON c.AccountId = Account.Id GROUP BY c.Email",
            &vocab(),
        );
        assert_eq!(refs, vec!["c.Email", "c.AccountId"]);
    }

    #[test]
    fn test_keyword_predicate() {
        let v = vocab();
        assert!(is_sql_keyword_or_function("SELECT", &v));
        assert!(is_sql_keyword_or_function("max(amount)", &v));
        assert!(is_sql_keyword_or_function("-1.5", &v));
        assert!(is_sql_keyword_or_function("'Active'", &v));
        assert!(is_sql_keyword_or_function("\"x\"", &v));
        assert!(!is_sql_keyword_or_function("Email", &v));
    }

    #[test]
    fn test_validate_sql_flags_typos() {
        let matcher = ColumnMatcher::default();
        let validation = matcher.validate_sql_columns(
            "SELECT Name, Emial FROM Contact WHERE Status = 'Active'",
            &contact_schema(),
        );
        assert!(!validation.is_valid);
        assert_eq!(validation.suggestions[0], "Potential issue with column 'Emial':");
        assert_eq!(
            validation.suggestions[1],
            "  • Did you mean Contact.Email? (similarity: 80.0%)"
        );
        assert_eq!(validation.suggestions.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_validate_sql_accepts_known_columns() {
        let matcher = ColumnMatcher::default();
        let validation = matcher.validate_sql_columns(
            "SELECT contact.name, EMAIL FROM Contact ORDER BY LastName",
            &contact_schema(),
        );
        assert!(validation.is_valid);
        assert!(validation.suggestions.is_empty());
    }

    #[test]
    fn test_preprocess_rewrites_confident_matches() {
        let mut schema = contact_schema();
        schema.insert("Session".to_string(), vec![ColumnInfo::new("Status")]);
        schema.get_mut("Contact").unwrap().retain(|c| c.name == "Email");

        let matcher = ColumnMatcher::default();
        let result = matcher.preprocess_query("show sttaus and email", &schema);
        // "email" resolves exactly and needs no hint.
        assert_eq!(
            result.suggestions,
            vec!["For 'sttaus', consider: Session.Status (similarity: 83.3%)".to_string()]
        );
        assert_eq!(result.enhanced_query, "show Session.Status and email");
    }

    #[test]
    fn test_preprocess_without_candidates() {
        let matcher = ColumnMatcher::default();
        let result = matcher.preprocess_query("how many?", &contact_schema());
        assert_eq!(result.enhanced_query, "how many?");
        assert!(result.suggestions.is_empty());
    }
}
