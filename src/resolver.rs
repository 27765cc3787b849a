//! Error-message resolver: turns database "unknown column" errors into
//! correction suggestions.

use crate::catalog::build_catalog;
use crate::matcher::{ColumnMatch, ColumnMatcher};
use crate::schema::SchemaMap;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const RESOLVE_TOP_N: usize = 3;

lazy_static! {
    /// MySQL, SQL Server, PostgreSQL and SQLite phrasings.
    static ref UNKNOWN_COLUMN_PATTERNS: Vec<Regex> = [
        r"(?i)Unknown column '([^']+)'",
        r"(?i)Column '([^']+)' doesn't exist",
        r"(?i)Invalid column name '([^']+)'",
        r#"(?i)column "([^"]+)" does not exist"#,
        r"(?i)no such column: ([^\s]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Identifiers named by known "unknown column" phrasings, as written in the message.
pub fn extract_error_columns(error_message: &str) -> Vec<String> {
    UNKNOWN_COLUMN_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(error_message))
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .unique()
        .collect()
}

/// `alias.Column` -> `Column`
fn strip_qualifier(identifier: &str) -> &str {
    identifier.rsplit('.').next().unwrap_or(identifier)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    pub error_type: String,
    pub original_error: String,
    pub suggestions: Vec<String>,
    /// The failed SQL with confident corrections applied.
    pub corrected_sql: String,
    /// Unresolved identifier -> best `Table.Column`.
    pub column_corrections: BTreeMap<String, String>,
}

impl ColumnMatcher {
    /// Suggestion lines for every column named in `error_message`.
    /// Messages in an unknown format produce no lines.
    pub fn resolve_error_columns(&self, error_message: &str, schema: &SchemaMap) -> Vec<String> {
        self.resolve(error_message, schema)
            .into_iter()
            .flat_map(|(identifier, matches)| suggestion_block(&identifier, &matches))
            .collect()
    }

    /// Full analysis of a failed query: suggestion lines, the best candidate
    /// per unresolved column and a corrected SQL string.
    pub fn analyze_sql_error(&self, error_message: &str, sql: &str, schema: &SchemaMap) -> ErrorAnalysis {
        let mut suggestions = Vec::new();
        let mut column_corrections = BTreeMap::new();
        let mut corrected_sql = sql.to_string();

        for (identifier, matches) in self.resolve(error_message, schema) {
            suggestions.extend(suggestion_block(&identifier, &matches));
            let best = &matches[0];
            let bare = strip_qualifier(&identifier);
            column_corrections.insert(bare.to_string(), best.qualified_name());

            if best.similarity_score >= self.config().rewrite_above {
                corrected_sql = replace_identifier(&corrected_sql, bare, &best.matched_column);
            }
        }

        info!(
            corrections = column_corrections.len(),
            rewritten = corrected_sql != sql,
            "Analyzed SQL error"
        );
        ErrorAnalysis {
            error_type: "column_name_error".to_string(),
            original_error: error_message.to_string(),
            suggestions,
            corrected_sql,
            column_corrections,
        }
    }

    /// Identifiers from the message paired with their (non-empty) ranked matches.
    fn resolve(&self, error_message: &str, schema: &SchemaMap) -> Vec<(String, Vec<ColumnMatch>)> {
        let identifiers = extract_error_columns(error_message);
        if identifiers.is_empty() {
            debug!("No unknown-column phrasing in error message");
            return Vec::new();
        }

        let catalog = build_catalog(schema, self.vocabulary());
        identifiers
            .into_iter()
            .filter_map(|identifier| {
                let matches = self.find_matches_in_catalog(strip_qualifier(&identifier), &catalog, RESOLVE_TOP_N);
                if matches.is_empty() {
                    debug!(column = %identifier, "No candidates for unresolved column");
                    None
                } else {
                    Some((identifier, matches))
                }
            })
            .collect()
    }
}

fn suggestion_block(identifier: &str, matches: &[ColumnMatch]) -> Vec<String> {
    let mut lines = Vec::with_capacity(matches.len() + 2);
    if let Some(best) = matches.first() {
        lines.push(format!(
            "Column '{}' not found. Did you mean '{}'?",
            identifier, best.matched_column
        ));
    }
    for m in matches {
        lines.push(format!("  • {} (similarity: {:.1}%)", m.qualified_name(), m.similarity_score));
    }
    lines.push(String::new());
    lines
}

fn replace_identifier(sql: &str, from: &str, to: &str) -> String {
    let pattern = format!(r"\b{}\b", regex::escape(from));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(sql, regex::NoExpand(to)).into_owned(),
        Err(e) => {
            warn!(identifier = from, error = %e, "Could not build replacement pattern, SQL left unchanged");
            sql.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnInfo;

    fn session_schema() -> SchemaMap {
        let mut schema = SchemaMap::new();
        schema.insert(
            "Session".to_string(),
            vec![ColumnInfo::new("Name"), ColumnInfo::new("Status")],
        );
        schema
    }

    #[test]
    fn test_extract_error_columns_per_dialect() {
        assert_eq!(extract_error_columns("Unknown column 'Sttaus' in 'field list'"), vec!["Sttaus"]);
        assert_eq!(extract_error_columns("ERROR: column \"s.sttaus\" does not exist"), vec!["s.sttaus"]);
        assert_eq!(extract_error_columns("no such column: nmae"), vec!["nmae"]);
        assert_eq!(extract_error_columns("Invalid column name 'Stat'."), vec!["Stat"]);
        assert_eq!(extract_error_columns("COLUMN 'x' DOESN'T EXIST"), vec!["x"]);
        assert!(extract_error_columns("syntax error near FROM").is_empty());
    }

    #[test]
    fn test_resolve_unknown_column() {
        let matcher = ColumnMatcher::default();
        let lines = matcher.resolve_error_columns("Unknown column 'Sttaus' in 'field list'", &session_schema());
        assert_eq!(lines[0], "Column 'Sttaus' not found. Did you mean 'Status'?");
        assert_eq!(lines[1], "  • Session.Status (similarity: 83.3%)");
        assert_eq!(lines.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_resolve_strips_qualifier() {
        let matcher = ColumnMatcher::default();
        let lines = matcher.resolve_error_columns("no such column: s.Sttaus", &session_schema());
        assert!(lines[0].starts_with("Column 's.Sttaus' not found"));
        assert!(lines.iter().any(|l| l.contains("Session.Status")));
    }

    #[test]
    fn test_unrecognized_message_is_empty() {
        let matcher = ColumnMatcher::default();
        assert!(matcher
            .resolve_error_columns("deadlock detected", &session_schema())
            .is_empty());
        assert!(matcher
            .resolve_error_columns("Unknown column 'Sttaus'", &SchemaMap::new())
            .is_empty());
    }

    #[test]
    fn test_analyze_sql_error_corrects_sql() {
        let matcher = ColumnMatcher::default();
        let analysis = matcher.analyze_sql_error(
            "Unknown column 's.Sttaus' in 'where clause'",
            "SELECT s.Name FROM Session s WHERE s.Sttaus = 'Sttaus_x'",
            &session_schema(),
        );
        assert_eq!(analysis.error_type, "column_name_error");
        assert_eq!(analysis.column_corrections["Sttaus"], "Session.Status");
        // Whole words only.
        assert_eq!(
            analysis.corrected_sql,
            "SELECT s.Name FROM Session s WHERE s.Status = 'Sttaus_x'"
        );
        assert!(!analysis.suggestions.is_empty());
    }

    #[test]
    fn test_analyze_keeps_sql_for_weak_matches() {
        let matcher = ColumnMatcher::default();
        let sql = "SELECT Saturn FROM Session";
        let analysis = matcher.analyze_sql_error("Unknown column 'Saturn'", sql, &session_schema());
        let best = &analysis.column_corrections["Saturn"];
        assert_eq!(best, "Session.Status");
        assert_eq!(analysis.corrected_sql, sql);
    }
}
