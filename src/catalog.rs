//! Schema indexer: flattens a schema map into a searchable column catalog.

use crate::schema::SchemaMap;
use crate::vocabulary::Vocabulary;

/// Salesforce-style custom field suffix.
pub const CUSTOM_FIELD_SUFFIX: &str = "__c";

/// One (table, column) entry of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub table: String,
    /// Lowercased, trimmed `name`.
    pub normalized_name: String,
    /// Name variants plus the table's business keywords.
    pub search_text: String,
}

impl ColumnDescriptor {
    pub fn new(name: &str, table: &str, vocabulary: &Vocabulary) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            normalized_name: name.trim().to_lowercase(),
            search_text: build_search_text(name, table, vocabulary),
        }
    }

    /// Name split into words: custom suffix dropped, underscores as separators.
    pub fn name_parts(&self) -> Vec<&str> {
        strip_custom_suffix(&self.normalized_name)
            .split(|c: char| c == '_' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .collect()
    }
}

/// Build the catalog for one matching pass. Tables come in schema-map order,
/// columns in ordinal order; duplicate pairs are kept as separate entries.
pub fn build_catalog(schema: &SchemaMap, vocabulary: &Vocabulary) -> Vec<ColumnDescriptor> {
    let catalog: Vec<ColumnDescriptor> = schema
        .iter()
        .flat_map(|(table, columns)| {
            columns
                .iter()
                .map(move |column| ColumnDescriptor::new(&column.name, table, vocabulary))
        })
        .collect();
    tracing::trace!(tables = schema.len(), columns = catalog.len(), "Built column catalog");
    catalog
}

fn strip_custom_suffix(name: &str) -> &str {
    name.strip_suffix(CUSTOM_FIELD_SUFFIX).unwrap_or(name)
}

fn build_search_text(name: &str, table: &str, vocabulary: &Vocabulary) -> String {
    let lower = name.trim().to_lowercase();
    let base = strip_custom_suffix(&lower);
    let mut search_text = lower.clone();

    let compact = base.replace('_', "");
    if compact != search_text {
        search_text.push(' ');
        search_text.push_str(&compact);
    }

    let spaced = base.replace('_', " ");
    let spaced = spaced.trim();
    if !spaced.is_empty() && !search_text.contains(spaced) {
        search_text.push(' ');
        search_text.push_str(spaced);
    }

    if let Some(context) = vocabulary.table_context(table) {
        search_text.push(' ');
        search_text.push_str(context);
    }

    search_text
}
