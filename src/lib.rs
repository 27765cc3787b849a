pub mod catalog;
pub mod config;
pub mod error;
pub mod matcher;
pub mod resolver;
pub mod scanner;
pub mod schema;
pub mod similarity;
pub mod vocabulary;

pub use catalog::{build_catalog, ColumnDescriptor};
pub use config::MatcherConfig;
pub use error::{MatchError, Result};
pub use matcher::{ColumnMatch, ColumnMatcher, MatchType};
pub use resolver::{extract_error_columns, ErrorAnalysis};
pub use scanner::{extract_candidate_tokens, extract_sql_column_refs, PreprocessedQuery, SqlValidation};
pub use schema::{load_sample_data, load_schema, parse_schema, ColumnInfo, KeyKind, SampleData, SchemaMap};
pub use similarity::{Scorer, ScorerBackend};
pub use vocabulary::Vocabulary;
