//! schema-match CLI - resolve loosely written column names against a schema
//!
//! Usage:
//!   schema-match --schema schema.json match <term> [--top-n <n>]
//!   schema-match --schema schema.json validate "<sql>"
//!   schema-match --schema schema.json explain-error "<db error>" [--sql "<sql>"]
//!
//! Settings come from `--config <file.json>`, then `SCHEMA_MATCH_*`
//! environment variables (a `.env` file is read first), then flags.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schema_match::{
    extract_candidate_tokens, load_sample_data, load_schema, ColumnMatcher, MatcherConfig, SchemaMap,
    ScorerBackend, Vocabulary,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-match")]
#[command(about = "Fuzzy column-name resolution for natural-language and SQL queries")]
#[command(version)]
struct Cli {
    /// Schema map JSON file (table -> columns)
    #[arg(short, long, global = true, env = "SCHEMA_MATCH_SCHEMA")]
    schema: Option<PathBuf>,

    /// Matcher config JSON file
    #[arg(short, long, global = true, env = "SCHEMA_MATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Similarity backend (indel, jaro_winkler)
    #[arg(long, global = true)]
    scorer: Option<ScorerBackend>,

    /// Minimum fuzzy score for a name match
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank schema columns for a term
    Match {
        term: String,

        /// Number of results (defaults to the configured top-N)
        #[arg(short = 'n', long)]
        top_n: Option<usize>,
    },

    /// Show the column-like words found in a natural-language question
    Tokens { text: String },

    /// Check the column references of a SQL statement
    Validate { sql: String },

    /// Suggest corrections for a database "unknown column" error
    ExplainError {
        error: String,

        /// The failed SQL; enables corrected SQL output
        #[arg(long)]
        sql: Option<String>,
    },

    /// Annotate a natural-language question with likely schema columns
    Preprocess { query: String },

    /// List schema columns with their key and null flags
    Columns {
        /// Only this table
        table: Option<String>,

        /// Sample rows JSON file (table -> rows)
        #[arg(long)]
        samples: Option<PathBuf>,
    },
}

impl Cli {
    fn matcher_config(&self) -> Result<MatcherConfig> {
        let config = match &self.config {
            Some(path) => MatcherConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => MatcherConfig::default(),
        };
        let mut config = config
            .with_env_overrides()
            .context("Invalid SCHEMA_MATCH_* environment override")?;

        if let Some(scorer) = self.scorer {
            config.scorer = scorer;
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        config.validate().context("Invalid command-line settings")?;
        Ok(config)
    }

    fn load_schema(&self) -> Result<SchemaMap> {
        let path = self
            .schema
            .as_ref()
            .context("This command needs a schema: pass --schema <file> or set SCHEMA_MATCH_SCHEMA")?;
        load_schema(path).with_context(|| format!("Failed to load schema from {}", path.display()))
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.matcher_config()?;
    info!(scorer = ?config.scorer, threshold = config.similarity_threshold, "schema-match starting");

    match &cli.command {
        Commands::Match { term, top_n } => {
            let schema = cli.load_schema()?;
            let matcher = ColumnMatcher::new(config);
            let top_n = top_n.unwrap_or(matcher.config().default_top_n);
            let matches = matcher.find_matches(term, &schema, top_n);

            if cli.json {
                return print_json(&matches);
            }
            if matches.is_empty() {
                println!("No columns match '{}'", term);
            }
            for m in &matches {
                println!(
                    "{:>6.1}  {:<8} {}{}",
                    m.similarity_score,
                    m.match_type.to_string(),
                    m.qualified_name(),
                    m.suggestion.as_ref().map(|s| format!("  ({})", s)).unwrap_or_default()
                );
            }
        }
        Commands::Tokens { text } => {
            let vocabulary = Vocabulary::with_extra_aliases(config.extra_aliases.clone());
            let tokens = extract_candidate_tokens(text, &vocabulary);
            if cli.json {
                return print_json(&tokens);
            }
            for token in &tokens {
                println!("{}", token);
            }
        }
        Commands::Validate { sql } => {
            let schema = cli.load_schema()?;
            let validation = ColumnMatcher::new(config).validate_sql_columns(sql, &schema);
            if cli.json {
                print_json(&validation)?;
            } else if validation.is_valid {
                println!("All column references resolve");
            } else {
                print_lines(&validation.suggestions);
            }
            if !validation.is_valid {
                std::process::exit(1);
            }
        }
        Commands::ExplainError { error, sql } => {
            let schema = cli.load_schema()?;
            let matcher = ColumnMatcher::new(config);
            match sql {
                Some(sql) => {
                    let analysis = matcher.analyze_sql_error(error, sql, &schema);
                    if cli.json {
                        return print_json(&analysis);
                    }
                    print_lines(&analysis.suggestions);
                    if analysis.corrected_sql != *sql {
                        println!("Corrected SQL:\n{}", analysis.corrected_sql);
                    }
                }
                None => {
                    let lines = matcher.resolve_error_columns(error, &schema);
                    if cli.json {
                        return print_json(&lines);
                    }
                    if lines.is_empty() {
                        println!("No unknown-column error recognized");
                    }
                    print_lines(&lines);
                }
            }
        }
        Commands::Preprocess { query } => {
            let schema = cli.load_schema()?;
            let result = ColumnMatcher::new(config).preprocess_query(query, &schema);
            if cli.json {
                return print_json(&result);
            }
            println!("{}", result.enhanced_query);
            if !result.suggestions.is_empty() {
                println!();
                print_lines(&result.suggestions);
            }
        }
        Commands::Columns { table, samples } => {
            let schema = cli.load_schema()?;
            let samples = samples
                .as_ref()
                .map(|path| {
                    load_sample_data(path)
                        .with_context(|| format!("Failed to load sample data from {}", path.display()))
                })
                .transpose()?;

            let tables: BTreeMap<_, _> = schema
                .iter()
                .filter(|(name, _)| table.as_ref().map_or(true, |t| t.eq_ignore_ascii_case(name)))
                .collect();
            if tables.is_empty() {
                anyhow::bail!("Table '{}' not found in schema", table.as_deref().unwrap_or_default());
            }
            if cli.json {
                return print_json(&tables);
            }

            for (name, columns) in tables {
                println!("{}:", name);
                for column in columns {
                    println!("  - {}", column);
                }
                if let Some(rows) = samples.as_ref().and_then(|s| s.get(name)) {
                    println!("  {} sample row(s)", rows.len());
                    if let Some(first) = rows.first() {
                        println!("  e.g. {}", serde_json::Value::Object(first.clone()));
                    }
                }
            }
        }
    }

    Ok(())
}
