//! Fixed word lists used by the matcher and the text scanners.
//!
//! Everything here is built once when a [`Vocabulary`] is constructed and is
//! read-only afterwards, so a single instance can be shared between threads.

use std::collections::{HashMap, HashSet};

/// Canonical business term -> synonyms. Later groups win when a synonym
/// appears more than once (e.g. "organization" resolves to "account").
const ALIAS_GROUPS: &[(&str, &[&str])] = &[
    // Common abbreviations
    ("id", &["identifier", "key", "pk"]),
    ("name", &["title", "label", "description"]),
    ("email", &["mail", "e-mail", "email_address"]),
    ("phone", &["telephone", "tel", "mobile", "cell"]),
    ("date", &["dt", "datetime", "timestamp"]),
    ("created", &["created_date", "creation_date", "date_created"]),
    ("modified", &["updated", "modified_date", "last_modified", "date_modified"]),
    ("status", &["state", "condition", "stage"]),
    ("type", &["category", "kind", "classification"]),
    ("amount", &["value", "cost", "price", "total"]),
    // Business domain
    ("instructor", &["teacher", "staff", "educator", "facilitator"]),
    ("student", &["pupil", "learner", "participant"]),
    ("school", &["institution", "organization", "org", "academy"]),
    ("program", &["course", "class", "session", "workshop"]),
    ("semester", &["term", "period", "academic_year"]),
    ("contact", &["person", "individual", "user"]),
    ("account", &["organization", "company", "client", "customer"]),
    ("opportunity", &["deal", "project", "engagement"]),
    // CRM field names
    ("account_name", &["organization_name", "company_name"]),
    ("contact_name", &["person_name", "full_name"]),
    ("record_type", &["type", "category", "classification"]),
    ("stage_name", &["status", "stage", "phase"]),
    ("close_date", &["end_date", "completion_date"]),
    ("is_deleted", &["deleted", "active", "inactive"]),
];

/// Business keywords folded into the search text of every column of a table.
const TABLE_CONTEXT: &[(&str, &str)] = &[
    ("Account", "organization company school client customer"),
    ("Contact", "person individual user staff instructor teacher"),
    ("Opportunity", "deal project program engagement grant donation"),
    ("Session", "class workshop program course meeting"),
    ("ProgramInstructorAvailability", "instructor teacher staff availability schedule"),
    ("Student", "pupil learner participant child"),
    ("Campaign", "marketing outreach communication email"),
    ("Lead", "prospect potential customer inquiry"),
];

/// Field words picked out of natural-language questions wherever they occur.
const COMMON_FIELDS: &[&str] = &[
    "name", "email", "phone", "status", "type", "date", "id", "title",
    "description", "amount", "address", "city", "state", "country",
    "created", "modified", "updated", "deleted", "active", "inactive",
    "first_name", "last_name", "full_name", "company", "organization",
    "semester", "session", "program", "course", "instructor", "teacher",
    "student", "school", "grade", "subject", "availability", "schedule",
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been",
    "have", "has", "had", "do", "does", "did", "will", "would",
    "could", "should", "may", "might", "can", "must", "shall",
    "to", "of", "in", "on", "at", "by", "for", "with", "from",
    "up", "about", "into", "through", "during", "before", "after",
    "above", "below", "between", "among", "and", "or", "but",
    "if", "then", "else", "when", "where", "why", "how", "what",
    "who", "which", "that", "this", "these", "those", "all",
    "any", "some", "many", "much", "more", "most", "other",
    "such", "no", "nor", "not", "only", "own", "same", "so",
    "than", "too", "very", "just", "now",
];

const SQL_KEYWORDS: &[&str] = &[
    "select", "from", "where", "join", "inner", "left", "right", "outer",
    "on", "and", "or", "not", "in", "like", "between", "is", "null",
    "count", "sum", "avg", "max", "min", "distinct", "as", "order", "by",
    "group", "having", "limit", "offset", "union", "all", "case", "when",
    "then", "else", "end", "if", "exists", "any", "some", "*",
];

/// Immutable word tables: aliases and their reverse index, table context,
/// stop words, common field words and SQL keywords.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    alias_to_canonical: HashMap<String, String>,
    table_context: HashMap<String, String>,
    stop_words: HashSet<&'static str>,
    sql_keywords: HashSet<&'static str>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

impl Vocabulary {
    /// The built-in CRM / education vocabulary.
    pub fn standard() -> Self {
        let groups = ALIAS_GROUPS
            .iter()
            .map(|(canonical, aliases)| {
                (canonical.to_string(), aliases.iter().map(|a| a.to_string()).collect())
            })
            .collect();
        Self::with_alias_groups(groups)
    }

    /// Standard vocabulary plus extra alias groups, applied after the built-in ones.
    pub fn with_extra_aliases<I>(extra: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut groups: Vec<(String, Vec<String>)> = ALIAS_GROUPS
            .iter()
            .map(|(canonical, aliases)| {
                (canonical.to_string(), aliases.iter().map(|a| a.to_string()).collect())
            })
            .collect();
        groups.extend(extra);
        Self::with_alias_groups(groups)
    }

    fn with_alias_groups(alias_groups: Vec<(String, Vec<String>)>) -> Self {
        let mut alias_to_canonical = HashMap::new();
        for (canonical, aliases) in alias_groups {
            for alias in aliases {
                alias_to_canonical.insert(alias.to_lowercase(), canonical.to_lowercase());
            }
        }

        Self {
            alias_to_canonical,
            table_context: TABLE_CONTEXT
                .iter()
                .map(|(table, words)| (table.to_string(), words.to_string()))
                .collect(),
            stop_words: STOP_WORDS.iter().copied().collect(),
            sql_keywords: SQL_KEYWORDS.iter().copied().collect(),
        }
    }

    /// Canonical term for an alias. Expects an already lowercased term.
    pub fn canonical_for(&self, term: &str) -> Option<&str> {
        self.alias_to_canonical.get(term).map(String::as_str)
    }

    /// Context keywords for a table; unknown tables have none.
    pub fn table_context(&self, table: &str) -> Option<&str> {
        self.table_context.get(table).map(String::as_str)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    pub fn is_sql_keyword(&self, word: &str) -> bool {
        self.sql_keywords.contains(word)
    }

    pub fn common_fields(&self) -> &'static [&'static str] {
        COMMON_FIELDS
    }
}
