//! String similarity scorers on a 0-100 scale.
//!
//! The matcher only sees the [`Scorer`] trait. The ratios follow the
//! indel (insert/delete) family: `ratio` is the normalized longest common
//! subsequence, and the partial, token and weighted variants are built on top
//! of it. The match thresholds (70 for names, 60 for context text, 90 for
//! near-exact) are calibrated against these definitions, so swapping the base
//! ratio for Jaro-Winkler shifts scores upward and the thresholds should be
//! revisited together.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Score two strings. Implementations return values in `[0, 100]`.
pub trait Scorer: Send + Sync {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Which base ratio the composite scorers are built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerBackend {
    /// Normalized indel similarity (LCS based).
    #[default]
    Indel,
    /// `strsim::jaro_winkler`, scaled to 0-100.
    JaroWinkler,
}

impl std::str::FromStr for ScorerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "indel" | "levenshtein" => Ok(ScorerBackend::Indel),
            "jaro_winkler" | "jarowinkler" => Ok(ScorerBackend::JaroWinkler),
            other => Err(format!("unknown scorer backend '{}'", other)),
        }
    }
}

impl ScorerBackend {
    /// Whole-string similarity.
    pub fn ratio(&self, a: &str, b: &str) -> f64 {
        match self {
            ScorerBackend::Indel => indel_ratio(a, b),
            ScorerBackend::JaroWinkler => {
                if a.is_empty() && b.is_empty() {
                    100.0
                } else {
                    strsim::jaro_winkler(a, b) * 100.0
                }
            }
        }
    }

    /// Best `ratio` of the shorter string against any equally long window of
    /// the longer one. Windows hanging over either end are included, so a
    /// prefix or suffix overlap still counts.
    pub fn partial_ratio(&self, a: &str, b: &str) -> f64 {
        let a_len = a.chars().count();
        let b_len = b.chars().count();
        if a_len == 0 || b_len == 0 {
            return if a_len == b_len { 100.0 } else { 0.0 };
        }

        let best = if a_len <= b_len {
            self.best_window(a, b)
        } else {
            self.best_window(b, a)
        };
        if a_len == b_len && best < 100.0 {
            return best.max(self.best_window(b, a));
        }
        best
    }

    fn best_window(&self, needle: &str, haystack: &str) -> f64 {
        let hay: Vec<char> = haystack.chars().collect();
        let m = needle.chars().count() as isize;
        let n = hay.len() as isize;

        let mut best: f64 = 0.0;
        for start in (1 - m)..n {
            let lo = start.max(0) as usize;
            let hi = (start + m).min(n) as usize;
            let window: String = hay[lo..hi].iter().collect();
            best = best.max(self.ratio(needle, &window));
            if best >= 100.0 {
                return 100.0;
            }
        }
        best
    }

    /// `ratio` after sorting whitespace-separated tokens.
    pub fn token_sort_ratio(&self, a: &str, b: &str) -> f64 {
        self.ratio(&sorted_tokens(a), &sorted_tokens(b))
    }

    /// Compares the shared tokens and the leftovers of each side separately;
    /// 100 when one side's tokens are a subset of the other's.
    pub fn token_set_ratio(&self, a: &str, b: &str) -> f64 {
        let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
        let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return 0.0;
        }

        let intersect = tokens_a.intersection(&tokens_b).join(" ");
        let diff_ab = tokens_a.difference(&tokens_b).join(" ");
        let diff_ba = tokens_b.difference(&tokens_a).join(" ");

        if !intersect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
            return 100.0;
        }

        let combined_ab = join_nonempty(&intersect, &diff_ab);
        let combined_ba = join_nonempty(&intersect, &diff_ba);

        let mut result = self.ratio(&combined_ab, &combined_ba);
        if !intersect.is_empty() {
            result = result
                .max(self.ratio(&intersect, &combined_ab))
                .max(self.ratio(&intersect, &combined_ba));
        }
        result
    }

    /// Partial ratio over sorted tokens; 100 as soon as a token is shared.
    pub fn partial_token_ratio(&self, a: &str, b: &str) -> f64 {
        let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
        let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return 0.0;
        }
        if tokens_a.intersection(&tokens_b).next().is_some() {
            return 100.0;
        }
        self.partial_ratio(&sorted_tokens(a), &sorted_tokens(b))
    }

    /// Weighted combination of the plain, token and partial ratios. Strings of
    /// similar length are compared whole; once one is 1.5x longer the partial
    /// scorers take over, discounted by how lopsided the lengths are.
    pub fn weighted_ratio(&self, a: &str, b: &str) -> f64 {
        const UNBASE_SCALE: f64 = 0.95;

        let a_len = a.chars().count();
        let b_len = b.chars().count();
        if a_len == 0 || b_len == 0 {
            return 0.0;
        }

        let len_ratio = a_len.max(b_len) as f64 / a_len.min(b_len) as f64;
        let mut end_ratio = self.ratio(a, b);

        if len_ratio < 1.5 {
            let token_ratio = self.token_sort_ratio(a, b).max(self.token_set_ratio(a, b));
            return end_ratio.max(token_ratio * UNBASE_SCALE);
        }

        let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        end_ratio = end_ratio.max(self.partial_ratio(a, b) * partial_scale);
        end_ratio.max(self.partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
    }
}

fn sorted_tokens(s: &str) -> String {
    s.split_whitespace().sorted().join(" ")
}

fn join_nonempty(head: &str, tail: &str) -> String {
    match (head.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => head.to_string(),
        _ => format!("{} {}", head, tail),
    }
}

/// Normalized indel similarity: `2 * lcs / (len_a + len_b)`, as a percentage.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    100.0 * (2 * lcs_len(&a, &b)) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Weighted-ratio scorer, tolerant of word order and length differences.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRatio {
    pub backend: ScorerBackend,
}

impl Scorer for WeightedRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        self.backend.weighted_ratio(a, b)
    }
}

/// Partial-ratio scorer, for matching a short term inside longer text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRatio {
    pub backend: ScorerBackend,
}

impl Scorer for PartialRatio {
    fn score(&self, a: &str, b: &str) -> f64 {
        self.backend.partial_ratio(a, b)
    }
}

/// Score `query` against every choice and keep the `limit` best as
/// `(choice index, score)`. Equal scores keep choice order.
pub fn extract<S: AsRef<str>>(
    query: &str,
    choices: &[S],
    scorer: &dyn Scorer,
    limit: usize,
) -> Vec<(usize, f64)> {
    let mut scored: Vec<(usize, f64)> = choices
        .iter()
        .enumerate()
        .map(|(idx, choice)| (idx, scorer.score(query, choice.as_ref())))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
