use serde::Serialize;
use strsim::{jaro_winkler, levenshtein};
use tracing::debug;

use crate::config::{DEFAULT_FUZZY_TOLERANCE, DEFAULT_SUGGESTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MatchTier {
    Exact,
    Substring,
    Prefix,
    Approximate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found { name: String, tier: MatchTier },
    NotFound { suggestions: Vec<String> },
}

impl Resolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Found { name, .. } => Some(name),
            Resolution::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Allowed edit distance as a fraction of the longer compared string.
    pub tolerance: f64,
    pub suggestion_limit: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_FUZZY_TOLERANCE,
            suggestion_limit: DEFAULT_SUGGESTIONS,
        }
    }
}

pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn resolve<S: AsRef<str>>(query: &str, choices: &[S]) -> Resolution {
    resolve_with(query, choices, ResolverOptions::default())
}

/// Exact, substring, prefix, then edit distance; first match in `choices` order wins a tier.
pub fn resolve_with<S: AsRef<str>>(query: &str, choices: &[S], opts: ResolverOptions) -> Resolution {
    let q = normalize(query);
    if q.is_empty() {
        return Resolution::NotFound {
            suggestions: suggestions(query, choices, opts.suggestion_limit),
        };
    }

    let folded = choices
        .iter()
        .map(|c| normalize(c.as_ref()))
        .collect::<Vec<_>>();

    let hit = folded
        .iter()
        .position(|c| *c == q)
        .map(|idx| (idx, MatchTier::Exact))
        .or_else(|| {
            folded
                .iter()
                .position(|c| c.contains(q.as_str()))
                .map(|idx| (idx, MatchTier::Substring))
        })
        .or_else(|| {
            folded
                .iter()
                .position(|c| c.starts_with(q.as_str()))
                .map(|idx| (idx, MatchTier::Prefix))
        })
        .or_else(|| closest_within(&q, &folded, opts.tolerance).map(|idx| (idx, MatchTier::Approximate)));

    match hit {
        Some((idx, tier)) => {
            let name = choices[idx].as_ref().to_string();
            debug!(query, %name, ?tier, "resolved entity");
            Resolution::Found { name, tier }
        }
        None => {
            debug!(query, "no tier matched");
            Resolution::NotFound {
                suggestions: suggestions(query, choices, opts.suggestion_limit),
            }
        }
    }
}

fn closest_within(q: &str, folded: &[String], tolerance: f64) -> Option<usize> {
    let q_len = q.chars().count();
    let mut best: Option<(usize, usize)> = None;
    for (idx, choice) in folded.iter().enumerate() {
        let max_len = q_len.max(choice.chars().count());
        let dist = levenshtein(q, choice);
        if dist as f64 > tolerance * max_len as f64 {
            continue;
        }
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((idx, dist));
        }
    }
    best.map(|(idx, _)| idx)
}

pub fn suggestions<S: AsRef<str>>(query: &str, choices: &[S], limit: usize) -> Vec<String> {
    let q = normalize(query);
    let mut scored = choices
        .iter()
        .map(|c| (jaro_winkler(&q, &normalize(c.as_ref())), c.as_ref()))
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}
