//! Fuzzy filtering of branch and tag names
//!
//! Scoring is tiered, and the first tier that matches decides the score:
//!
//! 1. case-insensitive substring: 100
//! 2. ordered subsequence (`"ES5"` in `"ENS-325"`): 95
//! 3. edit-distance similarity: 0..=94
//!
//! With the default threshold of 95, tier 3 never passes; it only matters
//! when a caller lowers the threshold.

use serde::Serialize;

/// Score at or above which candidates are kept by default
pub const DEFAULT_THRESHOLD: u8 = 95;

const SUBSTRING_SCORE: u8 = 100;
const SUBSEQUENCE_SCORE: u8 = 95;
const FUZZY_CEILING: u8 = SUBSEQUENCE_SCORE - 1;

/// A candidate that passed the filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FuzzyMatch {
    pub candidate: String,
    pub score: u8,
}

/// Score `candidate` against `query`.
///
/// Returns `None` when the strings share nothing at all.
pub fn score(query: &str, candidate: &str) -> Option<u8> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Some(SUBSTRING_SCORE);
    }
    let candidate = candidate.to_lowercase();

    if candidate.contains(&query) {
        return Some(SUBSTRING_SCORE);
    }
    if is_subsequence(&query, &candidate) {
        return Some(SUBSEQUENCE_SCORE);
    }

    let fuzzy = partial_ratio(&query, &candidate)
        .max(token_sort_ratio(&query, &candidate))
        .min(FUZZY_CEILING);
    (fuzzy > 0).then_some(fuzzy)
}

/// Keep candidates scoring at least `threshold`, best first.
///
/// Equal scores keep their input order, so callers' ordering (recency, VCS
/// order) survives filtering. An empty query keeps everything at 100.
pub fn filter<S: AsRef<str>>(candidates: &[S], query: &str, threshold: u8) -> Vec<FuzzyMatch> {
    let mut matches: Vec<FuzzyMatch> = candidates
        .iter()
        .filter_map(|c| {
            let candidate = c.as_ref();
            score(query, candidate)
                .filter(|s| *s >= threshold)
                .map(|score| FuzzyMatch {
                    candidate: candidate.to_string(),
                    score,
                })
        })
        .collect();

    // sort_by is stable
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches
}

/// Like [`filter`], returning names only.
pub fn fuzzy_match<S: AsRef<str>>(candidates: &[S], query: &str, threshold: u8) -> Vec<String> {
    filter(candidates, query, threshold)
        .into_iter()
        .map(|m| m.candidate)
        .collect()
}

/// Every char of `query` appears in `text`, in order.
pub fn is_subsequence(query: &str, text: &str) -> bool {
    let mut text = text.chars();
    query.chars().all(|q| text.any(|t| t == q))
}

/// Similarity 0..=100 from the insert/delete edit distance.
fn ratio(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }
    let common = lcs_len(a, b);
    // distance = total - 2 * common
    ((200 * common + total / 2) / total) as u8
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Best ratio of the shorter string against same-length windows of the longer.
fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }
    long.windows(short.len())
        .map(|w| ratio(&short, w))
        .max()
        .unwrap_or(0)
}

fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = sorted_tokens(a).chars().collect();
    let b: Vec<char> = sorted_tokens(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    ratio(&a, &b)
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_matches_itself_exactly() {
        for c in ["main", "feature/auth-flow", "ENS-325", "v1.2.0", "x"] {
            assert_eq!(score(c, c), Some(100), "{}", c);
        }
    }

    #[test]
    fn substring_is_case_insensitive() {
        assert_eq!(score("325", "ENS-325"), Some(100));
        assert_eq!(score("ens", "ENS-325"), Some(100));
        assert_eq!(score("AUTH", "feature/auth"), Some(100));
    }

    #[test]
    fn subsequence_scores_exactly_95() {
        assert_eq!(score("ES5", "ENS-325"), Some(95));
        assert_eq!(score("fa", "feature-a"), Some(95));
        assert_eq!(score("ftra", "feature-a"), Some(95));
    }

    #[test]
    fn fuzzy_tier_stays_below_subsequence() {
        assert_eq!(score("fetaure", "feature"), Some(86));
        let s = score("mian", "main").unwrap();
        assert!(s < 95);
    }

    #[test]
    fn unrelated_strings_do_not_match() {
        assert_eq!(score("xyz", "main"), None);
    }

    #[test]
    fn empty_query_keeps_everything() {
        let items = ["b", "a", "c"];
        let result = filter(&items, "", DEFAULT_THRESHOLD);
        assert_eq!(
            result,
            vec![
                FuzzyMatch { candidate: "b".into(), score: 100 },
                FuzzyMatch { candidate: "a".into(), score: 100 },
                FuzzyMatch { candidate: "c".into(), score: 100 },
            ]
        );
        assert_eq!(filter(&items, "   ", DEFAULT_THRESHOLD).len(), 3);
    }

    #[test]
    fn filter_ranks_tiers_and_drops_misses() {
        let items = ["ENS-325", "ENS-410", "feature-ES5-login"];
        let result = filter(&items, "ES5", DEFAULT_THRESHOLD);
        assert_eq!(
            result,
            vec![
                FuzzyMatch { candidate: "feature-ES5-login".into(), score: 100 },
                FuzzyMatch { candidate: "ENS-325".into(), score: 95 },
            ]
        );
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let items = ["zeta-x", "alpha-x", "mid-x", "x-beta"];
        let names = fuzzy_match(&items, "x", DEFAULT_THRESHOLD);
        assert_eq!(names, vec!["zeta-x", "alpha-x", "mid-x", "x-beta"]);
    }

    #[test]
    fn output_is_sorted_non_increasing() {
        let items = ["fetaure", "feature", "feat", "release", "f-e-a-t-u-r-e"];
        let result = filter(&items, "feature", 0);
        assert!(result.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(result[0].candidate, "feature");
    }

    #[test]
    fn lowered_threshold_admits_fuzzy_matches() {
        let items = ["feature", "hotfix"];
        assert!(filter(&items, "fetaure", DEFAULT_THRESHOLD).is_empty());
        let relaxed = filter(&items, "fetaure", 80);
        assert_eq!(relaxed.len(), 1);
        assert_eq!(relaxed[0].candidate, "feature");
    }

    #[test]
    fn scoring_is_deterministic() {
        let items = ["one", "two", "three", "tone", "phone"];
        assert_eq!(filter(&items, "on", 0), filter(&items, "on", 0));
    }
}
