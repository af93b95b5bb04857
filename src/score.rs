// src/score.rs
//! Relevance scorer: a pure, deterministic function from (title,
//! description, query) to an integer in `0..=10`.
//!
//! The score is monotone nondecreasing as more query terms match and always
//! saturates at 10. Term checks are plain substring containment on
//! lowercased text, so "sr" also hits inside "senior"; that looseness is
//! intentional and shared with the post-fetch filter.

use crate::model::{clamp_score, Posting, MAX_SCORE};

/// Terms treated as adjacent to software-engineering queries.
const RELATED_TERMS: [&str; 7] = [
    "developer",
    "programmer",
    "coding",
    "programming",
    "tech",
    "it",
    "dev",
];

/// Score a posting's relevance to `query`.
pub fn score_posting(posting: &Posting, query: &str) -> u8 {
    score_text(&posting.title, posting.description.as_deref().unwrap_or(""), query)
}

/// Core scoring on raw text fields.
pub fn score_text(title: &str, description: &str, query: &str) -> u8 {
    let query = query.to_lowercase();
    let title = title.to_lowercase();
    let description = description.to_lowercase();
    let combined = format!("{title} {description}");

    let max = MAX_SCORE as i32;
    let mut score: i32;

    if title.contains(&query) {
        // Full-phrase match in the title dominates everything else.
        score = max;
    } else {
        let terms: Vec<&str> = query.split_whitespace().collect();
        let matched = terms.iter().filter(|t| combined.contains(**t)).count();
        score = if terms.is_empty() {
            0
        } else {
            (max * matched as i32) / terms.len() as i32
        };
        for term in &terms {
            if title.contains(*term) {
                score = (score + 2).min(max);
            }
        }
    }

    if query.contains("software") || query.contains("engineer") {
        for related in RELATED_TERMS {
            if combined.contains(related) {
                score = (score + 1).min(max);
            }
        }
    }

    clamp_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_phrase_title_match_scores_ten() {
        assert_eq!(
            score_text("Senior Software Engineer", "", "software engineer"),
            10
        );
        // Case-insensitive.
        assert_eq!(score_text("SOFTWARE ENGINEER", "", "Software Engineer"), 10);
    }

    #[test]
    fn partial_match_with_title_bonus() {
        // "engineer" matches (1 of 2 terms): floor(10 * 1/2) = 5, +2 title bonus.
        assert_eq!(score_text("ML Platform Engineer", "", "software engineer"), 7);
    }

    #[test]
    fn related_terms_add_bonus() {
        // "developer" in the description adds +1 for engineering queries.
        let base = score_text("ML Platform Engineer", "", "software engineer");
        let bumped = score_text(
            "ML Platform Engineer",
            "developer role on the platform team",
            "software engineer",
        );
        assert!(bumped > base);
        assert!(bumped <= 10);
    }

    #[test]
    fn no_match_scores_zero() {
        assert_eq!(score_text("Pastry Chef", "", "kubernetes"), 0);
    }

    #[test]
    fn adding_a_matching_term_never_decreases_score() {
        let query = "backend rust kafka";
        let sparse = score_text("Platform Team", "backend services", query);
        let richer = score_text("Platform Team", "backend services in rust", query);
        let full = score_text("Platform Team", "backend services in rust with kafka", query);
        assert!(richer >= sparse);
        assert!(full >= richer);
        assert!(full <= 10);
    }

    #[test]
    fn score_is_always_in_range() {
        let cases = [
            ("Senior Staff Software Engineer", "dev tech it programming"),
            ("", ""),
            ("x", "y"),
        ];
        for (t, d) in cases {
            let s = score_text(t, d, "software engineer developer tech");
            assert!(s <= 10);
        }
    }

    #[test]
    fn empty_description_related_loop_runs_on_combined_only() {
        // S5 fixture: no related term appears in "ml platform engineer".
        assert_eq!(score_text("ML Platform Engineer", "", "software engineer"), 7);
    }
}
