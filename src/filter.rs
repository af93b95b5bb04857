// src/filter.rs
//! Post-fetch filter rules.
//!
//! Upstream query parameters are unreliable, so every adapter deliberately
//! over-requests and then rejects locally. The rules run in order; a posting
//! is dropped the moment any active rule fails. The city/state location
//! filter is forwarded into upstream queries only and never re-checked here.

use crate::model::{ExperienceLevel, FilterSpec, Posting, WorkModel};

const JUNIOR_MARKERS: [&str; 4] = ["junior", "entry", "associate", "jr"];
/// Mid-level uses a blocklist that rejects both ends of the seniority range.
const MID_BLOCKLIST: [&str; 5] = ["senior", "lead", "principal", "junior", "entry"];
const SENIOR_MARKERS: [&str; 5] = ["senior", "lead", "principal", "staff", "sr"];

/// Apply the experience-level and work-model rules from `filters`.
pub fn passes_filters(posting: &Posting, filters: &FilterSpec) -> bool {
    passes_experience(posting, filters.experience_level)
        && passes_work_model(posting, filters.work_model)
}

/// Experience check against the title, falling back to the description.
fn passes_experience(posting: &Posting, level: ExperienceLevel) -> bool {
    if level == ExperienceLevel::NoPreference {
        return true;
    }
    let combined = posting.combined_text();
    match level {
        ExperienceLevel::Junior => JUNIOR_MARKERS.iter().any(|m| combined.contains(m)),
        ExperienceLevel::Mid => !MID_BLOCKLIST.iter().any(|m| combined.contains(m)),
        ExperienceLevel::Senior => SENIOR_MARKERS.iter().any(|m| combined.contains(m)),
        ExperienceLevel::NoPreference => true,
    }
}

/// Work-model check against `location + " " + description`.
fn passes_work_model(posting: &Posting, model: WorkModel) -> bool {
    if model == WorkModel::NoPreference {
        return true;
    }
    let mut haystack = posting.location.to_lowercase();
    haystack.push(' ');
    if let Some(d) = &posting.description {
        haystack.push_str(&d.to_lowercase());
    }
    match model {
        WorkModel::Remote => haystack.contains("remote"),
        WorkModel::Hybrid => haystack.contains("hybrid"),
        WorkModel::OnSite => !haystack.contains("remote") && !haystack.contains("hybrid"),
        WorkModel::NoPreference => true,
    }
}

/// Query containment for sources that cannot filter upstream by free text:
/// the whole query as a substring, or any single term longer than two
/// characters. `text` is expected lowercased; the query is lowercased here.
pub fn matches_query_terms(text: &str, query: &str) -> bool {
    let q = query.to_lowercase();
    if text.contains(&q) {
        return true;
    }
    q.split_whitespace()
        .any(|term| term.len() > 2 && text.contains(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FilterSpec;

    fn posting(title: &str, location: &str, description: Option<&str>) -> Posting {
        Posting {
            title: title.into(),
            company: "Acme".into(),
            location: location.into(),
            salary: None,
            posted_date: chrono::Utc::now().date_naive(),
            url: "https://example.test/p".into(),
            description: description.map(Into::into),
            source: "Test".into(),
            reputability: 8,
            relevance: 0,
        }
    }

    #[test]
    fn junior_filter_keeps_junior_rejects_senior() {
        let mut f = FilterSpec::new("junior developer");
        f.experience_level = ExperienceLevel::Junior;
        assert!(passes_filters(&posting("Junior Developer", "Remote", None), &f));
        assert!(!passes_filters(&posting("Senior Developer", "Remote", None), &f));
    }

    #[test]
    fn mid_blocklist_rejects_both_ends() {
        let mut f = FilterSpec::new("developer");
        f.experience_level = ExperienceLevel::Mid;
        assert!(passes_filters(&posting("Software Developer", "Remote", None), &f));
        assert!(!passes_filters(&posting("Senior Developer", "Remote", None), &f));
        assert!(!passes_filters(&posting("Entry Level Developer", "Remote", None), &f));
        assert!(!passes_filters(&posting("Junior Developer", "Remote", None), &f));
    }

    #[test]
    fn senior_marker_in_description_counts() {
        let mut f = FilterSpec::new("developer");
        f.experience_level = ExperienceLevel::Senior;
        assert!(passes_filters(
            &posting("Developer", "Remote", Some("senior role, 8+ years")),
            &f
        ));
        assert!(!passes_filters(&posting("Developer", "Remote", None), &f));
    }

    #[test]
    fn remote_filter_requires_remote_keyword() {
        let mut f = FilterSpec::new("data");
        f.work_model = WorkModel::Remote;
        assert!(passes_filters(&posting("Data Analyst", "Remote", None), &f));
        assert!(passes_filters(
            &posting("Data Analyst", "Austin, TX", Some("fully remote team")),
            &f
        ));
        assert!(!passes_filters(&posting("Data Analyst", "Austin, TX", None), &f));
    }

    #[test]
    fn onsite_rejects_remote_and_hybrid_mentions() {
        let mut f = FilterSpec::new("data");
        f.work_model = WorkModel::OnSite;
        assert!(passes_filters(&posting("Data Analyst", "Austin, TX", None), &f));
        assert!(!passes_filters(&posting("Data Analyst", "Hybrid", None), &f));
        assert!(!passes_filters(
            &posting("Data Analyst", "Austin, TX", Some("remote ok")),
            &f
        ));
    }

    #[test]
    fn query_term_matching_skips_short_terms() {
        assert!(matches_query_terms("go developer wanted", "go developer"));
        // "go" alone is too short to count as a term match.
        assert!(!matches_query_terms("gopher wrangler", "go x"));
        // Whole-query containment still wins.
        assert!(matches_query_terms("go x marks the spot", "go x"));
    }
}
