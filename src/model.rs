// src/model.rs
//! Normalized posting record and the per-search filter specification.
//!
//! Every adapter produces `Posting` values in this shape; the aggregator
//! never sees source-specific payloads. Both score fields are clamped to
//! `0..=10` at every assignment via [`clamp_score`].

use chrono::NaiveDate;

/// Upper bound for both `relevance` and `reputability`.
pub const MAX_SCORE: u8 = 10;

/// Clamp a raw score into `0..=10`.
pub fn clamp_score(raw: i32) -> u8 {
    raw.clamp(0, MAX_SCORE as i32) as u8
}

/// A normalized job posting. Immutable after construction except for
/// `relevance`, which the scorer assigns once during aggregation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Posting {
    /// Non-empty; postings with an empty title are dropped at merge time.
    pub title: String,
    /// Adapter-specific placeholder (e.g. "See posting") when absent upstream.
    pub company: String,
    /// "Remote", "Hybrid", "On-site", or free-form.
    pub location: String,
    /// Pre-formatted salary text, when the source provides one.
    pub salary: Option<String>,
    /// Defaults to the fetch date when the upstream value is missing or malformed.
    pub posted_date: NaiveDate,
    /// Absolute URL of the posting.
    pub url: String,
    pub description: Option<String>,
    /// Short identifier of the origin adapter, e.g. "Adzuna".
    pub source: String,
    /// Hard-coded trust weight of the source, `0..=10`.
    pub reputability: u8,
    /// Assigned by the scorer; stays 0 until scored.
    pub relevance: u8,
}

impl Posting {
    /// Composite sort key used by the aggregator, in `0..=20`.
    pub fn composite_score(&self) -> u8 {
        self.relevance + self.reputability
    }

    /// Set the relevance score, clamped to `0..=10`.
    pub fn set_relevance(&mut self, raw: i32) {
        self.relevance = clamp_score(raw);
    }

    /// Lowercased `title + " " + description`, the haystack used by the
    /// scorer and the post-fetch filter rules.
    pub fn combined_text(&self) -> String {
        let mut s = self.title.to_lowercase();
        s.push(' ');
        if let Some(d) = &self.description {
            s.push_str(&d.to_lowercase());
        }
        s
    }
}

/// Desired workplace arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum WorkModel {
    Remote,
    Hybrid,
    OnSite,
    #[default]
    NoPreference,
}

/// Seniority band requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
    #[default]
    NoPreference,
}

/// User-supplied constraints, constructed once per search and read-only
/// thereafter.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct FilterSpec {
    /// Free-text query; must be non-empty after trimming.
    pub query: String,
    pub work_model: WorkModel,
    pub city: Option<String>,
    pub state: Option<String>,
    pub experience_level: ExperienceLevel,
}

impl FilterSpec {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// The location filter is active only when both city and state are set.
    pub fn has_location_filter(&self) -> bool {
        matches!((&self.city, &self.state), (Some(c), Some(s))
            if !c.trim().is_empty() && !s.trim().is_empty())
    }

    /// "City, ST" for forwarding into upstream query parameters.
    pub fn location_string(&self) -> String {
        if self.has_location_filter() {
            format!(
                "{}, {}",
                self.city.as_deref().unwrap_or_default().trim(),
                self.state.as_deref().unwrap_or_default().trim()
            )
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(-3), 0);
        assert_eq!(clamp_score(0), 0);
        assert_eq!(clamp_score(7), 7);
        assert_eq!(clamp_score(10), 10);
        assert_eq!(clamp_score(42), 10);
    }

    #[test]
    fn location_filter_requires_both_parts() {
        let mut f = FilterSpec::new("rust");
        assert!(!f.has_location_filter());
        f.city = Some("Denver".into());
        assert!(!f.has_location_filter());
        f.state = Some("CO".into());
        assert!(f.has_location_filter());
        assert_eq!(f.location_string(), "Denver, CO");
        f.state = Some("  ".into());
        assert!(!f.has_location_filter());
        assert_eq!(f.location_string(), "");
    }

    #[test]
    fn set_relevance_clamps() {
        let mut p = Posting {
            title: "Engineer".into(),
            company: "Acme".into(),
            location: "Remote".into(),
            salary: None,
            posted_date: chrono::Utc::now().date_naive(),
            url: "https://example.test/1".into(),
            description: None,
            source: "Test".into(),
            reputability: 8,
            relevance: 0,
        };
        p.set_relevance(13);
        assert_eq!(p.relevance, 10);
        assert_eq!(p.composite_score(), 18);
    }
}
