//! Eligibility policy
//!
//! Decides whether a detail record belongs in the qualifying set. The rule set is
//! configuration: every list below can be overridden from the config file or environment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::app_detail::{AppKind, DetailRecord};
use crate::domain::constants::store::ADULT_TAG;
use crate::domain::record::NormalizedRecord;

/// Why a record was left out of the qualifying set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("missing required genre '{0}'")]
    MissingGenre(String),

    #[error("carries excluded content tag '{0}'")]
    ExcludedTag(String),

    #[error("carries excluded genre '{0}'")]
    ExcludedGenre(String),

    #[error("app kind '{0}' is excluded")]
    ExcludedKind(AppKind),

    #[error("not released yet ({0})")]
    Unreleased(String),

    #[error("{recommendations} recommendations, minimum is {minimum}")]
    BelowEngagement { recommendations: u32, minimum: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityPolicy {
    /// All of these genres must be present
    pub required_genres: Vec<String>,
    pub excluded_content_tags: Vec<String>,
    pub excluded_genres: Vec<String>,
    pub excluded_kinds: Vec<AppKind>,
    /// Case-insensitive substrings of the release text marking an unreleased app
    pub excluded_release_markers: Vec<String>,
    pub min_recommendations: u32,
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            required_genres: vec!["Indie".to_string()],
            excluded_content_tags: vec![ADULT_TAG.to_string()],
            excluded_genres: vec!["Early Access".to_string()],
            excluded_kinds: vec![AppKind::Dlc, AppKind::Demo],
            excluded_release_markers: vec!["Coming soon".to_string()],
            min_recommendations: 5,
        }
    }
}

impl EligibilityPolicy {
    /// Checks the record against every rule, reporting the first one that fails
    pub fn evaluate(&self, record: &DetailRecord) -> Result<(), Rejection> {
        if let Some(genre) = self
            .required_genres
            .iter()
            .find(|genre| !record.has_genre(genre))
        {
            return Err(Rejection::MissingGenre(genre.clone()));
        }

        if let Some(tag) = self
            .excluded_content_tags
            .iter()
            .find(|tag| record.has_content_tag(tag))
        {
            return Err(Rejection::ExcludedTag(tag.clone()));
        }

        if let Some(genre) = self
            .excluded_genres
            .iter()
            .find(|genre| record.has_genre(genre))
        {
            return Err(Rejection::ExcludedGenre(genre.clone()));
        }

        if self.excluded_kinds.contains(&record.kind) {
            return Err(Rejection::ExcludedKind(record.kind.clone()));
        }

        if record.coming_soon || self.is_unreleased_text(&record.release_status) {
            return Err(Rejection::Unreleased(record.release_status.clone()));
        }

        if record.recommendation_count < self.min_recommendations {
            return Err(Rejection::BelowEngagement {
                recommendations: record.recommendation_count,
                minimum: self.min_recommendations,
            });
        }

        Ok(())
    }

    /// Evaluates and, on success, normalizes the record for output
    pub fn classify(&self, record: &DetailRecord) -> Result<NormalizedRecord, Rejection> {
        self.evaluate(record)?;
        Ok(NormalizedRecord::from_detail(record))
    }

    fn is_unreleased_text(&self, release_status: &str) -> bool {
        let status = release_status.to_lowercase();
        self.excluded_release_markers
            .iter()
            .any(|marker| status.contains(&marker.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn indie_game() -> DetailRecord {
        let genres = vec!["Indie".to_string(), "Puzzle".to_string()];
        DetailRecord {
            id: 1,
            name: "Tiny Quest".into(),
            release_status: "3 Jan, 2020".into(),
            coming_soon: false,
            content_tags: genres.iter().cloned().collect::<BTreeSet<_>>(),
            genres,
            categories: vec![],
            kind: AppKind::Game,
            developers: vec!["Solo Dev".into()],
            price_cents: Some(499),
            recommendation_count: 120,
            critic_score: None,
        }
    }

    #[test]
    fn accepts_released_indie_game() {
        let policy = EligibilityPolicy::default();
        let record = policy.classify(&indie_game()).unwrap();
        assert_eq!(record.app_id, 1);
        assert_eq!(record.genres, "Indie, Puzzle");
    }

    #[test]
    fn genre_match_ignores_case() {
        let mut raw = indie_game();
        raw.genres = vec!["INDIE".into()];
        assert!(EligibilityPolicy::default().evaluate(&raw).is_ok());
    }

    #[rstest]
    #[case::no_indie(|r: &mut DetailRecord| r.genres = vec!["Action".into()],
        Rejection::MissingGenre("Indie".into()))]
    #[case::adult(|r: &mut DetailRecord| { r.content_tags.insert("Adult".into()); },
        Rejection::ExcludedTag("Adult".into()))]
    #[case::early_access(|r: &mut DetailRecord| r.genres.push("Early Access".into()),
        Rejection::ExcludedGenre("Early Access".into()))]
    #[case::dlc(|r: &mut DetailRecord| r.kind = AppKind::Dlc,
        Rejection::ExcludedKind(AppKind::Dlc))]
    #[case::demo(|r: &mut DetailRecord| r.kind = AppKind::Demo,
        Rejection::ExcludedKind(AppKind::Demo))]
    #[case::coming_soon_text(|r: &mut DetailRecord| r.release_status = "Coming soon".into(),
        Rejection::Unreleased("Coming soon".into()))]
    #[case::coming_soon_flag(|r: &mut DetailRecord| { r.coming_soon = true; r.release_status = "Q3 2027".into(); },
        Rejection::Unreleased("Q3 2027".into()))]
    #[case::low_engagement(|r: &mut DetailRecord| r.recommendation_count = 4,
        Rejection::BelowEngagement { recommendations: 4, minimum: 5 })]
    fn rejects(#[case] mutate: fn(&mut DetailRecord), #[case] expected: Rejection) {
        let mut raw = indie_game();
        mutate(&mut raw);
        assert_eq!(EligibilityPolicy::default().evaluate(&raw), Err(expected));
    }

    #[test]
    fn release_marker_is_a_substring_match() {
        let mut raw = indie_game();
        raw.release_status = "COMING SOON - wishlist now".into();
        assert!(matches!(
            EligibilityPolicy::default().evaluate(&raw),
            Err(Rejection::Unreleased(_))
        ));
    }

    #[test]
    fn policy_is_configurable() {
        let policy: EligibilityPolicy = serde_json::from_str(
            r#"{"required_genres": ["Strategy"], "excluded_kinds": [], "min_recommendations": 0}"#,
        )
        .unwrap();

        let mut raw = indie_game();
        raw.genres = vec!["Strategy".into()];
        raw.kind = AppKind::Dlc;
        raw.recommendation_count = 0;

        assert!(policy.evaluate(&raw).is_ok());
        assert_eq!(policy.excluded_content_tags, vec!["Adult".to_string()]);
    }
}
