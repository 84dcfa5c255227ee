//! Normalized record: the unit that survives filtering and ends up in the CSV outputs

use std::fmt;

use serde::{Serialize, Serializer};

use super::app_detail::DetailRecord;
use super::constants::buckets::{LOW_MAX_RECOMMENDATIONS, MODERATE_MAX_RECOMMENDATIONS};
use super::constants::store::{FREE_TOKEN, LIST_SEPARATOR, NOT_AVAILABLE};

/// Price column: an amount in major currency units, or the `Free` token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Price {
    Free,
    Amount { cents: u64 },
}

impl Price {
    pub fn from_cents(cents: Option<u64>) -> Self {
        cents.map_or(Self::Free, |cents| Self::Amount { cents })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str(FREE_TOKEN),
            Self::Amount { cents } => write!(f, "{}.{:02}", cents / 100, cents % 100),
        }
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Metacritic column: an integer score, or `N/A`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetacriticScore(pub Option<u32>);

impl fmt::Display for MetacriticScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(score) => write!(f, "{score}"),
            None => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for MetacriticScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(score) => serializer.serialize_u32(score),
            None => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// A qualifying app, flattened into the fixed CSV schema.
///
/// Field order matches the column order of the output files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    #[serde(rename = "AppID")]
    pub app_id: u32,
    #[serde(rename = "Game Name")]
    pub name: String,
    #[serde(rename = "Release Date")]
    pub release_date: String,
    #[serde(rename = "Developer")]
    pub developer: String,
    #[serde(rename = "Genres")]
    pub genres: String,
    #[serde(rename = "Price ($)")]
    pub price: Price,
    #[serde(rename = "Recommendations")]
    pub recommendations: u32,
    #[serde(rename = "Metacritic Score")]
    pub metacritic: MetacriticScore,
}

impl NormalizedRecord {
    pub fn from_detail(detail: &DetailRecord) -> Self {
        Self {
            app_id: detail.id,
            name: non_empty_or_na(&detail.name),
            release_date: non_empty_or_na(&detail.release_status),
            developer: join_or_na(&detail.developers),
            genres: detail.genres.join(LIST_SEPARATOR),
            price: Price::from_cents(detail.price_cents),
            recommendations: detail.recommendation_count,
            metacritic: MetacriticScore(detail.critic_score),
        }
    }

    pub fn bucket(&self) -> Bucket {
        Bucket::for_recommendations(self.recommendations)
    }
}

fn non_empty_or_na(value: &str) -> String {
    if value.trim().is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        value.to_string()
    }
}

fn join_or_na(values: &[String]) -> String {
    if values.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        values.join(LIST_SEPARATOR)
    }
}

/// Recommendation-count strata used by the balancer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Low,
    Moderate,
    High,
}

impl Bucket {
    /// Output order of the balanced file
    pub const ALL: [Self; 3] = [Self::Low, Self::Moderate, Self::High];

    pub const fn for_recommendations(recommendations: u32) -> Self {
        if recommendations <= LOW_MAX_RECOMMENDATIONS {
            Self::Low
        } else if recommendations <= MODERATE_MAX_RECOMMENDATIONS {
            Self::Moderate
        } else {
            Self::High
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Moderate => 1,
            Self::High => 2,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::app_detail::AppKind;
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn detail() -> DetailRecord {
        DetailRecord {
            id: 620,
            name: "Portal 2".into(),
            release_status: "18 Apr, 2011".into(),
            coming_soon: false,
            genres: vec!["Action".into(), "Indie".into()],
            categories: vec![],
            content_tags: BTreeSet::new(),
            kind: AppKind::Game,
            developers: vec!["Valve".into(), "Friends".into()],
            price_cents: Some(999),
            recommendation_count: 42,
            critic_score: Some(95),
        }
    }

    #[rstest]
    #[case(0, Bucket::Low)]
    #[case(50, Bucket::Low)]
    #[case(51, Bucket::Moderate)]
    #[case(500, Bucket::Moderate)]
    #[case(501, Bucket::High)]
    #[case(u32::MAX, Bucket::High)]
    fn bucket_boundaries(#[case] recommendations: u32, #[case] expected: Bucket) {
        assert_eq!(Bucket::for_recommendations(recommendations), expected);
    }

    #[rstest]
    #[case(None, "Free")]
    #[case(Some(0), "0.00")]
    #[case(Some(999), "9.99")]
    #[case(Some(1000), "10.00")]
    #[case(Some(5), "0.05")]
    fn price_renders_major_units(#[case] cents: Option<u64>, #[case] expected: &str) {
        assert_eq!(Price::from_cents(cents).to_string(), expected);
    }

    #[test]
    fn normalizes_joined_fields() {
        let record = NormalizedRecord::from_detail(&detail());
        assert_eq!(record.developer, "Valve, Friends");
        assert_eq!(record.genres, "Action, Indie");
        assert_eq!(record.price, Price::Amount { cents: 999 });
        assert_eq!(record.metacritic.to_string(), "95");
        assert_eq!(record.bucket(), Bucket::Low);
    }

    #[test]
    fn missing_values_fall_back_to_placeholders() {
        let mut raw = detail();
        raw.developers.clear();
        raw.release_status.clear();
        raw.price_cents = None;
        raw.critic_score = None;

        let record = NormalizedRecord::from_detail(&raw);
        assert_eq!(record.developer, "N/A");
        assert_eq!(record.release_date, "N/A");
        assert_eq!(record.price.to_string(), "Free");
        assert_eq!(record.metacritic.to_string(), "N/A");
    }
}
