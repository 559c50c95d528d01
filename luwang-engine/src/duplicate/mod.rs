//! Duplicate/Risk Detector
//!
//! Scores a candidate plot registration against the existing plots of
//! a field for exact, fuzzy and proximity duplication. Detection is
//! advisory except for the case-sensitive unique-location constraint,
//! which the store enforces on write.

pub mod similarity;

pub use similarity::{SimilarityStrategy, TextOverlapSimilarity};

use serde::Serialize;

use shared::{DomainError, DomainResult};

use crate::store::StoreReader;
use crate::utils::validation::{MAX_LOCATION_LEN, validate_required_text};

/// Similarity score above which a candidate counts as "nearby"
const NEARBY_THRESHOLD: f64 = 0.70;

/// Risk points for an exact duplicate
const EXACT_SCORE: u32 = 100;
/// Risk points per similar match
const SIMILAR_SCORE: u32 = 20;
/// Risk points per nearby match
const NEARBY_SCORE: u32 = 10;

/// Aggregated duplication risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
    None,
}

impl RiskLevel {
    fn from_score(score: u32) -> Self {
        match score {
            s if s >= 100 => RiskLevel::High,
            s if s >= 50 => RiskLevel::Medium,
            s if s >= 20 => RiskLevel::Low,
            _ => RiskLevel::None,
        }
    }
}

/// One candidate match against an existing plot
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateMatch {
    pub plot_id: i64,
    pub location: String,
    pub similarity: f64,
}

/// Detection result for one candidate location
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub field_id: i64,
    pub location: String,
    pub exact_matches: Vec<DuplicateMatch>,
    pub similar_matches: Vec<DuplicateMatch>,
    pub nearby_matches: Vec<DuplicateMatch>,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
}

/// Duplicate detector with a swappable similarity strategy
pub struct DuplicateDetector {
    similarity: Box<dyn SimilarityStrategy>,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::with_strategy(Box::new(TextOverlapSimilarity))
    }

    pub fn with_strategy(similarity: Box<dyn SimilarityStrategy>) -> Self {
        Self { similarity }
    }

    /// Score `location` against the existing plots of `field_id`
    ///
    /// Candidates are scanned in ascending plot id, so ties and output
    /// ordering are deterministic. `radius` enables the nearby tier (a
    /// textual stand-in until real geocoordinates exist); its value is
    /// otherwise unused.
    pub async fn detect<R>(
        &self,
        reader: &R,
        field_id: i64,
        location: &str,
        exclude_plot_id: Option<i64>,
        radius: Option<f64>,
    ) -> DomainResult<DuplicateReport>
    where
        R: StoreReader + ?Sized,
    {
        validate_required_text(location, "location", MAX_LOCATION_LEN)?;
        reader
            .field(field_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("field {field_id}")))?;

        let candidate_lower = location.to_lowercase();
        let mut exact_matches = Vec::new();
        let mut similar_matches = Vec::new();
        let mut nearby_matches = Vec::new();

        // plots_in_field returns ascending id
        for plot in reader.plots_in_field(field_id).await? {
            if exclude_plot_id == Some(plot.id) {
                continue;
            }
            let Some(existing) = plot.location.as_deref() else {
                continue;
            };
            let existing_lower = existing.to_lowercase();
            let score = self.similarity.score(location, existing);
            let entry = DuplicateMatch {
                plot_id: plot.id,
                location: existing.to_string(),
                similarity: score,
            };

            if existing_lower == candidate_lower {
                exact_matches.push(entry);
            } else if existing_lower.contains(&candidate_lower)
                || candidate_lower.contains(&existing_lower)
            {
                similar_matches.push(entry);
            } else if radius.is_some() && score > NEARBY_THRESHOLD {
                nearby_matches.push(entry);
            }
        }

        let mut risk_score = 0u32;
        if !exact_matches.is_empty() {
            risk_score += EXACT_SCORE;
        }
        risk_score += SIMILAR_SCORE * similar_matches.len() as u32;
        risk_score += NEARBY_SCORE * nearby_matches.len() as u32;

        Ok(DuplicateReport {
            field_id,
            location: location.to_string(),
            exact_matches,
            similar_matches,
            nearby_matches,
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
        })
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use shared::models::{Field, Plot};
    use shared::types::PlotStatus;
    use shared::util::now_millis;

    use super::*;
    use crate::store::{DataStore, MemoryStore, Transaction};

    async fn store_with_locations(locations: &[(i64, &str)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed_field(Field {
            id: 1,
            name: "East Field".into(),
            location: None,
        });
        let mut txn = store.begin().await.unwrap();
        for (id, location) in locations {
            txn.insert_plot(Plot {
                id: *id,
                field_id: 1,
                location: Some((*location).to_string()),
                total_capacity: Decimal::from(10),
                status: PlotStatus::Active,
                session_id: 1,
                notes: vec![],
                created_at: now_millis(),
                updated_at: now_millis(),
            })
            .await
            .unwrap();
        }
        txn.commit().await.unwrap();
        store
    }

    #[tokio::test]
    async fn exact_match_is_high_risk() {
        let store = store_with_locations(&[(1, "Plot A")]).await;
        let detector = DuplicateDetector::new();
        let report = detector
            .detect(store.as_ref(), 1, "Plot A", None, None)
            .await
            .unwrap();
        assert_eq!(report.exact_matches.len(), 1);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.risk_score, 100);
    }

    #[tokio::test]
    async fn case_differs_still_exact() {
        let store = store_with_locations(&[(1, "plot a")]).await;
        let detector = DuplicateDetector::new();
        let report = detector
            .detect(store.as_ref(), 1, "PLOT A", None, None)
            .await
            .unwrap();
        assert_eq!(report.exact_matches.len(), 1);
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn sibling_numbering_is_low_or_none() {
        let store = store_with_locations(&[(1, "North-1"), (2, "North-2")]).await;
        let detector = DuplicateDetector::new();
        let report = detector
            .detect(store.as_ref(), 1, "North-1", Some(1), None)
            .await
            .unwrap();
        assert!(report.exact_matches.is_empty());
        assert!(matches!(report.risk_level, RiskLevel::Low | RiskLevel::None));
    }

    #[tokio::test]
    async fn containment_counts_as_similar() {
        let store = store_with_locations(&[(1, "North"), (2, "North Block 3")]).await;
        let detector = DuplicateDetector::new();
        let report = detector
            .detect(store.as_ref(), 1, "North Block", None, None)
            .await
            .unwrap();
        // "North Block" is contained in "North Block 3" and contains "North"... both similar
        assert_eq!(report.similar_matches.len(), 2);
        assert_eq!(report.risk_score, 40);
        assert_eq!(report.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn nearby_tier_requires_radius() {
        let store = store_with_locations(&[(1, "North-1")]).await;
        let detector = DuplicateDetector::new();

        let without = detector
            .detect(store.as_ref(), 1, "North-2", None, None)
            .await
            .unwrap();
        assert!(without.nearby_matches.is_empty());

        // char sets {n,o,r,t,h,-,2} vs {n,o,r,t,h,-,1}: 6/8 = 0.75 > 0.70
        let with = detector
            .detect(store.as_ref(), 1, "North-2", None, Some(500.0))
            .await
            .unwrap();
        assert_eq!(with.nearby_matches.len(), 1);
        assert_eq!(with.risk_score, 10);
        assert_eq!(with.risk_level, RiskLevel::None);
    }

    #[tokio::test]
    async fn exclude_skips_self_and_missing_field_errors() {
        let store = store_with_locations(&[(1, "Plot A")]).await;
        let detector = DuplicateDetector::new();

        let report = detector
            .detect(store.as_ref(), 1, "Plot A", Some(1), None)
            .await
            .unwrap();
        assert!(report.exact_matches.is_empty());
        assert_eq!(report.risk_level, RiskLevel::None);

        let err = detector
            .detect(store.as_ref(), 9, "Plot A", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn similarity_strategy_is_swappable() {
        struct Never;
        impl SimilarityStrategy for Never {
            fn score(&self, _: &str, _: &str) -> f64 {
                0.0
            }
        }

        let store = store_with_locations(&[(1, "North-1")]).await;
        let detector = DuplicateDetector::with_strategy(Box::new(Never));
        let report = detector
            .detect(store.as_ref(), 1, "North-2", None, Some(500.0))
            .await
            .unwrap();
        // The default strategy scores this pair 0.75; Never suppresses it.
        assert!(report.nearby_matches.is_empty());
        assert_eq!(report.risk_level, RiskLevel::None);
    }

    #[tokio::test]
    async fn candidate_order_is_by_ascending_plot_id() {
        let store = store_with_locations(&[(5, "Spot"), (2, "SPOT"), (9, "spot")]).await;
        let detector = DuplicateDetector::new();
        let report = detector
            .detect(store.as_ref(), 1, "Spot", None, None)
            .await
            .unwrap();
        let ids: Vec<i64> = report.exact_matches.iter().map(|m| m.plot_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }
}
