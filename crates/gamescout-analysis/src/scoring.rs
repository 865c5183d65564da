//! City ranking by weighted amenity density.
//!
//! Each category's venue count is normalized against the best city for that
//! category, then combined with the configured category weights.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::error::AnalysisError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub slug: String,
    pub count: u64,
    /// `count / max(count across cities)`, or 0 when no city has any.
    pub normalized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityScore {
    pub city: String,
    pub categories: Vec<CategoryScore>,
    pub weighted_score: f64,
}

impl CityScore {
    #[must_use]
    pub fn count(&self, slug: &str) -> u64 {
        self.categories
            .iter()
            .find(|c| c.slug == slug)
            .map_or(0, |c| c.count)
    }
}

/// One slice of a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub city: String,
    pub value: f64,
    /// Percentage of the column total, 0 when the total is 0.
    pub percent: f64,
}

/// Score each city from venue counts keyed by `(city, category slug)`.
///
/// Missing keys count as zero. Results are ordered by weighted score
/// descending, ties by city name.
///
/// # Errors
///
/// Returns [`AnalysisError::NoCategories`] if `weights` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn score_cities<S: std::hash::BuildHasher>(
    cities: &[String],
    weights: &[(String, f64)],
    counts: &HashMap<(String, String), u64, S>,
) -> Result<Vec<CityScore>, AnalysisError> {
    if weights.is_empty() {
        return Err(AnalysisError::NoCategories);
    }

    let lookup = |city: &str, slug: &str| -> u64 {
        counts
            .get(&(city.to_string(), slug.to_string()))
            .copied()
            .unwrap_or(0)
    };

    let maxima: Vec<u64> = weights
        .iter()
        .map(|(slug, _)| {
            cities
                .iter()
                .map(|city| lookup(city, slug))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut scores: Vec<CityScore> = cities
        .iter()
        .map(|city| {
            let categories: Vec<CategoryScore> = weights
                .iter()
                .zip(&maxima)
                .map(|((slug, _), &max)| {
                    let count = lookup(city, slug);
                    let normalized = if max == 0 {
                        0.0
                    } else {
                        count as f64 / max as f64
                    };
                    CategoryScore {
                        slug: slug.clone(),
                        count,
                        normalized,
                    }
                })
                .collect();
            let weighted_score = categories
                .iter()
                .zip(weights)
                .map(|(c, (_, weight))| c.normalized * weight)
                .sum();
            CityScore {
                city: city.clone(),
                categories,
                weighted_score,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.weighted_score
            .partial_cmp(&a.weighted_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.city.cmp(&b.city))
    });

    Ok(scores)
}

fn shares(values: Vec<(String, f64)>) -> Vec<Share> {
    let total: f64 = values.iter().map(|(_, v)| v).sum();
    values
        .into_iter()
        .map(|(city, value)| Share {
            city,
            value,
            percent: if total > 0.0 {
                value / total * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Pie-chart slices of one category's venue counts across the scored cities.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn category_shares(scores: &[CityScore], slug: &str) -> Vec<Share> {
    shares(
        scores
            .iter()
            .map(|s| (s.city.clone(), s.count(slug) as f64))
            .collect(),
    )
}

/// Pie-chart slices of the weighted scores.
#[must_use]
pub fn score_shares(scores: &[CityScore]) -> Vec<Share> {
    shares(
        scores
            .iter()
            .map(|s| (s.city.clone(), s.weighted_score))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights() -> Vec<(String, f64)> {
        vec![
            ("coffee".to_string(), 0.2),
            ("schools".to_string(), 0.2),
            ("clubs".to_string(), 0.2),
            ("bars".to_string(), 0.4),
        ]
    }

    fn cities() -> Vec<String> {
        vec![
            "San Francisco".to_string(),
            "New York".to_string(),
            "London".to_string(),
        ]
    }

    fn counts() -> HashMap<(String, String), u64> {
        let mut m = HashMap::new();
        for (city, slug, n) in [
            ("San Francisco", "coffee", 40),
            ("San Francisco", "schools", 10),
            ("San Francisco", "clubs", 5),
            ("San Francisco", "bars", 20),
            ("New York", "coffee", 50),
            ("New York", "schools", 20),
            ("New York", "clubs", 10),
            ("New York", "bars", 50),
            ("London", "coffee", 10),
            ("London", "bars", 25),
        ] {
            m.insert((city.to_string(), slug.to_string()), n);
        }
        m
    }

    #[test]
    fn score_cities_rejects_empty_weights() {
        assert_eq!(
            score_cities(&cities(), &[], &counts()),
            Err(AnalysisError::NoCategories)
        );
    }

    #[test]
    fn score_cities_normalizes_by_category_maximum() {
        let scores = score_cities(&cities(), &weights(), &counts()).unwrap();
        let sf = scores.iter().find(|s| s.city == "San Francisco").unwrap();
        let coffee = &sf.categories[0];
        assert_eq!(coffee.count, 40);
        assert!((coffee.normalized - 0.8).abs() < 1e-12);
    }

    #[test]
    fn score_cities_applies_weights_and_orders_descending() {
        let scores = score_cities(&cities(), &weights(), &counts()).unwrap();
        assert_eq!(scores[0].city, "New York");
        assert!((scores[0].weighted_score - 1.0).abs() < 1e-12);

        // SF: 0.2*0.8 + 0.2*0.5 + 0.2*0.5 + 0.4*0.4 = 0.52
        let sf = scores.iter().find(|s| s.city == "San Francisco").unwrap();
        assert!((sf.weighted_score - 0.52).abs() < 1e-12);
        // London: 0.2*0.2 + 0.4*0.5 = 0.24
        assert_eq!(scores[2].city, "London");
        assert!((scores[2].weighted_score - 0.24).abs() < 1e-12);
    }

    #[test]
    fn score_cities_with_all_zero_counts_scores_zero_and_orders_by_name() {
        let scores = score_cities(&cities(), &weights(), &HashMap::new()).unwrap();
        assert!(scores.iter().all(|s| s.weighted_score.abs() < f64::EPSILON));
        let names: Vec<&str> = scores.iter().map(|s| s.city.as_str()).collect();
        assert_eq!(names, vec!["London", "New York", "San Francisco"]);
    }

    #[test]
    fn category_shares_sum_to_hundred_percent() {
        let scores = score_cities(&cities(), &weights(), &counts()).unwrap();
        let slices = category_shares(&scores, "bars");
        let total: f64 = slices.iter().map(|s| s.percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        let ny = slices.iter().find(|s| s.city == "New York").unwrap();
        assert!((ny.value - 50.0).abs() < f64::EPSILON);
        assert!((ny.percent - 50.0 / 95.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn category_shares_of_unknown_category_are_zero() {
        let scores = score_cities(&cities(), &weights(), &counts()).unwrap();
        let slices = category_shares(&scores, "museums");
        assert!(slices
            .iter()
            .all(|s| s.value.abs() < f64::EPSILON && s.percent.abs() < f64::EPSILON));
    }

    #[test]
    fn score_shares_follow_weighted_scores() {
        let scores = score_cities(&cities(), &weights(), &counts()).unwrap();
        let slices = score_shares(&scores);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].city, "New York");
        assert!((slices[0].percent - 1.0 / 1.76 * 100.0).abs() < 1e-9);
    }
}
