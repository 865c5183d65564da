//! Which cities gaming companies cluster in, and the labeled point set per city.

use std::collections::{BTreeMap, HashSet};

use gamescout_core::{GeoPoint, LabeledPoint, Office};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CityCount {
    pub city: String,
    pub count: usize,
}

/// All labeled office points recorded for one city.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPoints {
    pub city: String,
    pub points: Vec<LabeledPoint>,
}

impl CityPoints {
    #[must_use]
    pub fn coordinates(&self) -> Vec<GeoPoint> {
        self.points.iter().map(|p| p.point).collect()
    }
}

/// Drop exact duplicate offices, keeping the first occurrence.
#[must_use]
pub fn dedup_offices(offices: Vec<Office>) -> Vec<Office> {
    let mut seen = HashSet::new();
    offices
        .into_iter()
        .filter(|o| {
            seen.insert((
                o.company.clone(),
                o.city.clone(),
                o.street.clone(),
                o.point.latitude.to_bits(),
                o.point.longitude.to_bits(),
            ))
        })
        .collect()
}

/// Office count per non-empty city, most offices first, ties by city name.
#[must_use]
pub fn count_by_city(offices: &[Office]) -> Vec<CityCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for office in offices {
        let city = office.city.trim();
        if city.is_empty() {
            continue;
        }
        *counts.entry(city).or_default() += 1;
    }

    let mut ranked: Vec<CityCount> = counts
        .into_iter()
        .map(|(city, count)| CityCount {
            city: city.to_string(),
            count,
        })
        .collect();
    // BTreeMap iteration is already name-ordered; a stable sort keeps that for ties.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// The `n` cities with the most offices.
#[must_use]
pub fn top_cities(offices: &[Office], n: usize) -> Vec<CityCount> {
    let mut ranked = count_by_city(offices);
    ranked.truncate(n);
    ranked
}

/// Labeled point set for each requested city, in the requested order.
///
/// A city with no offices yields an empty set rather than being omitted, so
/// callers can report "no data" for it.
#[must_use]
pub fn group_by_city(offices: &[Office], cities: &[String]) -> Vec<CityPoints> {
    cities
        .iter()
        .map(|city| CityPoints {
            city: city.clone(),
            points: offices
                .iter()
                .filter(|o| o.city.trim() == city.as_str())
                .map(Office::to_labeled_point)
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn office(company: &str, city: &str, lat: f64, lon: f64) -> Office {
        Office {
            company: company.to_string(),
            city: city.to_string(),
            street: None,
            point: GeoPoint::new(lat, lon).unwrap(),
        }
    }

    fn fixture() -> Vec<Office> {
        vec![
            office("Zynga", "San Francisco", 37.77, -122.40),
            office("Kabam", "San Francisco", 37.78, -122.39),
            office("OMGPOP", "New York", 40.72, -74.00),
            office("Playdom", "San Francisco", 37.79, -122.41),
            office("Mind Candy", "London", 51.52, -0.08),
            office("Gaia", "New York", 40.74, -73.99),
            office("Nowhere Inc", "", 0.0, 0.0),
        ]
    }

    #[test]
    fn count_by_city_orders_by_count_then_name() {
        let counts = count_by_city(&fixture());
        assert_eq!(
            counts,
            vec![
                CityCount {
                    city: "San Francisco".to_string(),
                    count: 3
                },
                CityCount {
                    city: "New York".to_string(),
                    count: 2
                },
                CityCount {
                    city: "London".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn count_by_city_breaks_ties_alphabetically() {
        let offices = vec![
            office("A", "Seattle", 47.6, -122.3),
            office("B", "Austin", 30.3, -97.7),
        ];
        let counts = count_by_city(&offices);
        assert_eq!(counts[0].city, "Austin");
        assert_eq!(counts[1].city, "Seattle");
    }

    #[test]
    fn count_by_city_skips_empty_city() {
        let counts = count_by_city(&fixture());
        assert!(counts.iter().all(|c| !c.city.is_empty()));
    }

    #[test]
    fn top_cities_truncates() {
        let top = top_cities(&fixture(), 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[1].city, "New York");
    }

    #[test]
    fn dedup_offices_removes_exact_duplicates_only() {
        let mut offices = fixture();
        offices.push(office("Zynga", "San Francisco", 37.77, -122.40));
        offices.push(office("Zynga", "San Francisco", 37.70, -122.40));
        let deduped = dedup_offices(offices);
        assert_eq!(deduped.len(), fixture().len() + 1);
    }

    #[test]
    fn group_by_city_preserves_requested_order_and_reports_unknown() {
        let cities = vec![
            "London".to_string(),
            "Atlantis".to_string(),
            "San Francisco".to_string(),
        ];
        let groups = group_by_city(&fixture(), &cities);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].city, "London");
        assert_eq!(groups[0].points.len(), 1);
        assert!(groups[1].points.is_empty());
        assert_eq!(groups[2].points.len(), 3);
        assert_eq!(groups[2].points[0].label.as_deref(), Some("Zynga"));
        assert_eq!(groups[2].coordinates().len(), 3);
    }
}
