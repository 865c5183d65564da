//! `cities` subcommands, plus the office loading and city selection shared by
//! the other handlers.

use anyhow::bail;
use clap::Subcommand;
use gamescout_analysis::{
    dedup_offices, group_by_city, summarize, top_cities, CityCount, CityPoints, ClusterSummary,
    FarthestPair, OutlierThreshold, SummaryOptions,
};
use gamescout_core::{AppConfig, GeoPoint, Office};
use serde::Serialize;

#[derive(Debug, Subcommand)]
pub enum CitiesCommands {
    /// Rank cities by number of tagged company offices
    Top {
        /// Number of cities to show; defaults to GAMESCOUT_TOP_CITIES
        #[arg(long)]
        limit: Option<usize>,
        /// Company tag substring; defaults to GAMESCOUT_COMPANY_TAG
        #[arg(long)]
        tag: Option<String>,
    },
    /// Covering circle of each city's office cluster
    Circles {
        /// City to summarize (repeatable); defaults to the top cities
        #[arg(long = "city")]
        cities: Vec<String>,
        /// Outlier cutoff as planar distance in degrees
        #[arg(long, conflicts_with = "threshold_meters", value_parser = parse_threshold)]
        threshold_degrees: Option<f64>,
        /// Outlier cutoff as haversine distance in meters
        #[arg(long, value_parser = parse_threshold)]
        threshold_meters: Option<f64>,
        /// Include the convex hull of the retained offices
        #[arg(long)]
        hull: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Outlier cutoffs must be finite and positive, like the configured defaults.
fn parse_threshold(raw: &str) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|e| format!("'{raw}' is not a number: {e}"))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("'{raw}' must be a positive number"));
    }
    Ok(value)
}

/// A city's offices together with their summary (`None` for no data).
#[derive(Debug)]
pub(crate) struct CityCluster {
    pub points: CityPoints,
    pub summary: Option<ClusterSummary>,
}

/// Serializable view of one city's covering circle.
#[derive(Debug, Serialize)]
pub(crate) struct CircleReport {
    pub city: String,
    pub offices: usize,
    pub retained: usize,
    pub discarded: usize,
    pub centroid: GeoPoint,
    pub center: GeoPoint,
    pub radius_meters: f64,
    pub radius_degrees: f64,
    pub farthest: Option<FarthestPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hull: Option<Vec<[f64; 2]>>,
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: CitiesCommands,
) -> anyhow::Result<()> {
    match command {
        CitiesCommands::Top { limit, tag } => {
            let tag = tag.as_deref().unwrap_or(&config.company_tag);
            let offices = load_offices(pool, tag, None).await?;
            let top = top_cities(&offices, limit.unwrap_or(config.top_cities));
            if top.is_empty() {
                println!("no offices found for tag '{tag}'");
                return Ok(());
            }
            print_top_cities(&top);
        }
        CitiesCommands::Circles {
            cities,
            threshold_degrees,
            threshold_meters,
            hull,
            json,
        } => {
            let cities = resolve_cities(pool, config, &cities).await?;
            let options = SummaryOptions {
                threshold: outlier_threshold(config, threshold_degrees, threshold_meters),
                with_hull: hull,
            };
            let clusters = load_clusters(pool, config, &cities, &options).await?;

            if json {
                let reports: Vec<CircleReport> = clusters
                    .iter()
                    .filter_map(|c| circle_report(c, config.degrees_to_meters))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_circles(&clusters);
            }
        }
    }
    Ok(())
}

/// Tagged offices as domain values, optionally restricted to `cities`.
///
/// Rows whose stored coordinates fail validation are logged and skipped;
/// repeated offices of one company are collapsed.
pub(crate) async fn load_offices(
    pool: &sqlx::PgPool,
    tag: &str,
    cities: Option<&[String]>,
) -> anyhow::Result<Vec<Office>> {
    let rows = gamescout_db::list_offices_by_tag(pool, tag, cities).await?;
    let mut offices = Vec::with_capacity(rows.len());
    for row in rows {
        let office_id = row.office_id;
        match Office::try_from(row) {
            Ok(office) => offices.push(office),
            Err(e) => tracing::warn!(office_id, error = %e, "skipping office with invalid coordinates"),
        }
    }
    Ok(dedup_offices(offices))
}

/// The cities a command should work on: the requested ones, or the top
/// `config.top_cities` by office count when none were given.
pub(crate) async fn resolve_cities(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    requested: &[String],
) -> anyhow::Result<Vec<String>> {
    if !requested.is_empty() {
        return Ok(requested.iter().map(|c| c.trim().to_string()).collect());
    }

    let offices = load_offices(pool, &config.company_tag, None).await?;
    let top = top_cities(&offices, config.top_cities);
    if top.is_empty() {
        bail!(
            "no offices found for tag '{}'; run `gamescout import` first",
            config.company_tag
        );
    }
    Ok(top.into_iter().map(|c| c.city).collect())
}

/// Command-line threshold if given, else the configured one. A meters
/// threshold in the environment switches the default to geodesic filtering.
pub(crate) fn outlier_threshold(
    config: &AppConfig,
    degrees: Option<f64>,
    meters: Option<f64>,
) -> OutlierThreshold {
    match (degrees, meters) {
        (_, Some(m)) => OutlierThreshold::Meters(m),
        (Some(d), None) => OutlierThreshold::Degrees(d),
        (None, None) => config.outlier_threshold_meters.map_or(
            OutlierThreshold::Degrees(config.outlier_threshold_degrees),
            OutlierThreshold::Meters,
        ),
    }
}

/// Default summary options for commands without threshold flags.
pub(crate) fn default_options(config: &AppConfig, with_hull: bool) -> SummaryOptions {
    SummaryOptions {
        threshold: outlier_threshold(config, None, None),
        with_hull,
    }
}

pub(crate) async fn load_clusters(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    cities: &[String],
    options: &SummaryOptions,
) -> anyhow::Result<Vec<CityCluster>> {
    let offices = load_offices(pool, &config.company_tag, Some(cities)).await?;
    Ok(cluster_cities(&offices, cities, options))
}

/// Group offices into `cities` (in the given order) and summarize each.
pub(crate) fn cluster_cities(
    offices: &[Office],
    cities: &[String],
    options: &SummaryOptions,
) -> Vec<CityCluster> {
    group_by_city(offices, cities)
        .into_iter()
        .map(|points| {
            let summary = summarize(&points.coordinates(), options);
            if summary.is_none() {
                tracing::warn!(city = %points.city, "no offices with coordinates");
            }
            CityCluster { points, summary }
        })
        .collect()
}

/// `None` when the city has no data.
pub(crate) fn circle_report(cluster: &CityCluster, degrees_to_meters: f64) -> Option<CircleReport> {
    let summary = cluster.summary.as_ref()?;
    let radius_degrees = if degrees_to_meters > 0.0 {
        summary.circle.radius_meters / degrees_to_meters
    } else {
        0.0
    };

    Some(CircleReport {
        city: cluster.points.city.clone(),
        offices: cluster.points.points.len(),
        retained: summary.retained,
        discarded: summary.discarded,
        centroid: summary.centroid,
        center: summary.circle.center,
        radius_meters: summary.circle.radius_meters,
        radius_degrees,
        farthest: summary.farthest,
        hull: summary
            .hull
            .as_ref()
            .map(|polygon| polygon.exterior().coords().map(|c| [c.x, c.y]).collect()),
    })
}

fn print_top_cities(top: &[CityCount]) {
    println!("{:<5} {:<28} {:>7}", "RANK", "CITY", "OFFICES");
    println!("{}", "-".repeat(42));
    for (i, entry) in top.iter().enumerate() {
        println!("{:<5} {:<28} {:>7}", i + 1, entry.city, entry.count);
    }
}

fn print_circles(clusters: &[CityCluster]) {
    println!(
        "{:<20} {:>7} {:>5} {:<24} {:>11}",
        "CITY", "OFFICES", "KEPT", "CENTER", "RADIUS (m)"
    );
    println!("{}", "-".repeat(71));
    for cluster in clusters {
        match &cluster.summary {
            Some(summary) => println!(
                "{:<20} {:>7} {:>5} {:<24} {:>11.1}",
                cluster.points.city,
                cluster.points.points.len(),
                summary.retained,
                summary.circle.center.to_string(),
                summary.circle.radius_meters
            ),
            None => println!("{:<20} {:>7} {:>5} {:<24} {:>11}", cluster.points.city, 0, 0, "no data", "-"),
        }
    }
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

    #[test]
    fn outlier_threshold_prefers_flags_over_config() {
        let mut config = crate::tests::app_config();
        assert_eq!(
            outlier_threshold(&config, None, None),
            OutlierThreshold::Degrees(0.05)
        );
        assert_eq!(
            outlier_threshold(&config, Some(0.1), None),
            OutlierThreshold::Degrees(0.1)
        );
        assert_eq!(
            outlier_threshold(&config, None, Some(3000.0)),
            OutlierThreshold::Meters(3000.0)
        );

        config.outlier_threshold_meters = Some(5000.0);
        assert_eq!(
            outlier_threshold(&config, None, None),
            OutlierThreshold::Meters(5000.0)
        );
        assert_eq!(
            outlier_threshold(&config, Some(0.02), None),
            OutlierThreshold::Degrees(0.02)
        );
    }

    #[test]
    fn parse_threshold_accepts_only_finite_positive_values() {
        assert_eq!(parse_threshold("0.05"), Ok(0.05));
        assert_eq!(parse_threshold("4000"), Ok(4000.0));
        for bad in ["0", "-1", "-0.05", "NaN", "inf", "-inf", "wide"] {
            assert!(parse_threshold(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn cluster_cities_keeps_requested_order_and_marks_no_data() {
        let offices = vec![
            office("Zynga", "San Francisco", 37.7749, -122.4194),
            office("Kabam", "San Francisco", 37.7849, -122.4294),
            office("Riot", "Los Angeles", 34.0522, -118.2437),
        ];
        let cities = vec![
            "Boise".to_string(),
            "San Francisco".to_string(),
            "Los Angeles".to_string(),
        ];

        let clusters = cluster_cities(&offices, &cities, &SummaryOptions::default());
        let names: Vec<&str> = clusters.iter().map(|c| c.points.city.as_str()).collect();
        assert_eq!(names, vec!["Boise", "San Francisco", "Los Angeles"]);
        assert!(clusters[0].summary.is_none());
        assert!(clusters[1].summary.is_some());

        let la = clusters[2].summary.as_ref().unwrap();
        assert_eq!(la.circle.radius_meters, 0.0);
        assert_eq!(la.circle.center, offices[2].point);
    }

    #[test]
    fn circle_report_converts_radius_to_degrees() {
        let offices = vec![
            office("A", "San Francisco", 37.7749, -122.4194),
            office("B", "San Francisco", 37.7849, -122.4294),
        ];
        let cities = vec!["San Francisco".to_string()];
        let clusters = cluster_cities(&offices, &cities, &SummaryOptions::default());

        let report = circle_report(&clusters[0], 111_000.0).unwrap();
        assert_eq!(report.offices, 2);
        assert_eq!(report.retained, 2);
        assert!(report.radius_meters > 0.0);
        assert!((report.radius_degrees - report.radius_meters / 111_000.0).abs() < 1e-12);
        assert!(report.hull.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("hull").is_none());
        assert_eq!(json["city"], "San Francisco");
    }

    #[test]
    fn circle_report_is_none_without_data() {
        let cities = vec!["Boise".to_string()];
        let clusters = cluster_cities(&[], &cities, &SummaryOptions::default());
        assert!(circle_report(&clusters[0], 111_000.0).is_none());
    }

    #[test]
    fn circle_report_includes_hull_when_requested() {
        let offices = vec![
            office("A", "Austin", 30.2672, -97.7431),
            office("B", "Austin", 30.2772, -97.7531),
            office("C", "Austin", 30.2572, -97.7531),
        ];
        let cities = vec!["Austin".to_string()];
        let options = SummaryOptions {
            threshold: OutlierThreshold::Degrees(0.05),
            with_hull: true,
        };
        let clusters = cluster_cities(&offices, &cities, &options);
        let report = circle_report(&clusters[0], 111_000.0).unwrap();
        let hull = report.hull.unwrap();
        assert_eq!(hull.first(), hull.last(), "hull ring must be closed");
        assert!(hull.len() >= 4);
    }
}
