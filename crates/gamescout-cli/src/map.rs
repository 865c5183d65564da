//! `map` handler: one city's cluster as a GeoJSON `FeatureCollection`.
//!
//! Every feature carries a `kind` property (`office`, `farthest`, `midpoint`,
//! `circle`, `hull` or `venue`). Point features use the simplestyle
//! `marker-color` / `marker-symbol` properties so the file renders styled in
//! common GeoJSON viewers.

use std::path::Path;

use anyhow::{bail, Context};
use gamescout_analysis::{circle_ring, retained_indices, OutlierThreshold};
use gamescout_core::{CategoriesFile, GeoPoint};
use gamescout_db::VenueRow;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;

use crate::cities::{cluster_cities, default_options, load_offices, CityCluster};

/// Segments used to approximate the covering circle.
const CIRCLE_SEGMENTS: usize = 64;

const OFFICE_COLOR: &str = "#3388ff";
const OUTLIER_COLOR: &str = "#999999";
const FARTHEST_COLOR: &str = "#d63e2a";
const MIDPOINT_COLOR: &str = "#72b026";

pub(crate) async fn run_map(
    pool: &sqlx::PgPool,
    config: &gamescout_core::AppConfig,
    city: &str,
    out: Option<&Path>,
    hull: bool,
    with_venues: bool,
) -> anyhow::Result<()> {
    let city = city.trim().to_string();
    let options = default_options(config, hull);
    let cities = [city.clone()];
    let offices = load_offices(pool, &config.company_tag, Some(cities.as_slice())).await?;
    let clusters = cluster_cities(&offices, &cities, &options);
    let Some(cluster) = clusters.first().filter(|c| c.summary.is_some()) else {
        bail!("no offices with coordinates in '{city}'");
    };

    let (venues, categories) = if with_venues {
        let file = gamescout_core::load_categories(&config.categories_path)?;
        let rows = gamescout_db::list_venues(pool, Some(&city)).await?;
        (rows, Some(file))
    } else {
        (Vec::new(), None)
    };

    let collection =
        build_feature_collection(cluster, options.threshold, &venues, categories.as_ref());
    let feature_count = collection.features.len();
    let body = GeoJson::from(collection).to_string();

    match out {
        Some(path) => {
            std::fs::write(path, &body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(city = %city, features = feature_count, path = %path.display(), "map written");
            println!("wrote {feature_count} features to {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

/// Build the map for one summarized city.
///
/// Offices outside the outlier threshold are kept on the map but flagged.
/// Returns an empty collection for a city without data.
pub(crate) fn build_feature_collection(
    cluster: &CityCluster,
    threshold: OutlierThreshold,
    venues: &[VenueRow],
    categories: Option<&CategoriesFile>,
) -> FeatureCollection {
    let mut features = Vec::new();
    let Some(summary) = &cluster.summary else {
        return feature_collection(features);
    };

    let coordinates = cluster.points.coordinates();
    let mut retained = vec![false; coordinates.len()];
    for i in retained_indices(&coordinates, threshold) {
        retained[i] = true;
    }

    for (labeled, kept) in cluster.points.points.iter().zip(&retained) {
        let mut props = JsonObject::new();
        props.insert("kind".into(), json!("office"));
        props.insert("company".into(), json!(labeled.label));
        props.insert("street".into(), json!(labeled.street));
        props.insert("outlier".into(), json!(!kept));
        props.insert(
            "marker-color".into(),
            json!(if *kept { OFFICE_COLOR } else { OUTLIER_COLOR }),
        );
        features.push(point_feature(labeled.point, props));
    }

    if let Some(pair) = &summary.farthest {
        for end in [pair.a, pair.b] {
            let mut props = JsonObject::new();
            props.insert("kind".into(), json!("farthest"));
            props.insert("distance_meters".into(), json!(pair.distance_meters));
            props.insert("marker-color".into(), json!(FARTHEST_COLOR));
            features.push(point_feature(end, props));
        }
    }

    let mut props = JsonObject::new();
    props.insert("kind".into(), json!("midpoint"));
    props.insert("city".into(), json!(cluster.points.city));
    props.insert("radius_meters".into(), json!(summary.circle.radius_meters));
    props.insert("marker-color".into(), json!(MIDPOINT_COLOR));
    props.insert("marker-symbol".into(), json!("star"));
    features.push(point_feature(summary.circle.center, props));

    let ring: Vec<Vec<f64>> = circle_ring(
        summary.circle.center,
        summary.circle.radius_meters,
        CIRCLE_SEGMENTS,
    )
    .into_iter()
    .map(position)
    .collect();
    let mut props = JsonObject::new();
    props.insert("kind".into(), json!("circle"));
    props.insert("radius_meters".into(), json!(summary.circle.radius_meters));
    props.insert("fill-opacity".into(), json!(0.1));
    features.push(feature(Geometry::new(Value::Polygon(vec![ring])), props));

    if let Some(polygon) = &summary.hull {
        let mut props = JsonObject::new();
        props.insert("kind".into(), json!("hull"));
        props.insert("fill-opacity".into(), json!(0.05));
        features.push(feature(Geometry::from(polygon), props));
    }

    for venue in venues {
        let Ok(point) = venue.point() else {
            tracing::warn!(fsq_id = %venue.fsq_id, "skipping venue with invalid coordinates");
            continue;
        };
        let mut props = JsonObject::new();
        props.insert("kind".into(), json!("venue"));
        props.insert("category".into(), json!(venue.category));
        props.insert("name".into(), json!(venue.name));
        props.insert("address".into(), json!(venue.address));
        if let Some(style) = categories.and_then(|c| c.get(&venue.category)) {
            props.insert("marker-color".into(), json!(style.marker.color));
            props.insert("marker-symbol".into(), json!(style.marker.icon));
        }
        features.push(point_feature(point, props));
    }

    feature_collection(features)
}

fn position(point: GeoPoint) -> Vec<f64> {
    vec![point.longitude, point.latitude]
}

fn point_feature(point: GeoPoint, properties: JsonObject) -> Feature {
    feature(Geometry::new(Value::Point(position(point))), properties)
}

fn feature(geometry: Geometry, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
