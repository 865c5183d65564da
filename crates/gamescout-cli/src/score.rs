//! `score` handler: rank cities by weighted, normalized amenity counts.

use std::collections::HashMap;

use gamescout_analysis::{score_cities, CityScore};
use gamescout_core::AppConfig;
use gamescout_db::LocalityCountRow;

use crate::cities::resolve_cities;

/// Counts keyed by `(city, category slug)`. Negative counts cannot occur in
/// SQL `COUNT(*)` and are clamped to zero.
pub(crate) fn counts_map(rows: &[LocalityCountRow]) -> HashMap<(String, String), u64> {
    rows.iter()
        .map(|row| {
            (
                (row.locality.clone(), row.category.clone()),
                u64::try_from(row.count).unwrap_or(0),
            )
        })
        .collect()
}

/// Score the given cities from stored venue counts.
pub(crate) async fn load_scores(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    cities: &[String],
) -> anyhow::Result<Vec<CityScore>> {
    let file = gamescout_core::load_categories(&config.categories_path)?;
    let rows = gamescout_db::count_venues_by_locality(pool, cities).await?;
    let counts = counts_map(&rows);
    Ok(score_cities(cities, &file.weights(), &counts)?)
}

pub(crate) async fn run_score(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    requested: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let cities = resolve_cities(pool, config, requested).await?;
    let scores = load_scores(pool, config, &cities).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&scores)?);
        return Ok(());
    }

    print_scores(&scores);
    Ok(())
}

fn print_scores(scores: &[CityScore]) {
    let Some(first) = scores.first() else {
        println!("no cities to score");
        return;
    };

    print!("{:<5} {:<20} {:>8}", "RANK", "CITY", "SCORE");
    for category in &first.categories {
        print!(" {:>8}", category.slug.to_uppercase());
    }
    println!();
    println!("{}", "-".repeat(35 + 9 * first.categories.len()));

    for (i, score) in scores.iter().enumerate() {
        print!("{:<5} {:<20} {:>8.3}", i + 1, score.city, score.weighted_score);
        for category in &score.categories {
            print!(" {:>8}", category.count);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(locality: &str, category: &str, count: i64) -> LocalityCountRow {
        LocalityCountRow {
            locality: locality.to_string(),
            category: category.to_string(),
            count,
        }
    }

    #[test]
    fn counts_map_keys_by_city_and_category() {
        let rows = vec![
            row("San Francisco", "coffee", 12),
            row("San Francisco", "bars", 30),
            row("New York", "bars", 45),
        ];
        let counts = counts_map(&rows);
        assert_eq!(counts.len(), 3);
        assert_eq!(
            counts.get(&("San Francisco".to_string(), "bars".to_string())),
            Some(&30)
        );
        assert!(!counts.contains_key(&("New York".to_string(), "coffee".to_string())));
    }

    #[test]
    fn counts_feed_weighted_scores() {
        let rows = vec![
            row("San Francisco", "coffee", 10),
            row("New York", "coffee", 5),
            row("New York", "bars", 20),
        ];
        let counts = counts_map(&rows);
        let cities = vec!["San Francisco".to_string(), "New York".to_string()];
        let weights = vec![("coffee".to_string(), 0.5), ("bars".to_string(), 0.5)];

        let scores = score_cities(&cities, &weights, &counts).unwrap();
        assert_eq!(scores[0].city, "New York");
        assert!((scores[0].weighted_score - 0.75).abs() < 1e-9);
        assert_eq!(scores[1].count("bars"), 0);
    }
}
