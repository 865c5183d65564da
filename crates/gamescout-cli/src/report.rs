//! `report` handler: a markdown summary of office clusters, amenity scores
//! and each city's share of every category.

use std::fmt::Write as _;

use gamescout_analysis::{
    category_shares, score_cities, score_shares, top_cities, CityCount, CityScore, Share,
};
use gamescout_core::{AppConfig, CategoriesFile};

use crate::cities::{circle_report, cluster_cities, default_options, load_offices, CircleReport};
use crate::score::counts_map;

pub(crate) async fn run_report(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    requested: &[String],
) -> anyhow::Result<()> {
    let file = gamescout_core::load_categories(&config.categories_path)?;
    let offices = load_offices(pool, &config.company_tag, None).await?;
    let top = top_cities(&offices, config.top_cities);

    let cities: Vec<String> = if requested.is_empty() {
        top.iter().map(|c| c.city.clone()).collect()
    } else {
        requested.iter().map(|c| c.trim().to_string()).collect()
    };
    if cities.is_empty() {
        anyhow::bail!(
            "no offices found for tag '{}'; run `gamescout import` first",
            config.company_tag
        );
    }

    let circles: Vec<CircleReport> =
        cluster_cities(&offices, &cities, &default_options(config, false))
            .iter()
            .filter_map(|c| circle_report(c, config.degrees_to_meters))
            .collect();

    let rows = gamescout_db::count_venues_by_locality(pool, &cities).await?;
    let scores = score_cities(&cities, &file.weights(), &counts_map(&rows))?;

    print!("{}", render_report(&config.company_tag, &top, &circles, &scores, &file));
    Ok(())
}

/// Render the whole report. Pure so it can be tested without a database.
pub(crate) fn render_report(
    tag: &str,
    top: &[CityCount],
    circles: &[CircleReport],
    scores: &[CityScore],
    categories: &CategoriesFile,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# City report: companies tagged \"{tag}\"\n");

    let _ = writeln!(out, "## Top cities by office count\n");
    if top.is_empty() {
        let _ = writeln!(out, "_No tagged offices._\n");
    } else {
        let _ = writeln!(out, "| Rank | City | Offices |");
        let _ = writeln!(out, "|---:|---|---:|");
        for (i, entry) in top.iter().enumerate() {
            let _ = writeln!(out, "| {} | {} | {} |", i + 1, entry.city, entry.count);
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Coverage circles\n");
    if circles.is_empty() {
        let _ = writeln!(out, "_No city has office coordinates._\n");
    } else {
        let _ = writeln!(
            out,
            "| City | Offices | Retained | Center | Radius (m) | Radius (deg) |"
        );
        let _ = writeln!(out, "|---|---:|---:|---|---:|---:|");
        for c in circles {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {:.1} | {:.5} |",
                c.city, c.offices, c.retained, c.center, c.radius_meters, c.radius_degrees
            );
        }
        out.push('\n');
    }

    let _ = writeln!(out, "## Amenity scores\n");
    let _ = write!(out, "| Rank | City | Score |");
    for category in &categories.categories {
        let _ = write!(out, " {} |", category.label);
    }
    let _ = write!(out, "\n|---:|---|---:|");
    for _ in &categories.categories {
        out.push_str("---:|");
    }
    out.push('\n');
    for (i, score) in scores.iter().enumerate() {
        let _ = write!(out, "| {} | {} | {:.3} |", i + 1, score.city, score.weighted_score);
        for category in &categories.categories {
            let _ = write!(out, " {} |", score.count(&category.slug));
        }
        out.push('\n');
    }
    out.push('\n');

    let _ = writeln!(out, "## Shares\n");
    for category in &categories.categories {
        let shares = category_shares(scores, &category.slug);
        write_shares(&mut out, &category.label, &shares, |v| format!("{v:.0}"));
    }
    write_shares(&mut out, "Weighted score", &score_shares(scores), |v| format!("{v:.3}"));

    out
}

fn write_shares(out: &mut String, title: &str, shares: &[Share], value: impl Fn(f64) -> String) {
    let _ = writeln!(out, "### {title}\n");
    let _ = writeln!(out, "| City | Share |");
    let _ = writeln!(out, "|---|---:|");
    for share in shares {
        let _ = writeln!(
            out,
            "| {} | {} ({:.1}%) |",
            share.city,
            value(share.value),
            share.percent
        );
    }
    out.push('\n');
}
