//! `venues` subcommands: amenity collection around each city's covering
//! circle, and listing what has been stored.
//!
//! Collection runs are recorded in `collection_runs`, with one
//! `collection_run_cities` row per city holding the circle that was searched
//! and the categories asked for. A city that fails is logged and skipped;
//! the run fails only when every city does.

use anyhow::{anyhow, bail};
use clap::Subcommand;
use futures::stream::{self, StreamExt};
use gamescout_analysis::CoverageCircle;
use gamescout_core::{AppConfig, CategoriesFile, CategoryConfig, NormalizedVenue};
use gamescout_db::{CityRunStatus, CollectionRunCityRow, RunCityOutcome, SearchArea};
use gamescout_places::{normalize_place, PlacesClient, SearchRequest};

use crate::cities::{default_options, load_clusters, resolve_cities};
use crate::fail_run_best_effort;

#[derive(Debug, Subcommand)]
pub enum VenuesCommands {
    /// Search each city's circle for every configured amenity category
    Collect {
        /// City to collect (repeatable); defaults to the top cities
        #[arg(long = "city")]
        cities: Vec<String>,
        /// Category slug to collect (repeatable); defaults to all
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Print the planned searches without calling the API or writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Show recent collection runs with their per-city outcomes
    Runs {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// List stored venues
    List {
        /// Only venues whose reported locality matches
        #[arg(long)]
        city: Option<String>,
    },
}

/// Result of collecting one city during a venues run.
struct CityVenueOutcome {
    status: CityRunStatus,
    /// Venues returned across all categories (after normalization).
    found: usize,
    new: u64,
    updated: u64,
    error: Option<String>,
}

impl CityVenueOutcome {
    fn skipped() -> Self {
        Self {
            status: CityRunStatus::Skipped,
            found: 0,
            new: 0,
            updated: 0,
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            status: CityRunStatus::Failed,
            found: 0,
            new: 0,
            updated: 0,
            error: Some(message),
        }
    }
}

pub(crate) async fn run(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    command: VenuesCommands,
) -> anyhow::Result<()> {
    match command {
        VenuesCommands::Collect {
            cities,
            categories,
            dry_run,
        } => run_collect_venues(pool, config, &cities, &categories, dry_run).await,
        VenuesCommands::Runs { limit } => run_list_runs(pool, limit).await,
        VenuesCommands::List { city } => run_list_venues(pool, city.as_deref()).await,
    }
}

/// Categories to collect: all configured ones, or the requested slugs.
///
/// # Errors
///
/// Returns an error naming the first slug not present in the file.
pub(crate) fn select_categories<'a>(
    file: &'a CategoriesFile,
    requested: &[String],
) -> anyhow::Result<Vec<&'a CategoryConfig>> {
    if requested.is_empty() {
        return Ok(file.categories.iter().collect());
    }
    requested
        .iter()
        .map(|slug| {
            file.get(slug)
                .ok_or_else(|| anyhow!("unknown category '{slug}'"))
        })
        .collect()
}

/// The circle a city is searched over, with the radius actually sent to the
/// places API.
pub(crate) fn search_area(config: &AppConfig, circle: &CoverageCircle) -> SearchArea {
    SearchArea {
        center: circle.center,
        radius_meters: circle.radius_meters,
        search_radius_meters: SearchRequest::search_radius(circle, config.search_radius_divisor),
    }
}

/// The searches one city's circle expands into, one per category.
pub(crate) fn plan_searches(
    config: &AppConfig,
    circle: &CoverageCircle,
    categories: &[&CategoryConfig],
) -> Vec<(String, SearchRequest)> {
    categories
        .iter()
        .map(|category| {
            (
                category.slug.clone(),
                SearchRequest::within_circle(
                    &category.query,
                    circle,
                    config.search_radius_divisor,
                    config.places_result_limit,
                ),
            )
        })
        .collect()
}

async fn run_collect_venues(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    requested_cities: &[String],
    requested_categories: &[String],
    dry_run: bool,
) -> anyhow::Result<()> {
    let file = gamescout_core::load_categories(&config.categories_path)?;
    let categories = select_categories(&file, requested_categories)?;
    let cities = resolve_cities(pool, config, requested_cities).await?;
    let clusters = load_clusters(pool, config, &cities, &default_options(config, false)).await?;

    if dry_run {
        println!(
            "dry-run: would search {} categories in {} cities:",
            categories.len(),
            clusters.len()
        );
        for cluster in &clusters {
            let Some(summary) = &cluster.summary else {
                println!("  {:<20} no data, skipped", cluster.points.city);
                continue;
            };
            for (slug, request) in plan_searches(config, &summary.circle, &categories) {
                println!(
                    "  {:<20} {:<10} query={:?} ll={} radius={}m limit={}",
                    cluster.points.city,
                    slug,
                    request.query,
                    request.center,
                    request.radius_meters,
                    request.limit
                );
            }
        }
        return Ok(());
    }

    let api_key = config
        .foursquare_api_key
        .as_deref()
        .ok_or_else(|| anyhow!("FOURSQUARE_API_KEY must be set to collect venues"))?;
    let client = PlacesClient::new(
        api_key,
        config.places_request_timeout_secs,
        &config.places_user_agent,
        config.places_max_retries,
        config.places_retry_backoff_base_ms,
    )?;

    println!(
        "Collecting {} categories for {} cities...",
        categories.len(),
        clusters.len()
    );

    let run = gamescout_db::create_collection_run(pool).await?;
    if let Err(e) = gamescout_db::start_collection_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, "venues", format!("{e:#}")).await;
        return Err(e.into());
    }

    tracing::info!(run_id = run.id, public_id = %run.public_id, "venue collection run started");

    let run_id = run.id;
    let max_concurrent = config.places_max_concurrent.max(1);
    let searched: Vec<String> = categories.iter().map(|c| c.slug.clone()).collect();
    let slugs = searched.as_slice();
    let categories = categories.as_slice();
    let client = &client;

    let results: Vec<(&str, CityVenueOutcome)> = stream::iter(&clusters)
        .map(|cluster| {
            let city = cluster.points.city.as_str();
            let circle = cluster.summary.as_ref().map(|s| s.circle);
            async move {
                let outcome = match circle {
                    Some(circle) => {
                        collect_city(pool, config, client, run_id, categories, city, &circle).await
                    }
                    None => {
                        tracing::warn!(city, "no office data; skipping venue collection");
                        CityVenueOutcome::skipped()
                    }
                };
                let area = circle.map(|c| search_area(config, &c));
                record_city(pool, run_id, city, area, slugs, &outcome).await;
                (city, outcome)
            }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    let mut total_new: u64 = 0;
    let mut failed_cities: usize = 0;

    for (city, outcome) in &results {
        match outcome.status {
            CityRunStatus::Succeeded => {
                total_new += outcome.new;
                println!(
                    "  \u{2713} {:<20} {:>4} venues ({} new, {} updated)",
                    city, outcome.found, outcome.new, outcome.updated
                );
            }
            CityRunStatus::Skipped => println!("  - {city:<20} no data"),
            CityRunStatus::Failed => {
                failed_cities += 1;
                let err_msg = outcome.error.as_deref().unwrap_or("unknown error");
                println!("  \u{2717} {city:<20} {err_msg}");
            }
        }
    }

    if failed_cities > 0 && failed_cities == results.len() {
        let message = format!("all {failed_cities} cities failed venue collection");
        fail_run_best_effort(pool, run.id, "venues", message.clone()).await;
        bail!("{message}");
    }

    let total_found = match gamescout_db::complete_collection_run(pool, run.id).await {
        Ok(total) => total,
        Err(err) => {
            fail_run_best_effort(pool, run.id, "venues", format!("{err:#}")).await;
            return Err(err.into());
        }
    };

    println!("Run complete: {total_found} venues, {total_new} new this run");
    Ok(())
}

/// Search every category around one city and persist what comes back.
///
/// Any search or write error fails the whole city; nothing partial is
/// persisted for it.
async fn collect_city(
    pool: &sqlx::PgPool,
    config: &AppConfig,
    client: &PlacesClient,
    run_id: i64,
    categories: &[&CategoryConfig],
    city: &str,
    circle: &CoverageCircle,
) -> CityVenueOutcome {
    let mut venues: Vec<NormalizedVenue> = Vec::new();

    for (slug, request) in plan_searches(config, circle, categories) {
        let places = match client.search(&request).await {
            Ok(places) => places,
            Err(e) => {
                tracing::error!(city, category = %slug, error = %e, "venue search failed");
                return CityVenueOutcome::failed(format!("{slug}: {e}"));
            }
        };

        tracing::info!(
            city,
            category = %slug,
            results = places.len(),
            radius_meters = request.radius_meters,
            "venue search complete"
        );

        for place in &places {
            match normalize_place(place, &slug, city) {
                Ok(Some(venue)) => venues.push(venue),
                Ok(None) => {}
                Err(e) => tracing::warn!(city, fsq_id = %place.fsq_id, error = %e, "skipping venue"),
            }
        }
    }

    match gamescout_db::upsert_venues(pool, Some(run_id), &venues).await {
        Ok((new, updated)) => CityVenueOutcome {
            status: CityRunStatus::Succeeded,
            found: venues.len(),
            new,
            updated,
            error: None,
        },
        Err(e) => {
            tracing::error!(city, error = %e, "failed to persist venues");
            CityVenueOutcome::failed(format!("{e:#}"))
        }
    }
}

async fn record_city(
    pool: &sqlx::PgPool,
    run_id: i64,
    city: &str,
    area: Option<SearchArea>,
    categories: &[String],
    outcome: &CityVenueOutcome,
) {
    let record = RunCityOutcome {
        city,
        status: outcome.status,
        area,
        categories,
        venues_found: outcome.found,
        error_message: outcome.error.as_deref(),
    };
    if let Err(e) = gamescout_db::record_run_city(pool, run_id, &record).await {
        tracing::error!(run_id, city, error = %e, "failed to record city outcome");
    }
}

async fn run_list_runs(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let runs = gamescout_db::list_collection_runs(pool, limit.max(1)).await?;
    if runs.is_empty() {
        println!("no collection runs recorded");
        return Ok(());
    }

    for run in &runs {
        let started = run
            .started_at
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
        println!(
            "run {} {} started {} venues {}",
            run.id, run.status, started, run.venues_found
        );
        if let Some(message) = &run.error_message {
            println!("    error: {message}");
        }
        for city in gamescout_db::list_run_cities(pool, run.id).await? {
            println!("    {}", format_run_city(&city));
        }
    }
    Ok(())
}

/// One line of `venues runs` per city: outcome, the searched circle and the
/// categories asked for.
pub(crate) fn format_run_city(row: &CollectionRunCityRow) -> String {
    let area = row.area().map_or_else(
        || "no circle".to_string(),
        |a| {
            format!(
                "center {} radius {:.0}m search {}m",
                a.center, a.radius_meters, a.search_radius_meters
            )
        },
    );
    let mut line = format!(
        "{:<20} {:<9} {:>5}  {}  [{}]",
        row.city,
        row.status,
        row.venues_found,
        area,
        row.categories.join(", ")
    );
    if let Some(message) = &row.error_message {
        line.push_str("  ");
        line.push_str(message);
    }
    line
}

async fn run_list_venues(pool: &sqlx::PgPool, city: Option<&str>) -> anyhow::Result<()> {
    let rows = gamescout_db::list_venues(pool, city).await?;
    if rows.is_empty() {
        println!("no venues stored");
        return Ok(());
    }

    println!(
        "{:<10} {:<32} {:<20} {:<22}",
        "CATEGORY", "NAME", "LOCALITY", "COORDINATES"
    );
    println!("{}", "-".repeat(87));
    for row in &rows {
        println!(
            "{:<10} {:<32} {:<20} {:.6},{:.6}",
            row.category,
            truncate(&row.name, 32),
            row.locality.as_deref().unwrap_or("-"),
            row.latitude,
            row.longitude
        );
    }
    println!("{} venue(s)", rows.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('\u{2026}');
        out
    }
}
