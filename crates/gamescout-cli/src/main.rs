mod cities;
mod import;
mod map;
mod report;
mod score;
mod venues;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cities::CitiesCommands;
use venues::VenuesCommands;

#[derive(Debug, Parser)]
#[command(name = "gamescout")]
#[command(about = "Where gaming companies cluster, and what is around them")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Import a companies export (JSON array or JSON lines)
    Import {
        /// Path to the export file
        path: PathBuf,
    },
    /// Office clustering by city
    Cities {
        #[command(subcommand)]
        command: CitiesCommands,
    },
    /// Amenity venues around each city's covering circle
    Venues {
        #[command(subcommand)]
        command: VenuesCommands,
    },
    /// Rank cities by weighted amenity density
    Score {
        /// City to score (repeatable); defaults to the top cities
        #[arg(long = "city")]
        cities: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Write a GeoJSON map of one city
    Map {
        #[arg(long)]
        city: String,
        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Include the convex hull of the retained offices
        #[arg(long)]
        hull: bool,
        /// Include collected venues styled per category
        #[arg(long)]
        venues: bool,
    },
    /// Print a markdown report of clusters, scores and shares
    Report {
        #[arg(long = "city")]
        cities: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = gamescout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let Some(command) = cli.command else {
        println!("gamescout: no command given (see --help)");
        return Ok(());
    };

    let pool_config = gamescout_db::PoolConfig::from_app_config(&config);
    let pool = gamescout_db::connect_pool(&config.database_url, pool_config).await?;
    tracing::debug!(env = %config.env, "database pool ready");

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                gamescout_db::health_check(&pool).await?;
                println!("database reachable");
            }
            DbCommands::Migrate => {
                let applied = gamescout_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Import { path } => import::run_import(&pool, &path).await?,
        Commands::Cities { command } => cities::run(&pool, &config, command).await?,
        Commands::Venues { command } => venues::run(&pool, &config, command).await?,
        Commands::Score { cities, json } => score::run_score(&pool, &config, &cities, json).await?,
        Commands::Map {
            city,
            out,
            hull,
            venues,
        } => map::run_map(&pool, &config, &city, out.as_deref(), hull, venues).await?,
        Commands::Report { cities } => report::run_report(&pool, &config, &cities).await?,
    }

    Ok(())
}

/// Mark a run failed, logging rather than propagating a failure to do so.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = gamescout_db::fail_collection_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark {context} run as failed"
        );
    }
}
