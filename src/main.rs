use anyhow::Result;
use clap::{Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use tracing::{info, warn};

use dime::cache::PlaceCache;
use dime::db::Database;
use dime::environment::Config;
use dime::logging::configure_logging;
use dime::places::{fetch_with_deadline, Place, PlaceFetcher};
use dime::server;
use dime::text::{format_zone, TextNormalizer};

#[derive(Parser)]
#[clap(name = "dime", about = "Points of interest from the municipal open data catalogue")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the places API server
    Serve,

    /// Fetch places through the cache and print them
    Fetch {
        /// Bypass the persistent cache
        #[clap(long)]
        no_cache: bool,

        /// Print JSON instead of a table
        #[clap(long)]
        json: bool,
    },

    /// Normalize one or more labels
    Normalize {
        #[clap(required = true, num_args = 1..)]
        labels: Vec<String>,
    },

    /// Format a zone value as a display address
    Zone {
        #[clap(required = true)]
        zone: String,
    },

    /// Remove every cached place list, all versions included
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let args = Cli::parse();
    let config = Config::from_env();

    match args.command {
        Commands::Serve => server::serve(&config).await?,
        Commands::Fetch { no_cache, json } => fetch(&config, no_cache, json).await?,
        Commands::Normalize { labels } => {
            let normalizer = TextNormalizer::new();
            for label in labels {
                println!("{}", normalizer.normalize(&label));
            }
        }
        Commands::Zone { zone } => println!("{}", format_zone(Some(&zone))),
        Commands::ClearCache => {
            let db = Database::new(&config.database_path).await?;
            let removed = PlaceCache::with_ttl(db, config.cache_ttl).clear().await?;
            println!("Removed {} cache keys", removed);
        }
    }

    Ok(())
}

async fn fetch(config: &Config, no_cache: bool, json: bool) -> Result<()> {
    let fetcher = PlaceFetcher::new(config)?;

    let pipeline = async {
        if no_cache {
            fetcher.fetch_places().await
        } else {
            match Database::new(&config.database_path).await {
                Ok(db) => {
                    PlaceCache::with_ttl(db, config.cache_ttl)
                        .fetch_places_cached(&fetcher)
                        .await
                }
                Err(e) => {
                    warn!("Cache database unavailable ({}), fetching without cache", e);
                    fetcher.fetch_places().await
                }
            }
        }
    };

    let places = fetch_with_deadline(config.pipeline_timeout, pipeline).await?;
    info!("Fetched {} places", places.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&places)?);
    } else {
        print_places(&places);
    }
    Ok(())
}

fn print_places(places: &[Place]) {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Name"),
        Cell::new("Category"),
        Cell::new("Lat"),
        Cell::new("Lng"),
        Cell::new("Address"),
    ]));

    for place in places {
        table.add_row(Row::new(vec![
            Cell::new(&place.id.to_string()),
            Cell::new(&place.name),
            Cell::new(&place.category),
            Cell::new(&format!("{:.6}", place.location.lat)),
            Cell::new(&format!("{:.6}", place.location.lng)),
            Cell::new(&place.address),
        ]));
    }

    table.printstd();
    println!("{} places", places.len());
}
