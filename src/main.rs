//! Main entry point for the carbu CLI.
//!
//! Fetches the feed (from the official endpoint, another URL, or a local
//! snapshot file), runs the ingestion pipeline on a blocking worker, and
//! prints the decoded stations.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use carbu::{Cli, StationRecord, fetch, ingest};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.quiet {
        0 => "info",
        1 => "warn",
        _ => "error",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let source = cli.source_or_default().to_string();
    let buffer = if cli.is_http_url() {
        fetch::download(&source).await?
    } else {
        tokio::fs::read(&source).await?
    };

    // Decoding tens of thousands of stations is CPU-bound; keep it off the
    // runtime threads that must stay responsive.
    let records = tokio::task::spawn_blocking(move || ingest(&buffer)).await??;

    if cli.json {
        let shown = cli.limit.unwrap_or(records.len()).min(records.len());
        println!("{}", serde_json::to_string_pretty(&records[..shown])?);
    } else if cli.list || cli.verbose {
        list_stations(&records, cli.verbose, cli.limit);
    } else if !cli.is_quiet() {
        let quotes: usize = records.iter().map(|s| s.prices.len()).sum();
        println!(
            "{}: {} stations, {} price quotes",
            source,
            records.len(),
            quotes
        );
    }

    Ok(())
}

/// List decoded stations.
///
/// Two output formats, as with classic archive listings:
/// - Simple format (`-l`): station ids, one per line
/// - Verbose format (`-v`): table with coordinates, city, and price quotes
fn list_stations(records: &[StationRecord], verbose: bool, limit: Option<usize>) {
    if verbose {
        println!(
            "{:>10}  {:>9}  {:>9}  {:<20}  Prices",
            "Id", "Lat", "Lon", "City"
        );
        println!("{}", "-".repeat(78));
    }

    let shown = limit.unwrap_or(records.len());
    for station in records.iter().take(shown) {
        if verbose {
            let prices = station
                .prices
                .iter()
                .map(|p| format!("{}={:.3}", p.fuel, p.amount))
                .collect::<Vec<_>>()
                .join(" ");
            println!(
                "{:>10}  {:>9.5}  {:>9.5}  {:<20}  {}",
                station.id,
                station.latitude,
                station.longitude,
                station.city.as_deref().unwrap_or("-"),
                prices
            );
        } else {
            println!("{}", station.id);
        }
    }

    if verbose {
        println!("{}", "-".repeat(78));
        println!("{} stations", records.len());
    }
}
