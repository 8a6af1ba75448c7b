use clap::Parser;

use crate::fetch::DEFAULT_FEED_URL;

#[derive(Parser, Debug)]
#[command(name = "carbu")]
#[command(version)]
#[command(about = "Ingest the French fuel-price open-data feed", long_about = None)]
#[command(after_help = "Examples:\n  \
  carbu                          ingest the official feed and print a summary\n  \
  carbu -v instantane.zip        list stations with prices from a local snapshot\n  \
  carbu --json -n 10 feed.xml    print the first ten stations as JSON")]
pub struct Cli {
    /// Feed source: file path or HTTP URL (default: the official feed)
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// List station ids (short format)
    #[arg(short = 'l')]
    pub list: bool,

    /// List stations with coordinates and price quotes
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Print records as JSON
    #[arg(long)]
    pub json: bool,

    /// Show at most COUNT stations
    #[arg(short = 'n', value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn source_or_default(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_FEED_URL)
    }

    pub fn is_http_url(&self) -> bool {
        let source = self.source_or_default();
        source.starts_with("http://") || source.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}
