//! Feed download over HTTPS.
//!
//! The instantané endpoint serves the whole blob in one response; there is
//! no Range negotiation and no need for one, the payload is a few megabytes.

use anyhow::{Result, bail};
use reqwest::Client;
use std::time::Duration;
use tracing::info;

/// The government's live snapshot of all station prices.
pub const DEFAULT_FEED_URL: &str = "https://donnees.roulez-eco.fr/opendata/instantane";

/// Download the raw feed bytes from `url`.
///
/// The buffer is returned as-is: it may be a ZIP container or a bare XML
/// document, which is for [`ingest`](crate::ingest) to decide.
pub async fn download(url: &str) -> Result<Vec<u8>> {
    let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

    info!(url = %url, "downloading feed");
    let resp = client.get(url).send().await?;

    if !resp.status().is_success() {
        bail!("feed request failed with status: {}", resp.status());
    }

    let bytes = resp.bytes().await?;
    info!(bytes = bytes.len(), "feed downloaded");

    Ok(bytes.to_vec())
}
