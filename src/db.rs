use anyhow::{Context, Result};
use mongodb::{Client, Database};

/// Connects to the MongoDB deployment and opens the named database.
pub async fn init_database(url: &str, name: &str) -> Result<Database> {
    let client = Client::with_uri_str(url)
        .await
        .with_context(|| format!("connecting to {url}"))?;
    Ok(client.database(name))
}
