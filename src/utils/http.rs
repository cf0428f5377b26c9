// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// User-Agent for requests that do not impersonate a browser.
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Create a configured asynchronous HTTP client.
pub fn create_client(user_agent: &str, timeout_secs: u64) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Create the client used for the listing page.
pub fn create_source_client(config: &SourceConfig) -> Result<Client> {
    create_client(&config.user_agent, config.timeout_secs)
}

/// Fetch a page as text. Non-2xx responses are errors.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AppError::fetch(url, e))?;
    let response = response
        .error_for_status()
        .map_err(|e| AppError::fetch(url, e))?;
    response.text().await.map_err(|e| AppError::fetch(url, e))
}
