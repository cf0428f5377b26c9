// src/pipeline/monitor.rs

//! Single monitoring pass.
//!
//! Fetching → Extracting → Diffing → Classifying → Notifying → Persisting →
//! Done. A failed fetch ends the run in `Aborted` without touching the seen
//! store. Every later failure is either logged and tolerated (delivery) or
//! returned as an error (persisting).

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::models::{AnnouncementRecord, Config};
use crate::services::{Classifier, DeliveryOutcome, Extractor, Notifier};
use crate::storage::SeenStore;
use crate::utils::http;

/// Source of the listing page markup.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the listing page as text.
    async fn fetch(&self) -> Result<String>;

    /// Human-readable location, for logs.
    fn location(&self) -> &str;
}

/// Listing page fetched over HTTP.
pub struct HttpPageSource {
    client: Client,
    url: String,
}

impl HttpPageSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Build from the `[source]` configuration section.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = http::create_source_client(&config.source)?;
        Ok(Self::new(client, &config.source.url))
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch(&self) -> Result<String> {
        http::fetch_text(&self.client, &self.url).await
    }

    fn location(&self) -> &str {
        &self.url
    }
}

/// Phase of a monitoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Fetching,
    Extracting,
    Diffing,
    Classifying,
    Notifying,
    Persisting,
    Done,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Fetching => "fetching",
            RunState::Extracting => "extracting",
            RunState::Diffing => "diffing",
            RunState::Classifying => "classifying",
            RunState::Notifying => "notifying",
            RunState::Persisting => "persisting",
            RunState::Done => "done",
            RunState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Outcome of one monitoring run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal state, `Done` or `Aborted`
    pub state: RunState,
    /// Announcements extracted from the page
    pub fetched: usize,
    /// Announcements not seen before, classified, in page order
    pub new_announcements: Vec<AnnouncementRecord>,
    /// Present when a notification was attempted
    pub delivery: Option<DeliveryOutcome>,
    /// Identities written to the seen store
    pub persisted: usize,
}

impl RunReport {
    fn aborted() -> Self {
        Self {
            state: RunState::Aborted,
            fetched: 0,
            new_announcements: Vec::new(),
            delivery: None,
            persisted: 0,
        }
    }

    pub fn new_count(&self) -> usize {
        self.new_announcements.len()
    }

    pub fn priority_count(&self) -> usize {
        self.new_announcements
            .iter()
            .filter(|r| r.is_priority)
            .count()
    }
}

fn enter(state: &mut RunState, next: RunState) {
    log::debug!("Run state: {} -> {}", state, next);
    *state = next;
}

/// Run one monitoring pass against `source`.
pub async fn run_monitor(config: &Config, source: &dyn PageSource) -> Result<RunReport> {
    let extractor = Extractor::new(config.extraction.clone())?;
    let classifier = Classifier::new(config.keywords.clone());
    let notifier = Notifier::new(config.notifier.clone(), &config.source.url)?;
    let store = SeenStore::new(&config.storage.seen_file, config.storage.capacity);

    let mut state = RunState::Fetching;
    log::info!("Fetching listing page {}", source.location());
    let html = match source.fetch().await {
        Ok(html) => html,
        Err(e) => {
            log::error!("Failed to fetch listing page: {}", e);
            enter(&mut state, RunState::Aborted);
            return Ok(RunReport::aborted());
        }
    };

    enter(&mut state, RunState::Extracting);
    let records = extractor.extract(&html);
    if records.is_empty() {
        log::warn!(
            "Fetched {} bytes but no announcements matched; the page layout may have changed",
            html.len()
        );
    } else {
        log::info!("Found {} announcements", records.len());
    }

    enter(&mut state, RunState::Diffing);
    let mut seen = store.load().await;
    let mut emitted = HashSet::new();
    let mut new_announcements: Vec<AnnouncementRecord> = records
        .iter()
        .filter(|r| !seen.contains(&r.identity) && emitted.insert(r.identity.as_str()))
        .cloned()
        .collect();

    enter(&mut state, RunState::Classifying);
    for record in &mut new_announcements {
        classifier.classify(record);
    }

    enter(&mut state, RunState::Notifying);
    let delivery = if new_announcements.is_empty() {
        log::info!("No new announcements");
        None
    } else {
        let priority = new_announcements.iter().filter(|r| r.is_priority).count();
        log::info!(
            "Found {} new announcements ({} priority)",
            new_announcements.len(),
            priority
        );
        Some(notifier.notify(&new_announcements).await)
    };

    enter(&mut state, RunState::Persisting);
    for record in &records {
        seen.touch(record.identity.as_str());
    }
    let persisted = store.save(&seen).await?;
    log::info!(
        "Saved {} seen identities to {}",
        persisted,
        store.path().display()
    );

    enter(&mut state, RunState::Done);
    Ok(RunReport {
        state,
        fetched: records.len(),
        new_announcements,
        delivery,
        persisted,
    })
}
