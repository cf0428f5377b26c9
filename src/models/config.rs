//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::Status;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listing page and HTTP settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Webhook delivery settings
    #[serde(default)]
    pub notifier: NotifierConfig,

    /// Seen-identity persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Markup extraction rules
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Relevance keyword lists
    #[serde(default)]
    pub keywords: KeywordConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override the webhook URL. Blank values count as absent.
    pub fn with_webhook_url(mut self, webhook_url: Option<String>) -> Self {
        if let Some(url) = webhook_url {
            let url = url.trim();
            self.notifier.webhook_url = (!url.is_empty()).then(|| url.to_string());
        }
        self
    }

    /// Check that the webhook URL, if any, parses.
    ///
    /// Not part of [`Config::validate`]; `run` treats a bad webhook as a
    /// delivery failure.
    pub fn validate_webhook(&self) -> Result<()> {
        if let Some(webhook) = &self.notifier.webhook_url {
            url::Url::parse(webhook)?;
        }
        Ok(())
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.source.url)?;

        if self.notifier.timeout_secs == 0 {
            return Err(AppError::validation("notifier.timeout_secs must be > 0"));
        }

        if self.storage.capacity == 0 {
            return Err(AppError::validation("storage.capacity must be > 0"));
        }

        for selector in [
            &self.extraction.item_selector,
            &self.extraction.title_selector,
        ] {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        if self.extraction.hierarchy_separator.is_empty() {
            return Err(AppError::validation(
                "extraction.hierarchy_separator is empty",
            ));
        }
        if self.extraction.status_tokens.is_empty() {
            return Err(AppError::validation("No status tokens defined"));
        }

        if self.keywords.priority.is_empty() {
            return Err(AppError::validation("No priority keywords defined"));
        }
        if self
            .keywords
            .priority
            .iter()
            .chain(&self.keywords.exclude)
            .any(|k| k.is_empty())
        {
            return Err(AppError::validation("Keywords must not be empty strings"));
        }
        Ok(())
    }
}

/// Listing page location and fetch behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of the announcement listing page
    #[serde(default = "defaults::source_url")]
    pub url: String,

    /// User-Agent header for the page request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::fetch_timeout")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::source_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::fetch_timeout(),
        }
    }
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Incoming-webhook URL; `None` switches to the local report
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Delivery timeout in seconds
    #[serde(default = "defaults::delivery_timeout")]
    pub timeout_secs: u64,

    /// Source name shown in message headers
    #[serde(default = "defaults::source_name")]
    pub source_name: String,

    /// Heading of the priority section
    #[serde(default = "defaults::priority_heading")]
    pub priority_heading: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: defaults::delivery_timeout(),
            source_name: defaults::source_name(),
            priority_heading: defaults::priority_heading(),
        }
    }
}

/// Seen-identity file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the JSON identity list
    #[serde(default = "defaults::seen_file")]
    pub seen_file: PathBuf,

    /// Maximum number of identities kept
    #[serde(default = "defaults::capacity")]
    pub capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            seen_file: defaults::seen_file(),
            capacity: defaults::capacity(),
        }
    }
}

/// Rules for turning listing markup into records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// CSS selector for candidate entries
    #[serde(default = "defaults::item_selector")]
    pub item_selector: String,

    /// CSS selector for the title inside an entry
    #[serde(default = "defaults::title_selector")]
    pub title_selector: String,

    /// Entries with fewer text lines are skipped
    #[serde(default = "defaults::min_lines")]
    pub min_lines: usize,

    /// Separator used in organization paths
    #[serde(default = "defaults::hierarchy_separator")]
    pub hierarchy_separator: String,

    /// Suffixes that mark a line as an organization path
    #[serde(default = "defaults::org_unit_keywords")]
    pub org_unit_keywords: Vec<String>,

    /// Posted-date label
    #[serde(default = "defaults::posted_date_label")]
    pub posted_date_label: String,

    /// Application-period label
    #[serde(default = "defaults::period_label")]
    pub period_label: String,

    /// Target-audience label
    #[serde(default = "defaults::target_label")]
    pub target_label: String,

    /// Status text to status mapping
    #[serde(default = "defaults::status_tokens")]
    pub status_tokens: Vec<StatusToken>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            item_selector: defaults::item_selector(),
            title_selector: defaults::title_selector(),
            min_lines: defaults::min_lines(),
            hierarchy_separator: defaults::hierarchy_separator(),
            org_unit_keywords: defaults::org_unit_keywords(),
            posted_date_label: defaults::posted_date_label(),
            period_label: defaults::period_label(),
            target_label: defaults::target_label(),
            status_tokens: defaults::status_tokens(),
        }
    }
}

/// Mapping from a status label on the page to a [`Status`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusToken {
    pub token: String,
    pub status: Status,
}

/// Keyword lists driving relevance classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Any of these marks an announcement as relevant
    #[serde(default = "defaults::priority_keywords")]
    pub priority: Vec<String>,

    /// Suppress an announcement unless a priority keyword also matches
    #[serde(default = "defaults::exclude_keywords")]
    pub exclude: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            priority: defaults::priority_keywords(),
            exclude: defaults::exclude_keywords(),
        }
    }
}

/// Default value functions for serde.
mod defaults {
    use std::path::PathBuf;

    use super::StatusToken;
    use crate::models::Status;

    // Source defaults
    pub fn source_url() -> String {
        "https://pms.dicia.or.kr/mgmt/mjgg/mjggMgmtListR.do".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn fetch_timeout() -> u64 {
        30
    }

    // Notifier defaults
    pub fn delivery_timeout() -> u64 {
        10
    }
    pub fn source_name() -> String {
        "DICIA".into()
    }
    pub fn priority_heading() -> String {
        "어라운드 관련 공고".into()
    }

    // Storage defaults
    pub fn seen_file() -> PathBuf {
        PathBuf::from("seen_announcements.json")
    }
    pub fn capacity() -> usize {
        200
    }

    // Extraction defaults
    pub fn item_selector() -> String {
        "ul > li > a".into()
    }
    pub fn title_selector() -> String {
        "strong".into()
    }
    pub fn min_lines() -> usize {
        3
    }
    pub fn hierarchy_separator() -> String {
        ">".into()
    }
    pub fn org_unit_keywords() -> Vec<String> {
        vec![
            "사업단".into(),
            "기획단".into(),
            "추진단".into(),
            "지원단".into(),
        ]
    }
    pub fn posted_date_label() -> String {
        "공고일자".into()
    }
    pub fn period_label() -> String {
        "접수기간".into()
    }
    pub fn target_label() -> String {
        "지원대상".into()
    }
    pub fn status_tokens() -> Vec<StatusToken> {
        vec![
            StatusToken {
                token: "접수중".into(),
                status: Status::Open,
            },
            StatusToken {
                token: "접수마감".into(),
                status: Status::Closed,
            },
            StatusToken {
                token: "접수전".into(),
                status: Status::Pending,
            },
        ]
    }

    // Keyword defaults
    pub fn priority_keywords() -> Vec<String> {
        [
            "웹툰",
            "IP",
            "콘텐츠",
            "캐릭터",
            "라이선싱",
            "팝업",
            "콘텐츠기업",
            "시장창출",
            "입주",
            "굿즈",
            "브릿지페어",
            "관광",
            "문화콘텐츠",
            "융복합",
            "특수영상",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
    pub fn exclude_keywords() -> Vec<String> {
        vec!["비상임".into(), "채용".into(), "평가위원".into()]
    }
}
