//! Announcement data structure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator placed between title and posted date in an identity.
pub const IDENTITY_SEPARATOR: char = '|';

/// Application status shown next to a listing entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Applications are being accepted
    Open,
    /// Application window has closed
    Closed,
    /// Application window has not opened yet
    Pending,
    /// No recognized status token was found
    #[default]
    Unknown,
}

impl Status {
    /// Marker emoji used in notifications.
    pub fn indicator(self) -> &'static str {
        match self {
            Status::Open => "🟢",
            Status::Pending => "🟡",
            Status::Closed => "🔴",
            Status::Unknown => "⚪",
        }
    }

    /// Label as it appears on the listing page.
    pub fn label(self) -> &'static str {
        match self {
            Status::Open => "접수중",
            Status::Closed => "접수마감",
            Status::Pending => "접수전",
            Status::Unknown => "",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Open => "open",
            Status::Closed => "closed",
            Status::Pending => "pending",
            Status::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One entry on the announcement listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnouncementRecord {
    /// Deduplication key, `title|posted_date`
    pub identity: String,

    /// Announcement title
    pub title: String,

    /// Owning organizational unit, e.g. `진흥원 > 콘텐츠사업단`
    pub organization_path: Option<String>,

    /// Posted date as scraped
    pub posted_date: Option<String>,

    /// Application period as scraped
    pub application_period: Option<String>,

    /// Eligible applicants as scraped
    pub target_audience: Option<String>,

    /// Application status
    pub status: Status,

    /// Set by the classifier; never scraped
    #[serde(default)]
    pub is_priority: bool,
}

impl AnnouncementRecord {
    /// Build a record and derive its identity from title and posted date.
    pub fn new(
        title: impl Into<String>,
        organization_path: Option<String>,
        posted_date: Option<String>,
        application_period: Option<String>,
        target_audience: Option<String>,
        status: Status,
    ) -> Self {
        let title = title.into();
        let identity = Self::derive_identity(&title, posted_date.as_deref());
        Self {
            identity,
            title,
            organization_path,
            posted_date,
            application_period,
            target_audience,
            status,
            is_priority: false,
        }
    }

    /// Identity for a title and optional posted date.
    ///
    /// A missing date contributes an empty string, so `"t"` with no date
    /// and `"t"` with an empty date collide.
    pub fn derive_identity(title: &str, posted_date: Option<&str>) -> String {
        format!(
            "{title}{IDENTITY_SEPARATOR}{}",
            posted_date.unwrap_or_default()
        )
    }

    pub fn organization(&self) -> &str {
        self.organization_path.as_deref().unwrap_or_default()
    }

    pub fn date(&self) -> &str {
        self.posted_date.as_deref().unwrap_or_default()
    }

    pub fn period(&self) -> &str {
        self.application_period.as_deref().unwrap_or_default()
    }

    pub fn target(&self) -> &str {
        self.target_audience.as_deref().unwrap_or_default()
    }
}
