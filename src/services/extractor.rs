// src/services/extractor.rs

//! Announcement extraction service.
//!
//! Turns the listing page markup into [`AnnouncementRecord`]s. Each entry is
//! an anchor inside a list item whose text nodes form loosely labelled
//! lines:
//!
//! ```text
//! 접수중
//! 웹툰 IP 공모전 안내            <- <strong>
//! 진흥원 > 콘텐츠사업단
//! 공고일자 2025-03-02
//! 접수기간 2025-03-02 ~ 2025-03-20
//! 지원대상 도내 중소기업
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{AnnouncementRecord, ExtractionConfig, Status};

/// Service for extracting announcements from listing markup.
pub struct Extractor {
    config: ExtractionConfig,
    item_sel: Selector,
    title_sel: Selector,
}

impl Extractor {
    /// Create an extractor, compiling the configured selectors.
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let item_sel = Self::parse_selector(&config.item_selector)?;
        let title_sel = Self::parse_selector(&config.title_selector)?;
        Ok(Self {
            config,
            item_sel,
            title_sel,
        })
    }

    /// Extract all announcements from a page, in document order.
    pub fn extract(&self, html: &str) -> Vec<AnnouncementRecord> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for item in document.select(&self.item_sel) {
            match self.parse_item(&item) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        log::debug!(
            "Extracted {} announcements ({} candidates skipped)",
            records.len(),
            skipped
        );
        records
    }

    fn parse_item(&self, item: &ElementRef) -> Option<AnnouncementRecord> {
        let lines = text_lines(item);
        if lines.len() < self.config.min_lines {
            return None;
        }

        let title_elem = item.select(&self.title_sel).next()?;
        let title = joined_text(&title_elem);
        if title.is_empty() {
            return None;
        }

        let organization_path = self.find_organization(&lines);

        let mut posted_date = None;
        let mut application_period = None;
        let mut target_audience = None;
        for line in &lines {
            if let Some(value) = strip_label(line, &self.config.posted_date_label) {
                posted_date = value;
            } else if let Some(value) = strip_label(line, &self.config.period_label) {
                application_period = value;
            } else if let Some(value) = strip_label(line, &self.config.target_label) {
                target_audience = value;
            }
        }

        let status = self.find_status(&lines);

        Some(AnnouncementRecord::new(
            title,
            organization_path,
            posted_date,
            application_period,
            target_audience,
            status,
        ))
    }

    fn find_organization(&self, lines: &[String]) -> Option<String> {
        lines
            .iter()
            .find(|line| {
                line.contains(self.config.hierarchy_separator.as_str())
                    && self
                        .config
                        .org_unit_keywords
                        .iter()
                        .any(|k| line.contains(k.as_str()))
            })
            .cloned()
    }

    fn find_status(&self, lines: &[String]) -> Status {
        lines
            .iter()
            .find_map(|line| {
                self.config
                    .status_tokens
                    .iter()
                    .find(|t| t.token == *line)
                    .map(|t| t.status)
            })
            .unwrap_or_default()
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

/// Trimmed, non-empty text nodes of an element in document order.
fn text_lines(element: &ElementRef) -> Vec<String> {
    element
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `Some(value)` when `line` starts with `label`; an empty value is `Some(None)`.
fn strip_label(line: &str, label: &str) -> Option<Option<String>> {
    let rest = line.strip_prefix(label)?.trim();
    Some((!rest.is_empty()).then(|| rest.to_string()))
}

/// Text nodes trimmed and concatenated without separators.
///
/// Identities already stored by earlier runs were derived this way.
fn joined_text(element: &ElementRef) -> String {
    element.text().map(str::trim).collect()
}
