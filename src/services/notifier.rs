// src/services/notifier.rs

//! Slack webhook notification service.
//!
//! Renders newly seen announcements as a block-kit message and posts it to
//! an incoming webhook. Without a webhook URL the notifier produces a local
//! text report instead and never touches the network.

use chrono::{DateTime, Local};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::models::{AnnouncementRecord, NotifierConfig};
use crate::utils::http;

/// Message body posted to the webhook.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationPayload {
    /// Plaintext fallback summary
    pub text: String,
    /// Block-kit layout
    pub blocks: Vec<Value>,
}

/// Result of a notification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Webhook answered 200
    Delivered,
    /// Webhook answered with another status
    Rejected { status: u16, body: String },
    /// Request could not be completed
    Failed(String),
    /// No webhook configured; one line per announcement
    LocalReport(Vec<String>),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Service for delivering announcement notifications.
pub struct Notifier {
    config: NotifierConfig,
    page_url: String,
    client: Option<Client>,
}

impl Notifier {
    /// Create a notifier. `page_url` is linked from the message header.
    pub fn new(config: NotifierConfig, page_url: impl Into<String>) -> Result<Self> {
        let client = match &config.webhook_url {
            Some(_) => Some(http::create_client(
                http::DEFAULT_USER_AGENT,
                config.timeout_secs,
            )?),
            None => None,
        };
        Ok(Self {
            config,
            page_url: page_url.into(),
            client,
        })
    }

    /// Whether a webhook is configured.
    pub fn has_webhook(&self) -> bool {
        self.config.webhook_url.is_some()
    }

    /// Notify about new announcements.
    pub async fn notify(&self, records: &[AnnouncementRecord]) -> DeliveryOutcome {
        let (Some(webhook_url), Some(client)) = (&self.config.webhook_url, &self.client) else {
            log::warn!("No webhook URL configured; reporting locally");
            return DeliveryOutcome::LocalReport(local_report(records));
        };

        let payload = self.build_payload(records, Local::now());
        let outcome = match client.post(webhook_url).json(&payload).send().await {
            Ok(response) if response.status() == StatusCode::OK => DeliveryOutcome::Delivered,
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                DeliveryOutcome::Rejected { status, body }
            }
            Err(e) => DeliveryOutcome::Failed(e.to_string()),
        };

        match &outcome {
            DeliveryOutcome::Delivered => {
                log::info!("Slack notification sent ({} announcements)", records.len())
            }
            DeliveryOutcome::Rejected { status, body } => {
                log::error!("Slack delivery rejected: {} {}", status, body)
            }
            DeliveryOutcome::Failed(message) => log::error!("Slack delivery failed: {}", message),
            DeliveryOutcome::LocalReport(_) => {}
        }
        outcome
    }

    /// Render the webhook payload.
    pub fn build_payload(
        &self,
        records: &[AnnouncementRecord],
        now: DateTime<Local>,
    ) -> NotificationPayload {
        let source = &self.config.source_name;
        let (priority, other): (Vec<_>, Vec<_>) = records.iter().partition(|r| r.is_priority);

        let mut blocks = vec![
            json!({
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": format!("📢 {source} 새 공고 {}건", records.len()),
                    "emoji": true,
                },
            }),
            json!({
                "type": "context",
                "elements": [{
                    "type": "mrkdwn",
                    "text": format!(
                        "🕐 {} 확인 | <{}|공고 페이지 바로가기>",
                        now.format("%Y-%m-%d %H:%M"),
                        self.page_url
                    ),
                }],
            }),
            json!({ "type": "divider" }),
        ];

        if !priority.is_empty() {
            blocks.push(section(format!("⭐ *{}*", self.config.priority_heading)));
            for record in &priority {
                blocks.push(section(format!(
                    "{} *{}*\n📂 {}\n📅 공고일: {}\n⏰ 접수: {}\n👥 대상: {}",
                    record.status.indicator(),
                    record.title,
                    record.organization(),
                    record.date(),
                    record.period(),
                    record.target()
                )));
                blocks.push(json!({ "type": "divider" }));
            }
        }

        if !other.is_empty() {
            blocks.push(section("📋 *기타 공고*".to_string()));
            for record in &other {
                blocks.push(section(format!(
                    "{} *{}*\n📅 {} | 👥 {}",
                    record.status.indicator(),
                    record.title,
                    record.date(),
                    record.target()
                )));
            }
        }

        NotificationPayload {
            text: format!(
                "{source} 새 공고 {}건 (관심 {}건)",
                records.len(),
                priority.len()
            ),
            blocks,
        }
    }
}

fn section(text: String) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
    })
}

/// One line per announcement, priority entries starred.
pub fn local_report(records: &[AnnouncementRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| {
            let marker = if r.is_priority { "⭐ " } else { "" };
            format!("{marker}[{}] {}", r.status.label(), r.title)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;
    use chrono::TimeZone;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    fn record(title: &str, priority: bool, status: Status) -> AnnouncementRecord {
        let mut r = AnnouncementRecord::new(
            title,
            Some("진흥원 > 콘텐츠사업단".to_string()),
            Some("2025-03-02".to_string()),
            Some("2025-03-02 ~ 2025-03-20".to_string()),
            Some("도내 기업".to_string()),
            status,
        );
        r.is_priority = priority;
        r
    }

    fn notifier(webhook: Option<&str>) -> Notifier {
        let config = NotifierConfig {
            webhook_url: webhook.map(String::from),
            ..NotifierConfig::default()
        };
        Notifier::new(config, "https://pms.example.com/list").unwrap()
    }

    /// Serve one HTTP request with `response`, returning the request body.
    fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line.is_empty() || line == "\r\n" {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();

            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            String::from_utf8(body).unwrap()
        });
        (url, handle)
    }

    fn block_texts(payload: &NotificationPayload) -> Vec<String> {
        payload
            .blocks
            .iter()
            .filter_map(|b| b["text"]["text"].as_str().map(String::from))
            .collect()
    }

    #[test]
    fn test_payload_sections_and_order() {
        let records = vec![
            record("기타 A", false, Status::Closed),
            record("웹툰 A", true, Status::Open),
            record("기타 B", false, Status::Unknown),
            record("웹툰 B", true, Status::Pending),
        ];
        let now = Local.with_ymd_and_hms(2025, 3, 2, 9, 30, 0).unwrap();
        let payload = notifier(None).build_payload(&records, now);

        assert_eq!(payload.text, "DICIA 새 공고 4건 (관심 2건)");
        assert_eq!(payload.blocks[0]["type"], "header");
        assert_eq!(payload.blocks[0]["text"]["text"], "📢 DICIA 새 공고 4건");
        let context = payload.blocks[1]["elements"][0]["text"].as_str().unwrap();
        assert!(context.starts_with("🕐 2025-03-02 09:30 확인"));
        assert!(context.contains("<https://pms.example.com/list|"));
        assert_eq!(payload.blocks[2]["type"], "divider");

        let texts = block_texts(&payload);
        let pos = |needle: &str| texts.iter().position(|t| t.contains(needle)).unwrap();
        assert!(pos("⭐ *어라운드 관련 공고*") < pos("웹툰 A"));
        assert!(pos("웹툰 A") < pos("웹툰 B"));
        assert!(pos("웹툰 B") < pos("기타 공고"));
        assert!(pos("기타 공고") < pos("기타 A"));
        assert!(pos("기타 A") < pos("기타 B"));
    }

    #[test]
    fn test_priority_block_is_detailed() {
        let records = vec![record("웹툰 A", true, Status::Open)];
        let payload = notifier(None).build_payload(&records, Local::now());
        let texts = block_texts(&payload);
        let expected = "🟢 *웹툰 A*\n📂 진흥원 > 콘텐츠사업단\n📅 공고일: 2025-03-02\n⏰ 접수: 2025-03-02 ~ 2025-03-20\n👥 대상: 도내 기업";
        assert!(texts.iter().any(|t| t == expected));
        assert!(!texts.iter().any(|t| t.contains("기타 공고")));
    }

    #[test]
    fn test_other_block_is_compact() {
        let records = vec![record("회의록", false, Status::Closed)];
        let payload = notifier(None).build_payload(&records, Local::now());
        let texts = block_texts(&payload);
        assert!(texts.contains(&"🔴 *회의록*\n📅 2025-03-02 | 👥 도내 기업".to_string()));
        assert!(!texts.iter().any(|t| t.contains("어라운드 관련 공고")));
    }

    #[test]
    fn test_local_report_lines() {
        let records = vec![
            record("웹툰 A", true, Status::Open),
            record("회의록", false, Status::Unknown),
        ];
        assert_eq!(
            local_report(&records),
            vec!["⭐ [접수중] 웹툰 A".to_string(), "[] 회의록".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fallback_without_webhook() {
        let notifier = notifier(None);
        assert!(!notifier.has_webhook());
        assert!(notifier.client.is_none());

        let records = vec![
            record("웹툰 A", true, Status::Open),
            record("기타 A", false, Status::Closed),
        ];
        match notifier.notify(&records).await {
            DeliveryOutcome::LocalReport(lines) => assert_eq!(lines.len(), 2),
            other => panic!("expected local report, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_webhook_fails_softly() {
        let notifier = notifier(Some("http://127.0.0.1:9/hook"));
        let outcome = notifier
            .notify(&[record("웹툰 A", true, Status::Open)])
            .await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
        assert!(!outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_webhook_200_is_delivered() {
        let (url, server) =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
        let outcome = notifier(Some(&url))
            .notify(&[
                record("웹툰 A", true, Status::Open),
                record("회의록", false, Status::Closed),
            ])
            .await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);

        let body: Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(body["text"], "DICIA 새 공고 2건 (관심 1건)");
        assert!(body["blocks"].as_array().is_some_and(|b| !b.is_empty()));
    }

    #[tokio::test]
    async fn test_webhook_204_is_rejected() {
        let (url, server) =
            serve_once("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n");
        let outcome = notifier(Some(&url))
            .notify(&[record("웹툰 A", true, Status::Open)])
            .await;
        server.join().unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected {
                status: 204,
                body: String::new()
            }
        );
    }

    #[tokio::test]
    async fn test_webhook_500_is_rejected_with_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 11\r\nConnection: close\r\n\r\nno_service!",
        );
        let outcome = notifier(Some(&url))
            .notify(&[record("웹툰 A", true, Status::Open)])
            .await;
        server.join().unwrap();
        assert_eq!(
            outcome,
            DeliveryOutcome::Rejected {
                status: 500,
                body: "no_service!".to_string()
            }
        );
        assert!(!outcome.is_delivered());
    }

    #[tokio::test]
    async fn test_relative_webhook_url_fails_softly() {
        let outcome = notifier(Some("hooks.slack.com/services/T/B/x"))
            .notify(&[record("웹툰 A", true, Status::Open)])
            .await;
        assert!(matches!(outcome, DeliveryOutcome::Failed(_)));
    }

    #[test]
    fn test_priority_heading_is_configurable() {
        let config = NotifierConfig {
            priority_heading: "관심 공고".to_string(),
            ..NotifierConfig::default()
        };
        let notifier = Notifier::new(config, "https://pms.example.com/list").unwrap();
        let payload = notifier.build_payload(&[record("웹툰 A", true, Status::Open)], Local::now());
        assert!(block_texts(&payload).contains(&"⭐ *관심 공고*".to_string()));
    }
}
