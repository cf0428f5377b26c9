//! Relevance classification service.

use crate::models::{AnnouncementRecord, KeywordConfig};

/// Keyword-based relevance classifier.
///
/// Exclusion keywords only suppress an announcement when no priority
/// keyword is present; a title matching both lists is a priority.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: KeywordConfig,
}

impl Classifier {
    pub fn new(keywords: KeywordConfig) -> Self {
        Self { keywords }
    }

    /// Classify a title and organization path.
    pub fn is_priority(&self, title: &str, organization_path: &str) -> bool {
        let text = format!("{title} {organization_path}");
        let has_priority = contains_any(&text, &self.keywords.priority);

        if !has_priority && contains_any(&text, &self.keywords.exclude) {
            return false;
        }
        has_priority
    }

    /// Set `is_priority` on a record.
    pub fn classify(&self, record: &mut AnnouncementRecord) {
        record.is_priority = self.is_priority(&record.title, record.organization());
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordConfig::default())
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    #[test]
    fn test_priority_keyword() {
        assert!(Classifier::default().is_priority("웹툰 IP 공모전 안내", ""));
    }

    #[test]
    fn test_exclusion_without_priority() {
        assert!(!Classifier::default().is_priority("비상임 이사 채용 공고", ""));
    }

    #[test]
    fn test_priority_beats_exclusion() {
        assert!(Classifier::default().is_priority("웹툰 작가 채용 공고", ""));
    }

    #[test]
    fn test_no_keywords() {
        assert!(!Classifier::default().is_priority("정기 회의록", "기획단"));
    }

    #[test]
    fn test_organization_path_counts() {
        assert!(Classifier::default().is_priority("2025년 지원사업 공고", "진흥원 > 콘텐츠사업단"));
    }

    #[test]
    fn test_custom_keyword_lists() {
        let classifier = Classifier::new(KeywordConfig {
            priority: vec!["게임".to_string()],
            exclude: vec!["회의".to_string()],
        });
        assert!(classifier.is_priority("게임 개발 지원", ""));
        assert!(!classifier.is_priority("웹툰 회의", ""));
    }

    #[test]
    fn test_classify_sets_flag() {
        let mut record = AnnouncementRecord::new(
            "캐릭터 라이선싱 지원",
            None,
            None,
            None,
            None,
            Status::Open,
        );
        Classifier::default().classify(&mut record);
        assert!(record.is_priority);
    }
}
