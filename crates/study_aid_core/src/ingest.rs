//! crates/study_aid_core/src/ingest.rs
//!
//! Turns submitted study text into a stored ingest annotated with its academic domain.

use crate::domain::{Ingest, Mode};
use crate::error::{StudyError, StudyResult};
use crate::ports::{DatabaseService, DomainClassificationService};
use tracing::{info, instrument};
use uuid::Uuid;

/// Only this many leading characters are sent for classification.
pub const CLASSIFICATION_PREFIX_CHARS: usize = 1000;

pub const TEXT_SOURCE: &str = "text";

/// Classifies `content` and stores it. Nothing is written if classification fails.
#[instrument(skip(db, classifier, content), fields(content_chars = content.chars().count()))]
pub async fn ingest_text(
    db: &dyn DatabaseService,
    classifier: &dyn DomainClassificationService,
    user_id: Uuid,
    content: &str,
    mode: Mode,
) -> StudyResult<Ingest> {
    if content.trim().is_empty() {
        return Err(StudyError::Validation("content must not be empty".to_string()));
    }

    let excerpt: String = content.chars().take(CLASSIFICATION_PREFIX_CHARS).collect();
    let raw_label = classifier.classify_domain(&excerpt).await?;
    let domain = clean_domain_label(&raw_label).ok_or_else(|| {
        StudyError::MalformedGeneration("domain classifier returned an empty label".to_string())
    })?;

    let ingest = db.create_ingest(user_id, content, &domain, TEXT_SOURCE).await?;
    info!(ingest_id = %ingest.id, %domain, %mode, "Ingest stored.");
    Ok(ingest)
}

/// Strips whitespace, quotes and trailing punctuation from a classifier label.
fn clean_domain_label(raw: &str) -> Option<String> {
    let label = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())?
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim_end_matches(&['.', '!', ','][..])
        .trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::test_support::{seed_user, FakeGenerator};

    #[tokio::test]
    async fn stores_ingest_with_detected_domain() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let classifier = FakeGenerator {
            domain: Some(" \"Physics.\"\n".to_string()),
            ..Default::default()
        };

        let ingest = ingest_text(&db, &classifier, user_id, "Forces and motion.", Mode::Topper)
            .await
            .unwrap();
        assert_eq!(ingest.domain, "Physics");
        assert_eq!(ingest.source_type, "text");
        assert_eq!(ingest.content, "Forces and motion.");
        assert_eq!(db.get_ingest(ingest.id).await.unwrap().user_id, user_id);
    }

    #[tokio::test]
    async fn classification_sees_only_the_first_thousand_characters() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let classifier = FakeGenerator::default();
        let content = "é".repeat(CLASSIFICATION_PREFIX_CHARS + 500);

        let ingest = ingest_text(&db, &classifier, user_id, &content, Mode::Pass)
            .await
            .unwrap();
        assert_eq!(classifier.calls.lock().unwrap()[0], "classify:1000");
        assert_eq!(ingest.content.chars().count(), CLASSIFICATION_PREFIX_CHARS + 500);
    }

    #[tokio::test]
    async fn empty_content_is_rejected_without_an_upstream_call() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let classifier = FakeGenerator::default();

        let result = ingest_text(&db, &classifier, user_id, "   \n", Mode::Pass).await;
        assert!(matches!(result, Err(StudyError::Validation(_))));
        assert_eq!(classifier.call_count(), 0);
        assert_eq!(db.ingest_count(), 0);
    }

    #[tokio::test]
    async fn upstream_failure_writes_nothing() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let classifier = FakeGenerator {
            fail: true,
            ..Default::default()
        };

        let result = ingest_text(&db, &classifier, user_id, "Some notes", Mode::Pass).await;
        assert!(matches!(result, Err(StudyError::UpstreamGeneration(_))));
        assert_eq!(db.ingest_count(), 0);
    }

    #[tokio::test]
    async fn blank_label_is_malformed() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let classifier = FakeGenerator {
            domain: Some("  \"\" ".to_string()),
            ..Default::default()
        };

        let result = ingest_text(&db, &classifier, user_id, "Some notes", Mode::Pass).await;
        assert!(matches!(result, Err(StudyError::MalformedGeneration(_))));
        assert_eq!(db.ingest_count(), 0);
    }

    #[test]
    fn label_cleanup_keeps_multi_word_domains() {
        assert_eq!(
            clean_domain_label("Computer Science").as_deref(),
            Some("Computer Science")
        );
        assert_eq!(clean_domain_label("**History**").as_deref(), Some("History"));
        assert_eq!(clean_domain_label(""), None);
    }
}
