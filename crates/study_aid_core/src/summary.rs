//! crates/study_aid_core/src/summary.rs
//!
//! Mode-scoped summaries of an ingest, created lazily on first request, and
//! the on-demand "explain simply" restatement.

use crate::domain::{Mode, Summary};
use crate::error::{StudyError, StudyResult};
use crate::ports::{DatabaseService, SummaryGenerationService};
use tracing::{info, instrument};
use uuid::Uuid;

/// Returns the summary of `ingest_id` for exactly `mode`, generating and
/// storing it on first request.
#[instrument(skip(db, summarizer))]
pub async fn get_or_create_summary(
    db: &dyn DatabaseService,
    summarizer: &dyn SummaryGenerationService,
    user_id: Uuid,
    ingest_id: Uuid,
    mode: Mode,
) -> StudyResult<Summary> {
    let ingest = db.get_ingest(ingest_id).await?;
    if ingest.user_id != user_id {
        return Err(StudyError::Unauthorized);
    }

    if let Some(existing) = db.get_summary(ingest_id, mode).await? {
        return Ok(existing);
    }

    let generated = summarizer.summarize(&ingest.content, mode).await?;
    let summary_text = generated.summary_text.trim();
    if summary_text.is_empty() {
        return Err(StudyError::MalformedGeneration(
            "summary generator returned an empty summary".to_string(),
        ));
    }
    let highlights: Vec<String> = generated
        .highlights
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();

    let summary = db
        .save_summary(user_id, ingest_id, mode, summary_text, &highlights)
        .await?;
    info!(summary_id = %summary.id, highlights = summary.highlights.len(), "Summary stored.");
    Ok(summary)
}

/// Restates a stored summary in simple terms. The result is not persisted.
#[instrument(skip(db, summarizer))]
pub async fn explain_summary_simply(
    db: &dyn DatabaseService,
    summarizer: &dyn SummaryGenerationService,
    user_id: Uuid,
    summary_id: Uuid,
) -> StudyResult<String> {
    let summary = db.get_summary_by_id(summary_id).await?;
    if summary.user_id != user_id {
        return Err(StudyError::Unauthorized);
    }
    let text = summarizer.explain_simply(&summary.summary_text).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(StudyError::MalformedGeneration(
            "simplified explanation was empty".to_string(),
        ));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::test_support::{seed_user, FakeGenerator, SOURCE_TEXT};

    #[tokio::test]
    async fn summary_is_generated_once_per_mode() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let ingest = db
            .create_ingest(user_id, SOURCE_TEXT, "Biology", "text")
            .await
            .unwrap();
        let summarizer = FakeGenerator::default();

        let first = get_or_create_summary(&db, &summarizer, user_id, ingest.id, Mode::Topper)
            .await
            .unwrap();
        let again = get_or_create_summary(&db, &summarizer, user_id, ingest.id, Mode::Topper)
            .await
            .unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(summarizer.call_count(), 1);
        assert_eq!(first.highlights, vec!["ATP", "Ribosomes"]);

        // Switching modes never returns the other mode's summary.
        let pass = get_or_create_summary(&db, &summarizer, user_id, ingest.id, Mode::Pass)
            .await
            .unwrap();
        assert_ne!(pass.id, first.id);
        assert_eq!(pass.mode, Mode::Pass);
        assert_eq!(pass.summary_text, "pass summary");
        assert_eq!(summarizer.call_count(), 2);
    }

    #[tokio::test]
    async fn other_users_cannot_read_summaries() {
        let db = InMemoryStore::new();
        let owner = seed_user(&db).await;
        let intruder = seed_user(&db).await;
        let ingest = db
            .create_ingest(owner, SOURCE_TEXT, "Biology", "text")
            .await
            .unwrap();
        let summarizer = FakeGenerator::default();

        let result =
            get_or_create_summary(&db, &summarizer, intruder, ingest.id, Mode::Pass).await;
        assert!(matches!(result, Err(StudyError::Unauthorized)));
        assert_eq!(summarizer.call_count(), 0);
    }

    #[tokio::test]
    async fn explain_simply_is_recomputed_each_time() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let ingest = db
            .create_ingest(user_id, SOURCE_TEXT, "Biology", "text")
            .await
            .unwrap();
        let summarizer = FakeGenerator::default();
        let summary = get_or_create_summary(&db, &summarizer, user_id, ingest.id, Mode::Pass)
            .await
            .unwrap();

        let first = explain_summary_simply(&db, &summarizer, user_id, summary.id)
            .await
            .unwrap();
        let second = explain_summary_simply(&db, &summarizer, user_id, summary.id)
            .await
            .unwrap();
        assert_eq!(first, "Simply put: pass summary");
        assert_eq!(first, second);
        assert_eq!(summarizer.call_count(), 3);
    }

    #[tokio::test]
    async fn generation_failure_is_upstream_error() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let ingest = db
            .create_ingest(user_id, SOURCE_TEXT, "Biology", "text")
            .await
            .unwrap();
        let summarizer = FakeGenerator {
            fail: true,
            ..Default::default()
        };

        let result = get_or_create_summary(&db, &summarizer, user_id, ingest.id, Mode::Pass).await;
        assert!(matches!(result, Err(StudyError::UpstreamGeneration(_))));
        assert!(db.get_summary(ingest.id, Mode::Pass).await.unwrap().is_none());
    }
}
