//! crates/study_aid_core/src/questions.rs
//!
//! Generates a fixed-shape question pack for an ingest and validates the
//! generation service's output before anything is stored.

use crate::domain::{
    Difficulty, GeneratedQuestion, Mode, NewQuestion, Question, QuestionKind, QuestionPack,
    QuestionType,
};
use crate::error::{StudyError, StudyResult};
use crate::ports::{DatabaseService, QuestionGenerationService};
use crate::quiz::answers_match;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const PACK_SIZE: usize = 5;
pub const MCQ_OPTION_COUNT: usize = 3;

/// Required number of questions per type in a generated pack.
pub const PACK_SHAPE: [(QuestionType, usize); 3] = [
    (QuestionType::Mcq, 2),
    (QuestionType::Short, 2),
    (QuestionType::Analytical, 1),
];

/// Requests questions for an ingest and stores them as one pack.
/// A generated set that violates the pack shape stores nothing.
#[instrument(skip(db, generator))]
pub async fn generate_question_pack(
    db: &dyn DatabaseService,
    generator: &dyn QuestionGenerationService,
    user_id: Uuid,
    ingest_id: Uuid,
    mode: Mode,
) -> StudyResult<QuestionPack> {
    let ingest = db.get_ingest(ingest_id).await?;
    if ingest.user_id != user_id {
        return Err(StudyError::Unauthorized);
    }

    let generated = generator.generate_questions(&ingest.content, mode).await?;
    let questions = validate_generated_questions(generated, &ingest.content, mode.difficulty())?;
    let unverified = questions
        .iter()
        .filter(|q| !q.supporting_span_verified)
        .count();
    if unverified > 0 {
        warn!(unverified, "Supporting spans not found verbatim in the ingest text.");
    }

    let pack = db
        .create_question_pack(user_id, ingest_id, mode, questions)
        .await?;
    info!(pack_id = %pack.id, %mode, "Question pack stored.");
    Ok(pack)
}

/// Loads a pack with its questions in creation order.
pub async fn load_pack(
    db: &dyn DatabaseService,
    user_id: Uuid,
    pack_id: Uuid,
) -> StudyResult<(QuestionPack, Vec<Question>)> {
    let pack = db.get_question_pack(pack_id).await?;
    if pack.user_id != user_id {
        return Err(StudyError::Unauthorized);
    }
    let questions = db.get_questions_for_pack(pack_id).await?;
    Ok((pack, questions))
}

/// Checks a generated set against the pack shape and converts it into
/// storable questions, all tagged with `difficulty`.
pub fn validate_generated_questions(
    generated: Vec<GeneratedQuestion>,
    source_text: &str,
    difficulty: Difficulty,
) -> StudyResult<Vec<NewQuestion>> {
    if generated.len() != PACK_SIZE {
        return Err(malformed(format!(
            "expected {} questions, got {}",
            PACK_SIZE,
            generated.len()
        )));
    }

    let normalized_source = normalize_whitespace(source_text);
    let mut questions = Vec::with_capacity(PACK_SIZE);
    for (position, g) in generated.into_iter().enumerate() {
        let question_type: QuestionType = g
            .question_type
            .parse()
            .map_err(|_| malformed(format!("question {} has type '{}'", position, g.question_type)))?;

        let prompt = g.prompt.trim().to_string();
        let answer = g.answer.trim().to_string();
        if prompt.is_empty() || answer.is_empty() {
            return Err(malformed(format!("question {} lacks a prompt or answer", position)));
        }

        let kind = match (question_type, g.options) {
            (QuestionType::Mcq, Some(options)) => {
                let options: Vec<String> = options.iter().map(|o| o.trim().to_string()).collect();
                if options.len() != MCQ_OPTION_COUNT || options.iter().any(|o| o.is_empty()) {
                    return Err(malformed(format!(
                        "question {} needs exactly {} non-empty options",
                        position, MCQ_OPTION_COUNT
                    )));
                }
                if !options.iter().any(|o| answers_match(o, &answer)) {
                    return Err(malformed(format!(
                        "question {} answer is not one of its options",
                        position
                    )));
                }
                QuestionKind::Mcq { options }
            }
            (QuestionType::Mcq, None) => {
                return Err(malformed(format!("question {} is mcq without options", position)))
            }
            (_, Some(options)) if !options.is_empty() => {
                return Err(malformed(format!(
                    "question {} is {} but carries options",
                    position,
                    question_type.as_str()
                )))
            }
            (QuestionType::Short, _) => QuestionKind::Short,
            (QuestionType::Analytical, _) => QuestionKind::Analytical,
        };

        let supporting_span = g.supporting_span.trim().to_string();
        let supporting_span_verified = !supporting_span.is_empty()
            && normalized_source.contains(&normalize_whitespace(&supporting_span));

        questions.push(NewQuestion {
            position,
            kind,
            prompt,
            answer,
            rationale: g.rationale.trim().to_string(),
            supporting_span,
            supporting_span_verified,
            difficulty,
        });
    }

    for (question_type, expected) in PACK_SHAPE {
        let actual = questions
            .iter()
            .filter(|q| q.kind.question_type() == question_type)
            .count();
        if actual != expected {
            return Err(malformed(format!(
                "expected {} {} questions, got {}",
                expected,
                question_type.as_str(),
                actual
            )));
        }
    }

    Ok(questions)
}

fn malformed(msg: String) -> StudyError {
    StudyError::MalformedGeneration(msg)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::test_support::{seed_user, valid_generated_questions, FakeGenerator, SOURCE_TEXT};

    #[test]
    fn valid_set_is_accepted_in_order_with_mode_difficulty() {
        let questions =
            validate_generated_questions(valid_generated_questions(), SOURCE_TEXT, Difficulty::Hard)
                .unwrap();
        assert_eq!(questions.len(), PACK_SIZE);
        let types: Vec<QuestionType> = questions.iter().map(|q| q.kind.question_type()).collect();
        assert_eq!(
            types,
            vec![
                QuestionType::Mcq,
                QuestionType::Mcq,
                QuestionType::Short,
                QuestionType::Short,
                QuestionType::Analytical
            ]
        );
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Hard));
        assert!(questions.iter().enumerate().all(|(i, q)| q.position == i));
        assert!(questions.iter().all(|q| q.supporting_span_verified));
        assert_eq!(questions[0].kind.options().map(|o| o.len()), Some(3));
    }

    #[test]
    fn wrong_count_is_malformed() {
        let mut generated = valid_generated_questions();
        generated.pop();
        assert!(matches!(
            validate_generated_questions(generated, SOURCE_TEXT, Difficulty::Medium),
            Err(StudyError::MalformedGeneration(_))
        ));
    }

    #[test]
    fn wrong_type_mix_is_malformed() {
        let mut generated = valid_generated_questions();
        generated[4].question_type = "short".to_string();
        assert!(matches!(
            validate_generated_questions(generated, SOURCE_TEXT, Difficulty::Medium),
            Err(StudyError::MalformedGeneration(_))
        ));
    }

    #[test]
    fn unknown_type_is_malformed() {
        let mut generated = valid_generated_questions();
        generated[2].question_type = "essay".to_string();
        assert!(matches!(
            validate_generated_questions(generated, SOURCE_TEXT, Difficulty::Medium),
            Err(StudyError::MalformedGeneration(_))
        ));
    }

    #[test]
    fn mcq_needs_three_options_including_the_answer() {
        let mut two_options = valid_generated_questions();
        two_options[0].options = Some(vec!["Mitochondria".to_string(), "Nucleus".to_string()]);
        assert!(validate_generated_questions(two_options, SOURCE_TEXT, Difficulty::Hard).is_err());

        let mut missing_answer = valid_generated_questions();
        missing_answer[1].answer = "Carbohydrates".to_string();
        assert!(
            validate_generated_questions(missing_answer, SOURCE_TEXT, Difficulty::Hard).is_err()
        );

        let mut no_options = valid_generated_questions();
        no_options[0].options = None;
        assert!(validate_generated_questions(no_options, SOURCE_TEXT, Difficulty::Hard).is_err());
    }

    #[test]
    fn options_on_open_questions_are_malformed() {
        let mut generated = valid_generated_questions();
        generated[3].options = Some(vec!["a".into(), "b".into(), "c".into()]);
        assert!(validate_generated_questions(generated, SOURCE_TEXT, Difficulty::Hard).is_err());

        // An empty list is tolerated as "no options".
        let mut empty = valid_generated_questions();
        empty[3].options = Some(Vec::new());
        assert!(validate_generated_questions(empty, SOURCE_TEXT, Difficulty::Hard).is_ok());
    }

    #[test]
    fn non_verbatim_span_is_flagged_not_rejected() {
        let mut generated = valid_generated_questions();
        generated[2].supporting_span = "Cells burn sugar for energy.".to_string();
        generated[3].supporting_span = "Ribosomes   synthesize\nproteins.".to_string();
        let questions =
            validate_generated_questions(generated, SOURCE_TEXT, Difficulty::Medium).unwrap();
        assert!(!questions[2].supporting_span_verified);
        assert!(questions[3].supporting_span_verified);
    }

    #[tokio::test]
    async fn pack_is_stored_with_five_ordered_questions() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let ingest = db
            .create_ingest(user_id, SOURCE_TEXT, "Biology", "text")
            .await
            .unwrap();
        let generator = FakeGenerator::default();

        let pack = generate_question_pack(&db, &generator, user_id, ingest.id, Mode::Topper)
            .await
            .unwrap();
        assert_eq!(pack.mode, Mode::Topper);

        let (loaded, questions) = load_pack(&db, user_id, pack.id).await.unwrap();
        assert_eq!(loaded.id, pack.id);
        assert_eq!(questions.len(), PACK_SIZE);
        assert!(questions.iter().all(|q| q.difficulty == Difficulty::Hard));
        assert_eq!(questions[0].prompt, "Which organelle is the powerhouse of the cell?");
    }

    #[tokio::test]
    async fn malformed_generation_persists_nothing() {
        let db = InMemoryStore::new();
        let user_id = seed_user(&db).await;
        let ingest = db
            .create_ingest(user_id, SOURCE_TEXT, "Biology", "text")
            .await
            .unwrap();
        let mut bad = valid_generated_questions();
        bad.truncate(3);
        let generator = FakeGenerator {
            questions: Some(bad),
            ..Default::default()
        };

        let result = generate_question_pack(&db, &generator, user_id, ingest.id, Mode::Pass).await;
        assert!(matches!(result, Err(StudyError::MalformedGeneration(_))));
        assert_eq!(db.pack_count(), 0);
    }
}
