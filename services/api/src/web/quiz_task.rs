//! services/api/src/web/quiz_task.rs
//!
//! The "worker" that drives one live quiz: it presents questions, owns the
//! per-question countdown and feeds answers and expiries into the session.
//!
//! Exactly one countdown is armed at a time. It is cancelled before the next
//! one is armed, and an expiry that arrives for a question that is no longer
//! current is dropped.

use crate::web::protocol::{ClientMessage, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use study_aid_core::{
    ports::DatabaseService,
    quiz::{QuizPhase, QuizSession, SubmitOutcome, QUESTION_TIME_BUDGET_SECS},
    StudyResult,
};
use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How long to wait before retrying an expiry whose write failed.
const EXPIRY_RETRY_DELAY: Duration = Duration::from_secs(5);

/// The countdown armed for the current question.
struct Countdown {
    question_index: usize,
    /// When the question was presented; used to work out the time taken.
    presented_at: Instant,
    token: CancellationToken,
}

impl Countdown {
    /// Spawns a timer that reports `question_index` on `expiry_tx` after
    /// `delay`, unless cancelled first.
    fn arm(
        question_index: usize,
        presented_at: Instant,
        delay: Duration,
        expiry_tx: mpsc::Sender<usize>,
    ) -> Self {
        let token = CancellationToken::new();
        let timer_token = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = timer_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = expiry_tx.send(question_index).await;
                }
            }
        });
        Self {
            question_index,
            presented_at,
            token,
        }
    }

    /// Whole seconds left in the budget, rounding elapsed time down.
    fn remaining_secs(&self) -> u32 {
        let elapsed = self.presented_at.elapsed().as_secs();
        (QUESTION_TIME_BUDGET_SECS as u64).saturating_sub(elapsed) as u32
    }

    fn cancel(self) {
        self.token.cancel();
    }
}

/// What the loop should do after handling one event.
enum Flow {
    Continue,
    Stop,
}

/// Sends the current question to the client and arms its countdown.
async fn present_current(
    session: &QuizSession,
    server_tx: &mpsc::Sender<ServerMessage>,
    expiry_tx: &mpsc::Sender<usize>,
) -> Option<Countdown> {
    let index = session.current_index()?;
    let question = session.current_question()?;
    let msg = ServerMessage::QuestionPresented {
        question_index: index,
        question_id: question.id,
        question_type: question.kind.question_type().as_str().to_string(),
        prompt: question.prompt.clone(),
        options: question.kind.options().map(|o| o.to_vec()),
        time_limit_secs: QUESTION_TIME_BUDGET_SECS,
    };
    if server_tx.send(msg).await.is_err() {
        return None;
    }
    Some(Countdown::arm(
        index,
        Instant::now(),
        Duration::from_secs(QUESTION_TIME_BUDGET_SECS as u64),
        expiry_tx.clone(),
    ))
}

/// Reports the result of a submission or expiry and moves the countdown on.
async fn apply_outcome(
    result: StudyResult<SubmitOutcome>,
    question_index: usize,
    timed_out: bool,
    session: &QuizSession,
    countdown: &mut Option<Countdown>,
    server_tx: &mpsc::Sender<ServerMessage>,
    expiry_tx: &mpsc::Sender<usize>,
) -> Flow {
    match result {
        Ok(SubmitOutcome::Ignored) => Flow::Continue,
        Ok(outcome) => {
            if let Some(current) = countdown.take() {
                current.cancel();
            }
            let recorded = ServerMessage::AnswerRecorded {
                question_index,
                timed_out,
            };
            if server_tx.send(recorded).await.is_err() {
                return Flow::Stop;
            }
            match outcome {
                SubmitOutcome::Completed { total_score } => {
                    let _ = server_tx
                        .send(ServerMessage::QuizCompleted {
                            quiz_id: session.quiz_id(),
                            total_score,
                        })
                        .await;
                    Flow::Stop
                }
                _ => {
                    *countdown = present_current(session, server_tx, expiry_tx).await;
                    if countdown.is_some() {
                        Flow::Continue
                    } else {
                        Flow::Stop
                    }
                }
            }
        }
        Err(e) => {
            error!(quiz_id = %session.quiz_id(), question_index, "Failed to record answer: {}", e);
            if timed_out {
                // The timer already fired; arm a retry for the same question.
                if let Some(fired) = countdown.take() {
                    *countdown = Some(Countdown::arm(
                        fired.question_index,
                        fired.presented_at,
                        EXPIRY_RETRY_DELAY,
                        expiry_tx.clone(),
                    ));
                }
            }
            if server_tx.send(ServerMessage::from_error(&e)).await.is_err() {
                return Flow::Stop;
            }
            Flow::Continue
        }
    }
}

/// Runs a quiz until it completes or the client goes away.
///
/// `client_rx` carries parsed client messages; `server_tx` carries everything
/// the client should see. Dropping the client side ends the loop and cancels
/// the armed countdown.
pub async fn run_quiz_session(
    db: Arc<dyn DatabaseService>,
    mut session: QuizSession,
    mut client_rx: mpsc::Receiver<ClientMessage>,
    server_tx: mpsc::Sender<ServerMessage>,
) {
    let quiz_id = session.quiz_id();

    if let QuizPhase::Complete { total_score } = session.phase() {
        let _ = server_tx
            .send(ServerMessage::QuizCompleted {
                quiz_id,
                total_score,
            })
            .await;
        return;
    }

    let (expiry_tx, mut expiry_rx) = mpsc::channel::<usize>(4);
    let mut countdown = present_current(&session, &server_tx, &expiry_tx).await;
    if countdown.is_none() {
        return;
    }

    loop {
        let flow = tokio::select! {
            msg = client_rx.recv() => match msg {
                Some(ClientMessage::SubmitAnswer { question_index, answer }) => {
                    let remaining = countdown
                        .as_ref()
                        .filter(|c| c.question_index == question_index)
                        .map(Countdown::remaining_secs)
                        .unwrap_or(0);
                    let result = session
                        .submit_answer(db.as_ref(), question_index, &answer, remaining)
                        .await;
                    apply_outcome(
                        result,
                        question_index,
                        false,
                        &session,
                        &mut countdown,
                        &server_tx,
                        &expiry_tx,
                    )
                    .await
                }
                Some(ClientMessage::Init { .. }) => {
                    warn!(%quiz_id, "Received subsequent Init message, which is ignored.");
                    Flow::Continue
                }
                None => {
                    info!(%quiz_id, "Client left the quiz.");
                    Flow::Stop
                }
            },
            Some(question_index) = expiry_rx.recv() => {
                let current = countdown.as_ref().map(|c| c.question_index);
                if current != Some(question_index) {
                    warn!(%quiz_id, question_index, "Dropping stale countdown expiry.");
                    Flow::Continue
                } else {
                    info!(%quiz_id, question_index, "Question timed out.");
                    let result = session.expire(db.as_ref(), question_index).await;
                    apply_outcome(
                        result,
                        question_index,
                        true,
                        &session,
                        &mut countdown,
                        &server_tx,
                        &expiry_tx,
                    )
                    .await
                }
            }
        };

        if let Flow::Stop = flow {
            break;
        }
    }

    if let Some(current) = countdown.take() {
        current.cancel();
    }
}
