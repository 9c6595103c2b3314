//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for a live quiz.

use serde::{Deserialize, Serialize};
use study_aid_core::StudyError;
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attaches the connection to a started quiz. This must be the first message
    /// sent on the connection; sending it again for the same quiz resumes it.
    Init { quiz_id: Uuid },

    /// Answers the question at `question_index`. A blank answer counts as no answer.
    SubmitAnswer { question_index: usize, answer: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the connection is attached to the quiz.
    SessionInitialized { quiz_id: Uuid, question_count: usize },

    /// A question is now current and its countdown is running.
    QuestionPresented {
        question_index: usize,
        question_id: Uuid,
        question_type: String,
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<Vec<String>>,
        time_limit_secs: u32,
    },

    /// The response to `question_index` is stored.
    AnswerRecorded { question_index: usize, timed_out: bool },

    /// Every question is answered and the quiz is scored.
    QuizCompleted { quiz_id: Uuid, total_score: u8 },

    /// Reports an error. The session stays on the current question unless the
    /// connection is closed afterwards.
    Error { message: String },
}

impl ServerMessage {
    /// An `Error` message for a failed quiz operation. Store details stay in the log.
    pub fn from_error(err: &StudyError) -> Self {
        let message = match err {
            StudyError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        ServerMessage::Error { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_are_tagged_by_type() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "submit_answer", "question_index": 2, "answer": "ATP"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SubmitAnswer {
                question_index: 2,
                answer: "ATP".to_string()
            }
        );
    }

    #[test]
    fn open_questions_omit_options() {
        let json = serde_json::to_value(ServerMessage::QuestionPresented {
            question_index: 2,
            question_id: Uuid::nil(),
            question_type: "short".to_string(),
            prompt: "What is produced?".to_string(),
            options: None,
            time_limit_secs: 60,
        })
        .unwrap();
        assert_eq!(json["type"], "question_presented");
        assert!(json.get("options").is_none());
    }
}
