//! services/api/src/web/quiz_ws.rs
//!
//! The entry point for a live quiz WebSocket connection. It authenticates the
//! `init` message against the quiz owner, then splits the socket into a writer
//! task, the quiz driver and a reader loop connected by channels.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    quiz_task::run_quiz_session,
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use study_aid_core::{ports::DatabaseService, quiz::QuizSession};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn quiz_ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, user_id))
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|e| {
        error!("Failed to serialize server message: {}", e);
    })?;
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| warn!("Failed to send message to client: {}", e))
}

fn init_required() -> ServerMessage {
    error!("First message was not a valid Init message.");
    ServerMessage::Error {
        message: "The first message must be an init message.".to_string(),
    }
}

/// Parses the first frame of a connection as `init` and attaches to the quiz
/// it names. On failure, returns the `error` message to send before closing.
pub async fn attach_to_quiz(
    db: &dyn DatabaseService,
    user_id: Uuid,
    first_frame: &str,
) -> Result<QuizSession, ServerMessage> {
    let quiz_id = match serde_json::from_str::<ClientMessage>(first_frame) {
        Ok(ClientMessage::Init { quiz_id }) => quiz_id,
        _ => return Err(init_required()),
    };
    QuizSession::resume(db, user_id, quiz_id).await.map_err(|e| {
        error!(%quiz_id, "Failed to attach to quiz: {}", e);
        ServerMessage::from_error(&e)
    })
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, user_id: Uuid) {
    info!("New quiz WebSocket connection for user: {}", user_id);
    let (mut sender, mut receiver) = socket.split();

    // --- 1. Initialization Phase ---
    let first_frame = match receiver.next().await {
        Some(Ok(Message::Text(text))) => text,
        Some(Ok(_)) => {
            let _ = send_message(&mut sender, &init_required()).await;
            return;
        }
        _ => {
            info!("Client disconnected before sending Init message.");
            return;
        }
    };

    let session = match attach_to_quiz(app_state.db.as_ref(), user_id, &first_frame).await {
        Ok(session) => session,
        Err(msg) => {
            let _ = send_message(&mut sender, &msg).await;
            return;
        }
    };
    let quiz_id = session.quiz_id();

    let initialized = ServerMessage::SessionInitialized {
        quiz_id,
        question_count: session.question_count(),
    };
    if send_message(&mut sender, &initialized).await.is_err() {
        return;
    }

    // --- 2. Writer, Driver and Reader ---
    let (server_tx, mut server_rx) = mpsc::channel::<ServerMessage>(32);
    let (client_tx, client_rx) = mpsc::channel::<ClientMessage>(32);

    let writer = tokio::spawn(async move {
        while let Some(msg) = server_rx.recv().await {
            if send_message(&mut sender, &msg).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let driver = tokio::spawn(run_quiz_session(
        app_state.db.clone(),
        session,
        client_rx,
        server_tx.clone(),
    ));

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    if client_tx.send(msg).await.is_err() {
                        // The driver finished, e.g. the quiz completed.
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                    let msg = ServerMessage::Error {
                        message: format!("Unrecognized message: {}", e),
                    };
                    if server_tx.send(msg).await.is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client sent close message.");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    // --- 3. Cleanup ---
    drop(client_tx);
    drop(server_tx);
    if let Err(e) = driver.await {
        error!(%quiz_id, "Quiz driver task failed: {}", e);
    }
    let _ = writer.await;
    info!(%quiz_id, "Quiz WebSocket connection closed.");
}
