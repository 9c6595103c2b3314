//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler and connection.

use crate::config::Config;
use std::sync::Arc;
use study_aid_core::ports::{
    DatabaseService, DomainClassificationService, QuestionGenerationService,
    SummaryGenerationService,
};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub classifier: Arc<dyn DomainClassificationService>,
    pub summarizer: Arc<dyn SummaryGenerationService>,
    pub question_generator: Arc<dyn QuestionGenerationService>,
}
