#![allow(dead_code)]

use api_lib::{
    config::Config,
    web::{router, state::AppState},
};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use study_aid_core::{
    domain::{GeneratedQuestion, GeneratedSummary, Mode},
    ports::{
        DomainClassificationService, PortError, PortResult, QuestionGenerationService,
        SummaryGenerationService,
    },
    InMemoryStore,
};
use tower::ServiceExt;

pub const SOURCE_TEXT: &str = "The mitochondria is the powerhouse of the cell. \
It produces ATP through cellular respiration. Ribosomes synthesize proteins.";

/// Two MCQs, two short answers and one analytical question, in that order.
pub fn generated_questions() -> Vec<GeneratedQuestion> {
    let question = |kind: &str, prompt: &str, options: Option<[&str; 3]>, answer: &str, span: &str| {
        GeneratedQuestion {
            question_type: kind.to_string(),
            prompt: prompt.to_string(),
            options: options.map(|o| o.iter().map(|s| s.to_string()).collect()),
            answer: answer.to_string(),
            rationale: "Stated in the text.".to_string(),
            supporting_span: span.to_string(),
        }
    };
    vec![
        question(
            "mcq",
            "Which organelle is the powerhouse of the cell?",
            Some(["Mitochondria", "Ribosome", "Nucleus"]),
            "Mitochondria",
            "The mitochondria is the powerhouse of the cell.",
        ),
        question(
            "mcq",
            "What do ribosomes synthesize?",
            Some(["Lipids", "Proteins", "ATP"]),
            "Proteins",
            "Ribosomes synthesize proteins.",
        ),
        question(
            "short",
            "What molecule does cellular respiration produce?",
            None,
            "ATP",
            "It produces ATP through cellular respiration.",
        ),
        question(
            "short",
            "Which organelle synthesizes proteins?",
            None,
            "Ribosomes",
            "Ribosomes synthesize proteins.",
        ),
        question(
            "analytical",
            "Why is the mitochondria called the powerhouse?",
            None,
            "Because it produces ATP",
            "It produces ATP through cellular respiration.",
        ),
    ]
}

/// The answers to `generated_questions`, in order.
pub const ANSWERS: [&str; 5] = [
    "Mitochondria",
    "Proteins",
    "ATP",
    "Ribosomes",
    "Because it produces ATP",
];

/// A generation service double for all three generation ports.
#[derive(Default)]
pub struct FakeGenerator {
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            Err(PortError::Upstream("status 503".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DomainClassificationService for FakeGenerator {
    async fn classify_domain(&self, _excerpt: &str) -> PortResult<String> {
        self.record()?;
        Ok("Biology.".to_string())
    }
}

#[async_trait]
impl SummaryGenerationService for FakeGenerator {
    async fn summarize(&self, _text: &str, mode: Mode) -> PortResult<GeneratedSummary> {
        self.record()?;
        Ok(GeneratedSummary {
            summary_text: format!("A {} summary of cell biology.", mode),
            highlights: vec!["powerhouse of the cell".to_string()],
        })
    }

    async fn explain_simply(&self, summary_text: &str) -> PortResult<String> {
        self.record()?;
        Ok(format!("Simply put: {}", summary_text))
    }
}

#[async_trait]
impl QuestionGenerationService for FakeGenerator {
    async fn generate_questions(
        &self,
        _text: &str,
        _mode: Mode,
    ) -> PortResult<Vec<GeneratedQuestion>> {
        self.record()?;
        Ok(generated_questions())
    }
}

pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        log_level: tracing::Level::DEBUG,
        allowed_origin: "http://localhost:3000".to_string(),
        openai_api_key: None,
        openai_api_base: None,
        classify_model: "test-model".to_string(),
        summary_model: "test-model".to_string(),
        question_model: "test-model".to_string(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryStore>,
    pub generator: Arc<FakeGenerator>,
}

pub fn create_test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let generator = Arc::new(FakeGenerator::default());
    let state = Arc::new(AppState {
        db: store.clone(),
        config: Arc::new(test_config()),
        classifier: generator.clone(),
        summarizer: generator.clone(),
        question_generator: generator.clone(),
    });
    TestApp {
        router: router(state).unwrap(),
        store,
        generator,
    }
}

/// Sends one request and returns the status, the `Set-Cookie` header and the
/// JSON body (`Value::Null` when empty).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, set_cookie, json)
}

/// Signs a new user up and returns the `session=...` cookie pair.
pub async fn signup(app: &Router, email: &str) -> String {
    let (status, set_cookie, _) = send(
        app,
        "POST",
        "/auth/signup",
        None,
        Some(serde_json::json!({ "email": email, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    set_cookie
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string()
}
