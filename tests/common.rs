#![allow(dead_code)]

use async_trait::async_trait;
use color_eyre::eyre::{eyre, Result};
use course_rag::index::{ChunkMetadata, CourseIndex, CourseMetadata, LessonInfo, SearchRequest, SearchResults};
use course_rag::openai::{CompletionRequest, CompletionResponse, InferenceClient};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{Mutex, Once};
use tracing_appender::rolling;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static START: Once = Once::new();
static _GUARD: Lazy<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> = Lazy::new(|| Mutex::new(None));

/// Initialize test environment: dotenv and tracing (stderr + file).
/// Idempotent: safe to call multiple times.
pub fn init() {
    START.call_once(|| {
        let _ = dotenvy::dotenv();
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("info"))
            .expect("env filter");

        // Daily rotating log file separate from app runtime logs
        let file_appender = rolling::daily("logs", "tests.log");
        let (file_nb, guard) = tracing_appender::non_blocking(file_appender);
        *_GUARD.lock().unwrap() = Some(guard);

        let stderr_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(file_nb);

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init();

        tracing::info!(target = "test_init", "Test tracing initialized (stderr + rotating file)");
    });
}

pub const MCP_COURSE: &str = "\
Course Title: MCP: Build Rich-Context AI Apps with Anthropic
Course Link: https://example.com/mcp
Course Instructor: Elie Schoppik

Lesson 0: Introduction
Lesson Link: https://example.com/mcp/lesson0
MCP is an open protocol that standardizes how applications provide context to language models. It was introduced to simplify tool integrations.

Lesson 1: Architecture
Lesson Link: https://example.com/mcp/lesson1
MCP follows a client server architecture. Servers expose tools, resources and prompts over JSON-RPC.
";

pub const RETRIEVAL_COURSE: &str = "\
Course Title: Advanced Retrieval for AI with Chroma
Course Link: https://example.com/retrieval
Course Instructor: Anton Troynikov

Lesson 0: Overview
Lesson Link: https://example.com/retrieval/lesson0
Embedding based retrieval finds passages that are close to the query. Query expansion improves recall for short queries.
";

/// Inference endpoint double: replays scripted responses and records every
/// request it receives. Once the script runs out it keeps returning
/// `fallback` (or fails when there is none).
pub struct ScriptedClient {
    script: Mutex<VecDeque<CompletionResponse>>,
    fallback: Option<CompletionResponse>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<CompletionResponse>) -> Self {
        Self { script: Mutex::new(script.into()), fallback: None, requests: Mutex::new(Vec::new()) }
    }

    /// Returns `response` for every request.
    pub fn repeating(response: CompletionResponse) -> Self {
        Self { script: Mutex::new(VecDeque::new()), fallback: Some(response), requests: Mutex::new(Vec::new()) }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone()).ok_or_else(|| eyre!("script exhausted"))
    }
}

/// Endpoint that always fails, as a dropped connection would.
pub struct FailingClient;

#[async_trait]
impl InferenceClient for FailingClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse> {
        Err(eyre!("connection refused"))
    }
}

/// Index double returning the same canned hits for every search and
/// remembering the requests it saw.
pub struct CannedIndex {
    pub hits: Vec<(String, String, Option<u32>)>,
    pub error: Option<String>,
    pub seen: Mutex<Vec<SearchRequest>>,
}

impl CannedIndex {
    pub fn with_hits(hits: &[(&str, &str, Option<u32>)]) -> Self {
        Self {
            hits: hits.iter().map(|(c, d, l)| (c.to_string(), d.to_string(), *l)).collect(),
            error: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self { hits: Vec::new(), error: Some(error.to_string()), seen: Mutex::new(Vec::new()) }
    }
}

impl CourseIndex for CannedIndex {
    fn search(&self, request: &SearchRequest) -> SearchResults {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(e) = &self.error {
            return SearchResults::with_error(e.clone());
        }
        let mut out = SearchResults::default();
        for (i, (course, doc, lesson)) in self.hits.iter().enumerate() {
            out.documents.push(doc.clone());
            out.metadata.push(ChunkMetadata { course_title: course.clone(), lesson_number: *lesson, chunk_index: i });
            out.distances.push(0.5);
        }
        out
    }

    fn get_course_metadata(&self, course_title: &str) -> Option<CourseMetadata> {
        let (course, _, _) = self.hits.iter().find(|(c, _, _)| c.contains(course_title))?;
        Some(CourseMetadata {
            title: course.clone(),
            instructor: None,
            course_link: None,
            lesson_count: 1,
            lessons: vec![LessonInfo { lesson_number: 1, lesson_title: "Only".into(), lesson_link: None }],
        })
    }

    fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        Some(format!("https://example.com/{}/lesson{}", course_title.to_lowercase(), lesson_number))
    }

    fn course_titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self.hits.iter().map(|(c, _, _)| c.clone()).collect();
        titles.dedup();
        titles
    }
}
