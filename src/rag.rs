//! Query orchestration: index, tools, generator and sessions wired together.

use std::sync::{Arc, Mutex, MutexGuard};

use color_eyre::eyre::{eyre, Result, WrapErr};
use serde::Serialize;
use tracing::{info, instrument};

use crate::citations::filter_cited_sources;
use crate::config::Config;
use crate::index::{parse_course_document, CourseIndex, SqliteCourseIndex};
use crate::openai::{AiGenerator, InferenceClient, OpenAiClient};
use crate::session::SessionManager;
use crate::tools::{EvidenceItem, ToolRegistry};

/// Answer text plus the sources it cites, numbered as in the text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<EvidenceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

pub struct RagSystem {
    config: Config,
    index: Arc<SqliteCourseIndex>,
    generator: AiGenerator,
    sessions: Mutex<SessionManager>,
}

impl RagSystem {
    pub fn new(config: Config, index: Arc<SqliteCourseIndex>, client: Arc<dyn InferenceClient>) -> Self {
        let generator = AiGenerator::new(client, config.max_tool_rounds);
        let sessions = Mutex::new(SessionManager::new(config.max_history));
        Self { config, index, generator, sessions }
    }

    /// Open the on-disk index and connect to the configured endpoint.
    pub fn from_config(config: Config) -> Result<Self> {
        let index = SqliteCourseIndex::open_or_create(&config.db_path, config.max_results)?;
        let client = OpenAiClient::new(config.clone());
        Ok(Self::new(config, Arc::new(index), Arc::new(client)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &Arc<SqliteCourseIndex> {
        &self.index
    }

    fn sessions(&self) -> Result<MutexGuard<'_, SessionManager>> {
        self.sessions.lock().map_err(|_| eyre!("session store mutex poisoned"))
    }

    pub fn create_session(&self) -> Result<String> {
        Ok(self.sessions()?.create_session())
    }

    /// Answer one question. Each call gets its own tool registry, so citation
    /// numbering never leaks between queries.
    #[instrument(name = "rag_query", skip(self), fields(query_len = query.len()))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> Result<QueryAnswer> {
        let history = match session_id {
            Some(id) => self.sessions()?.get_history(id),
            None => None,
        };

        let index: Arc<dyn CourseIndex> = self.index.clone();
        let mut registry = ToolRegistry::with_course_tools(index)?;
        let definitions = registry.definitions();

        let text = self
            .generator
            .generate(query, history.as_deref(), Some(&definitions), Some(&mut registry))
            .await?;

        let evidence = registry.collect_evidence();
        let (answer, sources) = filter_cited_sources(&text, &evidence);
        registry.clear_evidence();

        if let Some(id) = session_id {
            self.sessions()?.add_exchange(id, query, &answer);
        }
        info!(target: "rag", gathered = evidence.len(), cited = sources.len(), "query_answered");
        Ok(QueryAnswer { answer, sources })
    }

    /// Parse a course document and index it. Returns (title, chunk count).
    pub fn add_course_from_text(&self, text: &str) -> Result<(String, usize)> {
        let course = parse_course_document(text).wrap_err("parsing course document")?;
        let chunks = self.index.add_course(&course, self.config.chunk_size, self.config.chunk_overlap)?;
        info!(target: "rag", title = %course.title, chunks, "course_added");
        Ok((course.title, chunks))
    }

    /// Index every document in the configured docs folder not yet stored.
    pub fn load_docs_dir(&self) -> Result<(usize, usize)> {
        self.index.ingest_folder(&self.config.docs_dir, self.config.chunk_size, self.config.chunk_overlap)
    }

    pub fn delete_course(&self, title: &str) -> Result<bool> {
        self.index.delete_course(title)
    }

    pub fn course_analytics(&self) -> CourseAnalytics {
        let course_titles = self.index.course_titles();
        CourseAnalytics { total_courses: course_titles.len(), course_titles }
    }
}
