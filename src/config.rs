//! Application configuration.
//!
//! Defaults live in [`Config::default`]; [`Config::from_env`] overlays `RAG_*`
//! environment variables (a local `.env` is loaded first when present).

use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::PathBuf;
use std::str::FromStr;

/// Application settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Chat model identifier.
    pub model: String,
    /// `max_tokens` for 4o-family models.
    pub max_tokens: u32,
    /// `max_completion_tokens` for newer model families.
    pub max_completion_tokens: u32,
    /// Sampling temperature. Kept at 0 so answers are deterministic.
    pub temperature: f32,
    /// Tool-use rounds allowed before a final answer is forced.
    pub max_tool_rounds: usize,
    /// Passages returned per search.
    pub max_results: usize,
    /// Exchanges kept per chat session.
    pub max_history: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// SQLite file backing the course index.
    pub db_path: PathBuf,
    /// Folder of course transcripts loaded at startup.
    pub docs_dir: PathBuf,
    /// Override for OpenAI-compatible endpoints.
    pub api_base: Option<String>,
    /// Event polling interval of the terminal UI (ms).
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            // NOTE: Keep in sync with tests/config_tests.rs.
            max_tokens: 800,
            max_completion_tokens: 800,
            temperature: 0.0,
            max_tool_rounds: 2,
            max_results: 5,
            max_history: 2,
            chunk_size: 800,
            chunk_overlap: 100,
            db_path: PathBuf::from("course_index.sqlite"),
            docs_dir: PathBuf::from("docs"),
            api_base: None,
            poll_interval_ms: 100,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from defaults plus `RAG_*` variables, then validate it.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::default();

        if let Ok(model) = std::env::var("RAG_MODEL") {
            cfg.model = model;
        }
        if let Some(v) = env_parse("RAG_MAX_TOKENS")? {
            cfg.max_tokens = v;
        }
        if let Some(v) = env_parse("RAG_MAX_COMPLETION_TOKENS")? {
            cfg.max_completion_tokens = v;
        }
        if let Some(v) = env_parse("RAG_MAX_TOOL_ROUNDS")? {
            cfg.max_tool_rounds = v;
        }
        if let Some(v) = env_parse("RAG_MAX_RESULTS")? {
            cfg.max_results = v;
        }
        if let Some(v) = env_parse("RAG_MAX_HISTORY")? {
            cfg.max_history = v;
        }
        if let Some(v) = env_parse("RAG_CHUNK_SIZE")? {
            cfg.chunk_size = v;
        }
        if let Some(v) = env_parse("RAG_CHUNK_OVERLAP")? {
            cfg.chunk_overlap = v;
        }
        if let Ok(p) = std::env::var("RAG_DB_PATH") {
            cfg.db_path = PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("RAG_DOCS_DIR") {
            cfg.docs_dir = PathBuf::from(p);
        }
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            if !base.trim().is_empty() {
                cfg.api_base = Some(base);
            }
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the rest of the system cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(eyre!("model must be set"));
        }
        if self.max_tool_rounds == 0 {
            return Err(eyre!("max_tool_rounds must be at least 1"));
        }
        if self.max_results == 0 {
            return Err(eyre!("max_results must be greater than 0"));
        }
        if self.chunk_size == 0 {
            return Err(eyre!("chunk_size must be greater than 0"));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(eyre!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap,
                self.chunk_size
            ));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => {
            let v = raw
                .trim()
                .parse::<T>()
                .wrap_err_with(|| format!("invalid value for {key}: {raw:?}"))?;
            Ok(Some(v))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::new().validate().is_ok());
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut cfg = Config::new();
        cfg.chunk_overlap = cfg.chunk_size;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_rounds_rejected() {
        let mut cfg = Config::new();
        cfg.max_tool_rounds = 0;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("max_tool_rounds"));
    }
}
