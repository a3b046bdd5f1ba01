//! Tools the model can call, and the registry that dispatches them.
//!
//! Every tool implements [`Tool`]. Invocation never fails outward: problems
//! come back as [`ToolOutput::Error`] text so the model always receives a
//! well-formed tool result and can react to it.

mod definition;
mod outline;
mod registry;
mod search;

pub use definition::{ToolDefinition, ToolParametersBuilder};
pub use outline::{CourseOutlineTool, OUTLINE_TOOL_NAME};
pub use registry::{ToolRegistry, ToolResolution};
pub use search::{CourseSearchTool, SEARCH_TOOL_NAME};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A numbered source surfaced to the user as a citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub citation_num: u32,
    /// Course title, with `" - Lesson N"` appended when known.
    pub title: String,
    pub url: Option<String>,
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    Error(String),
}

impl ToolOutput {
    pub fn text(&self) -> &str {
        match self {
            ToolOutput::Text(t) | ToolOutput::Error(t) => t,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error(_))
    }

    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Text(t) | ToolOutput::Error(t) => t,
        }
    }
}

/// A capability the model may invoke by name.
///
/// Tools that hand out citations keep their evidence list and counter as
/// per-query state; the registry reads it out and resets it between queries.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn invoke(&mut self, args: &Value) -> ToolOutput;

    /// Evidence gathered since the last reset, in creation order.
    fn evidence(&self) -> &[EvidenceItem] {
        &[]
    }

    fn clear_evidence(&mut self) {}
}

/// Fetch an optional string argument; empty strings count as absent.
pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str()).map(str::trim).filter(|s| !s.is_empty())
}

/// Fetch an optional non-negative integer argument. Numeric strings are
/// accepted since models occasionally quote numbers.
pub(crate) fn optional_u32(args: &Value, key: &str) -> Result<Option<u32>, String> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| format!("Invalid '{key}': expected a non-negative integer, got {n}")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| format!("Invalid '{key}': expected a non-negative integer, got {s:?}")),
        Some(other) => Err(format!("Invalid '{key}': expected a non-negative integer, got {other}")),
    }
}

pub(crate) fn require_object(args: &Value) -> Result<(), String> {
    if args.is_object() {
        Ok(())
    } else {
        Err(format!("Invalid arguments: expected a JSON object, got {args}"))
    }
}
