use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use color_eyre::eyre::{eyre, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::index::CourseIndex;

use super::{CourseOutlineTool, CourseSearchTool, EvidenceItem, Tool, ToolDefinition, ToolOutput};

/// Outcome of dispatching one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolResolution {
    Executed { name: String, output: String },
    /// The tool ran but reported a problem (bad arguments, index error).
    Failed { name: String, error: String },
    ToolNotFound { requested: String },
}

impl ToolResolution {
    pub fn is_executed(&self) -> bool {
        matches!(self, ToolResolution::Executed { .. })
    }

    /// Text handed back to the model as the tool result.
    pub fn content(&self) -> String {
        match self {
            ToolResolution::Executed { output, .. } => output.clone(),
            ToolResolution::Failed { error, .. } => error.clone(),
            ToolResolution::ToolNotFound { requested } => format!("Tool '{requested}' not found"),
        }
    }
}

impl Display for ToolResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolResolution::Executed { name, output } => write!(f, "Executed name={} output_len={}", name, output.len()),
            ToolResolution::Failed { name, error } => write!(f, "Failed name={} error={}", name, error),
            ToolResolution::ToolNotFound { requested } => write!(f, "ToolNotFound requested={}", requested),
        }
    }
}

/// Tools by name, in registration order.
///
/// Evidence-tracking tools carry per-query state, so a registry belongs to
/// one logical query at a time: the generation loop borrows it `&mut`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the content-search and outline tools over `index`.
    pub fn with_course_tools(index: Arc<dyn CourseIndex>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(CourseSearchTool::new(index.clone()))?;
        registry.register(CourseOutlineTool::new(index))?;
        Ok(registry)
    }

    /// Register a tool under its definition's name. A tool registered under
    /// an existing name replaces the old one in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        let name = tool.definition().name;
        if name.trim().is_empty() {
            return Err(eyre!("Tool must have a 'name' in its definition"));
        }
        match self.by_name.get(&name) {
            Some(&i) => self.tools[i] = Box::new(tool),
            None => {
                self.by_name.insert(name.clone(), self.tools.len());
                self.tools.push(Box::new(tool));
            }
        }
        debug!(target: "tools", tool = %name, "tool_registered");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Run the named tool. Unknown names and tool failures are reported in
    /// the returned resolution, never as `Err`.
    pub fn dispatch(&mut self, name: &str, args: &Value) -> ToolResolution {
        let Some(&i) = self.by_name.get(name) else {
            info!(target: "tools", requested = name, "tool_not_found");
            return ToolResolution::ToolNotFound { requested: name.to_string() };
        };
        let resolution = match self.tools[i].invoke(args) {
            ToolOutput::Text(output) => ToolResolution::Executed { name: name.to_string(), output },
            ToolOutput::Error(error) => ToolResolution::Failed { name: name.to_string(), error },
        };
        debug!(target: "tools", resolution = %resolution, "tool_dispatched");
        resolution
    }

    /// Evidence of every tracking tool, tool by tool in registration order.
    pub fn collect_evidence(&self) -> Vec<EvidenceItem> {
        self.tools.iter().flat_map(|t| t.evidence().iter().cloned()).collect()
    }

    /// Reset every tool's evidence and citation counter.
    pub fn clear_evidence(&mut self) {
        for tool in &mut self.tools {
            tool.clear_evidence();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolParametersBuilder;
    use serde_json::json;

    struct Echo(&'static str);

    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.0, "echo", ToolParametersBuilder::new_object().build())
        }

        fn invoke(&mut self, args: &Value) -> ToolOutput {
            ToolOutput::Text(args.to_string())
        }
    }

    #[test]
    fn nameless_tool_rejected() {
        let mut reg = ToolRegistry::new();
        let err = reg.register(Echo("")).unwrap_err();
        assert!(err.to_string().contains("name"));
        assert!(reg.is_empty());
    }

    #[test]
    fn definitions_keep_registration_order() -> Result<()> {
        let mut reg = ToolRegistry::new();
        reg.register(Echo("b"))?;
        reg.register(Echo("a"))?;
        reg.register(Echo("b"))?;
        let names: Vec<String> = reg.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        Ok(())
    }

    #[test]
    fn unknown_tool_is_a_string() {
        let mut reg = ToolRegistry::new();
        let res = reg.dispatch("nope", &json!({}));
        assert_eq!(res.content(), "Tool 'nope' not found");
        assert!(!res.is_executed());
    }

    #[test]
    fn tools_without_evidence_contribute_nothing() -> Result<()> {
        let mut reg = ToolRegistry::new();
        reg.register(Echo("x"))?;
        assert_eq!(reg.dispatch("x", &json!({"k": 1})).content(), r#"{"k":1}"#);
        assert!(reg.collect_evidence().is_empty());
        reg.clear_evidence();
        Ok(())
    }
}
