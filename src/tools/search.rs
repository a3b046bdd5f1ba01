use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::index::{CourseIndex, SearchRequest, SearchResults};

use super::{optional_str, optional_u32, require_object, EvidenceItem, Tool, ToolDefinition, ToolOutput, ToolParametersBuilder};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

/// Searches course transcripts and numbers every returned passage.
///
/// Citation numbers keep counting across calls until [`Tool::clear_evidence`],
/// so a second search in the same query continues at `last + 1`.
pub struct CourseSearchTool {
    index: Arc<dyn CourseIndex>,
    evidence: Vec<EvidenceItem>,
    counter: u32,
}

impl CourseSearchTool {
    pub fn new(index: Arc<dyn CourseIndex>) -> Self {
        Self { index, evidence: Vec::new(), counter: 0 }
    }

    fn format_results(&mut self, results: &SearchResults) -> String {
        let mut blocks = Vec::with_capacity(results.len());
        for (doc, meta) in results.iter() {
            self.counter += 1;
            let citation_num = self.counter;

            let mut title = meta.course_title.clone();
            if let Some(n) = meta.lesson_number {
                title.push_str(&format!(" - Lesson {n}"));
            }
            let url = meta
                .lesson_number
                .and_then(|n| self.index.get_lesson_link(&meta.course_title, n));

            blocks.push(format!("[{citation_num}] {title}\n{doc}"));
            self.evidence.push(EvidenceItem { citation_num, title, url });
        }
        blocks.join("\n\n")
    }
}

impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        let schema = ToolParametersBuilder::new_object()
            .add_string("query", Some("What to search for in the course content"))
            .add_string("course_name", Some("Course title (partial matches work, e.g. 'MCP', 'Introduction')"))
            .add_integer("lesson_number", Some("Specific lesson number to search within (e.g. 1, 2, 3)"), Some(0), None)
            .required("query")
            .additional_properties(false)
            .build();
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            "Search course materials with smart course name matching and lesson filtering",
            schema,
        )
    }

    fn invoke(&mut self, args: &Value) -> ToolOutput {
        if let Err(e) = require_object(args) {
            return ToolOutput::Error(e);
        }
        let Some(query) = optional_str(args, "query") else {
            return ToolOutput::Error("Missing required parameter 'query'".to_string());
        };
        let course_name = optional_str(args, "course_name");
        let lesson_number = match optional_u32(args, "lesson_number") {
            Ok(n) => n,
            Err(e) => return ToolOutput::Error(e),
        };

        let request = SearchRequest {
            query: query.to_string(),
            course_name: course_name.map(str::to_string),
            lesson_number,
        };
        let results = self.index.search(&request);

        if let Some(error) = results.error {
            debug!(target: "tools", %error, "search_index_error");
            return ToolOutput::Error(error);
        }
        if results.is_empty() {
            let mut filter_info = String::new();
            if let Some(c) = course_name {
                filter_info.push_str(&format!(" in course '{c}'"));
            }
            if let Some(n) = lesson_number {
                filter_info.push_str(&format!(" in lesson {n}"));
            }
            return ToolOutput::Text(format!("No relevant content found{filter_info}."));
        }

        let text = self.format_results(&results);
        debug!(target: "tools", hits = results.len(), last_citation = self.counter, "search_formatted");
        ToolOutput::Text(text)
    }

    fn evidence(&self) -> &[EvidenceItem] {
        &self.evidence
    }

    fn clear_evidence(&mut self) {
        self.evidence.clear();
        self.counter = 0;
    }
}
