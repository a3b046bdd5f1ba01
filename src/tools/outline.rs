use std::sync::Arc;

use serde_json::Value;

use crate::index::{CourseIndex, CourseMetadata};

use super::{optional_str, require_object, Tool, ToolDefinition, ToolOutput, ToolParametersBuilder};

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

/// Returns a course's title, instructor, link and lesson list.
/// Outlines are not citation sources, so this tool keeps no evidence.
pub struct CourseOutlineTool {
    index: Arc<dyn CourseIndex>,
}

impl CourseOutlineTool {
    pub fn new(index: Arc<dyn CourseIndex>) -> Self {
        Self { index }
    }
}

pub(crate) fn format_outline(meta: &CourseMetadata) -> String {
    let mut lines = vec![
        format!("Course: {}", meta.title),
        format!("Instructor: {}", meta.instructor.as_deref().unwrap_or("Unknown")),
        format!("Course Link: {}", meta.course_link.as_deref().unwrap_or("N/A")),
        format!("Total Lessons: {}", meta.lesson_count),
        String::new(),
        "Lessons:".to_string(),
    ];
    for lesson in &meta.lessons {
        match lesson.lesson_link.as_deref().filter(|l| !l.is_empty()) {
            Some(link) => lines.push(format!("  {}. {} - {}", lesson.lesson_number, lesson.lesson_title, link)),
            None => lines.push(format!("  {}. {}", lesson.lesson_number, lesson.lesson_title)),
        }
    }
    lines.join("\n")
}

impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        let schema = ToolParametersBuilder::new_object()
            .add_string("course_title", Some("Course title to look up (partial matches work, e.g. 'MCP', 'Introduction')"))
            .required("course_title")
            .additional_properties(false)
            .build();
        ToolDefinition::new(
            OUTLINE_TOOL_NAME,
            "Get course structure including title, link, instructor, and complete lesson list with links. \
             Use for questions about course syllabus, what topics a course covers, or listing lessons.",
            schema,
        )
    }

    fn invoke(&mut self, args: &Value) -> ToolOutput {
        if let Err(e) = require_object(args) {
            return ToolOutput::Error(e);
        }
        let Some(title) = optional_str(args, "course_title") else {
            return ToolOutput::Error("Missing required parameter 'course_title'".to_string());
        };
        match self.index.get_course_metadata(title) {
            Some(meta) => ToolOutput::Text(format_outline(&meta)),
            None => ToolOutput::Text(format!("No course found matching '{title}'")),
        }
    }
}
