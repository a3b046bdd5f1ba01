//! Course index: the retrieval backend the search tools talk to.
//!
//! [`CourseIndex`] is the seam; [`SqliteCourseIndex`] is the bundled
//! implementation and tests plug in their own doubles.

pub mod document;
pub mod sqlite;

pub use document::{chunk_text, parse_course_document, Course, Lesson};
pub use sqlite::SqliteCourseIndex;

/// Parameters of a content search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Partial course title; resolved by the index.
    pub course_name: Option<String>,
    pub lesson_number: Option<u32>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    pub fn with_course(mut self, course_name: impl Into<String>) -> Self {
        self.course_name = Some(course_name.into());
        self
    }

    pub fn with_lesson(mut self, lesson_number: u32) -> Self {
        self.lesson_number = Some(lesson_number);
        self
    }
}

/// Where a retrieved passage came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub chunk_index: usize,
}

/// Documents and metadata are parallel vectors; `error` is set when the
/// search itself failed (bad filter, storage failure).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
    pub error: Option<String>,
}

impl SearchResults {
    /// Empty result carrying an error message.
    pub fn with_error(error: impl Into<String>) -> Self {
        Self { error: Some(error.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// (document, metadata) pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChunkMetadata)> {
        self.documents.iter().zip(self.metadata.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonInfo {
    pub lesson_number: u32,
    pub lesson_title: String,
    pub lesson_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMetadata {
    pub title: String,
    pub instructor: Option<String>,
    pub course_link: Option<String>,
    pub lesson_count: usize,
    pub lessons: Vec<LessonInfo>,
}

/// Read side of the course index.
///
/// Methods do not return `Result`: search failures travel inside
/// [`SearchResults::error`] and lookups degrade to `None`, so callers can
/// always hand something readable back to the model.
pub trait CourseIndex: Send + Sync {
    fn search(&self, request: &SearchRequest) -> SearchResults;

    /// Metadata for the course best matching `course_title` (partial match).
    fn get_course_metadata(&self, course_title: &str) -> Option<CourseMetadata>;

    /// Link of one lesson; `course_title` must be the exact stored title.
    fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String>;

    fn course_titles(&self) -> Vec<String>;

    fn course_count(&self) -> usize {
        self.course_titles().len()
    }
}
