//! SQLite-backed course index.
//!
//! Stores courses, lessons and transcript chunks with `rusqlite` (bundled
//! SQLite, so it builds the same everywhere). Retrieval is plain term-overlap
//! scoring; good enough to ground answers, not meant to compete with an
//! embedding store.
//!
//! ```no_run
//! use course_rag::index::{CourseIndex, SearchRequest, SqliteCourseIndex};
//!
//! # fn demo() -> color_eyre::Result<()> {
//! let index = SqliteCourseIndex::open_or_create("course_index.sqlite", 5)?;
//! let (courses, chunks) = index.ingest_folder("docs", 800, 100)?;
//! println!("loaded {courses} courses / {chunks} chunks");
//! let hits = index.search(&SearchRequest::new("tool calling").with_course("MCP"));
//! for (doc, meta) in hits.iter() {
//!     println!("{} -> {}", meta.course_title, doc);
//! }
//! # Ok(()) }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use color_eyre::eyre::{eyre, Result, WrapErr};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use super::document::{chunk_text, parse_course_document, Course};
use super::{ChunkMetadata, CourseIndex, CourseMetadata, LessonInfo, SearchRequest, SearchResults};

/// Index handle. The connection sits behind a mutex so the index can be
/// shared between tools as `Arc<dyn CourseIndex>`.
pub struct SqliteCourseIndex {
    conn: Mutex<Connection>,
    path: PathBuf,
    max_results: usize,
}

/// One row of [`SqliteCourseIndex::detailed_courses`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub title: String,
    pub instructor: Option<String>,
    pub course_link: Option<String>,
    pub lesson_count: usize,
    pub chunk_count: usize,
}

impl SqliteCourseIndex {
    /// Open the index file, creating it and its schema if needed.
    pub fn open_or_create<P: AsRef<Path>>(path: P, max_results: usize) -> Result<Self> {
        let p = path.as_ref().to_path_buf();
        let conn = Connection::open(&p).wrap_err_with(|| format!("opening index {}", p.display()))?;
        let index = Self { conn: Mutex::new(conn), path: p, max_results };
        index.ensure_schema()?;
        Ok(index)
    }

    /// Non-persistent index (tests, demos).
    pub fn in_memory(max_results: usize) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let index = Self { conn: Mutex::new(conn), path: PathBuf::from(":memory:"), max_results };
        index.ensure_schema()?;
        Ok(index)
    }

    pub fn db_file_path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| eyre!("index connection mutex poisoned"))
    }

    fn ensure_schema(&self) -> Result<()> {
        self.lock()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS courses (
                title TEXT PRIMARY KEY,
                instructor TEXT,
                course_link TEXT
            );
            CREATE TABLE IF NOT EXISTS lessons (
                course_title TEXT NOT NULL,
                lesson_number INTEGER NOT NULL,
                lesson_title TEXT NOT NULL,
                lesson_link TEXT,
                PRIMARY KEY (course_title, lesson_number)
            );
            CREATE TABLE IF NOT EXISTS chunks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                course_title TEXT NOT NULL,
                lesson_number INTEGER,
                chunk_index INTEGER NOT NULL,
                content TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_course ON chunks(course_title, lesson_number);
            "#,
        )?;
        Ok(())
    }

    /// Store (or replace) a course and its chunks. Returns the chunk count.
    pub fn add_course(&self, course: &Course, chunk_size: usize, chunk_overlap: usize) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT INTO courses(title, instructor, course_link) VALUES (?1, ?2, ?3)
               ON CONFLICT(title) DO UPDATE SET
                   instructor = excluded.instructor,
                   course_link = excluded.course_link"#,
            params![course.title, course.instructor, course.link],
        )?;
        tx.execute("DELETE FROM lessons WHERE course_title = ?1", params![course.title])?;
        tx.execute("DELETE FROM chunks WHERE course_title = ?1", params![course.title])?;

        let mut chunk_count = 0usize;
        for lesson in &course.lessons {
            tx.execute(
                "INSERT INTO lessons(course_title, lesson_number, lesson_title, lesson_link) VALUES (?1, ?2, ?3, ?4)",
                params![course.title, lesson.number, lesson.title, lesson.link],
            )?;
            for (i, chunk) in chunk_text(&lesson.content, chunk_size, chunk_overlap).iter().enumerate() {
                tx.execute(
                    "INSERT INTO chunks(course_title, lesson_number, chunk_index, content) VALUES (?1, ?2, ?3, ?4)",
                    params![course.title, lesson.number, i as i64, chunk],
                )?;
                chunk_count += 1;
            }
        }
        tx.commit()?;
        info!(target: "index", course = %course.title, lessons = course.lessons.len(), chunks = chunk_count, "course_indexed");
        Ok(chunk_count)
    }

    /// Delete a course by exact title. Returns whether anything was removed.
    pub fn delete_course(&self, title: &str) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let affected = tx.execute("DELETE FROM courses WHERE title = ?1", params![title])?;
        tx.execute("DELETE FROM lessons WHERE course_title = ?1", params![title])?;
        tx.execute("DELETE FROM chunks WHERE course_title = ?1", params![title])?;
        tx.commit()?;
        debug!(target: "index", title, deleted = affected > 0, "delete_course");
        Ok(affected > 0)
    }

    /// Parse and index every `.txt`/`.md` document in `dir`, skipping
    /// courses whose title is already stored. Returns (courses, chunks) added.
    pub fn ingest_folder<P: AsRef<Path>>(&self, dir: P, chunk_size: usize, chunk_overlap: usize) -> Result<(usize, usize)> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!(target: "index", dir = %dir.display(), "docs folder missing; nothing ingested");
            return Ok((0, 0));
        }
        let known: HashSet<String> = self.titles()?.into_iter().collect();
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "md"))
                    .unwrap_or(false)
            })
            .collect();
        entries.sort();

        let (mut courses, mut chunks) = (0, 0);
        for path in entries {
            let text = match fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(target: "index", file = %path.display(), error = %e, "skipping unreadable document");
                    continue;
                }
            };
            let course = match parse_course_document(&text) {
                Ok(c) => c,
                Err(e) => {
                    warn!(target: "index", file = %path.display(), error = %e, "skipping unparsable document");
                    continue;
                }
            };
            if known.contains(&course.title) {
                debug!(target: "index", title = %course.title, "already indexed");
                continue;
            }
            chunks += self.add_course(&course, chunk_size, chunk_overlap)?;
            courses += 1;
        }
        info!(target: "index", courses, chunks, "ingest_folder_done");
        Ok((courses, chunks))
    }

    /// Per-course summary rows, ordered by title.
    pub fn detailed_courses(&self) -> Result<Vec<CourseSummary>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT c.title, c.instructor, c.course_link,
                      (SELECT COUNT(*) FROM lessons l WHERE l.course_title = c.title),
                      (SELECT COUNT(*) FROM chunks k WHERE k.course_title = c.title)
               FROM courses c ORDER BY c.title ASC"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CourseSummary {
                title: row.get(0)?,
                instructor: row.get(1)?,
                course_link: row.get(2)?,
                lesson_count: row.get::<_, i64>(3)? as usize,
                chunk_count: row.get::<_, i64>(4)? as usize,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    fn titles(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT title FROM courses ORDER BY title ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Map a partial course name onto a stored title.
    pub fn resolve_course_name(&self, name: &str) -> Result<Option<String>> {
        Ok(best_title_match(name, &self.titles()?))
    }

    fn try_search(&self, request: &SearchRequest) -> Result<SearchResults> {
        let course_filter = match &request.course_name {
            Some(name) => match self.resolve_course_name(name)? {
                Some(title) => Some(title),
                None => return Ok(SearchResults::with_error(format!("No course found matching '{name}'"))),
            },
            None => None,
        };

        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT course_title, lesson_number, chunk_index, content FROM chunks
               WHERE (?1 IS NULL OR course_title = ?1)
                 AND (?2 IS NULL OR lesson_number = ?2)
               ORDER BY id ASC"#,
        )?;
        let rows = stmt.query_map(params![course_filter, request.lesson_number], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<u32>>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let query_terms = terms(&request.query);
        let mut scored: Vec<(usize, ChunkMetadata, String)> = Vec::new();
        for r in rows {
            let (course_title, lesson_number, chunk_index, content) = r?;
            let score = overlap_score(&query_terms, &content);
            if score == 0 && !query_terms.is_empty() {
                continue;
            }
            scored.push((score, ChunkMetadata { course_title, lesson_number, chunk_index: chunk_index as usize }, content));
        }
        // stable: ties keep insertion order
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.truncate(self.max_results);

        let mut results = SearchResults::default();
        for (score, meta, content) in scored {
            results.distances.push(1.0 / (1.0 + score as f32));
            results.metadata.push(meta);
            results.documents.push(content);
        }
        debug!(target: "index", query = %request.query, course = ?course_filter, lesson = ?request.lesson_number, hits = results.len(), "search");
        Ok(results)
    }

    fn try_course_metadata(&self, course_title: &str) -> Result<Option<CourseMetadata>> {
        let Some(title) = self.resolve_course_name(course_title)? else {
            return Ok(None);
        };
        let conn = self.lock()?;
        let head: Option<(String, Option<String>, Option<String>)> = conn
            .query_row(
                "SELECT title, instructor, course_link FROM courses WHERE title = ?1",
                params![title],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((title, instructor, course_link)) = head else {
            return Ok(None);
        };
        let mut stmt = conn.prepare(
            "SELECT lesson_number, lesson_title, lesson_link FROM lessons WHERE course_title = ?1 ORDER BY lesson_number ASC",
        )?;
        let rows = stmt.query_map(params![title], |row| {
            Ok(LessonInfo { lesson_number: row.get(0)?, lesson_title: row.get(1)?, lesson_link: row.get(2)? })
        })?;
        let mut lessons = Vec::new();
        for r in rows {
            lessons.push(r?);
        }
        Ok(Some(CourseMetadata { title, instructor, course_link, lesson_count: lessons.len(), lessons }))
    }

    fn try_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let conn = self.lock()?;
        let link: Option<Option<String>> = conn
            .query_row(
                "SELECT lesson_link FROM lessons WHERE course_title = ?1 AND lesson_number = ?2",
                params![course_title, lesson_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(link.flatten())
    }
}

impl CourseIndex for SqliteCourseIndex {
    fn search(&self, request: &SearchRequest) -> SearchResults {
        self.try_search(request).unwrap_or_else(|e| {
            warn!(target: "index", error = %e, "search_failed");
            SearchResults::with_error(format!("Search error: {e}"))
        })
    }

    fn get_course_metadata(&self, course_title: &str) -> Option<CourseMetadata> {
        self.try_course_metadata(course_title).unwrap_or_else(|e| {
            warn!(target: "index", error = %e, "course_metadata_failed");
            None
        })
    }

    fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        self.try_lesson_link(course_title, lesson_number).unwrap_or_else(|e| {
            warn!(target: "index", error = %e, "lesson_link_failed");
            None
        })
    }

    fn course_titles(&self) -> Vec<String> {
        self.titles().unwrap_or_else(|e| {
            warn!(target: "index", error = %e, "course_titles_failed");
            Vec::new()
        })
    }
}

/// Lowercased alphanumeric terms (length ≥ 2), deduplicated in order.
fn terms(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

fn overlap_score(query_terms: &[String], content: &str) -> usize {
    let content_terms: HashSet<String> = terms(content).into_iter().collect();
    query_terms.iter().filter(|t| content_terms.contains(*t)).count()
}

const STOPWORDS: &[&str] = &["the", "and", "for", "with", "to", "of", "in", "on", "an", "ai", "by"];

/// Terms that say something about a title: three letters or more, no stopwords.
fn significant_terms(text: &str) -> Vec<String> {
    terms(text)
        .into_iter()
        .filter(|t| t.chars().count() >= 3 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Exact (case-insensitive) match first, then substring containment with the
/// shortest title winning, then the shortest title containing every
/// significant term of `name`.
fn best_title_match(name: &str, titles: &[String]) -> Option<String> {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    if let Some(t) = titles.iter().find(|t| t.to_lowercase() == needle) {
        return Some(t.clone());
    }
    if let Some(t) = titles
        .iter()
        .filter(|t| t.to_lowercase().contains(&needle))
        .min_by_key(|t| t.len())
    {
        return Some(t.clone());
    }
    let wanted = significant_terms(&needle);
    if wanted.is_empty() {
        return None;
    }
    titles
        .iter()
        .filter(|t| overlap_score(&wanted, t) == wanted.len())
        .min_by_key(|t| t.len())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Lesson;

    fn sample() -> Course {
        Course {
            title: "Introduction to MCP".into(),
            link: Some("https://example.com/mcp".into()),
            instructor: Some("John Doe".into()),
            lessons: vec![
                Lesson { number: 0, title: "Getting Started".into(), link: Some("https://example.com/l0".into()), content: "MCP connects models to external tools.".into() },
                Lesson { number: 1, title: "Transport".into(), link: None, content: "The protocol uses JSON-RPC messages.".into() },
            ],
        }
    }

    #[test]
    fn search_filters_by_partial_course_and_lesson() -> Result<()> {
        let index = SqliteCourseIndex::in_memory(5)?;
        index.add_course(&sample(), 800, 100)?;
        let hits = index.search(&SearchRequest::new("protocol json").with_course("mcp").with_lesson(1));
        assert_eq!(hits.error, None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits.metadata[0].lesson_number, Some(1));
        Ok(())
    }

    #[test]
    fn unknown_course_reports_error() -> Result<()> {
        let index = SqliteCourseIndex::in_memory(5)?;
        index.add_course(&sample(), 800, 100)?;
        let hits = index.search(&SearchRequest::new("x").with_course("Kubernetes"));
        assert_eq!(hits.error.as_deref(), Some("No course found matching 'Kubernetes'"));
        Ok(())
    }

    #[test]
    fn title_matching_prefers_exact_then_shortest() {
        let titles = vec!["MCP Advanced".to_string(), "MCP".to_string(), "Chroma".to_string()];
        assert_eq!(best_title_match("mcp", &titles).as_deref(), Some("MCP"));
        assert_eq!(best_title_match("advanced", &titles).as_deref(), Some("MCP Advanced"));
        assert_eq!(best_title_match("nothing", &titles), None);
    }

    #[test]
    fn term_fallback_needs_every_significant_term() {
        let titles = vec!["Introduction to MCP".to_string(), "Advanced Retrieval for AI with Chroma".to_string()];
        assert_eq!(best_title_match("Introduction to Kubernetes", &titles), None);
        assert_eq!(best_title_match("the mcp one", &titles).as_deref(), Some("Introduction to MCP"));
        assert_eq!(
            best_title_match("chroma retrieval", &titles).as_deref(),
            Some("Advanced Retrieval for AI with Chroma")
        );
    }
}
