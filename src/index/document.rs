//! Course transcript documents.
//!
//! Expected layout:
//!
//! ```text
//! Course Title: Building Towards Computer Use
//! Course Link: https://example.com/course
//! Course Instructor: Jane Doe
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/course/lesson0
//! transcript text ...
//!
//! Lesson 1: ...
//! ```

use color_eyre::eyre::{eyre, Result};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LESSON_HEADER: Regex = Regex::new(r"^Lesson\s+(\d+)\s*:\s*(.*)$").expect("valid lesson regex");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

fn header_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?;
    let rest = rest.trim_start().strip_prefix(':')?;
    let v = rest.trim();
    if v.is_empty() { None } else { Some(v) }
}

/// Parse a transcript document into a [`Course`].
pub fn parse_course_document(text: &str) -> Result<Course> {
    let mut title: Option<String> = None;
    let mut link = None;
    let mut instructor = None;
    let mut lessons: Vec<Lesson> = Vec::new();
    let mut body: Vec<&str> = Vec::new();

    let finish = |lessons: &mut Vec<Lesson>, body: &mut Vec<&str>| {
        if let Some(last) = lessons.last_mut() {
            last.content = body.join("\n").trim().to_string();
        }
        body.clear();
    };

    let mut lines = text.lines().peekable();
    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if let Some(caps) = LESSON_HEADER.captures(line) {
            finish(&mut lessons, &mut body);
            let number: u32 = caps[1]
                .parse()
                .map_err(|e| eyre!("invalid lesson number in {line:?}: {e}"))?;
            let mut lesson_link = None;
            if let Some(next) = lines.peek() {
                if let Some(v) = header_value(next.trim(), "Lesson Link") {
                    lesson_link = Some(v.to_string());
                    lines.next();
                }
            }
            lessons.push(Lesson {
                number,
                title: caps[2].trim().to_string(),
                link: lesson_link,
                content: String::new(),
            });
            continue;
        }
        if lessons.is_empty() {
            if let Some(v) = header_value(line, "Course Title") {
                title = Some(v.to_string());
            } else if let Some(v) = header_value(line, "Course Link") {
                link = Some(v.to_string());
            } else if let Some(v) = header_value(line, "Course Instructor") {
                instructor = Some(v.to_string());
            }
            continue;
        }
        body.push(raw);
    }
    finish(&mut lessons, &mut body);

    let title = title.ok_or_else(|| eyre!("document has no 'Course Title:' line"))?;
    Ok(Course { title, link, instructor, lessons })
}

fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = Vec::new();
    let mut current = String::new();
    let mut chars = normalized.chars().peekable();
    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|n| *n == ' ') {
            let s = current.trim();
            if !s.is_empty() {
                out.push(s.to_string());
            }
            current.clear();
        }
    }
    let s = current.trim();
    if !s.is_empty() {
        out.push(s.to_string());
    }
    out
}

/// Split `text` into sentence-aligned chunks of at most `chunk_size`
/// characters (a single longer sentence stays whole). Consecutive chunks
/// share trailing sentences totalling at most `overlap` characters.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < sentences.len() {
        let mut len = 0;
        let mut end = start;
        while end < sentences.len() {
            let add = sentences[end].len() + usize::from(end > start);
            if end > start && len + add > chunk_size {
                break;
            }
            len += add;
            end += 1;
        }
        chunks.push(sentences[start..end].join(" "));
        if end >= sentences.len() {
            break;
        }
        // Step back over overlap sentences, always advancing at least one.
        let mut next = end;
        let mut shared = 0;
        while next > start + 1 {
            let add = sentences[next - 1].len() + 1;
            if shared + add > overlap {
                break;
            }
            shared += add;
            next -= 1;
        }
        start = next;
    }
    chunks
}
