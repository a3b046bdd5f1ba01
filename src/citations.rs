//! Caller-side citation filtering.
//!
//! After a generation, only the evidence the answer actually cites is kept,
//! renumbered `1..` in order of first appearance, and the markers in the text
//! are rewritten to match.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use tracing::debug;

use crate::tools::EvidenceItem;

lazy_static! {
    static ref MARKER: Regex = Regex::new(r"( ?)\[(\d+)\]").expect("valid marker regex");
}

/// Citation numbers in order of first appearance, without duplicates.
pub fn extract_citation_numbers(text: &str) -> Vec<u32> {
    let mut seen = Vec::new();
    for caps in MARKER.captures_iter(text) {
        if let Ok(n) = caps[2].parse::<u32>() {
            if !seen.contains(&n) {
                seen.push(n);
            }
        }
    }
    seen
}

/// Keep cited evidence only, renumber it and rewrite the markers in `text`.
///
/// Markers that point at no evidence item are dropped from the text.
pub fn filter_cited_sources(text: &str, evidence: &[EvidenceItem]) -> (String, Vec<EvidenceItem>) {
    let cited = extract_citation_numbers(text);
    if cited.is_empty() {
        return (text.to_string(), Vec::new());
    }

    let mut renumber: HashMap<u32, u32> = HashMap::new();
    let mut kept = Vec::new();
    for old in cited {
        if let Some(item) = evidence.iter().find(|e| e.citation_num == old) {
            let new = kept.len() as u32 + 1;
            renumber.insert(old, new);
            kept.push(EvidenceItem { citation_num: new, ..item.clone() });
        }
    }

    let rewritten = MARKER.replace_all(text, |caps: &Captures| {
        let mapped = caps[2].parse::<u32>().ok().and_then(|n| renumber.get(&n));
        match mapped {
            Some(new) => format!("{}[{}]", &caps[1], new),
            None => String::new(),
        }
    });
    debug!(target: "rag", kept = kept.len(), available = evidence.len(), "citations_filtered");
    (rewritten.into_owned(), kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(n: u32, title: &str) -> EvidenceItem {
        EvidenceItem { citation_num: n, title: title.into(), url: Some(format!("url{n}")) }
    }

    #[test]
    fn numbers_follow_first_appearance() {
        assert_eq!(extract_citation_numbers("a [3] b [1] c [3] d [2]"), vec![3, 1, 2]);
        assert!(extract_citation_numbers("nothing cited").is_empty());
    }

    #[test]
    fn unused_sources_are_dropped_and_rest_renumbered() {
        let evidence = vec![item(1, "Source 1"), item(2, "Source 2"), item(3, "Source 3")];
        let (text, kept) = filter_cited_sources("This is about MCP [1] and protocols [3].", &evidence);
        assert_eq!(text, "This is about MCP [1] and protocols [2].");
        assert_eq!(kept, vec![item(1, "Source 1"), EvidenceItem { citation_num: 2, ..item(3, "Source 3") }]);
    }

    #[test]
    fn renumbering_uses_text_order() {
        let evidence = vec![item(3, "Source 3"), item(5, "Source 5")];
        let (text, kept) = filter_cited_sources("First point [5] and second point [3], again [5].", &evidence);
        assert_eq!(text, "First point [1] and second point [2], again [1].");
        assert_eq!(kept[0].title, "Source 5");
        assert_eq!(kept[1].title, "Source 3");
    }

    #[test]
    fn orphan_markers_are_removed() {
        let evidence = vec![item(1, "Source 1")];
        let (text, kept) = filter_cited_sources("Known [1] and made up [7].", &evidence);
        assert_eq!(text, "Known [1] and made up.");
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn uncited_text_is_untouched() {
        let (text, kept) = filter_cited_sources("No citations here.", &[]);
        assert_eq!(text, "No citations here.");
        assert!(kept.is_empty());

        let (text, kept) = filter_cited_sources("This response has no citations.", &[item(1, "Source 1")]);
        assert_eq!(text, "This response has no citations.");
        assert!(kept.is_empty());
    }
}
