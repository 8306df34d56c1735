//! Citation extraction and run-wide deduplication.
//!
//! Citations are recognised purely by pattern. [`extract`] runs three rules over a text,
//! one after another, and each rule numbers its own records from 1:
//!
//! | Rule        | Pattern                                   | Id prefix |
//! |-------------|-------------------------------------------|-----------|
//! | Link        | `[label](url)`                            | `cite`    |
//! | Academic    | `(Author List, 2023)`                     | `acad`    |
//! | Source tag  | `[Source: Title, Publisher, Date, URL]`   | `src`     |
//!
//! The source-tag form is the one the research prompt asks models to use.
//!
//! [`dedupe`] keeps the first record for every `(source, url)` pair and preserves the
//! order in which records were first seen.
//!
//! # Example
//!
//! ```
//! use essayforge::citation::{extract, extract_all};
//!
//! let records = extract("See [Foo](http://x).");
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].source, "Foo");
//! assert_eq!(records[0].url, "http://x");
//!
//! let merged = extract_all(["[Foo](http://x)", "again [Foo](http://x)"]);
//! assert_eq!(merged.len(), 1);
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    static ref LINK_PATTERN: Regex = Regex::new(r"\[([^\]]+)\]\(([^)]+)\)")
        .expect("link citation pattern is valid");
    static ref ACADEMIC_PATTERN: Regex = Regex::new(r"\(([A-Za-z\s&]+),\s*(\d{4})\)")
        .expect("academic citation pattern is valid");
    static ref SOURCE_TAG_PATTERN: Regex = Regex::new(r"(?i)\[source:\s*([^\]]+)\]")
        .expect("source tag pattern is valid");
}

/// Which rule produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    Link,
    Academic,
    SourceTag,
}

/// One citation found in a text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Rule-scoped sequential id (`cite1`, `acad2`, `src1`, ...).
    pub id: String,
    pub kind: CitationKind,
    /// Title or label shown in the references list.
    pub source: String,
    /// Empty when the citation carries no link.
    pub url: String,
    pub authors: Vec<String>,
    /// Free-form date (a year for academic citations).
    pub date: String,
}

impl CitationRecord {
    /// Composite identity used for deduplication.
    pub fn key(&self) -> (&str, &str) {
        (self.source.as_str(), self.url.as_str())
    }
}

/// Extract every citation from `text`, link rule first, then academic, then source tags.
pub fn extract(text: &str) -> Vec<CitationRecord> {
    let mut records = extract_links(text);
    records.extend(extract_academic(text));
    records.extend(extract_source_tags(text));
    records
}

fn extract_links(text: &str) -> Vec<CitationRecord> {
    LINK_PATTERN
        .captures_iter(text)
        .enumerate()
        .map(|(i, caps)| CitationRecord {
            id: format!("cite{}", i + 1),
            kind: CitationKind::Link,
            source: caps[1].to_string(),
            url: caps[2].to_string(),
            authors: Vec::new(),
            date: String::new(),
        })
        .collect()
}

fn extract_academic(text: &str) -> Vec<CitationRecord> {
    ACADEMIC_PATTERN
        .captures_iter(text)
        .enumerate()
        .map(|(i, caps)| {
            let authors = caps[1].trim().to_string();
            let year = caps[2].to_string();
            CitationRecord {
                id: format!("acad{}", i + 1),
                kind: CitationKind::Academic,
                source: format!("{} ({})", authors, year),
                url: String::new(),
                authors: vec![authors],
                date: year,
            }
        })
        .collect()
}

fn extract_source_tags(text: &str) -> Vec<CitationRecord> {
    let mut records = Vec::new();
    for caps in SOURCE_TAG_PATTERN.captures_iter(text) {
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        // `[Source: ...](url)` is a link and belongs to the link rule.
        if text[whole.end()..].starts_with('(') {
            continue;
        }

        let parts: Vec<&str> = caps[1].split(',').map(str::trim).collect();
        let title = parts.first().copied().unwrap_or_default();
        if title.is_empty() {
            continue;
        }
        let publisher = parts.get(1).copied().unwrap_or_default();
        let date = parts.get(2).copied().unwrap_or_default();
        let url = parts
            .get(3)
            .copied()
            .filter(|candidate| candidate.starts_with("http"))
            .unwrap_or_default();

        records.push(CitationRecord {
            id: format!("src{}", records.len() + 1),
            kind: CitationKind::SourceTag,
            source: title.to_string(),
            url: url.to_string(),
            authors: if publisher.is_empty() {
                Vec::new()
            } else {
                vec![publisher.to_string()]
            },
            date: date.to_string(),
        });
    }
    records
}

/// Keep the first record for each `(source, url)` pair, in first-seen order.
pub fn dedupe<I>(records: I) -> Vec<CitationRecord>
where
    I: IntoIterator<Item = CitationRecord>,
{
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut unique = Vec::new();
    for record in records {
        if seen.insert((record.source.clone(), record.url.clone())) {
            unique.push(record);
        }
    }
    unique
}

/// Extract from each text in order and dedupe across all of them.
pub fn extract_all<I, S>(texts: I) -> Vec<CitationRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    dedupe(texts.into_iter().flat_map(|text| extract(text.as_ref())))
}
