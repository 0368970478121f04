// src/knowledge/mod.rs — In-memory FAQ search
//
// The FAQ is a markdown document where every `### ` heading is a question and
// the text up to the next heading is its answer. Loaded once, read-only after.

use serde::Serialize;
use std::path::Path;

/// Words at or below this length never count as matches.
const MIN_MATCH_WORD_LEN: usize = 2;
/// Query words longer than this earn the heading bonus.
const MIN_HEADING_WORD_LEN: usize = 3;
const HEADING_BONUS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub question: String,
    pub answer: String,
    pub score: u32,
}

#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    raw: String,
    entries: Vec<FaqEntry>,
    max_results: usize,
}

impl KnowledgeBase {
    pub fn from_markdown(raw: impl Into<String>, max_results: usize) -> Self {
        let raw = raw.into();
        let entries = split_sections(&raw);
        Self {
            raw,
            entries,
            max_results,
        }
    }

    /// Read the FAQ document. A missing file yields an empty base so the
    /// assistant still runs; the FAQ path then falls back to general guidance.
    pub fn load(path: &Path, max_results: usize) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                let kb = Self::from_markdown(raw, max_results);
                tracing::info!(path = %path.display(), entries = kb.len(), "Loaded knowledge base");
                kb
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Knowledge base unavailable: {e}");
                Self::from_markdown(String::new(), max_results)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    /// The whole document, for prompt injection.
    pub fn full_text(&self) -> &str {
        &self.raw
    }

    /// Keyword ranking: +1 per query word found in question or answer, plus a
    /// bonus when a longer query word appears in the question. Ties keep
    /// document order; zero scores are dropped.
    pub fn search(&self, query: &str) -> Vec<RankedEntry> {
        let query = query.to_lowercase();
        let mut words: Vec<&str> = query.split_whitespace().collect();
        words.sort_unstable();
        words.dedup();

        let mut scored: Vec<RankedEntry> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let heading = entry.question.to_lowercase();
                let text = format!("{} {}", heading, entry.answer.to_lowercase());

                let mut score = words
                    .iter()
                    .filter(|w| w.len() > MIN_MATCH_WORD_LEN && text.contains(*w))
                    .count() as u32;
                if words
                    .iter()
                    .any(|w| w.len() > MIN_HEADING_WORD_LEN && heading.contains(*w))
                {
                    score += HEADING_BONUS;
                }

                (score > 0).then(|| RankedEntry {
                    question: entry.question.clone(),
                    answer: entry.answer.clone(),
                    score,
                })
            })
            .collect();

        // stable sort keeps document order for equal scores
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(self.max_results);
        scored
    }
}

fn split_sections(content: &str) -> Vec<FaqEntry> {
    let mut entries = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in content.lines() {
        if let Some(heading) = line.trim_start().strip_prefix("###") {
            if heading.starts_with('#') {
                // deeper heading, part of the answer body
                if let Some((_, body)) = current.as_mut() {
                    body.push(line);
                }
                continue;
            }
            if let Some((q, body)) = current.take() {
                entries.push(finish_entry(q, &body));
            }
            current = Some((heading.trim().to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            body.push(line);
        }
    }
    if let Some((q, body)) = current.take() {
        entries.push(finish_entry(q, &body));
    }

    entries.retain(|e| !e.question.is_empty());
    entries
}

fn finish_entry(question: String, body: &[&str]) -> FaqEntry {
    let mut answer = body.join("\n").trim().to_string();
    if let Some(stripped) = answer.strip_suffix("---") {
        answer = stripped.trim_end().to_string();
    }
    FaqEntry { question, answer }
}
