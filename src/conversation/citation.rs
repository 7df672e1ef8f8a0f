use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::chat::Source;

// Marker line terminating the answer body, with or without markdown bold.
static SOURCES_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:\*\*)?Sources:(?:\*\*)?\s*$").unwrap()
});

static PAGE_SUFFIX: Lazy<Regex> = Lazy::new(|| { Regex::new(r"\(Page\s+(\d+)\)\s*$").unwrap() });

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnswer {
    pub content: String,
    pub sources: Vec<Source>,
}

/// Reconciles raw answer text with the structured citations the backend
/// returned. Structured citations win when present; the textual fallback only
/// exists for stored answers that predate them. Either way a trailing
/// `Sources:` block is stripped from the displayed content.
pub fn reconcile(content: &str, structured: Option<&[Source]>) -> ParsedAnswer {
    let (cleaned, block) = strip_trailing_sources(content);

    let sources = match structured {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => block.map(recover_sources).unwrap_or_default(),
    };

    ParsedAnswer {
        content: cleaned,
        sources,
    }
}

/// Splits `content` at the first `Sources:` marker line. No marker means no
/// block: the content passes through untouched apart from trailing
/// whitespace, and recovery yields nothing.
fn strip_trailing_sources(content: &str) -> (String, Option<&str>) {
    match SOURCES_MARKER.find(content) {
        Some(m) => (content[..m.start()].trim_end().to_string(), Some(&content[m.end()..])),
        None => (content.trim_end().to_string(), None),
    }
}

/// Best-effort recovery of one source per line from a `Sources:` block.
/// Lines still carrying markup (`**`) or a repeated `Sources:` marker are
/// artifacts of older answer formatting and are dropped.
fn recover_sources(block: &str) -> Vec<Source> {
    let mut sources = Vec::new();

    for line in block.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains("**") || line.contains("Sources:") {
            continue;
        }

        let entry = line.trim_start_matches(['-', '*']).trim();
        let (name, page) = match PAGE_SUFFIX.captures(entry) {
            Some(caps) => {
                let page = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
                (entry[..caps.get(0).unwrap().start()].trim(), page)
            }
            None => (entry, None),
        };

        if name.is_empty() {
            continue;
        }
        sources.push(Source::named(name, page));
    }

    sources
}
