//! File planning: turning a free-form provider answer into a list of files.
//!
//! Provider output is unreliable, so extraction is a ladder of strategies,
//! each tried only when the previous one found nothing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use super::errors::{AgentError, AgentResult};

const DEFAULT_PURPOSE: &str = "Implementation file";

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\d+\.\s*([\w.-]+\.[a-zA-Z0-9]+)\s*-\s*(.*)$")
        .expect("valid numbered-line regex (verified by tests)")
});

static DOTTED_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([\w.-]+\.[a-zA-Z0-9]+)\b").expect("valid dotted-token regex (verified by tests)")
});

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[\s\\/*?:"<>|]"#).expect("valid filename regex (verified by tests)")
});

static GENERATABLE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w./-]+$").expect("valid filename regex (verified by tests)")
});

/// One file the pipeline intends to generate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    pub name: String,
    pub purpose: String,
}

impl PlannedFile {
    pub fn new(name: impl Into<String>, purpose: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            purpose: purpose.into(),
        }
    }

    /// Lower-cased extension including the dot, or empty
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }
}

/// Which rung of the ladder produced the plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    NumberedList,
    DottedTokens,
    FilenameList,
    Defaults,
}

impl fmt::Display for PlanSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanSource::NumberedList => write!(f, "numbered_list"),
            PlanSource::DottedTokens => write!(f, "dotted_tokens"),
            PlanSource::FilenameList => write!(f, "filename_list"),
            PlanSource::Defaults => write!(f, "defaults"),
        }
    }
}

/// A single extraction strategy
///
/// Returns the files found, or `ParseError` when the text holds nothing
/// usable so the caller can move on to the next strategy.
pub trait PlanStrategy: Send + Sync {
    fn source(&self) -> PlanSource;

    fn extract(&self, text: &str) -> AgentResult<Vec<PlannedFile>>;
}

/// `N. name.ext - purpose` lines
pub struct NumberedList;

/// Any `name.ext` token, purpose taken from the same line when it has a dash
pub struct DottedTokens;

/// A bare comma-separated list of names
pub struct CommaList;

fn no_match(strategy: PlanSource) -> AgentError {
    AgentError::ParseError(format!("{} strategy found no filenames", strategy))
}

fn non_empty(source: PlanSource, files: Vec<PlannedFile>) -> AgentResult<Vec<PlannedFile>> {
    let files = dedupe(files);
    if files.is_empty() {
        Err(no_match(source))
    } else {
        Ok(files)
    }
}

impl PlanStrategy for NumberedList {
    fn source(&self) -> PlanSource {
        PlanSource::NumberedList
    }

    fn extract(&self, text: &str) -> AgentResult<Vec<PlannedFile>> {
        let files = NUMBERED_LINE
            .captures_iter(text)
            .filter_map(|caps| {
                let name = sanitize_filename(caps.get(1)?.as_str())?;
                let purpose = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                Some(PlannedFile::new(name, purpose))
            })
            .collect();
        non_empty(self.source(), files)
    }
}

impl PlanStrategy for DottedTokens {
    fn source(&self) -> PlanSource {
        PlanSource::DottedTokens
    }

    fn extract(&self, text: &str) -> AgentResult<Vec<PlannedFile>> {
        let files = DOTTED_TOKEN
            .captures_iter(text)
            .filter_map(|caps| {
                let raw = caps.get(1)?.as_str();
                let name = sanitize_filename(raw)?;
                let purpose = text
                    .lines()
                    .filter(|line| line.contains(raw))
                    .find_map(|line| line.split_once('-').map(|(_, rest)| rest.trim()))
                    .filter(|p| !p.is_empty())
                    .unwrap_or(DEFAULT_PURPOSE);
                Some(PlannedFile::new(name, purpose))
            })
            .collect();
        non_empty(self.source(), files)
    }
}

impl PlanStrategy for CommaList {
    fn source(&self) -> PlanSource {
        PlanSource::FilenameList
    }

    fn extract(&self, text: &str) -> AgentResult<Vec<PlannedFile>> {
        let files = text
            .split(',')
            .filter_map(sanitize_filename)
            .map(|name| PlannedFile::new(name, DEFAULT_PURPOSE))
            .collect();
        non_empty(self.source(), files)
    }
}

/// Strategies applied to the planning answer, in order
pub fn planning_ladder() -> Vec<Box<dyn PlanStrategy>> {
    vec![Box::new(NumberedList), Box::new(DottedTokens)]
}

/// Runs `strategies` in order and returns the first non-empty result
pub fn extract_with(
    strategies: &[Box<dyn PlanStrategy>],
    text: &str,
) -> Option<(Vec<PlannedFile>, PlanSource)> {
    strategies.iter().find_map(|strategy| match strategy.extract(text) {
        Ok(files) => Some((files, strategy.source())),
        Err(e) => {
            tracing::debug!(strategy = %strategy.source(), error = %e, "Plan strategy found nothing");
            None
        }
    })
}

/// The part of a planning answer that lists files
///
/// When both the `ARCHITECTURE:` and `FILES:` markers are present only the
/// text after `FILES:` is used; otherwise the whole answer.
pub fn files_section(response: &str) -> String {
    let normalized = response.replace("\r\n", "\n");
    if normalized.contains("ARCHITECTURE:") {
        if let Some((_, files)) = normalized.split_once("FILES:") {
            return files.trim().to_string();
        }
    }
    normalized
}

/// Cleans a raw filename, returning `None` if nothing usable remains
///
/// Quotes around the name are dropped, whitespace and path/shell
/// metacharacters become `_`, and leading `.`, `/` and `\` are stripped.
/// The result must still contain a dot.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c| c == '\'' || c == '"')
        .trim_start_matches(['.', '/', '\\']);
    let replaced = UNSAFE_CHARS.replace_all(trimmed, "_");
    let cleaned = replaced.trim_start_matches(['.', '/', '\\']);

    if !cleaned.is_empty() && cleaned.contains('.') {
        Some(cleaned.to_string())
    } else {
        None
    }
}

/// Whether a name is safe to generate and persist
pub fn is_generatable(name: &str) -> bool {
    GENERATABLE_NAME.is_match(name)
}

/// Removes duplicate names, keeping the first occurrence
pub fn dedupe(files: Vec<PlannedFile>) -> Vec<PlannedFile> {
    let mut seen = HashSet::new();
    files
        .into_iter()
        .filter(|f| seen.insert(f.name.clone()))
        .collect()
}

/// Files used when no strategy produced anything, chosen by keyword
pub fn default_files(title: &str, description: &str) -> Vec<PlannedFile> {
    let haystack = format!("{} {}", title, description).to_lowercase();
    let has_any = |words: &[&str]| words.iter().any(|w| haystack.contains(w));

    let names: &[&str] = if has_any(&["web", "website", "html", "page"]) {
        &["index.html", "styles.css", "script.js"]
    } else if has_any(&["python", "script", "automation"]) {
        &["main.py", "README.md"]
    } else {
        &["main.txt", "README.md"]
    };

    names
        .iter()
        .map(|name| PlannedFile::new(*name, "Default implementation file"))
        .collect()
}

fn order_rank(name: &str) -> u8 {
    const CONFIG: [&str; 8] = [
        ".config", ".json", ".yaml", ".yml", ".toml", ".ini", "config", "settings",
    ];
    const CORE: [&str; 5] = ["main", "app", "index", "core", "engine"];

    let lower = name.to_lowercase();
    if CONFIG.iter().any(|p| lower.contains(p)) {
        0
    } else if lower.ends_with(".html") || lower.ends_with(".htm") {
        1
    } else if lower.ends_with(".css") {
        2
    } else if CORE.iter().any(|p| lower.contains(p)) {
        3
    } else {
        4
    }
}

/// Stable priority order: config, markup, styles, core files, the rest
pub fn order_files(mut files: Vec<PlannedFile>) -> Vec<PlannedFile> {
    files.sort_by_key(|f| order_rank(&f.name));
    files
}

pub(crate) fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if !name[idx..].contains('/') => name[idx..].to_lowercase(),
        _ => String::new(),
    }
}
