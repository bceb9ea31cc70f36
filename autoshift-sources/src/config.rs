//! Declarative source definitions.
//!
//! Each source is one YAML document describing where its codes live on the
//! page. The crate bundles definitions for the sites it knows; a directory of
//! `*.yaml` files can add more or replace a bundled one with the same `id`.

use std::path::Path;

use autoshift_core::Game;
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// How a page lays out its codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One code per `<tr>`, fields in columns.
    #[default]
    Table,
    /// One code per `<li>`, fields embedded in the item text.
    List,
}

/// Visual cue used to pre-mark a scraped code as expired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintStrategy {
    #[default]
    Strikethrough,
    None,
}

/// One "region relevant to game X" on the page.
///
/// Exactly one of `heading`, `heading_id` or `index` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Case-insensitive substring of the nearest preceding heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    /// `id` attribute of the nearest preceding heading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_id: Option<String>,
    /// Zero-based position among the page's tables (or lists).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Game label for every row in the region. When absent, the heading text
    /// is used instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
}

/// Borrowed view of a section's single locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator<'a> {
    Heading(&'a str),
    HeadingId(&'a str),
    Index(usize),
}

impl std::fmt::Display for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Heading(text) => write!(f, "heading \"{text}\""),
            Self::HeadingId(id) => write!(f, "heading #{id}"),
            Self::Index(i) => write!(f, "index {i}"),
        }
    }
}

impl Section {
    pub fn locator(&self) -> Option<Locator<'_>> {
        match (&self.heading, &self.heading_id, self.index) {
            (Some(text), None, None) => Some(Locator::Heading(text)),
            (None, Some(id), None) => Some(Locator::HeadingId(id)),
            (None, None, Some(i)) => Some(Locator::Index(i)),
            _ => None,
        }
    }
}

/// Where one field lives in a table row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Header cell texts (case-insensitive substrings) that identify the column.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Column index used when no header matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Column {
    fn headers(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            index: None,
        }
    }
}

/// Column-to-field mapping for table layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub code: Column,
    pub reward: Column,
    pub expires: Column,
    pub archived: Column,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            code: Column::headers(&["shift code", "code"]),
            reward: Column::headers(&["reward", "unlock"]),
            expires: Column::headers(&["expire", "expiration", "expiry", "valid until"]),
            archived: Column::headers(&["added", "archived", "released"]),
        }
    }
}

/// A single configured source page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub url: String,
    /// Credit line for the published file's metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
    #[serde(default)]
    pub layout: Layout,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub columns: ColumnMap,
    #[serde(default)]
    pub expired_hint: HintStrategy,
}

impl SourceConfig {
    /// Check locators and map every configured game label.
    ///
    /// Runs before any row is produced so a bad label fails the whole source.
    pub fn validate(&self) -> Result<(), SourceError> {
        if self.sections.is_empty() {
            return Err(SourceError::config(&self.id, "no sections configured"));
        }
        for (i, section) in self.sections.iter().enumerate() {
            if section.locator().is_none() {
                return Err(SourceError::config(
                    &self.id,
                    format!("section {i} must set exactly one of heading, heading_id or index"),
                ));
            }
            if let Some(label) = &section.game {
                Game::from_label(label).map_err(|e| SourceError::config(&self.id, e.to_string()))?;
            }
        }
        Ok(())
    }
}

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("mentalmars-bl4.yaml", include_str!("../sources/mentalmars-bl4.yaml")),
    ("mentalmars-bl3.yaml", include_str!("../sources/mentalmars-bl3.yaml")),
    ("mentalmars-bl2.yaml", include_str!("../sources/mentalmars-bl2.yaml")),
    ("mentalmars-blps.yaml", include_str!("../sources/mentalmars-blps.yaml")),
    ("mentalmars-ttw.yaml", include_str!("../sources/mentalmars-ttw.yaml")),
    ("mentalmars-bl1.yaml", include_str!("../sources/mentalmars-bl1.yaml")),
    ("polygon-bl4.yaml", include_str!("../sources/polygon-bl4.yaml")),
];

/// Source definitions bundled with the crate.
pub fn builtin_sources() -> Result<Vec<SourceConfig>, SourceError> {
    BUILTIN_SOURCES
        .iter()
        .map(|(name, contents)| {
            serde_yml::from_str(contents).map_err(|e| SourceError::Parse {
                path: format!("<builtin>/{name}"),
                source: e,
            })
        })
        .collect()
}

/// Load all source definitions from YAML files in a directory.
///
/// Each `.yaml` file should contain a single `SourceConfig`. A missing
/// directory yields an empty list.
pub fn load_sources_dir(dir: &Path) -> Result<Vec<SourceConfig>, SourceError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(SourceError::DirNotFound(dir.display().to_string()));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(|e| SourceError::Io {
            path: dir.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml")
        })
        .collect();
    entries.sort_by_key(|e| e.file_name());

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.path();
        let contents = std::fs::read_to_string(&path).map_err(|e| SourceError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let source: SourceConfig =
            serde_yml::from_str(&contents).map_err(|e| SourceError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        sources.push(source);
    }
    Ok(sources)
}

/// Bundled sources, overlaid with any found in `extra_dir`.
///
/// A definition whose `id` matches a bundled one replaces it in place; new
/// ids are appended in file-name order.
pub fn resolve_sources(extra_dir: Option<&Path>) -> Result<Vec<SourceConfig>, SourceError> {
    let mut sources = builtin_sources()?;
    let Some(dir) = extra_dir else {
        return Ok(sources);
    };
    for extra in load_sources_dir(dir)? {
        match sources.iter_mut().find(|s| s.id == extra.id) {
            Some(existing) => {
                log::debug!("Source '{}' overridden from {}", extra.id, dir.display());
                *existing = extra;
            }
            None => sources.push(extra),
        }
    }
    Ok(sources)
}
