//! Documentation data model: routes, pages and the table of contents.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::DocsError;

/// A validated route addressing one page on the documentation site.
///
/// Routes are site-relative paths such as `/llms.txt/docs/basic-usage.md`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    /// Validate and normalize a raw route string.
    ///
    /// A missing leading `/` is added. Routes that cannot name a page on the
    /// documentation site (empty, absolute URLs, whitespace, `..` segments)
    /// are reported as [`DocsError::NotFound`].
    pub fn parse(raw: &str) -> Result<Self, DocsError> {
        let trimmed = raw.trim();

        if trimmed.is_empty()
            || trimmed.contains("://")
            || trimmed.chars().any(char::is_whitespace)
            || trimmed.split('/').any(|segment| segment == "..")
        {
            return Err(DocsError::not_found(raw));
        }

        if trimmed.starts_with('/') {
            Ok(Self(trimmed.to_string()))
        } else {
            Ok(Self(format!("/{}", trimmed)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single documentation page, as fetched from upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct DocumentationPage {
    pub route: Route,
    pub content: String,
}

/// One navigable entry of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TocEntry {
    /// Section header the entry appears under, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub title: String,
    pub route: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// The full index of the documentation set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct TableOfContents {
    pub entries: Vec<TocEntry>,

    /// The index exactly as served upstream.
    #[serde(skip)]
    pub raw: String,
}

impl TableOfContents {
    /// Parse the markdown index (`llms.txt` format).
    ///
    /// `#` headers set the current section, `[title](/route): description`
    /// links become entries, and every other line is ignored. An index with
    /// no entries at all is a [`DocsError::ParseError`].
    pub fn parse(raw: &str) -> Result<Self, DocsError> {
        let mut entries: Vec<TocEntry> = Vec::new();
        let mut section = None;

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('#') {
                let header = line.trim_start_matches('#').trim();
                if !header.is_empty() {
                    section = Some(header.to_string());
                }
                continue;
            }

            if let Some((title, route, description)) = parse_link(line) {
                if entries.iter().any(|e| e.route == route) {
                    continue;
                }
                entries.push(TocEntry {
                    section: section.clone(),
                    title,
                    route,
                    description,
                });
            }
        }

        if entries.is_empty() {
            return Err(DocsError::parse(
                "index contains no [title](/route) entries",
            ));
        }

        Ok(Self {
            entries,
            raw: raw.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the index lists the given route.
    pub fn contains(&self, route: &str) -> bool {
        self.entries.iter().any(|e| e.route == route)
    }
}

/// Extract `(title, route, description)` from a `[title](/route): description` line.
fn parse_link(line: &str) -> Option<(String, String, String)> {
    let open = line.find('[')?;
    let close = open + line[open..].find("](")?;
    let title = line[open + 1..close].trim();

    let route_start = close + 2;
    let route_len = line[route_start..].find(')')?;
    let route = line[route_start..route_start + route_len].trim();

    if title.is_empty() || !route.starts_with('/') {
        return None;
    }

    let rest = line[route_start + route_len + 1..].trim_start();
    let description = rest
        .strip_prefix(':')
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    Some((title.to_string(), route.to_string(), description))
}
