//! In-memory documentation source for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{DocsError, DocsSource, DocumentationPage, Route, TableOfContents};

pub const INDEX: &str = "\
### Concepts
- [Session Management](/docs/session): Configure session expiration and storage.
- [Cookies](/docs/cookies): Cookie options.
";

/// Serves a fixed index and page set, counting fetches.
pub struct StaticDocsSource {
    index: Result<String, DocsError>,
    pages: HashMap<String, String>,
    pub fetches: AtomicUsize,
}

impl StaticDocsSource {
    pub fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(
            "/docs/session".to_string(),
            "# Session\n\nUse `session.expiresIn` (seconds) to configure expiration.\n".to_string(),
        );
        pages.insert("/docs/cookies".to_string(), "# Cookies\n".to_string());
        Self {
            index: Ok(INDEX.to_string()),
            pages,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            index: Err(DocsError::upstream("http://docs.invalid/llms.txt", "connection failed")),
            ..Self::new()
        }
    }
}

#[async_trait]
impl DocsSource for StaticDocsSource {
    async fn list_contents(&self) -> Result<TableOfContents, DocsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let raw = self.index.clone()?;
        TableOfContents::parse(&raw)
    }

    async fn read_page(&self, route: &str) -> Result<DocumentationPage, DocsError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let route = Route::parse(route)?;
        let content = self
            .pages
            .get(route.as_str())
            .cloned()
            .ok_or_else(|| DocsError::not_found(route.as_str()))?;
        Ok(DocumentationPage { route, content })
    }
}
