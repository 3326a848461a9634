//! Per-adapter cache of loaded template bodies.
//!
//! Bodies are read from disk the first time a template is used and kept for
//! the lifetime of the adapter. There is no eviction and no invalidation;
//! template files are expected not to change while the process runs.
//!
//! The lock is never held across a load. Two sends racing on the same cold
//! template may both read the file; the later write wins and both store the
//! same content.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::MailError;
use crate::loader::TemplateLoader;

/// Which body of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// Plain-text body
    Text,
    /// HTML body
    Html,
}

impl BodyKind {
    fn as_str(self) -> &'static str {
        match self {
            BodyKind::Text => "text",
            BodyKind::Html => "html",
        }
    }
}

/// Loaded bodies for one template.
#[derive(Debug, Clone, Default)]
pub struct CachedBody {
    /// Plain-text body, once loaded
    pub text: Option<Arc<str>>,
    /// HTML body, once loaded
    pub html: Option<Arc<str>>,
}

impl CachedBody {
    fn get(&self, kind: BodyKind) -> Option<&Arc<str>> {
        match kind {
            BodyKind::Text => self.text.as_ref(),
            BodyKind::Html => self.html.as_ref(),
        }
    }

    fn slot(&mut self, kind: BodyKind) -> &mut Option<Arc<str>> {
        match kind {
            BodyKind::Text => &mut self.text,
            BodyKind::Html => &mut self.html,
        }
    }
}

/// Template body cache keyed by template name.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: RwLock<HashMap<String, CachedBody>>,
}

impl RenderCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached body, loading it through `loader` on a miss.
    pub async fn get_or_load(
        &self,
        template: &str,
        kind: BodyKind,
        path: &Path,
        loader: &dyn TemplateLoader,
    ) -> Result<Arc<str>, MailError> {
        if let Some(body) = self.get(template, kind) {
            tracing::debug!(template, kind = kind.as_str(), "Template cache hit");
            return Ok(body);
        }

        tracing::debug!(template, kind = kind.as_str(), "Template cache miss");
        let bytes = loader.load(path).await?;
        let body: Arc<str> = String::from_utf8(bytes)
            .map_err(|e| MailError::TemplateLoad {
                path: path.display().to_string(),
                message: format!("not valid UTF-8: {}", e),
            })?
            .into();

        {
            let mut entries = self.entries.write();
            *entries.entry(template.to_string()).or_default().slot(kind) =
                Some(Arc::clone(&body));
        }

        Ok(body)
    }

    /// Get a cached body without loading.
    pub fn get(&self, template: &str, kind: BodyKind) -> Option<Arc<str>> {
        self.entries
            .read()
            .get(template)
            .and_then(|entry| entry.get(kind))
            .cloned()
    }

    /// Whether a body is cached.
    pub fn contains(&self, template: &str, kind: BodyKind) -> bool {
        self.get(template, kind).is_some()
    }

    /// Number of templates with at least one cached body.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
