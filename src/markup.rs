//! Seam to the external markup parser.
//!
//! The pipeline never parses source markup itself: it depends on a
//! [`TreeProvider`] that returns a parsed [`Document`], and it hands the
//! parser the capability interfaces [`ResolveInclude`] and
//! [`ResolvePageRef`] so include directives and inline cross-references
//! resolve against the content catalog. Only the block shapes the
//! pipeline consumes are represented here.

pub mod outline;

use indexmap::IndexMap;

use crate::catalog::{ContentCatalog, File};
use crate::resolve::{IncludeResolution, PageRefLink, resolve_include, resolve_page_ref};

pub use outline::OutlineParser;

#[derive(Debug, thiserror::Error)]
#[error("Failed to parse document {path}: {reason}")]
pub struct MarkupError {
    pub path: String,
    pub reason: String,
}

/// A parsed document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Document title, if the document declares one.
    pub title: Option<String>,
    /// Header attributes, in declaration order.
    pub attributes: IndexMap<String, String>,
    /// Top-level blocks, restricted to the kinds the pipeline consumes.
    pub blocks: Vec<Block>,
    /// Body rendered to HTML by the parser.
    pub content: String,
}

#[derive(Debug, Clone)]
pub enum Block {
    UnorderedList(ListBlock),
}

/// An unordered list block with its optional title.
#[derive(Debug, Clone, Default)]
pub struct ListBlock {
    pub title: Option<String>,
    pub items: Vec<ListItem>,
}

/// A list item: rendered inline content plus nested items.
#[derive(Debug, Clone)]
pub struct ListItem {
    /// Inline content rendered to HTML by the parser.
    pub content: String,
    pub items: Vec<ListItem>,
}

impl ListItem {
    pub fn new(content: impl Into<String>) -> Self {
        ListItem {
            content: content.into(),
            items: Vec::new(),
        }
    }
}

/// Supplies parsed documents for cataloged files.
pub trait TreeProvider {
    fn parse(&self, file: &File, catalog: &ContentCatalog) -> Result<Document, MarkupError>;
}

/// Capability handed to the parser adapter for include directives.
pub trait ResolveInclude {
    fn resolve_include(
        &self,
        target: &str,
        from: &File,
        cursor: &str,
        catalog: &ContentCatalog,
    ) -> IncludeResolution;
}

/// Capability handed to the parser adapter for inline cross-references.
pub trait ResolvePageRef {
    fn resolve_page_ref(
        &self,
        refspec: &str,
        text: Option<&str>,
        from: &File,
        catalog: &ContentCatalog,
        relativize: bool,
    ) -> PageRefLink;
}

/// The pipeline's own hook implementation, resolving against the catalog.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogHooks;

impl ResolveInclude for CatalogHooks {
    fn resolve_include(
        &self,
        target: &str,
        from: &File,
        cursor: &str,
        catalog: &ContentCatalog,
    ) -> IncludeResolution {
        resolve_include(target, from, cursor, catalog)
    }
}

impl ResolvePageRef for CatalogHooks {
    fn resolve_page_ref(
        &self,
        refspec: &str,
        text: Option<&str>,
        from: &File,
        catalog: &ContentCatalog,
        relativize: bool,
    ) -> PageRefLink {
        resolve_page_ref(refspec, text, from, catalog, relativize)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Test double returning canned documents keyed by physical path.
    #[derive(Default)]
    pub struct StaticTreeProvider {
        documents: HashMap<String, Document>,
    }

    impl StaticTreeProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_document(&mut self, path: &str, document: Document) {
            self.documents.insert(path.to_string(), document);
        }
    }

    impl TreeProvider for StaticTreeProvider {
        fn parse(&self, file: &File, _catalog: &ContentCatalog) -> Result<Document, MarkupError> {
            self.documents
                .get(&file.path)
                .cloned()
                .ok_or_else(|| MarkupError {
                    path: file.path.clone(),
                    reason: "no canned document".to_string(),
                })
        }
    }
}
