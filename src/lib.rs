//! docloom: a documentation site generator pipeline.
//!
//! The pipeline ingests versioned documentation components from git
//! repositories, classifies their files into a typed virtual catalog,
//! resolves cross-document references, builds navigation menus, and
//! composes per-page models for an external layout engine:
//!
//! playbook -> aggregate -> classify -> catalog -> navigation -> compose

pub mod aggregate;
pub mod catalog;
pub mod classify;
pub mod compose;
pub mod console;
pub mod markup;
pub mod navigation;
pub mod output;
pub mod page_id;
pub mod playbook;
pub mod resolve;
pub mod version;

pub use aggregate::{AggregateError, ComponentVersionBundle, aggregate_content};
pub use catalog::{
    CatalogError, Component, ContentCatalog, File, FileFilter, FileId, Family, HtmlExtensionStyle,
};
pub use classify::classify_content;
pub use compose::{ComposeError, PageComposer, PageUiModel, SiteUiModel, UiCatalog};
pub use console::Console;
pub use markup::{Document, TreeProvider};
pub use navigation::{NavigationCatalog, NavigationTree, build_navigation};
pub use page_id::{InvalidPageId, PageId, PageIdContext, parse_page_id};
pub use playbook::{Playbook, PlaybookError};
pub use resolve::resolve_page;
pub use version::version_compare;
