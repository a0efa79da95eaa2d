//! Navigation menus built from navigation-family files.
//!
//! Every top-level unordered list in a navigation document becomes one
//! tree; the per-`(component, version)` menu holds its trees ordered by
//! the originating file's position in the descriptor's `nav` list.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::catalog::{ContentCatalog, FileFilter, Family};
use crate::markup::{Block, ListBlock, ListItem, MarkupError, TreeProvider};

static ANCHOR_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)<a\s([^>]*)>(.*?)</a>"#).unwrap());
static HREF_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).unwrap());
static CLASS_RX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"class="([^"]*)""#).unwrap());

/// How a navigation entry's URL should be treated by the template layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    Internal,
    Fragment,
    External,
}

/// One entry of a navigation tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationItem {
    pub content: String,
    pub url: Option<String>,
    pub url_type: Option<UrlType>,
    pub hash: Option<String>,
    pub items: Vec<NavigationItem>,
}

impl NavigationItem {
    /// A content-only entry with no link, as used for discrete crumbs.
    pub fn discrete(content: impl Into<String>) -> Self {
        NavigationItem {
            content: content.into(),
            url: None,
            url_type: None,
            hash: None,
            items: Vec::new(),
        }
    }
}

/// One navigation tree: a titled (or untitled) list of entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationTree {
    /// True when the list title acts as the root entry of this tree.
    pub root: bool,
    pub content: Option<String>,
    pub url: Option<String>,
    pub url_type: Option<UrlType>,
    pub order: f64,
    pub items: Vec<NavigationItem>,
}

/// Ordered menus keyed by `component:version`.
#[derive(Debug, Default)]
pub struct NavigationCatalog {
    menus: IndexMap<String, Vec<NavigationTree>>,
}

impl NavigationCatalog {
    /// Inserts a tree into the menu at the first position whose existing
    /// order is greater than or equal to the tree's order.
    pub fn add_tree(&mut self, component: &str, version: &str, tree: NavigationTree) {
        let menu = self
            .menus
            .entry(format!("{component}:{version}"))
            .or_default();
        let position = menu
            .iter()
            .position(|existing| existing.order >= tree.order)
            .unwrap_or(menu.len());
        menu.insert(position, tree);
    }

    pub fn get_menu(&self, component: &str, version: &str) -> Option<&[NavigationTree]> {
        self.menus
            .get(&format!("{component}:{version}"))
            .map(Vec::as_slice)
    }
}

/// Builds the navigation catalog from every navigation-family file.
pub fn build_navigation(
    catalog: &ContentCatalog,
    provider: &dyn TreeProvider,
) -> Result<NavigationCatalog, MarkupError> {
    let mut nav_catalog = NavigationCatalog::default();
    let nav_files = catalog.find_by(&FileFilter {
        family: Some(Family::Navigation),
        ..Default::default()
    });

    for file in nav_files {
        let document = provider.parse(file, catalog)?;
        let lists: Vec<&ListBlock> = document
            .blocks
            .iter()
            .map(|block| {
                let Block::UnorderedList(list) = block;
                list
            })
            .collect();
        if lists.is_empty() {
            debug!(file = %file.id(), "navigation file contains no list");
            continue;
        }

        let nav_index = file.nav_index.unwrap_or_default();
        let count = lists.len();
        for (offset, list) in lists.into_iter().enumerate() {
            // Later lists in the same file keep their insertion order via
            // a fractional order between this nav index and the next
            let order = if offset == 0 {
                nav_index as f64
            } else {
                round4(nav_index as f64 + offset as f64 / count as f64)
            };
            let tree = build_tree(list, order);
            nav_catalog.add_tree(&file.src.component, &file.src.version, tree);
        }
    }
    Ok(nav_catalog)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn build_tree(list: &ListBlock, order: f64) -> NavigationTree {
    let (content, url, url_type) = match &list.title {
        Some(title) => {
            let partitioned = partition_content(title);
            (Some(partitioned.content), partitioned.url, partitioned.url_type)
        }
        None => (None, None, None),
    };
    NavigationTree {
        root: list.title.is_some(),
        content,
        url,
        url_type,
        order,
        items: list.items.iter().map(build_item).collect(),
    }
}

fn build_item(item: &ListItem) -> NavigationItem {
    let partitioned = partition_content(&item.content);
    NavigationItem {
        content: partitioned.content,
        url: partitioned.url,
        url_type: partitioned.url_type,
        hash: partitioned.hash,
        items: item.items.iter().map(build_item).collect(),
    }
}

struct PartitionedContent {
    content: String,
    url: Option<String>,
    url_type: Option<UrlType>,
    hash: Option<String>,
}

/// Partitions rendered inline content on its first anchor: an anchor with
/// the `page` role is an internal entry, a `#`-target is a fragment, and
/// anything else is external. Content without an anchor carries only text.
fn partition_content(content: &str) -> PartitionedContent {
    let Some(anchor) = ANCHOR_RX.captures(content) else {
        return PartitionedContent {
            content: content.to_string(),
            url: None,
            url_type: None,
            hash: None,
        };
    };

    let attrs = anchor.get(1).map(|m| m.as_str()).unwrap_or_default();
    let text = anchor.get(2).map(|m| m.as_str()).unwrap_or_default();
    let href = HREF_RX
        .captures(attrs)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let is_page = CLASS_RX
        .captures(attrs)
        .and_then(|captures| captures.get(1))
        .is_some_and(|classes| classes.as_str().split_whitespace().any(|class| class == "page"));

    let (url, url_type, hash) = if is_page {
        match href.split_once('#') {
            Some((url, fragment)) => (
                url.to_string(),
                UrlType::Internal,
                Some(format!("#{fragment}")),
            ),
            None => (href.to_string(), UrlType::Internal, None),
        }
    } else if href.starts_with('#') {
        (href.to_string(), UrlType::Fragment, Some(href.to_string()))
    } else {
        (href.to_string(), UrlType::External, None)
    };

    PartitionedContent {
        content: text.to_string(),
        url: Some(url),
        url_type: Some(url_type),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{File, FileSrc, HtmlExtensionStyle};
    use crate::markup::Document;
    use crate::markup::tests::StaticTreeProvider;

    fn internal_anchor(url: &str, text: &str) -> String {
        format!(r#"<a href="{url}" class="xref page">{text}</a>"#)
    }

    fn nav_catalog_with(documents: Vec<(&str, usize, Document)>) -> NavigationCatalog {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        let mut provider = StaticTreeProvider::new();
        for (path, nav_index, document) in documents {
            let relative = path.rsplit('/').next().unwrap();
            let src = FileSrc::new("docs", "1.0", "ROOT", Family::Navigation, relative);
            let mut file = File::new(src, Vec::new());
            file.path = path.to_string();
            file.nav_index = Some(nav_index);
            catalog.add_file(file).unwrap();
            provider.add_document(path, document);
        }
        build_navigation(&catalog, &provider).unwrap()
    }

    fn list(title: Option<&str>, items: Vec<ListItem>) -> ListBlock {
        ListBlock {
            title: title.map(str::to_string),
            items,
        }
    }

    #[test]
    fn test_item_partitioning() {
        let partitioned =
            partition_content(&internal_anchor("/docs/1.0/intro.html#setup", "Intro"));
        assert_eq!(partitioned.content, "Intro");
        assert_eq!(partitioned.url.as_deref(), Some("/docs/1.0/intro.html"));
        assert_eq!(partitioned.url_type, Some(UrlType::Internal));
        assert_eq!(partitioned.hash.as_deref(), Some("#setup"));

        let partitioned = partition_content(r##"<a href="#section">Jump</a>"##);
        assert_eq!(partitioned.url_type, Some(UrlType::Fragment));

        let partitioned = partition_content(r#"<a href="https://example.org">Out</a>"#);
        assert_eq!(partitioned.url_type, Some(UrlType::External));
        assert_eq!(partitioned.url.as_deref(), Some("https://example.org"));

        let partitioned = partition_content("Plain section");
        assert_eq!(partitioned.content, "Plain section");
        assert!(partitioned.url.is_none());
    }

    #[test]
    fn test_tree_built_from_nested_list() {
        let mut child = ListItem::new(internal_anchor("/docs/1.0/deep.html", "Deep"));
        child.items = Vec::new();
        let mut parent = ListItem::new("Guides".to_string());
        parent.items = vec![child];

        let document = Document {
            blocks: vec![Block::UnorderedList(list(Some("Docs"), vec![parent]))],
            ..Default::default()
        };
        let nav = nav_catalog_with(vec![("modules/ROOT/nav.adoc", 0, document)]);

        let menu = nav.get_menu("docs", "1.0").unwrap();
        assert_eq!(menu.len(), 1);
        let tree = &menu[0];
        assert!(tree.root);
        assert_eq!(tree.content.as_deref(), Some("Docs"));
        assert_eq!(tree.order, 0.0);
        assert_eq!(tree.items[0].content, "Guides");
        assert!(tree.items[0].url.is_none());
        assert_eq!(
            tree.items[0].items[0].url.as_deref(),
            Some("/docs/1.0/deep.html")
        );
    }

    #[test]
    fn test_multiple_lists_get_fractional_orders() {
        let document = Document {
            blocks: vec![
                Block::UnorderedList(list(Some("First"), vec![ListItem::new("a")])),
                Block::UnorderedList(list(Some("Second"), vec![ListItem::new("b")])),
            ],
            ..Default::default()
        };
        let nav = nav_catalog_with(vec![("modules/ROOT/nav.adoc", 2, document)]);

        let menu = nav.get_menu("docs", "1.0").unwrap();
        assert_eq!(menu[0].order, 2.0);
        assert_eq!(menu[1].order, 2.5);
    }

    #[test]
    fn test_menu_ordered_across_files() {
        let first = Document {
            blocks: vec![Block::UnorderedList(list(Some("A"), vec![ListItem::new("a")]))],
            ..Default::default()
        };
        let second = Document {
            blocks: vec![Block::UnorderedList(list(Some("B"), vec![ListItem::new("b")]))],
            ..Default::default()
        };
        // Declared out of order: the nav index governs menu order
        let nav = nav_catalog_with(vec![
            ("modules/ROOT/nav-late.adoc", 1, second),
            ("modules/ROOT/nav-early.adoc", 0, first),
        ]);

        let menu = nav.get_menu("docs", "1.0").unwrap();
        let titles: Vec<&str> = menu
            .iter()
            .map(|tree| tree.content.as_deref().unwrap())
            .collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_missing_menu_is_none() {
        let nav = NavigationCatalog::default();
        assert!(nav.get_menu("docs", "1.0").is_none());
    }

    #[test]
    fn test_untitled_list_has_no_root() {
        let document = Document {
            blocks: vec![Block::UnorderedList(list(None, vec![ListItem::new("a")]))],
            ..Default::default()
        };
        let nav = nav_catalog_with(vec![("modules/ROOT/nav.adoc", 0, document)]);
        let tree = &nav.get_menu("docs", "1.0").unwrap()[0];
        assert!(!tree.root);
        assert!(tree.content.is_none());
    }

    #[test]
    fn test_listless_document_contributes_nothing() {
        let nav = nav_catalog_with(vec![("modules/ROOT/nav.adoc", 0, Document::default())]);
        assert!(nav.get_menu("docs", "1.0").is_none());
    }
}
