//! Page composition: assembling the per-page model consumed by the
//! external layout engine.
//!
//! The layout engine itself is a pure function `(layout name, model) ->
//! bytes` behind [`RenderLayout`]; this module only decides which layout
//! applies and what the model contains.

use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::catalog::{Component, ContentCatalog, File, FileId, Family};
use crate::markup::{Document, MarkupError, TreeProvider};
use crate::navigation::{NavigationCatalog, NavigationItem, NavigationTree, UrlType};
use crate::playbook::Playbook;

const FALLBACK_LAYOUT: &str = "default";
const NOT_FOUND_LAYOUT: &str = "404";

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Layout {0} not found in the UI bundle")]
    LayoutNotFound(String),
    #[error("File is not a publishable page: {0}")]
    NotAPage(String),
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error("Layout rendering failed: {0}")]
    Render(String),
}

/// The layouts available for composition, from the UI bundle.
#[derive(Debug, Clone, Default)]
pub struct UiCatalog {
    pub output_dir: PathBuf,
    pub default_layout: Option<String>,
    pub layouts: Vec<String>,
}

impl UiCatalog {
    pub fn has_layout(&self, name: &str) -> bool {
        self.layouts.iter().any(|layout| layout == name)
    }

    fn default_layout(&self) -> &str {
        self.default_layout.as_deref().unwrap_or(FALLBACK_LAYOUT)
    }
}

/// The external layout engine: a pure function from layout name and page
/// model to output bytes.
pub trait RenderLayout {
    fn render(&self, layout: &str, model: &serde_json::Value) -> Result<Vec<u8>, ComposeError>;
}

/// Site-wide model precomputed from the playbook, shared by every page.
#[derive(Debug, Clone, Serialize)]
pub struct SiteUiModel {
    pub title: Option<String>,
    /// Site URL without a trailing slash.
    pub url: Option<String>,
    /// Publish URL of the site start page.
    pub home_url: Option<String>,
    /// Components sorted alphabetically by title.
    pub components: Vec<Component>,
    pub keys: indexmap::IndexMap<String, String>,
    pub ui: UiModel,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiModel {
    pub url: String,
    pub default_layout: String,
}

/// One entry of a page's cross-version list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageVersionModel {
    pub version: String,
    pub url: String,
    /// True when this component version has no such page; the URL then
    /// falls back to the version's start page.
    pub missing: bool,
}

/// The model handed to the layout engine for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageUiModel {
    pub title: String,
    pub url: String,
    pub layout: String,
    pub content: String,
    /// `page-` attributes with the prefix stripped.
    pub attributes: indexmap::IndexMap<String, String>,
    pub component: String,
    pub version: String,
    pub module: String,
    /// All versions of this page, present when the component has more
    /// than one version.
    pub versions: Option<Vec<PageVersionModel>>,
    pub navigation: Vec<NavigationTree>,
    pub breadcrumbs: Vec<NavigationItem>,
    pub canonical_url: Option<String>,
    pub edit_url: Option<String>,
    pub home: bool,
}

/// Composes page models against a site model precomputed once.
pub struct PageComposer<'a> {
    site: SiteUiModel,
    ui: &'a UiCatalog,
    nav: &'a NavigationCatalog,
    provider: &'a dyn TreeProvider,
}

impl<'a> PageComposer<'a> {
    pub fn new(
        playbook: &Playbook,
        catalog: &ContentCatalog,
        ui: &'a UiCatalog,
        nav: &'a NavigationCatalog,
        provider: &'a dyn TreeProvider,
    ) -> Self {
        let mut components: Vec<Component> = catalog.components().cloned().collect();
        components.sort_by(|a, b| a.title.cmp(&b.title));

        let site = SiteUiModel {
            title: playbook.site.title.clone(),
            url: playbook
                .site
                .url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string()),
            home_url: catalog
                .site_start_page()
                .and_then(|file| file.publish.as_ref())
                .map(|publish| publish.url.clone()),
            components,
            keys: playbook.site.keys.clone(),
            ui: UiModel {
                url: format!(
                    "/{}",
                    ui.output_dir.to_string_lossy().trim_matches('/')
                ),
                default_layout: ui.default_layout().to_string(),
            },
        };

        PageComposer {
            site,
            ui,
            nav,
            provider,
        }
    }

    pub fn site(&self) -> &SiteUiModel {
        &self.site
    }

    /// Builds the UI model for one publishable page.
    pub fn compose(
        &self,
        file: &File,
        catalog: &ContentCatalog,
    ) -> Result<PageUiModel, ComposeError> {
        // The 404 page lives outside every component and bypasses the
        // normal model
        if file.src.component.is_empty() && file.src.stem == NOT_FOUND_LAYOUT {
            return self.compose_not_found(file, catalog);
        }

        let publish = file
            .publish
            .as_ref()
            .ok_or_else(|| ComposeError::NotAPage(file.id().to_string()))?;
        let document = self.provider.parse(file, catalog)?;

        let attributes = page_attributes(&document);
        let layout = self.resolve_layout(attributes.get("layout").map(String::as_str))?;

        let versions = page_versions(catalog, file);
        let navigation: Vec<NavigationTree> = self
            .nav
            .get_menu(&file.src.component, &file.src.version)
            .map(<[NavigationTree]>::to_vec)
            .unwrap_or_default();

        let title = document
            .title
            .clone()
            .unwrap_or_else(|| file.src.stem.clone());
        let breadcrumbs = breadcrumbs_for(&navigation, &publish.url, &title);

        let canonical_url = self.site.url.as_ref().map(|site_url| {
            let url = versions
                .as_ref()
                .map(|versions| versions[0].url.as_str())
                .unwrap_or(&publish.url);
            format!("{site_url}{url}")
        });

        Ok(PageUiModel {
            title,
            url: publish.url.clone(),
            layout,
            content: document.content,
            attributes,
            component: file.src.component.clone(),
            version: file.src.version.clone(),
            module: file.src.module.clone(),
            versions,
            navigation,
            breadcrumbs,
            canonical_url,
            edit_url: file.src.edit_url.clone(),
            home: self.site.home_url.as_deref() == Some(publish.url.as_str()),
        })
    }

    fn compose_not_found(
        &self,
        file: &File,
        catalog: &ContentCatalog,
    ) -> Result<PageUiModel, ComposeError> {
        if !self.ui.has_layout(NOT_FOUND_LAYOUT) {
            return Err(ComposeError::LayoutNotFound(NOT_FOUND_LAYOUT.to_string()));
        }
        let document = self.provider.parse(file, catalog)?;
        let attributes = page_attributes(&document);
        Ok(PageUiModel {
            title: document
                .title
                .clone()
                .unwrap_or_else(|| "Page Not Found".to_string()),
            url: file
                .publish
                .as_ref()
                .map(|publish| publish.url.clone())
                .unwrap_or_else(|| format!("/{NOT_FOUND_LAYOUT}.html")),
            layout: NOT_FOUND_LAYOUT.to_string(),
            content: document.content,
            attributes,
            component: String::new(),
            version: String::new(),
            module: String::new(),
            versions: None,
            navigation: Vec::new(),
            breadcrumbs: Vec::new(),
            canonical_url: None,
            edit_url: None,
            home: false,
        })
    }

    /// Resolves the requested layout against the UI bundle: unknown
    /// layouts fall back to the default, a missing default fails, and the
    /// 404 layout never falls back.
    fn resolve_layout(&self, requested: Option<&str>) -> Result<String, ComposeError> {
        if let Some(requested) = requested {
            if requested == NOT_FOUND_LAYOUT && !self.ui.has_layout(NOT_FOUND_LAYOUT) {
                return Err(ComposeError::LayoutNotFound(requested.to_string()));
            }
            if self.ui.has_layout(requested) {
                return Ok(requested.to_string());
            }
            warn!(layout = requested, "unknown layout, falling back to default");
        }
        let default = self.ui.default_layout();
        if self.ui.has_layout(default) {
            Ok(default.to_string())
        } else {
            Err(ComposeError::LayoutNotFound(
                requested.unwrap_or(default).to_string(),
            ))
        }
    }
}

/// `page-` attributes with the prefix stripped, in declaration order.
fn page_attributes(document: &Document) -> indexmap::IndexMap<String, String> {
    document
        .attributes
        .iter()
        .filter_map(|(name, value)| {
            name.strip_prefix("page-")
                .map(|stripped| (stripped.to_string(), value.clone()))
        })
        .collect()
}

/// All versions of this page across its component, present when the
/// component has more than one version. Versions without the page are
/// marked missing and fall back to that version's start page URL.
fn page_versions(catalog: &ContentCatalog, file: &File) -> Option<Vec<PageVersionModel>> {
    let component = catalog.get_component(&file.src.component)?;
    if component.versions.len() < 2 {
        return None;
    }

    Some(
        component
            .versions
            .iter()
            .map(|entry| {
                let id = FileId::new(
                    Family::Page,
                    file.src.component.clone(),
                    entry.version.clone(),
                    file.src.module.clone(),
                    file.src.relative.clone(),
                );
                match catalog
                    .get_by_id(&id)
                    .and_then(|other| other.publish.as_ref())
                {
                    Some(publish) => PageVersionModel {
                        version: entry.version.clone(),
                        url: publish.url.clone(),
                        missing: false,
                    },
                    None => PageVersionModel {
                        version: entry.version.clone(),
                        url: entry.url.clone(),
                        missing: true,
                    },
                }
            })
            .collect(),
    )
}

/// Depth-first search through the menu for the chain of entries ending at
/// the current page; a page absent from the navigation gets a single
/// discrete crumb from its title.
fn breadcrumbs_for(
    menu: &[NavigationTree],
    page_url: &str,
    title: &str,
) -> Vec<NavigationItem> {
    for tree in menu {
        let mut path: Vec<&NavigationItem> = Vec::new();
        if search(&tree.items, page_url, &mut path) {
            let mut chain = Vec::new();
            if tree.root {
                if let Some(content) = &tree.content {
                    let mut root = NavigationItem::discrete(content.clone());
                    root.url = tree.url.clone();
                    root.url_type = tree.url_type;
                    chain.push(root);
                }
            }
            chain.extend(path.into_iter().cloned());
            return chain;
        }
    }
    if title.is_empty() {
        Vec::new()
    } else {
        vec![NavigationItem::discrete(title)]
    }
}

fn search<'a>(
    items: &'a [NavigationItem],
    page_url: &str,
    path: &mut Vec<&'a NavigationItem>,
) -> bool {
    for item in items {
        path.push(item);
        let matches = item.url_type == Some(UrlType::Internal)
            && item
                .url
                .as_deref()
                .is_some_and(|url| normalize_url(url) == normalize_url(page_url));
        if matches || search(&item.items, page_url, path) {
            return true;
        }
        path.pop();
    }
    false
}

fn normalize_url(url: &str) -> &str {
    url.strip_suffix("index.html").unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ContentCatalog, FileSrc, HtmlExtensionStyle};
    use crate::markup::tests::StaticTreeProvider;
    use crate::markup::{Block, ListBlock, ListItem};
    use crate::navigation::build_navigation;
    use indexmap::IndexMap;

    fn ui_catalog() -> UiCatalog {
        UiCatalog {
            output_dir: PathBuf::from("_"),
            default_layout: Some("default".to_string()),
            layouts: vec!["default".to_string(), "home".to_string(), "404".to_string()],
        }
    }

    struct Fixture {
        catalog: ContentCatalog,
        provider: StaticTreeProvider,
        playbook: Playbook,
    }

    fn fixture(versions: &[&str]) -> Fixture {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        let mut provider = StaticTreeProvider::new();

        for version in versions {
            for relative in ["index.adoc", "intro.adoc"] {
                let src = FileSrc::new("docs", *version, "ROOT", Family::Page, relative);
                let mut file = File::new(src, b"= Page\ncontent\n".to_vec());
                file.path = format!("{version}/modules/ROOT/pages/{relative}");
                provider.add_document(
                    &file.path,
                    Document {
                        title: Some(format!("Title of {relative}")),
                        attributes: IndexMap::new(),
                        blocks: Vec::new(),
                        content: "<p>body</p>".to_string(),
                    },
                );
                catalog.add_file(file).unwrap();
            }
            catalog
                .add_component_version("docs", version, Some("Docs".to_string()), None)
                .unwrap();
        }

        let mut playbook = Playbook::default();
        playbook.site.title = Some("The Site".to_string());
        playbook.site.url = Some("https://docs.example.org/".to_string());
        Fixture {
            catalog,
            provider,
            playbook,
        }
    }

    fn page<'a>(catalog: &'a ContentCatalog, version: &str, relative: &str) -> &'a File {
        catalog
            .get_by_id(&FileId::new(Family::Page, "docs", version, "ROOT", relative))
            .unwrap()
    }

    #[test]
    fn test_basic_page_model() {
        let fixture = fixture(&["1.0"]);
        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let composer =
            PageComposer::new(&fixture.playbook, &fixture.catalog, &ui, &nav, &fixture.provider);

        let model = composer
            .compose(page(&fixture.catalog, "1.0", "intro.adoc"), &fixture.catalog)
            .unwrap();
        assert_eq!(model.title, "Title of intro.adoc");
        assert_eq!(model.url, "/docs/1.0/intro.html");
        assert_eq!(model.layout, "default");
        assert_eq!(model.content, "<p>body</p>");
        // Single-version component gets no version fan-out
        assert!(model.versions.is_none());
        assert_eq!(
            model.canonical_url.as_deref(),
            Some("https://docs.example.org/docs/1.0/intro.html")
        );
        // No navigation: the title becomes a discrete crumb
        assert_eq!(model.breadcrumbs, vec![NavigationItem::discrete("Title of intro.adoc")]);
    }

    #[test]
    fn test_version_fan_out_marks_missing_versions() {
        let fixture = fixture(&["1.0", "2.0"]);
        let mut catalog = fixture.catalog;
        // A page present only in 1.0
        let src = FileSrc::new("docs", "1.0", "ROOT", Family::Page, "only-old.adoc");
        let mut file = File::new(src, Vec::new());
        file.path = "1.0/modules/ROOT/pages/only-old.adoc".to_string();
        catalog.add_file(file).unwrap();
        let mut provider = fixture.provider;
        provider.add_document(
            "1.0/modules/ROOT/pages/only-old.adoc",
            Document {
                title: Some("Only Old".to_string()),
                ..Default::default()
            },
        );

        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let composer = PageComposer::new(&fixture.playbook, &catalog, &ui, &nav, &provider);

        let model = composer
            .compose(page(&catalog, "1.0", "only-old.adoc"), &catalog)
            .unwrap();
        let versions = model.versions.unwrap();
        assert_eq!(
            versions,
            vec![
                PageVersionModel {
                    version: "2.0".to_string(),
                    url: "/docs/2.0/index.html".to_string(),
                    missing: true,
                },
                PageVersionModel {
                    version: "1.0".to_string(),
                    url: "/docs/1.0/only-old.html".to_string(),
                    missing: false,
                },
            ]
        );
    }

    #[test]
    fn test_canonical_url_points_at_latest_version() {
        let fixture = fixture(&["1.0", "2.0"]);
        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let composer =
            PageComposer::new(&fixture.playbook, &fixture.catalog, &ui, &nav, &fixture.provider);

        let model = composer
            .compose(page(&fixture.catalog, "1.0", "intro.adoc"), &fixture.catalog)
            .unwrap();
        assert_eq!(
            model.canonical_url.as_deref(),
            Some("https://docs.example.org/docs/2.0/intro.html")
        );
    }

    #[test]
    fn test_layout_attribute_and_fallbacks() {
        let fixture = fixture(&["1.0"]);
        let mut provider = fixture.provider;
        let mut attributes = IndexMap::new();
        attributes.insert("page-layout".to_string(), "home".to_string());
        attributes.insert("page-team".to_string(), "docs-team".to_string());
        provider.add_document(
            "1.0/modules/ROOT/pages/intro.adoc",
            Document {
                title: Some("Intro".to_string()),
                attributes,
                ..Default::default()
            },
        );

        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let composer = PageComposer::new(&fixture.playbook, &fixture.catalog, &ui, &nav, &provider);
        let model = composer
            .compose(page(&fixture.catalog, "1.0", "intro.adoc"), &fixture.catalog)
            .unwrap();
        assert_eq!(model.layout, "home");
        assert_eq!(model.attributes.get("team").map(String::as_str), Some("docs-team"));

        // Unknown layout falls back to default
        let mut attributes = IndexMap::new();
        attributes.insert("page-layout".to_string(), "fancy".to_string());
        provider.add_document(
            "1.0/modules/ROOT/pages/intro.adoc",
            Document {
                attributes,
                ..Default::default()
            },
        );
        let composer = PageComposer::new(&fixture.playbook, &fixture.catalog, &ui, &nav, &provider);
        let model = composer
            .compose(page(&fixture.catalog, "1.0", "intro.adoc"), &fixture.catalog)
            .unwrap();
        assert_eq!(model.layout, "default");
    }

    #[test]
    fn test_missing_default_layout_fails() {
        let fixture = fixture(&["1.0"]);
        let ui = UiCatalog {
            output_dir: PathBuf::from("_"),
            default_layout: Some("default".to_string()),
            layouts: Vec::new(),
        };
        let nav = NavigationCatalog::default();
        let composer =
            PageComposer::new(&fixture.playbook, &fixture.catalog, &ui, &nav, &fixture.provider);
        let result = composer.compose(page(&fixture.catalog, "1.0", "intro.adoc"), &fixture.catalog);
        assert!(matches!(result, Err(ComposeError::LayoutNotFound(_))));
    }

    #[test]
    fn test_breadcrumbs_follow_navigation() {
        let fixture = fixture(&["1.0"]);
        let mut catalog = fixture.catalog;
        let mut provider = fixture.provider;

        // Navigation: Docs > Guides > Intro
        let nav_src = FileSrc::new("docs", "1.0", "ROOT", Family::Navigation, "nav.adoc");
        let mut nav_file = File::new(nav_src, Vec::new());
        nav_file.path = "modules/ROOT/nav.adoc".to_string();
        nav_file.nav_index = Some(0);
        catalog.add_file(nav_file).unwrap();

        let mut guides = ListItem::new("Guides");
        guides.items = vec![ListItem::new(
            r#"<a href="/docs/1.0/intro.html" class="xref page">Intro</a>"#,
        )];
        provider.add_document(
            "modules/ROOT/nav.adoc",
            Document {
                blocks: vec![Block::UnorderedList(ListBlock {
                    title: Some("Docs".to_string()),
                    items: vec![guides],
                })],
                ..Default::default()
            },
        );

        let ui = ui_catalog();
        let nav = build_navigation(&catalog, &provider).unwrap();
        let composer = PageComposer::new(&fixture.playbook, &catalog, &ui, &nav, &provider);
        let model = composer
            .compose(page(&catalog, "1.0", "intro.adoc"), &catalog)
            .unwrap();

        let crumbs: Vec<&str> = model
            .breadcrumbs
            .iter()
            .map(|item| item.content.as_str())
            .collect();
        assert_eq!(crumbs, vec!["Docs", "Guides", "Intro"]);
    }

    #[test]
    fn test_home_flag_matches_site_start_page() {
        let fixture = fixture(&["1.0"]);
        let mut catalog = fixture.catalog;
        let mut playbook = fixture.playbook;
        playbook.site.start_page = Some("docs::index".to_string());
        catalog.register_site_start_page("docs::index").unwrap();

        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let composer = PageComposer::new(&playbook, &catalog, &ui, &nav, &fixture.provider);

        let home = composer
            .compose(page(&catalog, "1.0", "index.adoc"), &catalog)
            .unwrap();
        assert!(home.home);
        let other = composer
            .compose(page(&catalog, "1.0", "intro.adoc"), &catalog)
            .unwrap();
        assert!(!other.home);
    }

    #[test]
    fn test_not_found_page_bypasses_normal_model() {
        let fixture = fixture(&["1.0"]);
        let mut catalog = fixture.catalog;
        let mut provider = fixture.provider;

        let src = FileSrc::new("", "master", "ROOT", Family::Page, "404.adoc");
        let mut file = File::new(src, Vec::new());
        file.path = "404.adoc".to_string();
        provider.add_document(
            "404.adoc",
            Document {
                title: Some("Page Not Found".to_string()),
                ..Default::default()
            },
        );
        catalog.add_file(file).unwrap();

        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let composer = PageComposer::new(&fixture.playbook, &catalog, &ui, &nav, &provider);
        let id = FileId::new(Family::Page, "", "master", "ROOT", "404.adoc");
        let model = composer
            .compose(catalog.get_by_id(&id).unwrap(), &catalog)
            .unwrap();
        assert_eq!(model.layout, "404");
        assert_eq!(model.title, "Page Not Found");
    }

    #[test]
    fn test_site_model_sorts_components_by_title() {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        for (name, title) in [("zeta", "Alpha Docs"), ("alpha", "Zulu Docs")] {
            catalog
                .add_component_version(name, "1.0", Some(title.to_string()), None)
                .unwrap();
        }
        let ui = ui_catalog();
        let nav = NavigationCatalog::default();
        let provider = StaticTreeProvider::new();
        let composer =
            PageComposer::new(&Playbook::default(), &catalog, &ui, &nav, &provider);

        let titles: Vec<&str> = composer
            .site()
            .components
            .iter()
            .map(|component| component.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Alpha Docs", "Zulu Docs"]);
    }
}
