//! The content catalog: every classified file indexed by identity tuple,
//! plus the component/version registry derived from ingested descriptors.

pub mod file;
pub mod url;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::page_id::{InvalidPageId, PageIdContext, ROOT_MODULE, parse_page_id};
use crate::version::version_compare;

pub use file::{File, FileId, FileOut, FilePub, FileSrc, Family, is_publishable};
pub use url::{HtmlExtensionStyle, compute_out, compute_pub};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Duplicate file in catalog: {0}")]
    DuplicateFile(String),
    #[error("Duplicate version {version} for component {component}")]
    DuplicateVersion { component: String, version: String },
    #[error("Start page for {component}@{version} could not be resolved: {spec}")]
    StartPageMissing {
        component: String,
        version: String,
        spec: String,
    },
    #[error("{0}")]
    AliasConflict(String),
    #[error(transparent)]
    InvalidPageId(#[from] InvalidPageId),
}

/// One version entry of a component, in descending version order within
/// [`Component::versions`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ComponentVersion {
    pub version: String,
    pub title: Option<String>,
    pub url: String,
}

/// A named documentation component and its known versions.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Component {
    pub name: String,
    pub title: String,
    /// Publish URL of the latest version's start page.
    pub url: String,
    pub versions: Vec<ComponentVersion>,
}

impl Component {
    /// The newest version; `versions` is never empty once registered.
    pub fn latest_version(&self) -> &ComponentVersion {
        &self.versions[0]
    }
}

/// Identity tuple of the synthetic site start page alias.
fn site_start_page_id(family: Family) -> FileId {
    FileId::new(family, "", "master", ROOT_MODULE, "index.adoc")
}

/// Subset filter over `src` attributes used by [`ContentCatalog::find_by`].
#[derive(Debug, Clone, Default)]
pub struct FileFilter<'a> {
    pub component: Option<&'a str>,
    pub version: Option<&'a str>,
    pub module: Option<&'a str>,
    pub family: Option<Family>,
    pub relative: Option<&'a str>,
    pub basename: Option<&'a str>,
    pub extname: Option<&'a str>,
}

impl FileFilter<'_> {
    fn matches(&self, src: &FileSrc) -> bool {
        self.component.is_none_or(|v| src.component == v)
            && self.version.is_none_or(|v| src.version == v)
            && self.module.is_none_or(|v| src.module == v)
            && self.family.is_none_or(|v| src.family == v)
            && self.relative.is_none_or(|v| src.relative == v)
            && self.basename.is_none_or(|v| src.basename == v)
            && self.extname.is_none_or(|v| src.extname == v)
    }
}

/// Indexed catalog of components and virtual files.
///
/// Built serially from the aggregator's output; downstream stages treat it
/// as read-only.
#[derive(Debug, Default)]
pub struct ContentCatalog {
    components: IndexMap<String, Component>,
    files: IndexMap<String, File>,
    style: HtmlExtensionStyle,
}

impl ContentCatalog {
    pub fn new(style: HtmlExtensionStyle) -> Self {
        ContentCatalog {
            components: IndexMap::new(),
            files: IndexMap::new(),
            style,
        }
    }

    pub fn html_url_extension_style(&self) -> HtmlExtensionStyle {
        self.style
    }

    /// Adds a classified file, computing its output and publish mappings.
    ///
    /// Fails when another file with the same identity tuple is present.
    pub fn add_file(&mut self, mut file: File) -> Result<(), CatalogError> {
        let key = file.id().to_string();
        if self.files.contains_key(&key) {
            return Err(CatalogError::DuplicateFile(key));
        }

        let acting = self.acting_family(&file);
        let publishable = is_publishable(acting, &file.src.relative);

        if publishable && file.src.family != Family::Alias {
            file.out = Some(compute_out(&file.src, acting, self.style));
        }
        if publishable || file.src.family == Family::Navigation {
            let out = match (&file.out, file.src.family) {
                (Some(out), _) => Some(out.clone()),
                // An alias publishes through its target's family shape
                (None, Family::Alias) => Some(compute_out(&file.src, acting, self.style)),
                (None, _) => None,
            };
            file.publish = compute_pub(&file.src, out.as_ref(), acting, self.style);
        }

        self.files.insert(key, file);
        Ok(())
    }

    /// The family used for URL computation: an alias acts as the family of
    /// its target, every other file as its own.
    fn acting_family(&self, file: &File) -> Family {
        if file.src.family == Family::Alias {
            if let Some(target) = file.rel.as_ref().and_then(|id| self.get_by_id(id)) {
                return target.src.family;
            }
        }
        file.src.family
    }

    /// Registers a component version, resolving its start page URL.
    ///
    /// Versions are kept in descending order; when the new entry becomes
    /// the newest, the component title and URL roll over to it.
    pub fn add_component_version(
        &mut self,
        name: &str,
        version: &str,
        title: Option<String>,
        start_page: Option<&str>,
    ) -> Result<(), CatalogError> {
        if let Some(component) = self.components.get(name) {
            if component.versions.iter().any(|entry| entry.version == version) {
                return Err(CatalogError::DuplicateVersion {
                    component: name.to_string(),
                    version: version.to_string(),
                });
            }
        }

        let url = self.resolve_start_page_url(name, version, start_page)?;
        let entry = ComponentVersion {
            version: version.to_string(),
            title: title.clone(),
            url,
        };

        let component = self
            .components
            .entry(name.to_string())
            .or_insert_with(|| Component {
                name: name.to_string(),
                title: name.to_string(),
                url: String::new(),
                versions: Vec::new(),
            });

        let position = component
            .versions
            .iter()
            .position(|existing| version_compare(version, &existing.version).is_lt())
            .unwrap_or(component.versions.len());
        component.versions.insert(position, entry);

        if position == 0 {
            let latest = &component.versions[0];
            component.title = latest.title.clone().unwrap_or_else(|| name.to_string());
            component.url = latest.url.clone();
        }
        Ok(())
    }

    fn resolve_start_page_url(
        &self,
        name: &str,
        version: &str,
        start_page: Option<&str>,
    ) -> Result<String, CatalogError> {
        let ctx = PageIdContext::of(name, version, ROOT_MODULE);
        if let Some(spec) = start_page {
            let id = parse_page_id(spec, &ctx)?;
            let id = FileId::new(
                Family::Page,
                id.component.unwrap_or_default(),
                id.version.unwrap_or_else(|| version.to_string()),
                id.module,
                id.relative,
            );
            return self
                .get_by_id(&id)
                .and_then(|file| file.publish.as_ref())
                .map(|publish| publish.url.clone())
                .ok_or_else(|| CatalogError::StartPageMissing {
                    component: name.to_string(),
                    version: version.to_string(),
                    spec: spec.to_string(),
                });
        }

        let implicit = FileId::new(Family::Page, name, version, ROOT_MODULE, "index.adoc");
        if let Some(url) = self
            .get_by_id(&implicit)
            .and_then(|file| file.publish.as_ref())
            .map(|publish| publish.url.clone())
        {
            return Ok(url);
        }

        // No start page in this component version; synthesize the URL the
        // index page would publish at so the component entry stays usable.
        warn!(component = name, version, "start page not found, using placeholder URL");
        let src = FileSrc::new(name, version, ROOT_MODULE, Family::Page, "index.adoc");
        let out = compute_out(&src, Family::Page, self.style);
        let publish = compute_pub(&src, Some(&out), Family::Page, self.style);
        Ok(publish.map(|publish| publish.url).unwrap_or_default())
    }

    /// Registers a page alias for `target`, parsed in the target's context.
    pub fn register_page_alias(
        &mut self,
        spec: &str,
        target: &FileId,
    ) -> Result<FileId, CatalogError> {
        let ctx = PageIdContext {
            component: Some(target.component.clone()),
            version: None,
            module: Some(target.module.clone()),
        };
        let parsed = parse_page_id(spec, &ctx)?;
        let component = parsed.component.unwrap_or_default();
        let version = match parsed.version {
            Some(version) => version,
            None => match self.components.get(&component) {
                Some(existing) => existing.latest_version().version.clone(),
                None => target.version.clone(),
            },
        };

        let page_id = FileId::new(
            Family::Page,
            component.clone(),
            version.clone(),
            parsed.module.clone(),
            parsed.relative.clone(),
        );
        if let Some(existing) = self.files.get(&page_id.to_string()) {
            return Err(if existing.id() == *target {
                CatalogError::AliasConflict(format!("Page alias cannot reference itself: {page_id}"))
            } else {
                CatalogError::AliasConflict(format!(
                    "Page alias cannot reference an existing page: {page_id}"
                ))
            });
        }

        let alias_id = FileId::new(Family::Alias, component, version, parsed.module, parsed.relative);
        if self.files.contains_key(&alias_id.to_string()) {
            return Err(CatalogError::AliasConflict(format!(
                "Page alias is already registered: {alias_id}"
            )));
        }

        let src = FileSrc::new(
            alias_id.component.clone(),
            alias_id.version.clone(),
            alias_id.module.clone(),
            Family::Alias,
            alias_id.relative.clone(),
        );
        let mut alias = File::new(src, Vec::new());
        alias.rel = Some(target.clone());
        self.add_file(alias)?;
        debug!(alias = %alias_id, target = %target, "registered page alias");
        Ok(alias_id)
    }

    /// Registers the synthetic site start page alias for `spec`.
    pub fn register_site_start_page(&mut self, spec: &str) -> Result<(), CatalogError> {
        let parsed = parse_page_id(spec, &PageIdContext::default())?;
        let component = parsed.component.unwrap_or_default();
        let version = match parsed.version {
            Some(version) => version,
            None => self
                .components
                .get(&component)
                .map(|existing| existing.latest_version().version.clone())
                .unwrap_or_default(),
        };
        let target = FileId::new(Family::Page, component, version, parsed.module, parsed.relative);
        if self.get_by_id(&target).is_none() {
            return Err(CatalogError::StartPageMissing {
                component: target.component,
                version: target.version,
                spec: spec.to_string(),
            });
        }

        let alias_tuple = site_start_page_id(Family::Alias);
        let src = FileSrc::new(
            "",
            "master",
            ROOT_MODULE,
            Family::Alias,
            alias_tuple.relative.clone(),
        );
        let mut alias = File::new(src, Vec::new());
        alias.rel = Some(target);
        self.add_file(alias)
    }

    /// The canonical site start page, never an alias.
    pub fn site_start_page(&self) -> Option<&File> {
        if let Some(page) = self.get_by_id(&site_start_page_id(Family::Page)) {
            return Some(page);
        }
        let alias = self.get_by_id(&site_start_page_id(Family::Alias))?;
        alias.rel.as_ref().and_then(|id| self.get_by_id(id))
    }

    pub fn get_by_id(&self, id: &FileId) -> Option<&File> {
        self.files.get(&id.to_string())
    }

    /// Looks up a file by its physical path within a component version.
    pub fn get_by_path(&self, component: &str, version: &str, path: &str) -> Option<&File> {
        self.files.values().find(|file| {
            file.src.component == component && file.src.version == version && file.path == path
        })
    }

    /// All files whose `src` matches every provided filter field.
    pub fn find_by(&self, filter: &FileFilter<'_>) -> Vec<&File> {
        self.files
            .values()
            .filter(|file| filter.matches(&file.src))
            .collect()
    }

    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    pub fn get_component(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_page(
        component: &str,
        version: &str,
        module: &str,
        relative: &str,
    ) -> (ContentCatalog, FileId) {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        let src = FileSrc::new(component, version, module, Family::Page, relative);
        let id = src.id();
        catalog.add_file(File::new(src, b"= Title\n".to_vec())).unwrap();
        (catalog, id)
    }

    #[test]
    fn test_duplicate_file_is_rejected() {
        let (mut catalog, _) = catalog_with_page("docs", "1.0", "ROOT", "intro.adoc");
        let src = FileSrc::new("docs", "1.0", "ROOT", Family::Page, "intro.adoc");
        let result = catalog.add_file(File::new(src, Vec::new()));
        assert!(matches!(result, Err(CatalogError::DuplicateFile(_))));
    }

    #[test]
    fn test_add_file_computes_out_and_pub() {
        let (catalog, id) = catalog_with_page("docs", "1.0", "ROOT", "intro.adoc");
        let file = catalog.get_by_id(&id).unwrap();
        assert_eq!(file.out.as_ref().unwrap().path, "docs/1.0/intro.html");
        assert_eq!(file.publish.as_ref().unwrap().url, "/docs/1.0/intro.html");
    }

    #[test]
    fn test_hidden_page_gets_no_pub() {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        let src = FileSrc::new("docs", "1.0", "ROOT", Family::Page, "_drafts/wip.adoc");
        let id = src.id();
        catalog.add_file(File::new(src, Vec::new())).unwrap();
        let file = catalog.get_by_id(&id).unwrap();
        assert!(file.out.is_none());
        assert!(file.publish.is_none());
    }

    #[test]
    fn test_component_versions_sorted_descending() {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        for version in ["1.0", "2.0", "1.5", "3.0"] {
            let src = FileSrc::new("docs", version, "ROOT", Family::Page, "index.adoc");
            catalog.add_file(File::new(src, Vec::new())).unwrap();
            catalog
                .add_component_version("docs", version, None, None)
                .unwrap();
        }
        let component = catalog.get_component("docs").unwrap();
        let versions: Vec<&str> = component
            .versions
            .iter()
            .map(|entry| entry.version.as_str())
            .collect();
        assert_eq!(versions, vec!["3.0", "2.0", "1.5", "1.0"]);
        assert_eq!(component.latest_version().version, "3.0");
        assert_eq!(component.url, "/docs/3.0/index.html");
    }

    #[test]
    fn test_duplicate_version_is_rejected() {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        catalog.add_component_version("docs", "1.0", None, None).unwrap();
        let result = catalog.add_component_version("docs", "1.0", None, None);
        assert!(matches!(result, Err(CatalogError::DuplicateVersion { .. })));
    }

    #[test]
    fn test_explicit_start_page_must_resolve() {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        let result = catalog.add_component_version("docs", "1.0", None, Some("home.adoc"));
        assert!(matches!(result, Err(CatalogError::StartPageMissing { .. })));
    }

    #[test]
    fn test_missing_implicit_start_page_synthesizes_url() {
        let mut catalog = ContentCatalog::new(HtmlExtensionStyle::Default);
        catalog.add_component_version("docs", "1.0", None, None).unwrap();
        let component = catalog.get_component("docs").unwrap();
        assert_eq!(component.url, "/docs/1.0/index.html");
    }

    #[test]
    fn test_find_by_filters_on_all_given_fields() {
        let (mut catalog, _) = catalog_with_page("docs", "1.0", "ROOT", "intro.adoc");
        let src = FileSrc::new("docs", "2.0", "ROOT", Family::Page, "intro.adoc");
        catalog.add_file(File::new(src, Vec::new())).unwrap();

        let all = catalog.find_by(&FileFilter {
            component: Some("docs"),
            relative: Some("intro.adoc"),
            ..Default::default()
        });
        assert_eq!(all.len(), 2);

        let one = catalog.find_by(&FileFilter {
            component: Some("docs"),
            version: Some("2.0"),
            ..Default::default()
        });
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].src.version, "2.0");
    }

    #[test]
    fn test_register_page_alias_dereferences_to_target() {
        let (mut catalog, target) = catalog_with_page("docs", "2.0", "ROOT", "intro.adoc");
        catalog.add_component_version("docs", "2.0", None, None).unwrap();

        let alias_id = catalog.register_page_alias("2.0@docs::old-intro", &target).unwrap();
        let alias = catalog.get_by_id(&alias_id).unwrap();
        assert_eq!(alias.src.family, Family::Alias);
        assert_eq!(alias.rel.as_ref().unwrap(), &target);
        // Acting family is the target's, so the alias publishes as a page
        assert_eq!(alias.publish.as_ref().unwrap().url, "/docs/2.0/old-intro.html");

        let again = catalog.register_page_alias("2.0@docs::old-intro", &target);
        assert!(matches!(again, Err(CatalogError::AliasConflict(_))));
    }

    #[test]
    fn test_alias_missing_version_defaults_to_latest() {
        let (mut catalog, target) = catalog_with_page("docs", "1.0", "ROOT", "intro.adoc");
        let src = FileSrc::new("docs", "2.0", "ROOT", Family::Page, "index.adoc");
        catalog.add_file(File::new(src, Vec::new())).unwrap();
        catalog.add_component_version("docs", "1.0", None, None).unwrap();
        catalog.add_component_version("docs", "2.0", None, None).unwrap();

        let alias_id = catalog.register_page_alias("docs::old-intro", &target).unwrap();
        assert_eq!(alias_id.version, "2.0");
    }

    #[test]
    fn test_alias_cannot_shadow_existing_page() {
        let (mut catalog, target) = catalog_with_page("docs", "1.0", "ROOT", "intro.adoc");
        let result = catalog.register_page_alias("1.0@docs::intro", &target);
        assert!(matches!(result, Err(CatalogError::AliasConflict(_))));
    }

    #[test]
    fn test_site_start_page_never_returns_alias() {
        let (mut catalog, target) = catalog_with_page("docs", "1.0", "ROOT", "index.adoc");
        catalog.add_component_version("docs", "1.0", None, None).unwrap();
        catalog.register_site_start_page("1.0@docs::index").unwrap();

        let start = catalog.site_start_page().unwrap();
        assert_eq!(start.src.family, Family::Page);
        assert_eq!(start.id(), target);
    }
}
