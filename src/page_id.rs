//! Contextual page ID parsing.
//!
//! A page spec has the shape `[version@][component:][module:]relative[.ext]`.
//! Segments left out of the spec fall back to the supplied context, except
//! that naming a component without a module pins the module to `ROOT`.

use std::sync::LazyLock;

use regex::Regex;

/// Default module name when a component is named without a module.
pub const ROOT_MODULE: &str = "ROOT";

/// Source markup extension appended to the parsed relative path.
pub const PAGE_EXT: &str = ".adoc";

static PAGE_ID_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^@:]+)@)?(?:(?:([^@:]+):)?([^@:]+)?:)?([^@:]+)$").unwrap()
});

#[derive(Debug, thiserror::Error)]
#[error("Invalid page ID spec: {spec}")]
pub struct InvalidPageId {
    pub spec: String,
}

/// A fully qualified page identity produced by [`parse_page_id`].
///
/// `component` and `version` stay `None` when neither the spec nor the
/// context supplies them; the caller decides how to resolve those (the
/// page resolver falls back to the component's latest version).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageId {
    pub component: Option<String>,
    pub version: Option<String>,
    pub module: String,
    pub relative: String,
}

/// Resolution context for the segments a spec leaves out.
#[derive(Debug, Clone, Default)]
pub struct PageIdContext {
    pub component: Option<String>,
    pub version: Option<String>,
    pub module: Option<String>,
}

impl PageIdContext {
    /// Context of an existing file's identity tuple.
    pub fn of(component: &str, version: &str, module: &str) -> Self {
        Self {
            component: Some(component.to_string()),
            version: Some(version.to_string()),
            module: Some(module.to_string()),
        }
    }
}

/// Parses a contextual page spec into a [`PageId`].
///
/// A single qualifier segment binds as the module (`mod:topic/page`); two
/// segments bind as component and module (`comp:mod:topic/page`), where an
/// empty module (`comp::topic/page`) selects `ROOT`. The markup extension
/// is optional on the spec and always present on the parsed relative path.
pub fn parse_page_id(spec: &str, ctx: &PageIdContext) -> Result<PageId, InvalidPageId> {
    let captures = PAGE_ID_RX.captures(spec).ok_or_else(|| InvalidPageId {
        spec: spec.to_string(),
    })?;

    let version = captures.get(1).map(|m| m.as_str().to_string());
    let component = captures.get(2).map(|m| m.as_str().to_string());
    let module = captures.get(3).map(|m| m.as_str().to_string());
    let path = captures.get(4).map(|m| m.as_str()).unwrap_or_default();

    let module = match (&component, module) {
        (Some(_), None) => ROOT_MODULE.to_string(),
        (_, Some(module)) => module,
        (None, None) => ctx.module.clone().unwrap_or_else(|| ROOT_MODULE.to_string()),
    };
    let component = component.or_else(|| ctx.component.clone());
    let version = version.or_else(|| ctx.version.clone());

    let relative = format!("{}{}", path.strip_suffix(PAGE_EXT).unwrap_or(path), PAGE_EXT);

    Ok(PageId {
        component,
        version,
        module,
        relative,
    })
}
