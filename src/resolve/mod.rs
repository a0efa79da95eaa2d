//! Resolution of contextual references against the content catalog.

pub mod include;
pub mod xref;

use crate::catalog::{ContentCatalog, File, FileId, Family};
use crate::page_id::{InvalidPageId, PageIdContext, parse_page_id};

pub use include::{IncludeResolution, resolve_include};
pub use xref::{LinkRole, PageRefLink, resolve_page_ref};

/// Resolves a contextual page spec to a file in the catalog.
///
/// A spec without a version resolves against the component's latest
/// version. The result may be a page or an alias; the caller decides
/// whether to dereference. `Ok(None)` means the spec was well formed but
/// nothing matched.
pub fn resolve_page<'a>(
    spec: &str,
    catalog: &'a ContentCatalog,
    ctx: &PageIdContext,
) -> Result<Option<&'a File>, InvalidPageId> {
    let id = parse_page_id(spec, ctx)?;
    let Some(component) = id.component else {
        return Ok(None);
    };
    let version = match id.version {
        Some(version) => version,
        None => match catalog.get_component(&component) {
            Some(existing) => existing.latest_version().version.clone(),
            None => return Ok(None),
        },
    };

    let page = FileId::new(
        Family::Page,
        component.clone(),
        version.clone(),
        id.module.clone(),
        id.relative.clone(),
    );
    if let Some(file) = catalog.get_by_id(&page) {
        return Ok(Some(file));
    }
    let alias = FileId::new(Family::Alias, component, version, id.module, id.relative);
    Ok(catalog.get_by_id(&alias))
}
