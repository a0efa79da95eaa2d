//! Inline cross-reference resolution.
//!
//! The markup parser invokes this callback for every inline xref. A spec
//! that fails to parse or resolve becomes an unresolved link carrying the
//! raw target; resolution never aborts a page conversion.

use tracing::debug;

use crate::catalog::{ContentCatalog, File};
use crate::page_id::PageIdContext;

use super::resolve_page;

/// Role the template layer uses to distinguish internal page links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Page,
    Unresolved,
}

/// A rendered cross-reference link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRefLink {
    pub target: String,
    pub text: String,
    pub role: LinkRole,
}

/// Resolves an inline cross-reference from `from` to `refspec`.
///
/// With `relativize`, the target is a path from the originating page's
/// output directory; otherwise it is the site-absolute publish URL. A
/// `#fragment` on the spec carries over to the link target. An alias
/// target is dereferenced exactly once.
pub fn resolve_page_ref(
    refspec: &str,
    text: Option<&str>,
    from: &File,
    catalog: &ContentCatalog,
    relativize: bool,
) -> PageRefLink {
    let (spec, fragment) = match refspec.split_once('#') {
        Some((spec, fragment)) => (spec, Some(fragment)),
        None => (refspec, None),
    };

    let unresolved = || {
        debug!(refspec, from = %from.id(), "unresolved cross reference");
        PageRefLink {
            target: refspec.to_string(),
            text: text.unwrap_or(refspec).to_string(),
            role: LinkRole::Unresolved,
        }
    };

    let ctx = PageIdContext::of(&from.src.component, &from.src.version, &from.src.module);
    let Ok(Some(file)) = resolve_page(spec, catalog, &ctx) else {
        return unresolved();
    };
    let Some(target_file) = dereference(file, catalog) else {
        return unresolved();
    };
    let Some(publish) = target_file.publish.as_ref() else {
        return unresolved();
    };

    let url = match (relativize, from.out.as_ref()) {
        (true, Some(out)) => relativize_url(&out.dirname, &publish.url),
        _ => publish.url.clone(),
    };
    let target = match fragment {
        Some(fragment) => format!("{url}#{fragment}"),
        None => url,
    };
    PageRefLink {
        target,
        text: text.unwrap_or(spec).to_string(),
        role: LinkRole::Page,
    }
}

/// Dereferences an alias exactly once.
fn dereference<'a>(file: &'a File, catalog: &'a ContentCatalog) -> Option<&'a File> {
    match file.rel.as_ref() {
        Some(rel) => catalog.get_by_id(rel),
        None => Some(file),
    }
}

/// Path from the directory `from_dir` to the site-absolute `to_url`.
pub fn relativize_url(from_dir: &str, to_url: &str) -> String {
    let from: Vec<&str> = if from_dir.is_empty() {
        Vec::new()
    } else {
        from_dir.split('/').collect()
    };
    let to: Vec<&str> = to_url.trim_start_matches('/').split('/').collect();
    let (to_dirs, basename) = to.split_at(to.len() - 1);

    let mut common = 0;
    while common < from.len() && common < to_dirs.len() && from[common] == to_dirs[common] {
        common += 1;
    }

    let mut parts: Vec<&str> = vec![".."; from.len() - common];
    parts.extend(&to_dirs[common..]);
    parts.push(basename[0]);
    let joined = parts.join("/");
    if joined.is_empty() {
        "./".to_string()
    } else {
        joined
    }
}
