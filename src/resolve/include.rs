//! Include target resolution.
//!
//! Include directives address either a family-proxied directory
//! (`_partials/...`, `_examples/...`) looked up within the including
//! file's module, or a path relative to the current cursor looked up by
//! physical path within the component version. Misses never abort the
//! build; the caller renders the unresolved marker inline.

use tracing::debug;

use crate::catalog::{ContentCatalog, File, FileFilter, Family};

/// Proxy prefix mapping to the partial family.
pub const PARTIALS_PROXY: &str = "_partials";
/// Proxy prefix mapping to the example family.
pub const EXAMPLES_PROXY: &str = "_examples";

/// Outcome of an include lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncludeResolution {
    Resolved {
        /// Physical path of the resolved file, the cursor for nested includes.
        path: String,
        contents: Vec<u8>,
    },
    /// The original target, for the caller to render inline.
    Unresolved { target: String },
}

/// Resolves an include target against the catalog.
pub fn resolve_include(
    target: &str,
    from: &File,
    cursor: &str,
    catalog: &ContentCatalog,
) -> IncludeResolution {
    let unresolved = || {
        debug!(target, from = %from.id(), "unresolved include target");
        IncludeResolution::Unresolved {
            target: target.to_string(),
        }
    };

    let hit = if let Some(relative) = proxy_remainder(target, PARTIALS_PROXY) {
        find_in_module(catalog, from, Family::Partial, relative)
    } else if let Some(relative) = proxy_remainder(target, EXAMPLES_PROXY) {
        find_in_module(catalog, from, Family::Example, relative)
    } else {
        let Some(path) = resolve_relative(cursor_dirname(cursor), target) else {
            return unresolved();
        };
        catalog.get_by_path(&from.src.component, &from.src.version, &path)
    };

    match hit {
        Some(file) => IncludeResolution::Resolved {
            path: file.path.clone(),
            // A page republished as a partial keeps its source on src;
            // prefer that over contents conversion may have replaced
            contents: file
                .src
                .contents
                .clone()
                .unwrap_or_else(|| file.contents.clone()),
        },
        None => unresolved(),
    }
}

fn proxy_remainder<'a>(target: &'a str, proxy: &str) -> Option<&'a str> {
    target
        .strip_prefix(proxy)
        .and_then(|rest| rest.strip_prefix('/'))
}

fn find_in_module<'a>(
    catalog: &'a ContentCatalog,
    from: &File,
    family: Family,
    relative: &str,
) -> Option<&'a File> {
    catalog
        .find_by(&FileFilter {
            component: Some(&from.src.component),
            version: Some(&from.src.version),
            module: Some(&from.src.module),
            family: Some(family),
            relative: Some(relative),
            ..Default::default()
        })
        .into_iter()
        .next()
}

fn cursor_dirname(cursor: &str) -> &str {
    cursor.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Joins `target` onto `base` and normalizes `.` and `..` segments;
/// `None` when the path escapes the component root.
fn resolve_relative(base: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = if base.is_empty() {
        Vec::new()
    } else {
        base.split('/').collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}
