//! Content classification: assigning a family to every raw file by path
//! convention and building the indexed catalog.
//!
//! Files inside a component root are expected to follow the layout
//! `modules/<module>/<kind>/...`; anything that does not match a known
//! kind is discarded silently. Files listed in the component descriptor's
//! `nav` list classify as navigation regardless of their location.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::aggregate::{ComponentVersionBundle, RawFile};
use crate::catalog::{CatalogError, ContentCatalog, Family, File, FileSrc};
use crate::page_id::ROOT_MODULE;
use crate::playbook::Playbook;

/// Classifies aggregated bundles into a content catalog, registering each
/// component version and, when configured, the site start page.
pub fn classify_content(
    playbook: &Playbook,
    bundles: Vec<ComponentVersionBundle>,
) -> Result<ContentCatalog, CatalogError> {
    let mut catalog = ContentCatalog::new(playbook.urls.html_extension_style);

    for bundle in bundles {
        let nav_indices: HashMap<&str, usize> = bundle
            .nav
            .iter()
            .enumerate()
            .map(|(index, path)| (path.as_str(), index))
            .collect();

        let mut classified = 0usize;
        for raw in &bundle.files {
            if let Some(file) = classify_file(raw, &bundle.name, &bundle.version, &nav_indices) {
                catalog.add_file(file)?;
                classified += 1;
            } else {
                debug!(
                    component = %bundle.name,
                    version = %bundle.version,
                    path = %raw.path,
                    "discarding unclassifiable file"
                );
            }
        }
        info!(
            component = %bundle.name,
            version = %bundle.version,
            files = classified,
            "classified component version"
        );

        catalog.add_component_version(
            &bundle.name,
            &bundle.version,
            bundle.title.clone(),
            bundle.start_page.as_deref(),
        )?;
    }

    if let Some(start_page) = playbook.site.start_page.as_deref() {
        catalog.register_site_start_page(start_page)?;
    }
    Ok(catalog)
}

/// Classifies one raw file, or `None` when its path matches no convention.
fn classify_file(
    raw: &RawFile,
    component: &str,
    version: &str,
    nav_indices: &HashMap<&str, usize>,
) -> Option<File> {
    let (family, module, relative, nav_index) = match nav_indices.get(raw.path.as_str()) {
        Some(&index) => {
            let (module, relative) =
                split_module(&raw.path).unwrap_or((ROOT_MODULE, raw.path.as_str()));
            (Family::Navigation, module, relative, Some(index))
        }
        None => {
            let (module, rest) = split_module(&raw.path)?;
            let (family, relative) = classify_kind(rest)?;
            (family, module, relative, None)
        }
    };

    let mut src = FileSrc::new(component, version, module, family, relative);
    src.module_root_path = module_root_path(&raw.path, module);
    src.edit_url = raw.origin.edit_url_for(&raw.path);
    src.origin = Some(raw.origin.clone());
    if family == Family::Page {
        // Keep the page source around: conversion may replace the file
        // contents, and includes of republished pages read the source
        src.contents = Some(raw.contents.clone());
    }

    let mut file = File::new(src, raw.contents.clone());
    file.path = raw.path.clone();
    file.nav_index = nav_index;
    Some(file)
}

/// Splits `modules/<module>/rest` into module name and remainder.
fn split_module(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("modules/")?;
    let (module, rest) = rest.split_once('/')?;
    if module.is_empty() {
        return None;
    }
    Some((module, rest))
}

/// Maps the in-module path to a family and the family-relative path.
fn classify_kind(rest: &str) -> Option<(Family, &str)> {
    if let Some(relative) = rest.strip_prefix("pages/_partials/") {
        return Some((Family::Partial, relative));
    }
    if let Some(relative) = rest.strip_prefix("partials/") {
        return Some((Family::Partial, relative));
    }
    if let Some(relative) = rest.strip_prefix("pages/") {
        return Some((Family::Page, relative));
    }
    if let Some(relative) = rest.strip_prefix("assets/images/") {
        return Some((Family::Image, relative));
    }
    if let Some(relative) = rest.strip_prefix("assets/attachments/") {
        return Some((Family::Attachment, relative));
    }
    if let Some(relative) = rest.strip_prefix("examples/") {
        return Some((Family::Example, relative));
    }
    None
}

/// Walk from the file's directory back to the module root, as `..`
/// segments. Input is the full in-repo path and the module name.
fn module_root_path(path: &str, module: &str) -> String {
    let in_module = path
        .strip_prefix("modules/")
        .and_then(|rest| rest.strip_prefix(module))
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path);
    let depth = in_module.matches('/').count();
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}
