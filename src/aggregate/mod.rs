//! Content aggregation: concurrent git-backed ingestion of component
//! versions.
//!
//! One blocking task runs per unique source URL so a repository is opened
//! once no matter how many sources reference it; distinct repositories
//! load in parallel. Any source failure aborts the whole aggregation; no
//! partial result is returned.

pub mod descriptor;
pub mod origin;
pub mod refs;
pub mod repository;
pub mod walk;

use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::map::Entry;
use indicatif::MultiProgress;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::console::Console;
use crate::playbook::Playbook;
use crate::version::version_compare;

pub use descriptor::{ComponentDescriptor, DESCRIPTOR_FILENAME, parse_descriptor};
pub use origin::{Origin, RefType};
pub use refs::RefPatterns;

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("Local content source does not exist: {url}")]
    LocalSourceMissing { url: String },
    #[error("Local content source is not a git repository: {url}")]
    LocalSourceNotRepo { url: String },
    #[error("Authentication required for content source: {url}")]
    AuthRequired { url: String },
    #[error("Content repository not found: {url}")]
    RepoNotFound { url: String },
    #[error("SSH agent is not available for content source: {url}")]
    SshAgentMissing { url: String },
    #[error("Invalid component descriptor in {url}: {reason}")]
    BadDescriptor { url: String, reason: String },
    #[error("Start path {start_path} does not exist in {url}")]
    StartPathMissing { url: String, start_path: String },
    #[error("I/O error during aggregation: {0}")]
    TransientIo(#[from] std::io::Error),
    #[error("git error for {url}: {source}")]
    Git { url: String, source: git2::Error },
    #[error("Aggregation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A raw file read from one origin, before classification.
#[derive(Debug, Clone)]
pub struct RawFile {
    /// Posix path relative to the walked component root.
    pub path: String,
    pub contents: Vec<u8>,
    pub origin: Arc<Origin>,
}

/// All data aggregated for one `(component, version)` pair.
#[derive(Debug, Clone)]
pub struct ComponentVersionBundle {
    pub name: String,
    pub version: String,
    pub title: Option<String>,
    pub start_page: Option<String>,
    /// Navigation files in menu order.
    pub nav: Vec<String>,
    /// Files in source-declaration order, then in-repo walk order.
    pub files: Vec<RawFile>,
}

struct ResolvedSource {
    patterns: RefPatterns,
    start_path: String,
    remote_name: String,
}

/// Aggregates all content sources of the playbook into bundles grouped by
/// `(component, version)` and sorted by name, then descending version.
pub async fn aggregate_content(
    playbook: &Playbook,
    console: &Console,
) -> Result<Vec<ComponentVersionBundle>, AggregateError> {
    let mut groups: IndexMap<String, Vec<ResolvedSource>> = IndexMap::new();
    for source in &playbook.content.sources {
        groups
            .entry(source.url.clone())
            .or_default()
            .push(ResolvedSource {
                patterns: RefPatterns {
                    branches: playbook.branch_patterns(source),
                    tags: playbook.tag_patterns(source),
                },
                start_path: source.start_path.clone().unwrap_or_default(),
                remote_name: source.remote.clone().unwrap_or_else(|| "origin".to_string()),
            });
    }

    info!(sources = playbook.content.sources.len(), repositories = groups.len(), "aggregating content");

    let cache_dir = playbook.cache_dir();
    let base_dir = playbook.dir.clone();
    let pull = playbook.runtime.pull;
    let group_count = groups.len();

    let mut join_set: JoinSet<Result<(usize, Vec<ComponentVersionBundle>), AggregateError>> =
        JoinSet::new();
    for (index, (url, sources)) in groups.into_iter().enumerate() {
        let cache_dir = cache_dir.clone();
        let base_dir = base_dir.clone();
        let multi_progress = console.multi_progress();
        join_set.spawn_blocking(move || {
            load_source_group(&url, &sources, &base_dir, &cache_dir, pull, &multi_progress)
                .map(|bundles| (index, bundles))
        });
    }

    let mut by_group: Vec<Vec<ComponentVersionBundle>> = Vec::new();
    by_group.resize_with(group_count, Vec::new);
    while let Some(joined) = join_set.join_next().await {
        let result = joined.map_err(AggregateError::from).and_then(|inner| inner);
        match result {
            Ok((index, bundles)) => by_group[index] = bundles,
            Err(err) => {
                join_set.abort_all();
                console.clear_progress();
                return Err(err);
            }
        }
    }

    Ok(merge_bundles(by_group.into_iter().flatten()))
}

/// Flattens per-origin bundles into one record per `(component, version)`:
/// scalar fields merge last-write-wins, file lists concatenate.
fn merge_bundles(
    bundles: impl IntoIterator<Item = ComponentVersionBundle>,
) -> Vec<ComponentVersionBundle> {
    let mut merged: IndexMap<String, ComponentVersionBundle> = IndexMap::new();
    for bundle in bundles {
        let key = format!("{}@{}", bundle.version, bundle.name);
        match merged.entry(key) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                if bundle.title.is_some() {
                    existing.title = bundle.title;
                }
                if bundle.start_page.is_some() {
                    existing.start_page = bundle.start_page;
                }
                if !bundle.nav.is_empty() {
                    existing.nav = bundle.nav;
                }
                existing.files.extend(bundle.files);
            }
            Entry::Vacant(entry) => {
                entry.insert(bundle);
            }
        }
    }

    let mut result: Vec<ComponentVersionBundle> = merged.into_values().collect();
    result.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| version_compare(&a.version, &b.version))
    });
    result
}

/// Loads every component version reachable from one repository URL.
fn load_source_group(
    url: &str,
    sources: &[ResolvedSource],
    base_dir: &std::path::Path,
    cache_dir: &std::path::Path,
    pull: bool,
    multi_progress: &MultiProgress,
) -> Result<Vec<ComponentVersionBundle>, AggregateError> {
    let location = repository::classify_url(url, base_dir)?;
    let opened = repository::open_source(&location, cache_dir, pull, multi_progress)?;

    let mut bundles = Vec::new();
    for source in sources {
        let origin_url = match &location {
            repository::SourceLocation::Remote { url } => url.clone(),
            _ => opened
                .repo
                .find_remote(&source.remote_name)
                .ok()
                .and_then(|remote| remote.url().map(str::to_string))
                .unwrap_or_else(|| url.to_string()),
        };

        let selected =
            refs::select_refs(&opened.repo, &source.patterns, opened.bare, opened.remote, url)?;
        debug!(url, refs = selected.len(), "matched references");

        for reference in selected {
            let walked = if reference.head_of_worktree {
                let workdir = opened.repo.workdir().map(PathBuf::from).ok_or_else(|| {
                    AggregateError::LocalSourceNotRepo {
                        url: url.to_string(),
                    }
                })?;
                let root = if source.start_path.is_empty() {
                    workdir
                } else {
                    workdir.join(&source.start_path)
                };
                if !root.is_dir() {
                    return Err(AggregateError::StartPathMissing {
                        url: url.to_string(),
                        start_path: source.start_path.clone(),
                    });
                }
                walk::walk_worktree(&root)?
            } else {
                walk::walk_tree(&opened.repo, reference.oid, &source.start_path, url)?
            };

            let bundle = into_bundle(
                walked,
                url,
                &origin_url,
                &source.start_path,
                &reference,
            )?;
            info!(
                url,
                reference = %reference.shorthand,
                component = %bundle.name,
                version = %bundle.version,
                files = bundle.files.len(),
                "loaded component version"
            );
            bundles.push(bundle);
        }
    }
    Ok(bundles)
}

fn into_bundle(
    mut walked: Vec<walk::WalkedFile>,
    url: &str,
    origin_url: &str,
    start_path: &str,
    reference: &refs::SelectedRef,
) -> Result<ComponentVersionBundle, AggregateError> {
    let position = walked
        .iter()
        .position(|file| file.path == DESCRIPTOR_FILENAME)
        .ok_or_else(|| AggregateError::BadDescriptor {
            url: url.to_string(),
            reason: format!(
                "no {DESCRIPTOR_FILENAME} at component root (ref {})",
                reference.shorthand
            ),
        })?;
    let descriptor_file = walked.remove(position);
    let descriptor = parse_descriptor(&descriptor_file.contents, url)?;

    let origin = Arc::new(Origin::new(
        origin_url,
        start_path,
        reference.shorthand.clone(),
        reference.ref_type,
        reference.head_of_worktree,
    ));

    let files = walked
        .into_iter()
        .map(|file| RawFile {
            path: file.path,
            contents: file.contents,
            origin: Arc::clone(&origin),
        })
        .collect();

    Ok(ComponentVersionBundle {
        name: descriptor.name,
        version: descriptor.version,
        title: descriptor.title,
        start_page: descriptor.start_page,
        nav: descriptor.nav,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(name: &str, version: &str, title: Option<&str>) -> ComponentVersionBundle {
        ComponentVersionBundle {
            name: name.to_string(),
            version: version.to_string(),
            title: title.map(str::to_string),
            start_page: None,
            nav: Vec::new(),
            files: Vec::new(),
        }
    }

    #[test]
    fn test_merge_groups_by_name_and_version() {
        let merged = merge_bundles([
            bundle("docs", "1.0", None),
            bundle("docs", "2.0", Some("Docs")),
            bundle("docs", "1.0", Some("Late Title")),
        ]);
        assert_eq!(merged.len(), 2);
        // Sorted by name, then descending version
        assert_eq!(merged[0].version, "2.0");
        assert_eq!(merged[1].version, "1.0");
        // Scalars merge last-write-wins
        assert_eq!(merged[1].title.as_deref(), Some("Late Title"));
    }

    #[test]
    fn test_merge_sorts_components_by_name() {
        let merged = merge_bundles([
            bundle("zoo", "1.0", None),
            bundle("api", "1.0", None),
            bundle("api", "3.0", None),
        ]);
        let order: Vec<(&str, &str)> = merged
            .iter()
            .map(|bundle| (bundle.name.as_str(), bundle.version.as_str()))
            .collect();
        assert_eq!(order, vec![("api", "3.0"), ("api", "1.0"), ("zoo", "1.0")]);
    }
}
