//! Repository access: source URL classification, the content cache, and
//! opening, cloning, and fetching repositories.

use std::path::{Path, PathBuf};

use git2::{Direction, FetchOptions, FetchPrune, RemoteCallbacks, Repository};
use indicatif::{MultiProgress, ProgressBar};
use tracing::debug;

use crate::console::transfer_progress_bar;

use super::AggregateError;

/// Refspecs used for the content cache: branches land under the remote
/// namespace so cached clones keep local and remote refs distinguishable.
const CACHE_REFSPECS: [&str; 2] = [
    "+refs/heads/*:refs/remotes/origin/*",
    "+refs/tags/*:refs/tags/*",
];

/// Where a content source lives and how to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Remote URL, cloned into the content cache.
    Remote { url: String },
    /// Local clone with a working tree.
    LocalWorktree { path: PathBuf },
    /// Local bare repository.
    LocalBare { path: PathBuf },
}

impl SourceLocation {
    pub fn is_remote(&self) -> bool {
        matches!(self, SourceLocation::Remote { .. })
    }
}

/// A URL is remote when it contains a `:` followed by `//` or by anything
/// other than a slash (covering scheme and scp-like syntaxes). Everything
/// else is a filesystem path resolved against the playbook dir.
pub fn is_remote_url(url: &str) -> bool {
    match url.split_once(':') {
        Some((_, rest)) => rest.starts_with("//") || !rest.is_empty() && !rest.starts_with('/'),
        None => false,
    }
}

/// Classifies a source URL, verifying local paths exist and are clones.
pub fn classify_url(url: &str, base_dir: &Path) -> Result<SourceLocation, AggregateError> {
    if is_remote_url(url) {
        return Ok(SourceLocation::Remote {
            url: url.to_string(),
        });
    }
    let path = base_dir.join(url);
    if !path.exists() {
        return Err(AggregateError::LocalSourceMissing {
            url: url.to_string(),
        });
    }
    if path.join(".git").exists() {
        Ok(SourceLocation::LocalWorktree { path })
    } else {
        Ok(SourceLocation::LocalBare { path })
    }
}

/// Computes the cache entry for a remote URL:
/// `<basename>-<sha1(normalized url)>.git`, where normalization lowercases,
/// converts separators to posix, and strips a trailing `.git` or `/`.
pub fn cache_repo_path(cache_dir: &Path, url: &str) -> PathBuf {
    let normalized = normalize_url(url);
    let basename = normalized
        .rsplit(['/', ':'])
        .next()
        .filter(|basename| !basename.is_empty())
        .unwrap_or("repo");
    let mut sha = sha1_smol::Sha1::new();
    sha.update(normalized.as_bytes());
    cache_dir.join(format!("{basename}-{}.git", sha.digest()))
}

fn normalize_url(url: &str) -> String {
    let normalized = url.to_lowercase().replace('\\', "/");
    let normalized = normalized.trim_end_matches('/');
    normalized
        .strip_suffix(".git")
        .unwrap_or(normalized)
        .to_string()
}

/// An opened repository plus what we know about its shape.
pub struct OpenedRepository {
    pub repo: Repository,
    pub bare: bool,
    pub remote: bool,
}

/// Opens the repository behind a source location. Remote sources open the
/// cache entry (fetching when `pull` is set), cloning it first if absent
/// or unusable.
pub fn open_source(
    location: &SourceLocation,
    cache_dir: &Path,
    pull: bool,
    progress: &MultiProgress,
) -> Result<OpenedRepository, AggregateError> {
    match location {
        SourceLocation::Remote { url } => {
            let cache_path = cache_repo_path(cache_dir, url);
            match Repository::open_bare(&cache_path) {
                Ok(repo) => {
                    if pull {
                        fetch_into_cache(&repo, url, progress)?;
                    }
                    Ok(OpenedRepository {
                        repo,
                        bare: true,
                        remote: true,
                    })
                }
                Err(_) => {
                    if cache_path.exists() {
                        std::fs::remove_dir_all(&cache_path)?;
                    }
                    let repo = clone_into_cache(url, &cache_path, progress)?;
                    Ok(OpenedRepository {
                        repo,
                        bare: true,
                        remote: true,
                    })
                }
            }
        }
        SourceLocation::LocalWorktree { path } => {
            let repo = Repository::open(path).map_err(|_| AggregateError::LocalSourceNotRepo {
                url: path.display().to_string(),
            })?;
            Ok(OpenedRepository {
                repo,
                bare: false,
                remote: false,
            })
        }
        SourceLocation::LocalBare { path } => {
            let repo =
                Repository::open_bare(path).map_err(|_| AggregateError::LocalSourceNotRepo {
                    url: path.display().to_string(),
                })?;
            Ok(OpenedRepository {
                repo,
                bare: true,
                remote: false,
            })
        }
    }
}

fn clone_into_cache(
    url: &str,
    cache_path: &Path,
    progress: &MultiProgress,
) -> Result<Repository, AggregateError> {
    debug!(url, cache = %cache_path.display(), "cloning into content cache");
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let repo =
        Repository::init_bare(cache_path).map_err(|err| map_git_error(url, err))?;
    {
        let mut remote = repo
            .remote("origin", url)
            .map_err(|err| map_git_error(url, err))?;
        fetch(&repo, &mut remote, url, progress)?;
    }
    Ok(repo)
}

fn fetch_into_cache(
    repo: &Repository,
    url: &str,
    progress: &MultiProgress,
) -> Result<(), AggregateError> {
    debug!(url, "refreshing content cache");
    let mut remote = repo
        .find_remote("origin")
        .or_else(|_| repo.remote("origin", url))
        .map_err(|err| map_git_error(url, err))?;
    fetch(repo, &mut remote, url, progress)
}

fn fetch(
    repo: &Repository,
    remote: &mut git2::Remote<'_>,
    url: &str,
    progress: &MultiProgress,
) -> Result<(), AggregateError> {
    let bar = transfer_progress_bar(progress, url);
    let result = fetch_with_bar(remote, url, &bar);
    // Terminate the bar whether or not the transfer completed
    bar.finish_and_clear();
    let default_branch = result?;

    // Record the remote's current branch so HEAD-relative patterns keep
    // resolving against the cache without a network round trip.
    if let Some(short) = default_branch
        .as_deref()
        .and_then(|full| full.strip_prefix("refs/heads/"))
    {
        set_origin_head(repo, short);
    }
    Ok(())
}

fn fetch_with_bar(
    remote: &mut git2::Remote<'_>,
    url: &str,
    bar: &ProgressBar,
) -> Result<Option<String>, AggregateError> {
    // Ask the remote for its current branch before transferring anything
    let default_branch = {
        let connection = remote
            .connect_auth(Direction::Fetch, Some(remote_callbacks(bar)), None)
            .map_err(|err| map_git_error(url, err))?;
        connection
            .default_branch()
            .ok()
            .and_then(|buf| buf.as_str().map(str::to_string))
    };

    let mut options = FetchOptions::new();
    options.remote_callbacks(remote_callbacks(bar));
    options.prune(FetchPrune::On);
    remote
        .fetch(&CACHE_REFSPECS, Some(&mut options), None)
        .map_err(|err| map_git_error(url, err))?;
    Ok(default_branch)
}

fn remote_callbacks(bar: &ProgressBar) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let transfer_bar = bar.clone();
    callbacks.transfer_progress(move |stats| {
        transfer_bar.set_length(stats.total_objects() as u64);
        transfer_bar.set_position(stats.received_objects() as u64);
        true
    });
    callbacks.credentials(|_url, username_from_url, allowed| {
        if allowed.contains(git2::CredentialType::SSH_KEY) {
            git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
        } else if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
            Err(git2::Error::from_str("authentication required"))
        } else {
            git2::Cred::default()
        }
    });
    callbacks
}

fn set_origin_head(repo: &git2::Repository, short: &str) {
    let _ = repo.reference_symbolic(
        "refs/remotes/origin/HEAD",
        &format!("refs/remotes/origin/{short}"),
        true,
        "set origin HEAD",
    );
}

/// Maps a git-layer error onto the aggregation failure taxonomy by
/// inspecting its class, code, and message.
pub fn map_git_error(url: &str, err: git2::Error) -> AggregateError {
    let message = err.message().to_lowercase();
    let url = url.to_string();
    if matches!(
        err.class(),
        git2::ErrorClass::Ssh | git2::ErrorClass::Callback
    ) && (message.contains("agent") || message.contains("ssh_auth_sock"))
    {
        return AggregateError::SshAgentMissing { url };
    }
    if err.code() == git2::ErrorCode::Auth
        || message.contains("authentication")
        || message.contains("401")
        || message.contains("403")
    {
        return AggregateError::AuthRequired { url };
    }
    if message.contains("404") || message.contains("not found") {
        return AggregateError::RepoNotFound { url };
    }
    AggregateError::Git { url, source: err }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url_detection() {
        assert!(is_remote_url("https://github.com/acme/docs.git"));
        assert!(is_remote_url("git@github.com:acme/docs.git"));
        assert!(is_remote_url("ssh://git@example.org/docs.git"));
        assert!(!is_remote_url("./docs-repo"));
        assert!(!is_remote_url("../shared/docs"));
        assert!(!is_remote_url("docs-repo"));
        assert!(!is_remote_url("c:/repos/docs"));
    }

    #[test]
    fn test_missing_local_source() {
        let dir = tempfile::tempdir().unwrap();
        let result = classify_url("does-not-exist", dir.path());
        assert!(matches!(
            result,
            Err(AggregateError::LocalSourceMissing { .. })
        ));
    }

    #[test]
    fn test_local_worktree_detection() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path().join("clone")).unwrap();
        let location = classify_url("clone", dir.path()).unwrap();
        assert!(matches!(location, SourceLocation::LocalWorktree { .. }));
    }

    #[test]
    fn test_non_repo_local_path_fails_on_open() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("plain")).unwrap();
        let location = classify_url("plain", dir.path()).unwrap();
        let progress = MultiProgress::new();
        let result = open_source(&location, dir.path(), false, &progress);
        assert!(matches!(
            result,
            Err(AggregateError::LocalSourceNotRepo { .. })
        ));
    }

    #[test]
    fn test_cache_repo_path_normalization() {
        let cache = Path::new("/cache");
        let a = cache_repo_path(cache, "https://Example.org/Acme/Docs.git");
        let b = cache_repo_path(cache, "https://example.org/acme/docs/");
        let c = cache_repo_path(cache, "https://example.org/acme/docs");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(
            a.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("docs-")
        );
        assert!(a.extension().is_some_and(|ext| ext == "git"));

        let other = cache_repo_path(cache, "https://example.org/other/docs");
        assert_ne!(a, other);
    }
}
