//! File materialization: reading a component root out of a git tree or a
//! local working tree.
//!
//! Entries whose basename starts with `.` or has no extension are ignored
//! in both walks.

use std::path::Path;

use git2::{ObjectType, Repository, TreeWalkMode, TreeWalkResult};

use super::AggregateError;
use super::repository::map_git_error;

/// A file read out of a walked component root.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    /// Posix path relative to the walked root.
    pub path: String,
    pub contents: Vec<u8>,
}

fn is_ignored(basename: &str) -> bool {
    basename.starts_with('.') || !basename.contains('.')
}

/// Walks the tree of `commit`, rooted at `start_path` when non-empty.
pub fn walk_tree(
    repo: &Repository,
    commit: git2::Oid,
    start_path: &str,
    url: &str,
) -> Result<Vec<WalkedFile>, AggregateError> {
    let commit = repo
        .find_commit(commit)
        .map_err(|err| map_git_error(url, err))?;
    let tree = commit.tree().map_err(|err| map_git_error(url, err))?;
    let root = if start_path.is_empty() {
        tree
    } else {
        let entry = tree.get_path(Path::new(start_path)).map_err(|_| {
            AggregateError::StartPathMissing {
                url: url.to_string(),
                start_path: start_path.to_string(),
            }
        })?;
        entry
            .to_object(repo)
            .ok()
            .and_then(|object| object.into_tree().ok())
            .ok_or_else(|| AggregateError::StartPathMissing {
                url: url.to_string(),
                start_path: start_path.to_string(),
            })?
    };

    let mut files = Vec::new();
    let mut walk_error = None;
    root.walk(TreeWalkMode::PreOrder, |dir, entry| {
        let Some(name) = entry.name() else {
            return TreeWalkResult::Skip;
        };
        if name.starts_with('.') {
            return TreeWalkResult::Skip;
        }
        match entry.kind() {
            Some(ObjectType::Blob) => {
                if is_ignored(name) {
                    return TreeWalkResult::Ok;
                }
                match entry.to_object(repo).and_then(|object| {
                    object
                        .into_blob()
                        .map_err(|_| git2::Error::from_str("expected blob"))
                }) {
                    Ok(blob) => {
                        files.push(WalkedFile {
                            path: format!("{dir}{name}"),
                            contents: blob.content().to_vec(),
                        });
                        TreeWalkResult::Ok
                    }
                    Err(err) => {
                        walk_error = Some(err);
                        TreeWalkResult::Abort
                    }
                }
            }
            _ => TreeWalkResult::Ok,
        }
    })
    .map_err(|err| map_git_error(url, err))?;

    if let Some(err) = walk_error {
        return Err(map_git_error(url, err));
    }
    Ok(files)
}

/// Walks a working tree directory on the filesystem.
pub fn walk_worktree(root: &Path) -> Result<Vec<WalkedFile>, AggregateError> {
    let mut files = Vec::new();
    walk_dir(root, "", &mut files)?;
    Ok(files)
}

fn walk_dir(
    dir: &Path,
    prefix: &str,
    files: &mut Vec<WalkedFile>,
) -> Result<(), AggregateError> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        let relative = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        if path.is_dir() {
            walk_dir(&path, &relative, files)?;
        } else if !is_ignored(name) {
            files.push(WalkedFile {
                path: relative,
                contents: std::fs::read(&path)?,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worktree_walk_ignores_hidden_and_extensionless() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("modules/ROOT/pages")).unwrap();
        std::fs::write(root.join("docloom.yml"), "name: docs\nversion: '1.0'\n").unwrap();
        std::fs::write(root.join("modules/ROOT/pages/index.adoc"), "= Index\n").unwrap();
        std::fs::write(root.join("modules/ROOT/pages/.hidden.adoc"), "").unwrap();
        std::fs::write(root.join("LICENSE"), "").unwrap();
        std::fs::create_dir(root.join(".git-like")).unwrap();
        std::fs::write(root.join(".git-like/config.adoc"), "").unwrap();

        let files = walk_worktree(root).unwrap();
        let paths: Vec<&str> = files.iter().map(|file| file.path.as_str()).collect();
        assert_eq!(paths, vec!["docloom.yml", "modules/ROOT/pages/index.adoc"]);
    }
}
