//! Reference selection: matching branches and tags against the patterns a
//! source declares.

use git2::Repository;
use glob::Pattern;
use tracing::debug;

use super::AggregateError;
use super::origin::RefType;
use super::repository::map_git_error;

/// Resolved branch and tag patterns for one source.
///
/// Each entry is a glob; an entry prefixed with `!` subtracts previously
/// matched names, in declaration order. The literals `HEAD` and `.` name
/// the repository's current branch and apply to branches only.
#[derive(Debug, Clone)]
pub struct RefPatterns {
    pub branches: Vec<String>,
    pub tags: Vec<String>,
}

/// A reference matched by the selection patterns.
#[derive(Debug)]
pub struct SelectedRef {
    pub shorthand: String,
    pub ref_type: RefType,
    pub oid: git2::Oid,
    /// True when this ref is the checked-out HEAD of a local clone, in
    /// which case files come from the working tree.
    pub head_of_worktree: bool,
}

struct Candidate {
    shorthand: String,
    oid: git2::Oid,
    remote_tracking: bool,
}

/// Enumerates references and returns those matching the patterns.
///
/// A branch present as both a local and a remote-tracking ref counts
/// once: bare repositories prefer the remote-tracking side, working
/// clones the local side.
pub fn select_refs(
    repo: &Repository,
    patterns: &RefPatterns,
    bare: bool,
    remote: bool,
    url: &str,
) -> Result<Vec<SelectedRef>, AggregateError> {
    let current_branch = current_branch_shorthand(repo, bare);
    let branch_patterns = expand_head_patterns(&patterns.branches, current_branch.as_deref());
    let tag_patterns: Vec<String> = patterns
        .tags
        .iter()
        // HEAD and . are only meaningful for branches
        .filter(|pattern| pattern.as_str() != "HEAD" && pattern.as_str() != ".")
        .cloned()
        .collect();

    let mut branches: Vec<Candidate> = Vec::new();
    let mut tags: Vec<Candidate> = Vec::new();

    let references = repo.references().map_err(|err| map_git_error(url, err))?;
    for reference in references {
        let reference = reference.map_err(|err| map_git_error(url, err))?;
        let Some(name) = reference.name() else {
            continue;
        };

        let (shorthand, remote_tracking, tag) = if let Some(rest) =
            name.strip_prefix("refs/heads/")
        {
            (rest.to_string(), false, false)
        } else if let Some(rest) = name.strip_prefix("refs/remotes/origin/") {
            if rest == "HEAD" {
                continue;
            }
            (rest.to_string(), true, false)
        } else if let Some(rest) = name.strip_prefix("refs/tags/") {
            (rest.to_string(), false, true)
        } else {
            continue;
        };

        let Ok(oid) = reference.peel_to_commit().map(|commit| commit.id()) else {
            debug!(reference = name, "skipping unpeelable reference");
            continue;
        };

        let candidate = Candidate {
            shorthand,
            oid,
            remote_tracking,
        };
        if tag {
            if matches_patterns(&candidate.shorthand, &tag_patterns) {
                tags.push(candidate);
            }
        } else if matches_patterns(&candidate.shorthand, &branch_patterns) {
            branches.push(candidate);
        }
    }

    let mut selected: Vec<SelectedRef> = Vec::new();
    for candidate in branches {
        // De-duplicate local vs remote-tracking refs for the same branch
        let duplicate = selected
            .iter()
            .position(|existing| existing.shorthand == candidate.shorthand);
        let keep_incoming = candidate.remote_tracking == bare;
        match duplicate {
            Some(index) if keep_incoming => {
                selected[index] = to_selected(candidate, bare, remote, &current_branch);
            }
            Some(_) => {}
            None => selected.push(to_selected(candidate, bare, remote, &current_branch)),
        }
    }
    for candidate in tags {
        selected.push(SelectedRef {
            shorthand: candidate.shorthand,
            ref_type: RefType::Tag,
            oid: candidate.oid,
            head_of_worktree: false,
        });
    }
    Ok(selected)
}

fn to_selected(
    candidate: Candidate,
    bare: bool,
    remote: bool,
    current_branch: &Option<String>,
) -> SelectedRef {
    let head_of_worktree = !bare
        && !remote
        && current_branch.as_deref() == Some(candidate.shorthand.as_str())
        && !candidate.remote_tracking;
    SelectedRef {
        shorthand: candidate.shorthand,
        ref_type: RefType::Branch,
        oid: candidate.oid,
        head_of_worktree,
    }
}

/// The shorthand of the repository's current branch: HEAD for working
/// clones, the recorded `origin/HEAD` for cache entries.
pub fn current_branch_shorthand(repo: &Repository, bare: bool) -> Option<String> {
    if !bare {
        return repo
            .head()
            .ok()
            .and_then(|head| head.shorthand().map(str::to_string));
    }
    repo.find_reference("refs/remotes/origin/HEAD")
        .ok()
        .and_then(|reference| {
            reference
                .symbolic_target()
                .and_then(|target| target.rsplit('/').next())
                .map(str::to_string)
        })
        .or_else(|| {
            repo.head()
                .ok()
                .and_then(|head| head.shorthand().map(str::to_string))
        })
}

fn expand_head_patterns(patterns: &[String], current_branch: Option<&str>) -> Vec<String> {
    patterns
        .iter()
        .filter_map(|pattern| match pattern.as_str() {
            "HEAD" | "." => current_branch.map(str::to_string),
            "!HEAD" | "!." => current_branch.map(|branch| format!("!{branch}")),
            _ => Some(pattern.clone()),
        })
        .collect()
}

/// Evaluates glob patterns in declaration order; `!`-prefixed patterns
/// subtract from the match set.
fn matches_patterns(name: &str, patterns: &[String]) -> bool {
    let mut matched = false;
    for pattern in patterns {
        if let Some(negated) = pattern.strip_prefix('!') {
            if glob_matches(negated, name) {
                matched = false;
            }
        } else if glob_matches(pattern, name) {
            matched = true;
        }
    }
    matched
}

fn glob_matches(pattern: &str, name: &str) -> bool {
    Pattern::new(pattern).is_ok_and(|pattern| pattern.matches(name))
}
