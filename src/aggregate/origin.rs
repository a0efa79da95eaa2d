//! Origin metadata attached to every ingested file.

use serde::Serialize;

/// Whether a matched reference is a branch or a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefType {
    Branch,
    Tag,
}

/// Describes where a file came from: repository, reference, and start
/// path, plus a template for building per-file edit URLs.
#[derive(Debug, Clone, Serialize)]
pub struct Origin {
    pub url: String,
    pub start_path: String,
    pub ref_name: String,
    pub ref_type: RefType,
    /// True when the files were read from a local working tree rather
    /// than a git tree object.
    pub worktree: bool,
    /// Edit URL template with a `%s` placeholder for the file path,
    /// present for recognized hosting domains.
    pub edit_url_pattern: Option<String>,
}

impl Origin {
    pub fn new(
        url: impl Into<String>,
        start_path: impl Into<String>,
        ref_name: impl Into<String>,
        ref_type: RefType,
        worktree: bool,
    ) -> Self {
        let url = url.into();
        let start_path = start_path.into();
        let ref_name = ref_name.into();
        let edit_url_pattern = edit_url_pattern(&url, ref_type, &ref_name, &start_path);
        Origin {
            url,
            start_path,
            ref_name,
            ref_type,
            worktree,
            edit_url_pattern,
        }
    }

    /// Edit URL for a file path relative to the start path.
    pub fn edit_url_for(&self, path: &str) -> Option<String> {
        self.edit_url_pattern
            .as_ref()
            .map(|pattern| pattern.replace("%s", path))
    }
}

/// Derives an edit URL template for recognized hosting domains. Branches
/// link to the host's edit action, tags to the read-only view.
fn edit_url_pattern(
    url: &str,
    ref_type: RefType,
    ref_name: &str,
    start_path: &str,
) -> Option<String> {
    let web_url = web_url(url)?;
    let host = web_url.strip_prefix("https://")?.split('/').next()?;
    let action = match (host, ref_type) {
        ("github.com" | "gitlab.com", RefType::Branch) => "edit",
        ("github.com" | "gitlab.com", RefType::Tag) => "blob",
        ("bitbucket.org", _) => "src",
        _ => return None,
    };
    let prefix = if start_path.is_empty() {
        String::new()
    } else {
        format!("{start_path}/")
    };
    Some(format!("{web_url}/{action}/{ref_name}/{prefix}%s"))
}

/// Normalizes a git URL to its https web form; `None` for URLs that have
/// no web form (local paths, unrecognized schemes).
fn web_url(url: &str) -> Option<String> {
    let url = url.strip_suffix(".git").unwrap_or(url);
    if let Some(rest) = url.strip_prefix("https://").or_else(|| url.strip_prefix("http://")) {
        return Some(format!("https://{rest}"));
    }
    // scp-like syntax: git@host:path
    if let Some(rest) = url.strip_prefix("git@") {
        let (host, path) = rest.split_once(':')?;
        return Some(format!("https://{host}/{path}"));
    }
    None
}
