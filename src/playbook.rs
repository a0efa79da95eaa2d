//! The playbook: the immutable input record driving a site build.
//!
//! Loaded once from a TOML file, resolved against the environment, and
//! passed by reference through the pipeline; nothing mutates it after
//! construction.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::catalog::HtmlExtensionStyle;

/// Environment variable selecting the test-suffixed default cache dir.
pub const ENV_VAR: &str = "DOCLOOM_ENV";

const DEFAULT_CACHE_DIR: &str = ".cache/docloom";

#[derive(thiserror::Error, Debug)]
pub enum PlaybookError {
    #[error("Failed to read playbook {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse playbook {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Playbook {
    pub site: SiteConfig,
    pub urls: UrlConfig,
    pub content: ContentConfig,
    pub runtime: RuntimeConfig,
    pub ui: UiConfig,
    pub asciidoc: AsciidocConfig,
    /// Base directory local source URLs resolve against.
    #[serde(skip)]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub title: Option<String>,
    pub url: Option<String>,
    pub start_page: Option<String>,
    pub keys: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UrlConfig {
    pub html_extension_style: HtmlExtensionStyle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub sources: Vec<Source>,
    /// Fallback branch patterns for sources that declare none.
    pub branches: Option<Patterns>,
    /// Fallback tag patterns for sources that declare none.
    pub tags: Option<Patterns>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Source {
    pub url: String,
    pub branches: Option<Patterns>,
    pub tags: Option<Patterns>,
    /// Directory within the repository holding the component root.
    pub start_path: Option<String>,
    /// Remote name consulted for local repositories; defaults to `origin`.
    pub remote: Option<String>,
}

impl Default for Source {
    fn default() -> Self {
        Source {
            url: String::new(),
            branches: None,
            tags: None,
            start_path: None,
            remote: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub cache_dir: Option<PathBuf>,
    pub pull: bool,
    pub quiet: bool,
    pub silent: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub output_dir: Option<PathBuf>,
    pub default_layout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AsciidocConfig {
    pub attributes: IndexMap<String, String>,
    pub extensions: Vec<PathBuf>,
}

/// Branch or tag selection patterns: a comma-separated string or a list.
/// The literal values `HEAD` and `.` name the repository's current branch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    One(String),
    Many(Vec<String>),
}

impl Patterns {
    /// Flattens into individual trimmed pattern strings.
    pub fn resolve(&self) -> Vec<String> {
        let split = |value: &str| {
            value
                .split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        match self {
            Patterns::One(value) => split(value),
            Patterns::Many(values) => values.iter().flat_map(|value| split(value)).collect(),
        }
    }
}

impl Playbook {
    /// Loads a playbook from a TOML file, resolving `dir` to the file's
    /// parent directory and the cache dir against the environment.
    pub fn load(path: &Path) -> Result<Self, PlaybookError> {
        Self::load_with_env(path, std::env::var(ENV_VAR).ok().as_deref())
    }

    /// Pure form of [`Playbook::load`]: the environment is an argument.
    pub fn load_with_env(path: &Path, env: Option<&str>) -> Result<Self, PlaybookError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PlaybookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut playbook: Playbook =
            toml::from_str(&contents).map_err(|source| PlaybookError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        playbook.dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        playbook.resolve_cache_dir(env);
        Ok(playbook)
    }

    fn resolve_cache_dir(&mut self, env: Option<&str>) {
        let cache_dir = match self.runtime.cache_dir.take() {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => self.dir.join(dir),
            None if env == Some("test") => self.dir.join(format!("{DEFAULT_CACHE_DIR}-test")),
            None => self.dir.join(DEFAULT_CACHE_DIR),
        };
        self.runtime.cache_dir = Some(cache_dir);
    }

    /// The resolved content cache directory; always set after load.
    pub fn cache_dir(&self) -> PathBuf {
        self.runtime
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.dir.join(DEFAULT_CACHE_DIR))
    }

    /// Branch patterns for a source, falling back to the content defaults.
    pub fn branch_patterns(&self, source: &Source) -> Vec<String> {
        source
            .branches
            .as_ref()
            .or(self.content.branches.as_ref())
            .map(Patterns::resolve)
            .unwrap_or_else(|| vec!["HEAD".to_string(), "v*".to_string()])
    }

    /// Tag patterns for a source, falling back to the content defaults.
    pub fn tag_patterns(&self, source: &Source) -> Vec<String> {
        source
            .tags
            .as_ref()
            .or(self.content.tags.as_ref())
            .map(Patterns::resolve)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_resolution() {
        let patterns = Patterns::One("main, v*".to_string());
        assert_eq!(patterns.resolve(), vec!["main", "v*"]);

        let patterns = Patterns::Many(vec!["main".to_string(), "v1.*,v2.*".to_string()]);
        assert_eq!(patterns.resolve(), vec!["main", "v1.*", "v2.*"]);
    }

    #[test]
    fn test_load_resolves_dir_and_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playbook.toml");
        std::fs::write(
            &path,
            r#"
[site]
title = "Docs"

[[content.sources]]
url = "https://example.org/docs.git"
"#,
        )
        .unwrap();

        let playbook = Playbook::load_with_env(&path, None).unwrap();
        assert_eq!(playbook.dir, dir.path());
        assert_eq!(playbook.cache_dir(), dir.path().join(".cache/docloom"));
        assert_eq!(playbook.site.title.as_deref(), Some("Docs"));
        assert_eq!(playbook.content.sources.len(), 1);
    }

    #[test]
    fn test_test_env_selects_suffixed_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playbook.toml");
        std::fs::write(&path, "").unwrap();

        let playbook = Playbook::load_with_env(&path, Some("test")).unwrap();
        assert_eq!(
            playbook.cache_dir(),
            dir.path().join(".cache/docloom-test")
        );
    }

    #[test]
    fn test_source_patterns_fall_back_to_content_defaults() {
        let playbook = Playbook {
            content: ContentConfig {
                sources: Vec::new(),
                branches: Some(Patterns::One("main".to_string())),
                tags: None,
            },
            ..Default::default()
        };
        let source = Source {
            url: "https://example.org/docs.git".to_string(),
            ..Default::default()
        };
        assert_eq!(playbook.branch_patterns(&source), vec!["main"]);
        assert!(playbook.tag_patterns(&source).is_empty());

        let pinned = Source {
            branches: Some(Patterns::One("v2.*".to_string())),
            ..source
        };
        assert_eq!(playbook.branch_patterns(&pinned), vec!["v2.*"]);
    }
}
