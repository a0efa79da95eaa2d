//! Output seam: writing composed pages beneath the site output directory.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compose::{ComposeError, RenderLayout};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Refusing to write outside the output directory: {0}")]
    PathEscape(String),
}

/// Writes page bytes at their computed output paths.
#[derive(Debug)]
pub struct PageWriter {
    base_path: PathBuf,
}

impl PageWriter {
    pub fn new(base_path: PathBuf) -> Result<Self, OutputError> {
        if !base_path.exists() {
            std::fs::create_dir_all(&base_path)?;
        }
        Ok(Self { base_path })
    }

    /// Writes `contents` at `out_path` (the file's computed output path,
    /// posix-relative) under the output directory.
    pub fn write_page(&self, out_path: &str, contents: &[u8]) -> Result<PathBuf, OutputError> {
        if out_path.split('/').any(|segment| segment == "..") {
            return Err(OutputError::PathEscape(out_path.to_string()));
        }
        let target = self.base_path.join(out_path);
        if let Some(parent) = target.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&target, contents)?;
        debug!(path = %target.display(), bytes = contents.len(), "wrote page");
        Ok(target)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Fallback layout engine producing a bare HTML shell around the page
/// model. Real sites plug a template engine in behind [`RenderLayout`];
/// this keeps the driver usable without one.
#[derive(Debug, Default)]
pub struct HtmlShellLayout;

impl RenderLayout for HtmlShellLayout {
    fn render(&self, layout: &str, model: &serde_json::Value) -> Result<Vec<u8>, ComposeError> {
        let title = model
            .get("title")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Untitled");
        let content = model
            .get("content")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let canonical = model
            .get("canonical_url")
            .and_then(serde_json::Value::as_str)
            .map(|url| format!("\n    <link rel=\"canonical\" href=\"{url}\">"))
            .unwrap_or_default();

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{}</title>{}
</head>
<body data-layout="{}">
{}
</body>
</html>
"#,
            html_escape::encode_text(title),
            canonical,
            html_escape::encode_text(layout),
            content,
        );
        Ok(html.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_page_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path().join("site")).unwrap();
        let written = writer
            .write_page("docs/1.0/intro.html", b"<html></html>")
            .unwrap();
        assert!(written.ends_with("site/docs/1.0/intro.html"));
        assert_eq!(std::fs::read(written).unwrap(), b"<html></html>");
    }

    #[test]
    fn test_write_page_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let writer = PageWriter::new(dir.path().join("site")).unwrap();
        let result = writer.write_page("../outside.html", b"");
        assert!(matches!(result, Err(OutputError::PathEscape(_))));
    }

    #[test]
    fn test_html_shell_escapes_title() {
        let layout = HtmlShellLayout;
        let model = serde_json::json!({
            "title": "Tags <& More>",
            "content": "<p>body</p>",
        });
        let bytes = layout.render("default", &model).unwrap();
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.contains("Tags &lt;&amp; More&gt;"));
        assert!(html.contains("<p>body</p>"));
    }
}
