//! Output path and publish URL computation.
//!
//! Pure functions over a file's identity tuple: no I/O, no catalog access.
//! The version literal `master` and the module literal `ROOT` never appear
//! in output paths or publish URLs.

use serde::Deserialize;

use crate::page_id::ROOT_MODULE;

use super::file::{Family, FileOut, FilePub, FileSrc, MEDIA_TYPE_ASCIIDOC};

/// Policy mapping a page's internal path to its public URL shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlExtensionStyle {
    #[default]
    Default,
    Drop,
    Indexify,
}

/// Computes the output mapping for a file acting as the given family.
pub fn compute_out(src: &FileSrc, acting: Family, style: HtmlExtensionStyle) -> FileOut {
    let version = if src.version == "master" { "" } else { &src.version };
    let module = if src.module == ROOT_MODULE { "" } else { &src.module };

    let mut basename = if src.media_type.as_deref() == Some(MEDIA_TYPE_ASCIIDOC) {
        format!("{}.html", src.stem)
    } else {
        src.basename.clone()
    };

    let mut indexify_segment = "";
    if acting == Family::Page && src.stem != "index" && style == HtmlExtensionStyle::Indexify {
        indexify_segment = &src.stem;
        basename = "index.html".to_string();
    }

    let module_path = join_segments(&[&src.component, version, module]);
    let dirname = join_segments(&[
        &module_path,
        acting.path_segment(),
        parent(&src.relative),
        indexify_segment,
    ]);
    let path = join_segments(&[&dirname, &basename]);

    FileOut {
        module_root_path: relative_up(&dirname, &module_path),
        root_path: relative_up(&dirname, ""),
        dirname,
        basename,
        path,
    }
}

/// Computes the publish mapping for a file acting as the given family.
///
/// Navigation files get a synthetic directory URL and need no `out`; for
/// every other family the result is derived from `out` and is `None` when
/// `out` is absent.
pub fn compute_pub(
    src: &FileSrc,
    out: Option<&FileOut>,
    acting: Family,
    style: HtmlExtensionStyle,
) -> Option<FilePub> {
    if acting == Family::Navigation {
        let version = if src.version == "master" { "" } else { &src.version };
        let module = if src.module == ROOT_MODULE { "" } else { &src.module };
        let url = format!("/{}/", join_segments(&[&src.component, version, module]));
        return Some(FilePub {
            url,
            module_root_path: Some(".".to_string()),
            root_path: None,
            canonical_url: None,
        });
    }

    let out = out?;
    let url = if acting == Family::Page {
        let mut segments: Vec<&str> = out.path.split('/').collect();
        let last = segments.pop().unwrap_or_default();
        segments.push(match style {
            HtmlExtensionStyle::Default => last,
            HtmlExtensionStyle::Drop if last == "index.html" => "",
            HtmlExtensionStyle::Drop => last.strip_suffix(".html").unwrap_or(last),
            HtmlExtensionStyle::Indexify => "",
        });
        format!("/{}", segments.join("/"))
    } else {
        format!("/{}", out.path)
    };

    Some(FilePub {
        url,
        module_root_path: Some(out.module_root_path.clone()),
        root_path: Some(out.root_path.clone()),
        canonical_url: None,
    })
}

/// Joins path segments, eliding empty ones.
fn join_segments(segments: &[&str]) -> String {
    let mut joined = String::new();
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push('/');
        }
        joined.push_str(segment);
    }
    joined
}

/// Posix dirname, `""` for a bare file name.
fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Relative walk from `dir` up to its ancestor `base`, as `..` segments.
fn relative_up(dir: &str, base: &str) -> String {
    let depth = segment_count(dir) - segment_count(base);
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

fn segment_count(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}
