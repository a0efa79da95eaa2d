//! The virtual file model carried through the pipeline.
//!
//! A file's identity tuple ([`FileSrc`]) is fixed during classification;
//! the output mapping ([`FileOut`]) and publish mapping ([`FilePub`]) are
//! computed from it when the file enters the catalog.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::Origin;

/// MIME type of the source markup.
pub const MEDIA_TYPE_ASCIIDOC: &str = "text/asciidoc";

/// Classification tag assigned to every cataloged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Page,
    Partial,
    Image,
    Attachment,
    Example,
    Navigation,
    Alias,
}

impl Family {
    pub fn as_str(self) -> &'static str {
        match self {
            Family::Page => "page",
            Family::Partial => "partial",
            Family::Image => "image",
            Family::Attachment => "attachment",
            Family::Example => "example",
            Family::Navigation => "navigation",
            Family::Alias => "alias",
        }
    }

    /// Extra top path segment in the output tree, if the family has one.
    pub fn path_segment(self) -> &'static str {
        match self {
            Family::Image => "_images",
            Family::Attachment => "_attachments",
            _ => "",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity tuple set during classification, immutable thereafter.
#[derive(Debug, Clone)]
pub struct FileSrc {
    pub component: String,
    pub version: String,
    pub module: String,
    pub family: Family,
    pub relative: String,
    pub basename: String,
    pub stem: String,
    pub extname: String,
    pub media_type: Option<String>,
    /// Original source bytes of a page; a later stage may replace
    /// [`File::contents`] with converted output, and include resolution
    /// reads these first.
    pub contents: Option<Vec<u8>>,
    /// Walk from the file's directory back to the module root, as `..`
    /// segments (`.` when the file sits at the module root).
    pub module_root_path: String,
    pub origin: Option<Arc<Origin>>,
    pub edit_url: Option<String>,
}

impl FileSrc {
    /// Builds an identity tuple, deriving basename, stem, extension, and
    /// media type from the relative path.
    pub fn new(
        component: impl Into<String>,
        version: impl Into<String>,
        module: impl Into<String>,
        family: Family,
        relative: impl Into<String>,
    ) -> Self {
        let relative = relative.into();
        let basename = relative.rsplit('/').next().unwrap_or(&relative).to_string();
        let (stem, extname) = match basename.rfind('.') {
            Some(dot) if dot > 0 => (basename[..dot].to_string(), basename[dot..].to_string()),
            _ => (basename.clone(), String::new()),
        };
        let media_type = media_type_for(&extname).map(str::to_string);
        FileSrc {
            component: component.into(),
            version: version.into(),
            module: module.into(),
            family,
            relative,
            basename,
            stem,
            extname,
            media_type,
            contents: None,
            module_root_path: ".".to_string(),
            origin: None,
            edit_url: None,
        }
    }

    pub fn id(&self) -> FileId {
        FileId {
            family: self.family,
            component: self.component.clone(),
            version: self.version.clone(),
            module: self.module.clone(),
            relative: self.relative.clone(),
        }
    }
}

/// Catalog identity key: `$family/version@component:module:relative`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileId {
    pub family: Family,
    pub component: String,
    pub version: String,
    pub module: String,
    pub relative: String,
}

impl FileId {
    pub fn new(
        family: Family,
        component: impl Into<String>,
        version: impl Into<String>,
        module: impl Into<String>,
        relative: impl Into<String>,
    ) -> Self {
        FileId {
            family,
            component: component.into(),
            version: version.into(),
            module: module.into(),
            relative: relative.into(),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}/{}@{}:{}:{}",
            self.family, self.version, self.component, self.module, self.relative
        )
    }
}

/// Output mapping of a publishable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOut {
    pub dirname: String,
    pub basename: String,
    pub path: String,
    pub module_root_path: String,
    pub root_path: String,
}

/// Publish mapping; `url` is site-absolute with a leading `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePub {
    pub url: String,
    pub module_root_path: Option<String>,
    pub root_path: Option<String>,
    pub canonical_url: Option<String>,
}

/// A virtual file owned by the catalog.
#[derive(Debug, Clone)]
pub struct File {
    /// Physical in-repo path (posix), empty for synthesized files.
    pub path: String,
    pub contents: Vec<u8>,
    pub src: FileSrc,
    pub out: Option<FileOut>,
    pub publish: Option<FilePub>,
    /// Identity of the alias target, for `family == Alias`.
    pub rel: Option<FileId>,
    /// Position in the component descriptor's `nav` list, for navigation files.
    pub nav_index: Option<usize>,
}

impl File {
    pub fn new(src: FileSrc, contents: Vec<u8>) -> Self {
        File {
            path: String::new(),
            contents,
            src,
            out: None,
            publish: None,
            rel: None,
            nav_index: None,
        }
    }

    pub fn id(&self) -> FileId {
        self.src.id()
    }
}

/// A file is publishable iff its acting family is page, image, or
/// attachment and no segment of its relative path starts with `_`.
pub fn is_publishable(acting: Family, relative: &str) -> bool {
    matches!(acting, Family::Page | Family::Image | Family::Attachment)
        && !relative.split('/').any(|segment| segment.starts_with('_'))
}

/// Maps a file extension (with leading dot) to a media type.
pub fn media_type_for(extname: &str) -> Option<&'static str> {
    match extname {
        ".adoc" => Some(MEDIA_TYPE_ASCIIDOC),
        ".html" => Some("text/html"),
        ".css" => Some("text/css"),
        ".js" => Some("application/javascript"),
        ".json" => Some("application/json"),
        ".yml" | ".yaml" => Some("application/yaml"),
        ".png" => Some("image/png"),
        ".jpg" | ".jpeg" => Some("image/jpeg"),
        ".gif" => Some("image/gif"),
        ".svg" => Some("image/svg+xml"),
        ".ico" => Some("image/x-icon"),
        ".pdf" => Some("application/pdf"),
        ".zip" => Some("application/zip"),
        ".txt" => Some("text/plain"),
        _ => None,
    }
}
