//! A minimal line-oriented reference adapter behind [`TreeProvider`].
//!
//! Understands just enough source markup to drive the pipeline end to
//! end: a title line, header attributes, include directives, `xref`
//! macros, and nested unordered lists. Production sites wire a real
//! AsciiDoc parser behind the same trait; this adapter exists so the
//! driver and the integration tests have a working provider.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::catalog::{ContentCatalog, File};
use crate::resolve::{IncludeResolution, LinkRole};

use super::{
    Block, CatalogHooks, Document, ListBlock, ListItem, MarkupError, ResolveInclude,
    ResolvePageRef, TreeProvider,
};

#[derive(Clone)]
pub struct OutlineParser {
    /// Site-wide attributes seeded into every document; document-level
    /// attributes override them.
    attributes: IndexMap<String, String>,
    includes: Arc<dyn ResolveInclude + Send + Sync>,
    page_refs: Arc<dyn ResolvePageRef + Send + Sync>,
}

impl fmt::Debug for OutlineParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineParser")
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl Default for OutlineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl OutlineParser {
    pub fn new() -> Self {
        Self::with_attributes(IndexMap::new())
    }

    pub fn with_attributes(attributes: IndexMap<String, String>) -> Self {
        Self::with_hooks(attributes, Arc::new(CatalogHooks), Arc::new(CatalogHooks))
    }

    /// Substitutes custom capability implementations for the default
    /// catalog-backed hooks.
    pub fn with_hooks(
        attributes: IndexMap<String, String>,
        includes: Arc<dyn ResolveInclude + Send + Sync>,
        page_refs: Arc<dyn ResolvePageRef + Send + Sync>,
    ) -> Self {
        OutlineParser {
            attributes,
            includes,
            page_refs,
        }
    }
}

impl TreeProvider for OutlineParser {
    fn parse(&self, file: &File, catalog: &ContentCatalog) -> Result<Document, MarkupError> {
        let text = String::from_utf8(file.contents.clone()).map_err(|err| MarkupError {
            path: file.path.clone(),
            reason: err.to_string(),
        })?;

        let mut document = Document {
            attributes: self.attributes.clone(),
            ..Default::default()
        };
        let mut paragraphs: Vec<String> = Vec::new();
        let mut pending_title: Option<String> = None;

        for line in text.lines() {
            let line = line.trim_end();
            if document.title.is_none() {
                if let Some(title) = line.strip_prefix("= ") {
                    document.title = Some(title.to_string());
                    continue;
                }
            }
            if let Some(attribute) = parse_attribute(line) {
                document.attributes.insert(attribute.0, attribute.1);
                continue;
            }
            if let Some(title) = line.strip_prefix('.') {
                // Block title attaches to the next list
                if !title.is_empty() && !title.starts_with(' ') {
                    pending_title = Some(title.to_string());
                    continue;
                }
            }
            if line.starts_with('*') {
                let depth = line.chars().take_while(|ch| *ch == '*').count();
                let rest = line[depth..].trim_start();
                if !rest.is_empty() {
                    let content = render_inline(rest, file, catalog, &*self.page_refs);
                    push_list_item(&mut document, depth, content, pending_title.take());
                    continue;
                }
            }
            if let Some(target) = line
                .strip_prefix("include::")
                .and_then(|rest| rest.strip_suffix("[]"))
            {
                match self
                    .includes
                    .resolve_include(target, file, &file.path, catalog)
                {
                    IncludeResolution::Resolved { contents, .. } => {
                        paragraphs.push(String::from_utf8_lossy(&contents).into_owned());
                    }
                    IncludeResolution::Unresolved { target } => {
                        paragraphs.push(format!("[missing include: {target}]"));
                    }
                }
                continue;
            }
            if !line.is_empty() {
                paragraphs.push(render_inline(line, file, catalog, &*self.page_refs));
            }
        }

        document.content = paragraphs
            .iter()
            .map(|paragraph| format!("<p>{paragraph}</p>"))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(document)
    }
}

/// Appends an item to the document's trailing list, opening a new list
/// block when the item is top-level and carries a title or no list is
/// open yet. Deeper items nest under the last item at the level above.
fn push_list_item(document: &mut Document, depth: usize, content: String, title: Option<String>) {
    let item = ListItem::new(content);
    let open_new =
        title.is_some() || !matches!(document.blocks.last(), Some(Block::UnorderedList(_)));
    if depth == 1 && open_new {
        document.blocks.push(Block::UnorderedList(ListBlock {
            title,
            items: vec![item],
        }));
        return;
    }
    let Some(Block::UnorderedList(list)) = document.blocks.last_mut() else {
        document.blocks.push(Block::UnorderedList(ListBlock {
            title,
            items: vec![item],
        }));
        return;
    };
    let mut items = &mut list.items;
    for _ in 1..depth {
        if items.last().is_none() {
            break;
        }
        // Just checked the parent item exists
        items = &mut items.last_mut().expect("invariant").items;
    }
    items.push(item);
}

fn parse_attribute(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(':')?;
    let (name, value) = rest.split_once(':')?;
    if name.is_empty() || name.contains(' ') {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// Renders `xref:spec[text]` macros to anchors through the page-ref
/// capability; everything else passes through untouched.
fn render_inline(
    line: &str,
    file: &File,
    catalog: &ContentCatalog,
    page_refs: &dyn ResolvePageRef,
) -> String {
    let mut rendered = String::new();
    let mut rest = line;
    while let Some(start) = rest.find("xref:") {
        let after = &rest[start + 5..];
        let Some(open) = after.find('[') else {
            break;
        };
        let Some(close) = after[open..].find(']') else {
            break;
        };
        let spec = &after[..open];
        let text = &after[open + 1..open + close];
        let link = page_refs.resolve_page_ref(
            spec,
            (!text.is_empty()).then_some(text),
            file,
            catalog,
            false,
        );
        let class = match link.role {
            LinkRole::Page => "xref page",
            LinkRole::Unresolved => "xref unresolved",
        };
        rendered.push_str(&rest[..start]);
        rendered.push_str(&format!(
            r#"<a href="{}" class="{class}">{}</a>"#,
            link.target, link.text
        ));
        rest = &after[open + close + 1..];
    }
    rendered.push_str(rest);
    rendered
}
