//! HTML pass.
//!
//! Streams elements as HTML. Attributes come out in sorted order; the
//! generated class is merged with any author `class`. In preview mode every
//! rendered element carries a `pid` attribute and is registered in the
//! preview map so an editor can address it. Import nodes are never emitted,
//! so only their component copies are registered.

use crate::components::ComponentTable;
use crate::css::ClassMap;
use crate::error::RenderResult;
use crate::ids::IdGenerator;
use crate::preview::PreviewMap;
use crate::resolver::{CycleGuard, Resolver};
use crate::tree::{NodeId, PageTree};
use crate::validator::MAX_NESTING_DEPTH;
use std::io::Write;

/// Void elements, written as `<tag ... />` with no children or text
pub const SELF_CLOSING_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements that receive the render's CSP nonce
const NONCE_TAGS: &[&str] = &["script", "style"];

pub fn is_self_closing(kind: &str) -> bool {
    SELF_CLOSING_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(kind))
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub struct HtmlRenderer<'r, 'a> {
    resolver: Resolver<'a>,
    components: &'r mut ComponentTable,
    ids: &'r mut dyn IdGenerator,
    classes: &'r ClassMap,
    preview: Option<&'r mut PreviewMap>,
    nonce: Option<&'r str>,
    guard: CycleGuard,
    depth: usize,
}

impl<'r, 'a> HtmlRenderer<'r, 'a> {
    pub fn new(
        resolver: Resolver<'a>,
        components: &'r mut ComponentTable,
        ids: &'r mut dyn IdGenerator,
        classes: &'r ClassMap,
    ) -> Self {
        Self {
            resolver,
            components,
            ids,
            classes,
            preview: None,
            nonce: None,
            guard: CycleGuard::new(),
            depth: 0,
        }
    }

    /// Tag elements with pids and record them in `pids`
    pub fn with_preview(mut self, pids: Option<&'r mut PreviewMap>) -> Self {
        self.preview = pids;
        self
    }

    pub fn with_nonce(mut self, nonce: Option<&'r str>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Render the subtree at `id`.
    ///
    /// A component that cannot be resolved aborts the render; output
    /// already written to `out` stays written. Nodes nested deeper than
    /// [`MAX_NESTING_DEPTH`] render as nothing.
    pub fn render(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            tracing::warn!(
                node = %id,
                max_depth = MAX_NESTING_DEPTH,
                "nesting too deep, rendering nothing"
            );
            return Ok(());
        }
        self.depth += 1;
        let result = if tree.node(id).is_import() {
            self.render_import(tree, id, out)
        } else {
            self.assign_pid(tree, id);
            self.render_element(tree, id, out)
        };
        self.depth -= 1;
        result
    }

    // ─── Preview ids ───

    fn assign_pid(&mut self, tree: &mut PageTree, id: NodeId) {
        let Some(pids) = self.preview.as_deref_mut() else {
            return;
        };
        let node = tree.node_mut(id);
        let taken = |pid: &str| pids.get(pid).is_some_and(|owner| owner != id);
        if !node.pid.is_empty() && taken(node.pid.as_str()) {
            tracing::debug!(pid = %node.pid, node = %id, "preview id held by another node");
            node.pid.clear();
        }
        if node.pid.is_empty() {
            node.pid = match self.classes.get(&id) {
                Some(class) if !taken(class.as_str()) => class.clone(),
                _ => loop {
                    let candidate = self.ids.next_id();
                    if !taken(candidate.as_str()) {
                        break candidate;
                    }
                },
            };
            tracing::debug!(pid = %node.pid, node = %id, "assigned preview id");
        }
        pids.register(node.pid.clone(), id);
    }

    // ─── Imports ───

    fn render_import(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        let node = tree.node(id);
        let reference = node.import.clone();
        let private = node.private;

        if !self.guard.enter(&reference) {
            tracing::debug!(%reference, node = %id, "import cycle, rendering nothing");
            return Ok(());
        }
        let result = self.render_component(tree, id, &reference, out);
        self.guard.leave(&reference);
        result?;

        if private && self.components.discard(&reference) {
            tracing::debug!(%reference, "discarded private component after use");
        }
        Ok(())
    }

    fn render_component(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        reference: &str,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        let component = self.resolver.resolve(reference, self.components)?;
        // The copy already carries the importer's pid, if it had one.
        let copy = tree.expand(id, reference, &component);
        self.render(tree, copy, out)
    }

    // ─── Elements ───

    fn render_element(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        let node = tree.node(id);
        let children = node.children.clone();

        // Synthetic roots have no tag of their own.
        if node.kind.is_empty() {
            out.write_all(node.text.as_bytes())?;
            for child in children {
                self.render(tree, child, out)?;
            }
            return Ok(());
        }

        let kind = node.kind.clone();
        write!(out, "<{}", kind)?;
        if self.preview.is_some() && !node.pid.is_empty() {
            write!(out, " pid=\"{}\"", escape_attribute(&node.pid))?;
        }

        let class = match (self.classes.get(&id), node.attributes.get("class")) {
            (Some(generated), Some(authored)) if !authored.is_empty() => {
                Some(format!("{} {}", generated, authored))
            }
            (Some(generated), _) => Some(generated.clone()),
            (None, Some(authored)) if !authored.is_empty() => Some(authored.clone()),
            _ => None,
        };
        if let Some(class) = class {
            write!(out, " class=\"{}\"", escape_attribute(&class))?;
        }
        for (name, value) in node.attributes.iter().filter(|(name, _)| name.as_str() != "class") {
            write!(out, " {}=\"{}\"", name, escape_attribute(value))?;
        }
        if let Some(nonce) = self.nonce {
            let wants_nonce = NONCE_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(&kind));
            if wants_nonce && !node.attributes.contains_key("nonce") {
                write!(out, " nonce=\"{}\"", escape_attribute(nonce))?;
            }
        }

        if is_self_closing(&kind) {
            out.write_all(b" />")?;
            return Ok(());
        }

        out.write_all(b">")?;
        out.write_all(node.text.as_bytes())?;
        for child in children {
            self.render(tree, child, out)?;
        }
        write!(out, "</{}>", kind)?;
        Ok(())
    }
}
