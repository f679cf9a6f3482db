//! Live preview support.
//!
//! A preview render tags each element with a `pid` and records it in a
//! [`PreviewMap`]. A [`PreviewSession`] keeps the page tree between renders
//! so the editor can look up an element by pid, replace it and re-render
//! with every other pid left stable.

use crate::element::{Element, Page};
use crate::engine::PageEngine;
use crate::error::{RenderError, RenderResult};
use crate::tree::{NodeId, PageTree};
use std::collections::HashMap;
use std::io::Write;

/// pid → node lookup filled during preview renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewMap {
    pids: HashMap<String, NodeId>,
}

impl PreviewMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `pid` at `id`, returning the node it pointed at before
    pub fn register(&mut self, pid: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.pids.insert(pid.into(), id)
    }

    pub fn get(&self, pid: &str) -> Option<NodeId> {
        self.pids.get(pid).copied()
    }

    pub fn contains(&self, pid: &str) -> bool {
        self.pids.contains_key(pid)
    }

    pub fn remove(&mut self, pid: &str) -> Option<NodeId> {
        self.pids.remove(pid)
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// All registered pids, sorted
    pub fn pids(&self) -> Vec<&str> {
        let mut pids: Vec<&str> = self.pids.keys().map(String::as_str).collect();
        pids.sort_unstable();
        pids
    }
}

/// An editable page held across preview renders
#[derive(Debug, Clone, Default)]
pub struct PreviewSession {
    tree: PageTree,
    pids: PreviewMap,
}

impl PreviewSession {
    pub fn new(page: &Page) -> Self {
        Self::from_tree(PageTree::from_page(page))
    }

    pub fn from_tree(tree: PageTree) -> Self {
        Self {
            tree,
            pids: PreviewMap::new(),
        }
    }

    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut PageTree {
        &mut self.tree
    }

    pub fn pids(&self) -> &PreviewMap {
        &self.pids
    }

    /// The current element (with its subtree) behind `pid`
    pub fn element(&self, pid: &str) -> Option<Element> {
        self.pids.get(pid).map(|id| self.tree.to_element(id))
    }

    /// Replace the element behind `pid`.
    ///
    /// An element without a pid takes over `pid`; one with its own pid is
    /// registered under it instead. Pids of the replaced subtree are dropped
    /// and the new children get fresh ones on the next render.
    pub fn update(&mut self, pid: &str, mut element: Element) -> RenderResult<NodeId> {
        let id = self
            .pids
            .get(pid)
            .ok_or_else(|| RenderError::UnknownPid { pid: pid.to_string() })?;

        let mut stale = Vec::new();
        self.collect_pids(id, &mut stale);
        for old in &stale {
            self.pids.remove(old);
        }

        if element.pid.is_empty() {
            element.pid = pid.to_string();
        }
        self.pids.register(element.pid.clone(), id);
        self.tree.replace(id, &element);
        tracing::debug!(pid, node = %id, "preview element replaced");
        Ok(id)
    }

    /// Render the session's page in preview mode
    pub fn render(&mut self, engine: &mut PageEngine<'_>, out: &mut dyn Write) -> RenderResult<()> {
        engine.render_page(&mut self.tree, Some(&mut self.pids), out)
    }

    pub fn render_to_string(&mut self, engine: &mut PageEngine<'_>) -> RenderResult<String> {
        engine.render_to_string(&mut self.tree, Some(&mut self.pids))
    }

    fn collect_pids(&self, id: NodeId, pids: &mut Vec<String>) {
        let node = self.tree.node(id);
        if !node.pid.is_empty() {
            pids.push(node.pid.clone());
        }
        for &child in &node.children {
            self.collect_pids(child, pids);
        }
        if let Some(expansion) = node.expansion() {
            self.collect_pids(expansion, pids);
        }
    }
}
