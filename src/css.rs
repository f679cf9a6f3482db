//! CSS collection pass.
//!
//! Walks the body once before any body HTML is written, gives every styled
//! node a `{type}_{token}` class and streams its rule. An import node takes
//! the class of its component copy. Copies of the same component position
//! share one class and one rule when their overlaid styles are equal, and
//! get separate ones when the importers' local overrides differ.

use crate::components::ComponentTable;
use crate::error::{RenderError, RenderResult};
use crate::ids::IdGenerator;
use crate::resolver::{CycleGuard, Resolver};
use crate::tree::{NodeId, Origin, PageTree};
use crate::validator::MAX_NESTING_DEPTH;
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;

/// Generated class per node, valid for one CSS pass and the render that follows it
pub type ClassMap = HashMap<NodeId, String>;

/// Definition position plus the style it ended up with, order-insensitive
type RuleKey = (Origin, BTreeMap<String, String>);

pub struct CssCollector<'r, 'a> {
    resolver: Resolver<'a>,
    components: &'r mut ComponentTable,
    ids: &'r mut dyn IdGenerator,
    classes: ClassMap,
    rules: HashMap<RuleKey, String>,
    guard: CycleGuard,
    depth: usize,
}

impl<'r, 'a> CssCollector<'r, 'a> {
    pub fn new(
        resolver: Resolver<'a>,
        components: &'r mut ComponentTable,
        ids: &'r mut dyn IdGenerator,
    ) -> Self {
        Self {
            resolver,
            components,
            ids,
            classes: ClassMap::new(),
            rules: HashMap::new(),
            guard: CycleGuard::new(),
            depth: 0,
        }
    }

    /// Collect CSS for the subtree at `id`, writing rules to `out` as they are generated.
    ///
    /// Nodes nested deeper than [`MAX_NESTING_DEPTH`] are skipped.
    pub fn collect(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            tracing::warn!(
                node = %id,
                max_depth = MAX_NESTING_DEPTH,
                "nesting too deep, skipping css"
            );
            return Ok(());
        }
        self.depth += 1;
        let result = self.collect_node(tree, id, out);
        self.depth -= 1;
        result
    }

    pub fn classes(&self) -> &ClassMap {
        &self.classes
    }

    pub fn into_classes(self) -> ClassMap {
        self.classes
    }

    fn collect_node(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        if tree.node(id).is_import() {
            return self.collect_import(tree, id, out);
        }

        let node = tree.node(id);
        if !node.style.is_empty() {
            let key: RuleKey = (
                node.origin().clone(),
                node.style.iter().map(|(p, v)| (p.clone(), v.clone())).collect(),
            );
            let class = match self.rules.get(&key) {
                Some(class) => class.clone(),
                None => {
                    let class = class_name(&node.kind, &self.ids.next_id());
                    write_rule(out, &class, &node.style)?;
                    self.rules.insert(key, class.clone());
                    class
                }
            };
            self.classes.insert(id, class);
        }

        let children = node.children.clone();
        for child in children {
            self.collect(tree, child, out)?;
        }
        Ok(())
    }

    fn collect_import(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        let reference = tree.node(id).import.clone();

        if !self.guard.enter(&reference) {
            tracing::debug!(%reference, node = %id, "import cycle, skipping css");
            return Ok(());
        }
        let result = self.collect_component(tree, id, &reference, out);
        self.guard.leave(&reference);
        result
    }

    fn collect_component(
        &mut self,
        tree: &mut PageTree,
        id: NodeId,
        reference: &str,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        let component = match self.resolver.resolve(reference, self.components) {
            Ok(component) => component,
            Err(err) => {
                tracing::warn!(
                    %reference,
                    error = %err,
                    "component unresolved during css collection"
                );
                return write_error_comment(out, &err);
            }
        };

        let copy = tree.expand(id, reference, &component);
        self.collect(tree, copy, out)?;
        if let Some(class) = self.classes.get(&copy).cloned() {
            self.classes.insert(id, class);
        }
        Ok(())
    }
}

pub fn class_name(kind: &str, token: &str) -> String {
    format!("{}_{}", kind, token)
}

/// `.class { prop: value; ... }` with declarations in map order
pub fn write_rule(
    out: &mut dyn Write,
    class: &str,
    style: &IndexMap<String, String>,
) -> RenderResult<()> {
    if style.is_empty() {
        return Ok(());
    }
    write!(out, ".{} {{", class)?;
    for (property, value) in style {
        write!(out, " {}: {};", property, value)?;
    }
    out.write_all(b" }")?;
    Ok(())
}

fn write_error_comment(out: &mut dyn Write, err: &RenderError) -> RenderResult<()> {
    let message = err.to_string().replace("*/", "* /");
    write!(out, "/* Error: {} */", message)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Element, Page};
    use crate::ids::SequentialIds;
    use pretty_assertions::assert_eq;

    fn collect_all(tree: &mut PageTree, components: &mut ComponentTable) -> (String, ClassMap) {
        let mut ids = SequentialIds::new();
        let mut out = Vec::new();
        let mut css = CssCollector::new(Resolver::new(), components, &mut ids);
        for id in tree.body().to_vec() {
            css.collect(tree, id, &mut out).unwrap();
        }
        (String::from_utf8(out).unwrap(), css.into_classes())
    }

    #[test]
    fn test_rule_per_styled_node() {
        let page = Page::new(
            vec![],
            vec![Element::new("div")
                .with_style("color", "red")
                .with_style("margin", "0")
                .with_child(Element::new("h1").with_text("Hi"))],
        );
        let mut tree = PageTree::from_page(&page);
        let (css, classes) = collect_all(&mut tree, &mut ComponentTable::new());

        assert_eq!(css, ".div_aaaaaa { color: red; margin: 0; }");
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[&tree.body()[0]], "div_aaaaaa");
    }

    #[test]
    fn test_import_sites_get_independent_rules() {
        let components = HashMap::from([(
            "button".to_string(),
            Element::new("button").with_style("color", "black").with_style("padding", "4px"),
        )]);
        let mut table = ComponentTable::from_components(components);
        let page = Page::new(
            vec![],
            vec![
                Element::import("button").with_style("color", "red"),
                Element::import("button").with_style("color", "blue"),
            ],
        );
        let mut tree = PageTree::from_page(&page);
        let (css, classes) = collect_all(&mut tree, &mut table);

        assert_eq!(
            css,
            ".button_aaaaaa { color: red; padding: 4px; }\
             .button_aaaaab { color: blue; padding: 4px; }"
        );
        let first = tree.body()[0];
        let second = tree.body()[1];
        assert_eq!(classes[&first], "button_aaaaaa");
        assert_eq!(classes[&second], "button_aaaaab");
        assert_eq!(table.get("button").unwrap().style["color"], "black");
    }

    #[test]
    fn test_unresolved_import_becomes_comment() {
        let page = Page::new(vec![], vec![Element::import("missing")]);
        let mut tree = PageTree::from_page(&page);
        let (css, classes) = collect_all(&mut tree, &mut ComponentTable::new());
        assert_eq!(css, "/* Error: Component 'missing' not found */");
        assert!(classes.is_empty());
    }

    #[test]
    fn test_error_comment_cannot_close_early() {
        let mut out = Vec::new();
        let err = RenderError::ComponentNotFound { reference: "a*/b".into() };
        write_error_comment(&mut out, &err).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "/* Error: Component 'a* /b' not found */");
    }

    #[test]
    fn test_self_import_stops() {
        let components = HashMap::from([(
            "loop".to_string(),
            Element::new("div")
                .with_style("color", "red")
                .with_child(Element::import("loop")),
        )]);
        let mut table = ComponentTable::from_components(components);
        let page = Page::new(vec![], vec![Element::import("loop")]);
        let mut tree = PageTree::from_page(&page);
        let (css, classes) = collect_all(&mut tree, &mut table);
        assert_eq!(css, ".div_aaaaaa { color: red; }");
        assert_eq!(classes[&tree.body()[0]], "div_aaaaaa");
    }

    #[test]
    fn test_import_sites_share_a_class_only_when_overlays_match() {
        let components = HashMap::from([(
            "card".to_string(),
            Element::new("section")
                .with_style("color", "black")
                .with_child(Element::new("em").with_style("font-style", "italic")),
        )]);
        let mut table = ComponentTable::from_components(components);
        let page = Page::new(
            vec![],
            vec![
                Element::import("card").with_style("color", "red"),
                Element::import("card").with_style("color", "red"),
                Element::import("card"),
                Element::import("card"),
            ],
        );
        let mut tree = PageTree::from_page(&page);
        let (css, classes) = collect_all(&mut tree, &mut table);

        assert_eq!(
            css,
            ".section_aaaaaa { color: red; }.em_aaaaab { font-style: italic; }\
             .section_aaaaac { color: black; }"
        );
        let sites: Vec<&str> = tree.body().iter().map(|id| classes[id].as_str()).collect();
        assert_eq!(
            sites,
            vec!["section_aaaaaa", "section_aaaaaa", "section_aaaaac", "section_aaaaac"]
        );

        // Each copy carries the class too, and nested nodes share theirs.
        for &site in tree.body() {
            let copy = tree.node(site).expansion().unwrap();
            assert_eq!(classes[&copy], classes[&site]);
            assert_eq!(classes[&tree.node(copy).children[0]], "em_aaaaab");
        }
    }

    #[test]
    fn test_page_nodes_with_equal_styles_keep_their_own_rules() {
        let page = Page::new(
            vec![],
            vec![
                Element::new("p").with_style("margin", "0"),
                Element::new("p").with_style("margin", "0"),
            ],
        );
        let mut tree = PageTree::from_page(&page);
        let (css, _) = collect_all(&mut tree, &mut ComponentTable::new());
        assert_eq!(css, ".p_aaaaaa { margin: 0; }.p_aaaaab { margin: 0; }");
    }

    #[test]
    fn test_collection_stops_at_max_depth() {
        let mut element = Element::new("div").with_style("color", "red");
        for _ in 1..MAX_NESTING_DEPTH + 4 {
            element = Element::new("div").with_style("color", "red").with_child(element);
        }
        let mut tree = PageTree::from_page(&Page::new(vec![], vec![element]));
        let (css, classes) = collect_all(&mut tree, &mut ComponentTable::new());
        assert_eq!(classes.len(), MAX_NESTING_DEPTH);
        assert_eq!(css.matches(" { color: red; }").count(), MAX_NESTING_DEPTH);
    }
}
