//! Page orchestration.
//!
//! [`PageEngine::render_page`] writes one complete document:
//!
//! ```text
//! <!DOCTYPE html><html><head>
//!   [editor bootstrap, preview only]
//!   head elements
//!   <style> generated CSS </style>
//! </head><body> body elements </body></html>
//! ```
//!
//! Output is streamed. A fatal error partway through leaves a truncated
//! document in the writer; callers that need all-or-nothing output should
//! render into a buffer (see [`PageEngine::render_to_string`]).

use crate::components::ComponentTable;
use crate::css::{ClassMap, CssCollector};
use crate::error::{RenderError, RenderResult};
use crate::html::{escape_attribute, HtmlRenderer};
use crate::ids::IdGenerator;
use crate::preview::PreviewMap;
use crate::resolver::{ComponentFetcher, InternalRouter, RequestContext, Resolver};
use crate::tree::PageTree;
use std::io::Write;

/// Editor assets written at the top of `<head>` in preview renders
#[derive(Debug, Clone, PartialEq)]
pub struct EditorBootstrap {
    pub script_src: String,
    pub stylesheet: String,
}

impl Default for EditorBootstrap {
    fn default() -> Self {
        Self {
            script_src: "/static/editor.js".to_string(),
            stylesheet: "[pid]:hover { outline: 2px dashed #ff4081; cursor: pointer; }".to_string(),
        }
    }
}

/// Per-render settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOptions {
    /// CSP nonce stamped on `<style>`/`<script>` output
    pub nonce: Option<String>,
    pub editor: EditorBootstrap,
}

pub struct PageEngine<'a> {
    components: &'a mut ComponentTable,
    ids: &'a mut dyn IdGenerator,
    resolver: Resolver<'a>,
    options: RenderOptions,
}

impl<'a> PageEngine<'a> {
    pub fn new(components: &'a mut ComponentTable, ids: &'a mut dyn IdGenerator) -> Self {
        Self {
            components,
            ids,
            resolver: Resolver::new(),
            options: RenderOptions::default(),
        }
    }

    pub fn with_router(mut self, router: &'a dyn InternalRouter) -> Self {
        self.resolver = self.resolver.with_router(router);
        self
    }

    pub fn with_fetcher(mut self, fetcher: &'a dyn ComponentFetcher) -> Self {
        self.resolver = self.resolver.with_fetcher(fetcher);
        self
    }

    pub fn with_request(mut self, request: &'a RequestContext) -> Self {
        self.resolver = self.resolver.with_request(request);
        self
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn components(&self) -> &ComponentTable {
        &*self.components
    }

    /// Render `tree` as a full HTML document.
    ///
    /// With `preview` set, elements carry `pid` attributes, pids are
    /// recorded in the map and the editor bootstrap is injected.
    pub fn render_page(
        &mut self,
        tree: &mut PageTree,
        mut preview: Option<&mut PreviewMap>,
        out: &mut dyn Write,
    ) -> RenderResult<()> {
        let request = self.resolver.request();
        tracing::info!(
            tenant = request.tenant.as_deref().unwrap_or("-"),
            preview = preview.is_some(),
            nodes = tree.len(),
            "rendering page"
        );

        let nonce = self.options.nonce.as_deref();
        let nonce_attr = nonce
            .map(|n| format!(" nonce=\"{}\"", escape_attribute(n)))
            .unwrap_or_default();

        out.write_all(b"<!DOCTYPE html><html><head>")?;
        if preview.is_some() {
            let editor = &self.options.editor;
            write!(
                out,
                "<script src=\"{}\"{}></script><style{}>{}</style>",
                escape_attribute(&editor.script_src),
                nonce_attr,
                nonce_attr,
                editor.stylesheet
            )?;
        }

        // Head elements get no generated classes.
        let head_classes = ClassMap::new();
        let mut head = HtmlRenderer::new(
            self.resolver,
            &mut *self.components,
            &mut *self.ids,
            &head_classes,
        )
        .with_preview(preview.as_deref_mut())
        .with_nonce(nonce);
        for id in tree.head().to_vec() {
            head.render(tree, id, out)?;
        }

        write!(out, "<style{}>", nonce_attr)?;
        let mut css = CssCollector::new(self.resolver, &mut *self.components, &mut *self.ids);
        for id in tree.body().to_vec() {
            css.collect(tree, id, out)?;
        }
        let classes = css.into_classes();
        out.write_all(b"</style></head><body>")?;

        let mut body =
            HtmlRenderer::new(self.resolver, &mut *self.components, &mut *self.ids, &classes)
                .with_preview(preview.as_deref_mut())
                .with_nonce(nonce);
        for id in tree.body().to_vec() {
            body.render(tree, id, out)?;
        }
        out.write_all(b"</body></html>")?;

        tracing::debug!(classes = classes.len(), "page rendered");
        Ok(())
    }

    /// Render into memory; nothing is returned unless the whole page succeeds
    pub fn render_to_string(
        &mut self,
        tree: &mut PageTree,
        preview: Option<&mut PreviewMap>,
    ) -> RenderResult<String> {
        let mut buf = Vec::new();
        self.render_page(tree, preview, &mut buf)?;
        String::from_utf8(buf).map_err(|e| RenderError::Io(e.to_string()))
    }
}
