//! # pageforge
//!
//! Renders JSON-described, component-based pages into HTML documents.
//!
//! ## Features
//! - Element trees with per-element inline style, compiled into generated CSS classes
//! - Reusable components imported by name, internal route or external URL
//! - Import cycle detection and one-shot `private` components
//! - Preview mode: every element gets a `pid` the editor can address and replace
//! - Streaming output into any `std::io::Write`
//!
//! ## Example
//! ```ignore
//! use pageforge::{ComponentTable, PageEngine, PageTree, SequentialIds, SiteData};
//!
//! let site = SiteData::from_json(r#"{
//!   "pages": {"home": {"body": {"elements": [
//!     {"type": "div", "style": {"color": "red"}, "elements": [{"type": "h1", "text": "Hi"}]}
//!   ]}}}
//! }"#)?;
//!
//! let mut components = ComponentTable::from_base(site.components.clone());
//! let mut ids = SequentialIds::new();
//! let mut tree = PageTree::from_page(site.page("home").unwrap());
//! let html = PageEngine::new(&mut components, &mut ids).render_to_string(&mut tree, None)?;
//! // <!DOCTYPE html><html><head><style>.div_aaaaaa { color: red; }</style></head>
//! // <body><div class="div_aaaaaa"><h1>Hi</h1></div></body></html>
//! ```

pub mod cache;
pub mod components;
pub mod config;
pub mod css;
pub mod element;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod html;
pub mod ids;
pub mod preview;
pub mod resolver;
pub mod routes;
pub mod store;
pub mod tree;
pub mod validator;

// --- Core types ---
pub use components::ComponentTable;
pub use element::{ComponentMap, Element, Page, Section, SiteData, DEFAULT_PAGE};
pub use engine::{EditorBootstrap, PageEngine, RenderOptions};
pub use error::{RenderError, RenderResult};
pub use ids::{IdGenerator, RandomIds, SequentialIds};
pub use tree::{NodeId, PageTree};

// --- Resolution ---
pub use resolver::{ComponentFetcher, ImportRef, InternalRouter, RequestContext, Resolver};
pub use fetch::HttpFetcher;
pub use routes::RouteTable;

// --- Preview ---
pub use preview::{PreviewMap, PreviewSession};

// --- Hosting ---
pub use cache::{MemoryCache, ResultCache};
pub use config::EngineConfig;
pub use store::{CachedStore, JsonDirStore, PageStore};

use std::sync::Arc;

/// Parse site data (`{pages, components}`) from JSON
pub fn parse_site(json: &str) -> RenderResult<SiteData> {
    SiteData::from_json(json)
}

/// Render one page of a site with random class names and no route or URL imports.
///
/// An empty `name` renders the home page.
pub fn render_site_page(site: &SiteData, name: &str) -> RenderResult<String> {
    let page = site.page(name).ok_or_else(|| RenderError::PageNotFound {
        name: name.to_string(),
    })?;
    let mut components = ComponentTable::from_base(Arc::clone(&site.components));
    let mut ids = RandomIds::new();
    let mut tree = PageTree::from_page(page);
    PageEngine::new(&mut components, &mut ids).render_to_string(&mut tree, None)
}
