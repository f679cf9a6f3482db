use crate::element::Element;
use crate::error::{RenderError, RenderResult};
use crate::resolver::{InternalRouter, RequestContext};
use std::collections::HashMap;
use std::fmt;

pub type RouteHandler = Box<dyn Fn(&RequestContext) -> RenderResult<Element> + Send + Sync>;

/// Exact-path table of engine-internal data routes (`/pages`, `/whoami`, …)
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteHandler>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&RequestContext) -> RenderResult<Element> + Send + Sync + 'static,
    {
        self.routes.insert(path.into(), Box::new(handler));
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.routes.keys().collect();
        paths.sort();
        f.debug_struct("RouteTable").field("paths", &paths).finish()
    }
}

impl InternalRouter for RouteTable {
    fn route(&self, path: &str, request: &RequestContext) -> RenderResult<Element> {
        let handler = self.routes.get(path).ok_or_else(|| RenderError::UnknownRoute {
            path: path.to_string(),
        })?;
        handler(request)
    }
}

/// A `ul` of links, one `li > a` per `(label, href)` pair
pub fn link_list<'a, I>(links: I) -> Element
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    links.into_iter().fold(Element::new("ul"), |list, (label, href)| {
        let link = Element::new("a").with_attribute("href", href).with_text(label);
        list.with_child(Element::new("li").with_child(link))
    })
}
