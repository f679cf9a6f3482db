//! Component resolution: turning an `import` reference into an element.
//!
//! References come in three shapes:
//! - a bare name (`"nav"`), looked up in the [`ComponentTable`];
//! - an internal route (`"/pages"`), answered by an [`InternalRouter`];
//! - an external URL (`"https://cdn.example/nav.json"`), fetched by a
//!   [`ComponentFetcher`] and memoized into the table for the rest of the
//!   render.

use crate::components::ComponentTable;
use crate::element::Element;
use crate::error::{RenderError, RenderResult};
use std::sync::Arc;

/// Inbound request headers that are never forwarded to external component hosts
const UNFORWARDED_HEADERS: &[&str] = &[
    "cookie",
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "accept-encoding",
];

/// Identity of the request a page is rendered for
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Inbound request headers, in arrival order
    pub headers: Vec<(String, String)>,
    /// Authenticated user handle, if any
    pub user: Option<String>,
    /// Tenant (site domain) being rendered
    pub tenant: Option<String>,
}

static EMPTY_REQUEST: RequestContext = RequestContext::empty();

impl RequestContext {
    pub const fn empty() -> Self {
        Self {
            headers: Vec::new(),
            user: None,
            tenant: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Headers to pass along on an external component fetch (no cookies)
    pub fn forwarded_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(name, _)| {
                !UNFORWARDED_HEADERS
                    .iter()
                    .any(|blocked| name.eq_ignore_ascii_case(blocked))
            })
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// The shape of an `import` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportRef<'a> {
    /// A component defined in the site's component table
    Named(&'a str),
    /// An engine-internal data route, e.g. `/pages`
    Internal(&'a str),
    /// Anything that looks like a URL
    External(&'a str),
}

impl<'a> ImportRef<'a> {
    pub fn parse(reference: &'a str) -> Self {
        if reference.starts_with('/') {
            ImportRef::Internal(reference)
        } else if reference.contains('/') {
            ImportRef::External(reference)
        } else {
            ImportRef::Named(reference)
        }
    }

    /// URL to request for an external reference (scheme added when missing)
    pub fn url(&self) -> Option<String> {
        match self {
            ImportRef::External(url) if url.contains("://") => Some(url.to_string()),
            ImportRef::External(url) => Some(format!("https://{}", url)),
            _ => None,
        }
    }
}

/// Answers `/`-prefixed imports without a network hop
pub trait InternalRouter {
    fn route(&self, path: &str, request: &RequestContext) -> RenderResult<Element>;
}

impl<F> InternalRouter for F
where
    F: Fn(&str, &RequestContext) -> RenderResult<Element>,
{
    fn route(&self, path: &str, request: &RequestContext) -> RenderResult<Element> {
        self(path, request)
    }
}

/// Loads an element from an external URL
pub trait ComponentFetcher {
    fn fetch(&self, url: &str, request: &RequestContext) -> RenderResult<Element>;
}

/// Import cycle guard for one pass.
///
/// Holds the references being expanded on the current import path. A
/// reference that is already open is refused, so a component reaching
/// itself (directly or through a chain) stops at the cycle point. Entries
/// are released on the way out, so independent branches may import the
/// same component.
#[derive(Debug, Default)]
pub struct CycleGuard {
    open: Vec<String>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if `reference` is already being expanded on the current path
    pub fn enter(&mut self, reference: &str) -> bool {
        if self.open.iter().any(|open| open == reference) {
            return false;
        }
        self.open.push(reference.to_string());
        true
    }

    pub fn leave(&mut self, reference: &str) {
        if let Some(index) = self.open.iter().rposition(|open| open == reference) {
            self.open.remove(index);
        }
    }

    /// Number of imports open on the current path
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

/// Resolves import references for one render
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    router: Option<&'a dyn InternalRouter>,
    fetcher: Option<&'a dyn ComponentFetcher>,
    request: &'a RequestContext,
}

impl Default for Resolver<'_> {
    fn default() -> Self {
        Self {
            router: None,
            fetcher: None,
            request: &EMPTY_REQUEST,
        }
    }
}

impl<'a> Resolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_router(mut self, router: &'a dyn InternalRouter) -> Self {
        self.router = Some(router);
        self
    }

    pub fn with_fetcher(mut self, fetcher: &'a dyn ComponentFetcher) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn with_request(mut self, request: &'a RequestContext) -> Self {
        self.request = request;
        self
    }

    pub fn request(&self) -> &'a RequestContext {
        self.request
    }

    /// Resolve `reference`, consulting the table first and memoizing
    /// anything fetched from a route or URL.
    pub fn resolve(
        &self,
        reference: &str,
        components: &mut ComponentTable,
    ) -> RenderResult<Arc<Element>> {
        if let Some(found) = components.get(reference) {
            return Ok(found);
        }
        if components.is_discarded(reference) {
            return Err(RenderError::ComponentNotFound {
                reference: reference.to_string(),
            });
        }

        let fetched = match ImportRef::parse(reference) {
            ImportRef::Named(name) => {
                return Err(RenderError::ComponentNotFound {
                    reference: name.to_string(),
                })
            }
            ImportRef::Internal(path) => {
                tracing::debug!(path, "resolving component from internal route");
                let router = self.router.ok_or_else(|| RenderError::RouterUnavailable {
                    path: path.to_string(),
                })?;
                router.route(path, self.request)?
            }
            external @ ImportRef::External(_) => {
                let url = external.url().unwrap_or_else(|| reference.to_string());
                tracing::debug!(%url, "fetching external component");
                let fetcher = self
                    .fetcher
                    .ok_or_else(|| RenderError::FetcherUnavailable { url: url.clone() })?;
                fetcher.fetch(&url, self.request)?
            }
        };

        Ok(components.insert(reference, fetched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct CountingFetcher {
        calls: Cell<usize>,
    }

    impl ComponentFetcher for CountingFetcher {
        fn fetch(&self, url: &str, request: &RequestContext) -> RenderResult<Element> {
            self.calls.set(self.calls.get() + 1);
            let forwarded: Vec<&str> = request.forwarded_headers().map(|(name, _)| name).collect();
            Ok(Element::new("aside")
                .with_text(url)
                .with_attribute("data-headers", forwarded.join(",")))
        }
    }

    #[test]
    fn test_import_ref_shapes() {
        assert_eq!(ImportRef::parse("nav"), ImportRef::Named("nav"));
        assert_eq!(ImportRef::parse("/pages"), ImportRef::Internal("/pages"));
        assert_eq!(
            ImportRef::parse("https://cdn.example/nav.json"),
            ImportRef::External("https://cdn.example/nav.json")
        );
        assert_eq!(
            ImportRef::parse("cdn.example/nav.json").url().as_deref(),
            Some("https://cdn.example/nav.json")
        );
        assert_eq!(ImportRef::parse("nav").url(), None);
    }

    #[test]
    fn test_named_lookup_and_missing_name() {
        let mut table = ComponentTable::from_components(HashMap::from([(
            "nav".to_string(),
            Element::new("nav"),
        )]));
        let resolver = Resolver::new();
        assert_eq!(resolver.resolve("nav", &mut table).unwrap().kind, "nav");
        assert_eq!(
            resolver.resolve("footer", &mut table),
            Err(RenderError::ComponentNotFound { reference: "footer".into() })
        );
    }

    #[test]
    fn test_internal_route_is_memoized() {
        let calls = Cell::new(0);
        let router = |path: &str, request: &RequestContext| -> RenderResult<Element> {
            calls.set(calls.get() + 1);
            Ok(Element::new("span").with_text(format!(
                "{} for {}",
                path,
                request.user.as_deref().unwrap_or("anonymous")
            )))
        };
        let request = RequestContext::default().with_user("ada");
        let resolver = Resolver::new().with_router(&router).with_request(&request);
        let mut table = ComponentTable::new();

        assert_eq!(resolver.resolve("/whoami", &mut table).unwrap().text, "/whoami for ada");
        assert_eq!(resolver.resolve("/whoami", &mut table).unwrap().text, "/whoami for ada");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_external_fetch_forwards_headers_but_not_cookies() {
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let request = RequestContext::default()
            .with_header("Accept-Language", "en")
            .with_header("Cookie", "session=secret")
            .with_header("Host", "site.example");
        let resolver = Resolver::new().with_fetcher(&fetcher).with_request(&request);
        let mut table = ComponentTable::new();

        let el = resolver.resolve("https://cdn.example/c.json", &mut table).unwrap();
        assert_eq!(el.attributes["data-headers"], "Accept-Language");
        assert!(table.contains("https://cdn.example/c.json"));
        resolver.resolve("https://cdn.example/c.json", &mut table).unwrap();
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_discarded_reference_is_not_refetched() {
        let fetcher = CountingFetcher { calls: Cell::new(0) };
        let resolver = Resolver::new().with_fetcher(&fetcher);
        let mut table = ComponentTable::new();
        resolver.resolve("https://cdn.example/c.json", &mut table).unwrap();
        table.discard("https://cdn.example/c.json");
        assert!(resolver.resolve("https://cdn.example/c.json", &mut table).is_err());
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn test_missing_collaborators_are_errors() {
        let resolver = Resolver::new();
        let mut table = ComponentTable::new();
        assert!(matches!(
            resolver.resolve("/pages", &mut table),
            Err(RenderError::RouterUnavailable { .. })
        ));
        assert!(matches!(
            resolver.resolve("https://cdn.example/c.json", &mut table),
            Err(RenderError::FetcherUnavailable { .. })
        ));
    }

    #[test]
    fn test_cycle_guard_refuses_open_references_only() {
        let mut guard = CycleGuard::new();
        assert!(guard.enter("page"));
        assert!(guard.enter("card"));
        assert!(!guard.enter("card"));
        assert!(!guard.enter("page"));
        assert_eq!(guard.depth(), 2);

        // Sibling branch: once closed, the same reference may open again.
        guard.leave("card");
        assert!(guard.enter("card"));
        guard.leave("card");
        guard.leave("page");
        assert!(guard.is_empty());
    }
}
