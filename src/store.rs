//! Where site data comes from.

use crate::cache::ResultCache;
use crate::element::SiteData;
use crate::error::{RenderError, RenderResult};
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Source of a tenant's pages and components
pub trait PageStore: Send + Sync {
    fn fetch(&self, tenant: &str) -> RenderResult<Arc<SiteData>>;
}

/// Reads `{root}/{tenant}.json`
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, tenant: &str) -> RenderResult<PathBuf> {
        validate_tenant(tenant)?;
        Ok(self.root.join(format!("{}.json", tenant)))
    }
}

impl PageStore for JsonDirStore {
    fn fetch(&self, tenant: &str) -> RenderResult<Arc<SiteData>> {
        let path = self.path_for(tenant)?;
        let json = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RenderError::SiteNotFound {
                tenant: tenant.to_string(),
            },
            _ => RenderError::Io(format!("{}: {}", path.display(), e)),
        })?;
        let site = SiteData::from_json(&json)?;
        tracing::debug!(
            tenant,
            pages = site.pages.len(),
            components = site.components.len(),
            "loaded site"
        );
        Ok(Arc::new(site))
    }
}

/// Memoizes another store's site data through a [`ResultCache`]
pub struct CachedStore<S, C> {
    inner: S,
    cache: C,
}

impl<S, C> CachedStore<S, C>
where
    S: PageStore,
    C: ResultCache<Arc<SiteData>>,
{
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    /// Drop the cached entry so the next fetch reloads the tenant
    pub fn invalidate(&self, tenant: &str) -> bool {
        self.cache.delete(tenant)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S, C> PageStore for CachedStore<S, C>
where
    S: PageStore,
    C: ResultCache<Arc<SiteData>>,
{
    fn fetch(&self, tenant: &str) -> RenderResult<Arc<SiteData>> {
        if let Some(site) = self.cache.get(tenant) {
            return Ok(site);
        }
        let site = self.inner.fetch(tenant)?;
        self.cache.set(tenant, Arc::clone(&site));
        Ok(site)
    }
}

/// Tenants are domain names; anything else could escape the store directory
fn validate_tenant(tenant: &str) -> RenderResult<()> {
    static TENANT_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = TENANT_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9.-]*$").unwrap());
    if !re.is_match(tenant) || tenant.contains("..") {
        return Err(RenderError::ValidationError(format!("invalid tenant name '{}'", tenant)));
    }
    Ok(())
}
