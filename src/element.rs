use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name of the page rendered when no page name is requested.
pub const DEFAULT_PAGE: &str = "home";

/// A node of a page: tag, attributes, inline style, text, children and an
/// optional reference to a reusable component.
///
/// Every field except `type` is omitted from JSON when empty. Explicit
/// `null` values are read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Element {
    /// Tag name (e.g. "div", "h1", "a"). Empty only for a synthetic root.
    #[serde(rename = "type", deserialize_with = "nullable")]
    pub kind: String,
    /// Attribute name -> value. A `class` entry is merged with the generated class.
    #[serde(skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "nullable")]
    pub attributes: BTreeMap<String, String>,
    /// Child elements, in rendering order.
    #[serde(skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub elements: Vec<Element>,
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "nullable")]
    pub text: String,
    /// CSS property -> value, emitted in insertion order.
    #[serde(skip_serializing_if = "IndexMap::is_empty", deserialize_with = "nullable")]
    pub style: IndexMap<String, String>,
    /// Component name, `/internal/route`, or external URL.
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "nullable")]
    pub import: String,
    /// Discard the imported component from the table after this use.
    #[serde(skip_serializing_if = "is_false", deserialize_with = "nullable")]
    pub private: bool,
    /// Preview identifier, assigned while rendering in preview mode.
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "nullable")]
    pub pid: String,
}

impl Element {
    /// Create an element of the given type with no content
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Create an element that imports `reference`
    pub fn import(reference: impl Into<String>) -> Self {
        Self {
            import: reference.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.elements.push(child);
        self
    }

    pub fn with_private(mut self, private: bool) -> Self {
        self.private = private;
        self
    }

    /// Preset the preview id, as an editor client does
    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.pid = pid.into();
        self
    }

    /// True if this element stands in for a component
    pub fn is_import(&self) -> bool {
        !self.import.is_empty()
    }
}

/// A list of elements: the head or the body of a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Section {
    #[serde(deserialize_with = "nullable")]
    pub elements: Vec<Element>,
}

/// One page of a site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Page {
    #[serde(deserialize_with = "nullable")]
    pub head: Section,
    #[serde(deserialize_with = "nullable")]
    pub body: Section,
    /// Where to send a visitor who already has an active session
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "nullable")]
    pub redirect_for_login: String,
    /// Where to send a visitor without a session
    #[serde(skip_serializing_if = "String::is_empty", deserialize_with = "nullable")]
    pub redirect_for_logout: String,
}

impl Page {
    /// Build a page from head and body element lists
    pub fn new(head: Vec<Element>, body: Vec<Element>) -> Self {
        Self {
            head: Section { elements: head },
            body: Section { elements: body },
            ..Self::default()
        }
    }

    /// Returns the redirect target for the visitor's session state, if any
    pub fn redirect_for(&self, logged_in: bool) -> Option<&str> {
        let target = if logged_in {
            &self.redirect_for_login
        } else {
            &self.redirect_for_logout
        };
        (!target.is_empty()).then_some(target.as_str())
    }
}

/// Shared, immutable component definitions keyed by name
pub type ComponentMap = HashMap<String, Arc<Element>>;

/// Everything stored for one tenant: its pages and its reusable components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteData {
    #[serde(deserialize_with = "nullable")]
    pub pages: HashMap<String, Page>,
    #[serde(deserialize_with = "nullable")]
    pub components: Arc<ComponentMap>,
}

impl SiteData {
    /// Parse site data from its stored JSON form
    pub fn from_json(json: &str) -> crate::RenderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a page by name; an empty name means the home page
    pub fn page(&self, name: &str) -> Option<&Page> {
        let name = if name.is_empty() { DEFAULT_PAGE } else { name };
        self.pages.get(name)
    }

    /// Sorted page names
    pub fn page_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.pages.keys().cloned().collect();
        names.sort();
        names
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Deserialize `null` as the type's default value
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
