use crate::element::{Element, Page, SiteData};
use crate::error::{RenderError, RenderResult};
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_NESTING_DEPTH: usize = 64;

/// Characters that would let a style value escape its CSS rule or the `<style>` element
const FORBIDDEN_STYLE_CHARS: &[char] = &['{', '}', ';', '<', '>'];

/// Validate an element tree
pub fn validate_element(element: &Element) -> RenderResult<()> {
    validate_element_recursive(element, 0)
}

/// Validate every element of a page's head and body
pub fn validate_page(page: &Page) -> RenderResult<()> {
    for element in page.head.elements.iter().chain(&page.body.elements) {
        validate_element(element)?;
    }
    for target in [&page.redirect_for_login, &page.redirect_for_logout] {
        if !target.is_empty() {
            validate_redirect(target)?;
        }
    }
    Ok(())
}

/// Validate all pages and components of a site, in name order
pub fn validate_site(site: &SiteData) -> RenderResult<()> {
    for name in site.page_names() {
        if let Some(page) = site.page(&name) {
            validate_page(page)?;
        }
    }

    let mut components: Vec<_> = site.components.iter().collect();
    components.sort_by(|a, b| a.0.cmp(b.0));
    for (name, component) in components {
        validate_component_name(name)?;
        validate_element(component)?;
    }
    Ok(())
}

fn validate_element_recursive(element: &Element, depth: usize) -> RenderResult<()> {
    if depth > MAX_NESTING_DEPTH {
        return Err(RenderError::MaxNestingDepthExceeded {
            max_depth: MAX_NESTING_DEPTH,
        });
    }

    if element.is_import() {
        validate_import(element)?;
    } else {
        if element.private {
            return Err(RenderError::InvalidImport {
                tag: element.kind.clone(),
                reason: "'private' is only meaningful on an import".to_string(),
            });
        }
        // An empty type is a synthetic root and renders children only.
        if !element.kind.is_empty() {
            validate_tag(&element.kind)?;
        }
    }

    for name in element.attributes.keys() {
        validate_attribute_name(&element.kind, name)?;
    }
    for (property, value) in &element.style {
        validate_style(property, value)?;
    }

    for child in &element.elements {
        validate_element_recursive(child, depth + 1)?;
    }
    Ok(())
}

fn validate_tag(tag: &str) -> RenderResult<()> {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = TAG_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9-]*$").unwrap());
    if !re.is_match(tag) {
        return Err(RenderError::InvalidTag { tag: tag.to_string() });
    }
    Ok(())
}

fn validate_attribute_name(tag: &str, name: &str) -> RenderResult<()> {
    static ATTRIBUTE_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = ATTRIBUTE_REGEX.get_or_init(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_.:-]*$").unwrap());
    // pid is reserved for preview renders
    if !re.is_match(name) || name.eq_ignore_ascii_case("pid") {
        return Err(RenderError::InvalidAttribute {
            tag: tag.to_string(),
            name: name.to_string(),
        });
    }
    Ok(())
}

fn validate_style(property: &str, value: &str) -> RenderResult<()> {
    static PROPERTY_REGEX: OnceLock<Regex> = OnceLock::new();
    let re = PROPERTY_REGEX.get_or_init(|| Regex::new(r"^-{0,2}[a-zA-Z][a-zA-Z0-9-]*$").unwrap());
    if !re.is_match(property) {
        return Err(RenderError::InvalidStyle {
            property: property.to_string(),
            reason: "property names may contain only letters, digits and '-'".to_string(),
        });
    }
    if value.contains(FORBIDDEN_STYLE_CHARS) || value.contains("*/") || value.contains("/*") {
        return Err(RenderError::InvalidStyle {
            property: property.to_string(),
            reason: "value must not contain braces, ';', '<', '>' or comment markers".to_string(),
        });
    }
    Ok(())
}

fn validate_import(element: &Element) -> RenderResult<()> {
    if element.import.chars().any(char::is_whitespace) {
        return Err(RenderError::InvalidImport {
            tag: element.kind.clone(),
            reason: format!("reference '{}' contains whitespace", element.import),
        });
    }
    Ok(())
}

fn validate_component_name(name: &str) -> RenderResult<()> {
    if name.is_empty() || name.contains('/') {
        return Err(RenderError::ValidationError(format!(
            "component name '{}' must be non-empty and contain no '/'",
            name
        )));
    }
    Ok(())
}

fn validate_redirect(target: &str) -> RenderResult<()> {
    if target.chars().any(char::is_whitespace) {
        return Err(RenderError::ValidationError(format!(
            "redirect target '{}' must not contain whitespace",
            target
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tree() {
        let el = Element::new("div")
            .with_attribute("data-id", "1")
            .with_attribute("aria-label", "x")
            .with_style("--accent", "#fff")
            .with_style("margin-top", "4px")
            .with_child(Element::import("nav").with_private(true))
            .with_child(Element::new("").with_text("raw"));
        assert!(validate_element(&el).is_ok());
    }

    #[test]
    fn test_invalid_tag() {
        let el = Element::new("di v");
        assert!(matches!(validate_element(&el), Err(RenderError::InvalidTag { .. })));
    }

    #[test]
    fn test_reserved_pid_attribute() {
        let el = Element::new("p").with_attribute("pid", "x");
        assert!(matches!(validate_element(&el), Err(RenderError::InvalidAttribute { .. })));
    }

    #[test]
    fn test_style_value_cannot_break_out() {
        let el = Element::new("p").with_style("color", "red;} body{display:none");
        assert!(matches!(validate_element(&el), Err(RenderError::InvalidStyle { .. })));
        let el = Element::new("p").with_style("color", "red</style>");
        assert!(validate_element(&el).is_err());
    }

    #[test]
    fn test_private_without_import() {
        let el = Element::new("p").with_private(true);
        assert!(matches!(validate_element(&el), Err(RenderError::InvalidImport { .. })));
    }

    #[test]
    fn test_nesting_depth() {
        let mut el = Element::new("span");
        for _ in 0..=MAX_NESTING_DEPTH {
            el = Element::new("div").with_child(el);
        }
        assert_eq!(
            validate_element(&el),
            Err(RenderError::MaxNestingDepthExceeded {
                max_depth: MAX_NESTING_DEPTH
            })
        );
    }
}
