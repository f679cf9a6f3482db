use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    // --- component resolution ---

    #[error("Component '{reference}' not found")]
    ComponentNotFound { reference: String },

    #[error("Unknown internal route: {path}")]
    UnknownRoute { path: String },

    #[error("Internal route '{path}' failed: {message}")]
    Route { path: String, message: String },

    #[error("Cannot resolve '{path}': no internal router configured")]
    RouterUnavailable { path: String },

    #[error("Cannot fetch '{url}': external component imports are disabled")]
    FetcherUnavailable { url: String },

    #[error("Error fetching {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Error fetching {url}: server responded with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Error decoding JSON from {url}: {message}")]
    Decode { url: String, message: String },

    // --- output ---

    #[error("Output error: {0}")]
    Io(String),

    // --- preview ---

    #[error("No element with pid '{pid}' in this preview")]
    UnknownPid { pid: String },

    // --- site data ---

    #[error("Page '{name}' not found")]
    PageNotFound { name: String },

    #[error("No site data for '{tenant}'")]
    SiteNotFound { tenant: String },

    #[error("Invalid site JSON: {0}")]
    Json(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // --- validation ---

    #[error("Invalid element type '{tag}': expected a letter, then letters, digits or '-'")]
    InvalidTag { tag: String },

    #[error("Invalid attribute '{name}' on <{tag}>")]
    InvalidAttribute { tag: String, name: String },

    #[error("Invalid style property '{property}': {reason}")]
    InvalidStyle { property: String, reason: String },

    #[error("Invalid import on <{tag}>: {reason}")]
    InvalidImport { tag: String, reason: String },

    #[error("Maximum nesting depth ({max_depth}) exceeded")]
    MaxNestingDepthExceeded { max_depth: usize },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl RenderError {
    /// True for failures of component resolution (missing, route, transport, decode).
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            RenderError::ComponentNotFound { .. }
                | RenderError::UnknownRoute { .. }
                | RenderError::Route { .. }
                | RenderError::RouterUnavailable { .. }
                | RenderError::FetcherUnavailable { .. }
                | RenderError::Fetch { .. }
                | RenderError::HttpStatus { .. }
                | RenderError::Decode { .. }
        )
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_errors_are_classified() {
        assert!(RenderError::ComponentNotFound { reference: "nav".into() }.is_resolution());
        assert!(RenderError::Decode {
            url: "https://example.com/c".into(),
            message: "eof".into()
        }
        .is_resolution());
        assert!(!RenderError::Io("broken pipe".into()).is_resolution());
        assert!(!RenderError::UnknownPid { pid: "abc".into() }.is_resolution());
    }

    #[test]
    fn test_fetch_errors_carry_url() {
        let err = RenderError::HttpStatus {
            url: "https://example.com/nav.json".into(),
            status: 404,
        };
        assert!(err.to_string().contains("https://example.com/nav.json"));
        assert!(err.to_string().contains("404"));
    }
}
