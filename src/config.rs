use crate::engine::{EditorBootstrap, RenderOptions};
use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration, loaded from YAML.
///
/// ```yaml
/// sites_dir: ./sites
/// preview:
///   editor_script: /static/editor.js
/// fetch:
///   timeout_secs: 10
///   user_agent: pageforge/0.1
/// ```
///
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding one `{tenant}.json` site file per tenant
    pub sites_dir: PathBuf,
    pub preview: PreviewConfig,
    pub fetch: FetchConfig,
}

/// Editor assets injected into preview renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub editor_script: String,
    pub editor_stylesheet: String,
}

/// Settings for the HTTP client used by external imports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Whole-request timeout; 0 disables it
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sites_dir: PathBuf::from("sites"),
            preview: PreviewConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        let editor = EditorBootstrap::default();
        Self {
            editor_script: editor.script_src,
            editor_stylesheet: editor.stylesheet,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: format!("pageforge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(yaml: &str) -> RenderResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> RenderResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Config(format!("read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Render options for one request
    pub fn render_options(&self, nonce: Option<String>) -> RenderOptions {
        RenderOptions {
            nonce,
            editor: EditorBootstrap {
                script_src: self.preview.editor_script.clone(),
                stylesheet: self.preview.editor_stylesheet.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fetch.timeout_secs, 10);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
sites_dir: /srv/sites
fetch:
  timeout_secs: 3
preview:
  editor_script: /assets/edit.js
"#;
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.sites_dir, PathBuf::from("/srv/sites"));
        assert_eq!(config.fetch.timeout_secs, 3);
        assert!(config.fetch.user_agent.starts_with("pageforge/"));

        let options = config.render_options(Some("n0nce".into()));
        assert_eq!(options.editor.script_src, "/assets/edit.js");
        assert_eq!(options.editor.stylesheet, EditorBootstrap::default().stylesheet);
        assert_eq!(options.nonce.as_deref(), Some("n0nce"));
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        let result = EngineConfig::from_yaml_str("fetch: [1, 2");
        assert!(matches!(result, Err(RenderError::Config(_))));
    }
}
