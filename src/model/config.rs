use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Configuration from fex.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FexConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Item schema, used only when items are served from a local file
    #[serde(default)]
    pub schema: Option<toml::Table>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the labeling backend
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: default_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Default: see CONFIG_TEMPLATE in io/config_io.rs
fn default_url() -> String {
    "http://localhost:8080".to_string()
}

/// Default: see CONFIG_TEMPLATE in io/config_io.rs
fn default_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub show_key_hints: bool,
    /// File that an embedding host appends JSON commands to
    #[serde(default)]
    pub inbox: Option<String>,
    /// Theme overrides, name → "#RRGGBB"
    #[serde(default)]
    pub colors: HashMap<String, String>,
    /// Colors for individual labels in multilabel fields
    #[serde(default)]
    pub label_colors: HashMap<String, String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_key_hints: true,
            inbox: None,
            colors: HashMap::new(),
            label_colors: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}
