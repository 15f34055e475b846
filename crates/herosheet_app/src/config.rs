//! herosheet configuration file handling
//!
//! A single TOML file with four optional tables. Every field has a default,
//! so an empty file is a valid configuration.
//!
//! ```toml
//! [site]
//! origin = "https://example.com"
//! post_type = "project"
//! taxonomies = ["project_category"]
//!
//! [overlay]
//! pin_offset = 30.0
//! close_delay_ms = 180
//!
//! [trigger]
//! item_class = "et_pb_portfolio_item"
//!
//! [http]
//! timeout_secs = 10
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use herosheet_layout::OverlayConfig;
use serde::{Deserialize, Serialize};

use crate::error::SheetError;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SheetConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub overlay: OverlaySettings,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Where content comes from
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Scheme and host the REST endpoints live under
    #[serde(default = "default_origin")]
    pub origin: String,
    /// REST slug of the post type opened in the overlay
    #[serde(default = "default_post_type")]
    pub post_type: String,
    /// Taxonomies whose term names appear in the meta line
    #[serde(default = "default_taxonomies")]
    pub taxonomies: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            post_type: default_post_type(),
            taxonomies: default_taxonomies(),
        }
    }
}

fn default_origin() -> String {
    "http://localhost".to_string()
}

fn default_post_type() -> String {
    "project".to_string()
}

fn default_taxonomies() -> Vec<String> {
    vec!["project_category".to_string()]
}

/// Overlay tunables, mirrored into the engine's `OverlayConfig`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OverlaySettings {
    #[serde(default = "default_pin_offset")]
    pub pin_offset: f32,
    #[serde(default = "default_pin_epsilon")]
    pub pin_epsilon: f32,
    #[serde(default = "default_close_delay_ms")]
    pub close_delay_ms: u64,
    #[serde(default = "default_pull_cap_ratio")]
    pub pull_cap_ratio: f32,
    #[serde(default = "default_true")]
    pub use_sheet: bool,
    #[serde(default = "default_true")]
    pub hide_header: bool,
    #[serde(default = "default_true")]
    pub close_in_hero: bool,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            pin_offset: default_pin_offset(),
            pin_epsilon: default_pin_epsilon(),
            close_delay_ms: default_close_delay_ms(),
            pull_cap_ratio: default_pull_cap_ratio(),
            use_sheet: true,
            hide_header: true,
            close_in_hero: true,
        }
    }
}

fn default_pin_offset() -> f32 {
    30.0
}

fn default_pin_epsilon() -> f32 {
    0.5
}

fn default_close_delay_ms() -> u64 {
    180
}

fn default_pull_cap_ratio() -> f32 {
    0.9
}

fn default_true() -> bool {
    true
}

/// Which page elements open the overlay
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TriggerConfig {
    /// Any of these classes on an ancestor marks a grid
    #[serde(default = "default_container_classes")]
    pub container_classes: Vec<String>,
    /// Class of the grid item carrying the `id` attribute
    #[serde(default = "default_item_class")]
    pub item_class: String,
    /// Prefix before the numeric item id
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            container_classes: default_container_classes(),
            item_class: default_item_class(),
            id_prefix: default_id_prefix(),
        }
    }
}

fn default_container_classes() -> Vec<String> {
    [
        "et_pb_portfolio",
        "et_pb_filterable_portfolio",
        "et_pb_fullwidth_portfolio",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_item_class() -> String {
    "et_pb_portfolio_item".to_string()
}

fn default_id_prefix() -> String {
    "post-".to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

impl SheetConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, SheetError> {
        let config: SheetConfig =
            toml::from_str(content).map_err(|e| SheetError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), SheetError> {
        let origin = &self.site.origin;
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(SheetError::Config(format!(
                "site.origin must be an http(s) URL, got {origin:?}"
            )));
        }
        if !(0.0..=1.0).contains(&self.overlay.pull_cap_ratio) {
            return Err(SheetError::Config(format!(
                "overlay.pull_cap_ratio must be within 0..=1, got {}",
                self.overlay.pull_cap_ratio
            )));
        }
        Ok(())
    }

    /// Origin without a trailing slash
    pub fn origin(&self) -> &str {
        self.site.origin.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Engine configuration for the overlay controller
    pub fn overlay_config(&self) -> OverlayConfig {
        let o = &self.overlay;
        OverlayConfig {
            pin_offset: o.pin_offset,
            pin_epsilon: o.pin_epsilon,
            close_delay: Duration::from_millis(o.close_delay_ms),
            pull_cap_ratio: o.pull_cap_ratio,
            use_sheet: o.use_sheet,
            hide_header: o.hide_header,
            close_in_hero: o.close_in_hero,
        }
    }
}
