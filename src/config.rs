//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/rstree/rstree.toml`
//! 3. Local config: explicit path handed to [`Settings::load`]
//! 4. Environment variables: `RSTREE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::TraversalStrategy;
use crate::errors::{TreeError, TreeResult};

/// What to do when a node that already has a parent is inserted elsewhere.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SanitizePolicy {
    /// Insert a deep copy, the original stays where it is
    #[default]
    Copy,
    /// Fail with `TreeError::AlreadyOwned`
    Reject,
}

impl SanitizePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SanitizePolicy::Copy => "copy",
            SanitizePolicy::Reject => "reject",
        }
    }
}

/// Structural editing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeSettings {
    pub sanitize: SanitizePolicy,
}

/// Transform framework settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransformSettings {
    /// Traversal used by rules that do not pick one themselves
    pub traversal: TraversalStrategy,
}

/// Unified configuration for rstree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub tree: TreeSettings,
    pub transform: TransformSettings,
}

/// Get the XDG config directory for rstree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rstree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("rstree.toml"))
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional TOML file overriding the global config; it must exist
    ///   when given
    pub fn load(local: Option<&Path>) -> TreeResult<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("tree.sanitize", defaults.tree.sanitize.as_str())
            .map_err(config_err)?
            .set_default("transform.traversal", defaults.transform.traversal.as_str())
            .map_err(config_err)?;

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(
                    File::from(global_path)
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        if let Some(path) = local {
            builder = builder.add_source(
                File::from(path.to_path_buf())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix("RSTREE")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = builder.build().map_err(config_err)?;
        config.try_deserialize().map_err(config_err)
    }

    /// Parse an inline TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> TreeResult<Self> {
        toml::from_str(content).map_err(|e| TreeError::Config {
            message: format!("parse settings: {e}"),
        })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> TreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| TreeError::Config {
            message: format!("serialize config: {e}"),
        })
    }
}

fn config_err(e: ConfigError) -> TreeError {
    TreeError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_document_when_parsing_then_uses_defaults() {
        let settings = Settings::from_toml_str("").expect("parse empty document");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.tree.sanitize, SanitizePolicy::Copy);
        assert_eq!(settings.transform.traversal, TraversalStrategy::PreOrder);
    }

    #[test]
    fn given_partial_document_when_parsing_then_keeps_other_defaults() {
        let settings = Settings::from_toml_str(
            r#"
[tree]
sanitize = "reject"
"#,
        )
        .expect("parse partial document");

        assert_eq!(settings.tree.sanitize, SanitizePolicy::Reject);
        assert_eq!(settings.transform.traversal, TraversalStrategy::PreOrder);
    }

    #[test]
    fn given_unknown_policy_when_parsing_then_returns_config_error() {
        let result = Settings::from_toml_str("[tree]\nsanitize = \"share\"\n");
        assert!(matches!(result, Err(TreeError::Config { .. })));
    }

    #[test]
    fn given_settings_when_serializing_then_round_trips() {
        let mut settings = Settings::default();
        settings.transform.traversal = TraversalStrategy::PostOrder;

        let toml = settings.to_toml().expect("serialize");
        assert!(toml.contains("post_order"));
        assert_eq!(Settings::from_toml_str(&toml).expect("parse"), settings);
    }
}
