//! Project configuration.
//!
//! Loads and validates `config.toml` from the project directory. Every key
//! has a default, so the file only needs the keys it changes, and the
//! command line can still override the content and output directories.
//!
//! ## Project Layout
//!
//! ```text
//! my-site/
//! ├── config.toml      # Optional
//! ├── content/         # Pages and assets → routes
//! ├── partials/        # *.html fragments, includable from every page
//! ├── templates/       # Named layouts (`template: base.html`)
//! └── dist/            # Generated site
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "content"
//! output_dir = "dist"
//! partials_dir = "partials"
//! templates_dir = "templates"
//!
//! [resolve]
//! max_iterations = 64   # Evaluate/expand passes before giving up
//! ```
//!
//! Relative directories are resolved against the project directory. Unknown
//! keys are rejected to catch typos early.

use crate::generate::RenderConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the project directory.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Content directory scanned into routes.
    pub content_dir: PathBuf,
    /// Where the generated site is written.
    pub output_dir: PathBuf,
    /// Directory of `*.html` partials.
    pub partials_dir: PathBuf,
    /// Directory of named layouts.
    pub templates_dir: PathBuf,
    /// Fixed-point resolution settings.
    pub resolve: ResolveConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            output_dir: PathBuf::from("dist"),
            partials_dir: PathBuf::from("partials"),
            templates_dir: PathBuf::from("templates"),
            resolve: ResolveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Upper bound on evaluate/expand passes.
    pub max_iterations: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self { max_iterations: 64 }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolve.max_iterations == 0 {
            return Err(ConfigError::Validation(
                "resolve.max_iterations must be at least 1".into(),
            ));
        }
        for (key, dir) in [
            ("content_dir", &self.content_dir),
            ("output_dir", &self.output_dir),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        Ok(())
    }

    /// Content directory, relative to `project_dir` unless absolute.
    pub fn content_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.content_dir)
    }

    /// Render-stage directories, relative to `project_dir` unless absolute.
    pub fn render_config(&self, project_dir: &Path) -> RenderConfig {
        RenderConfig {
            output_dir: project_dir.join(&self.output_dir),
            partials_dir: project_dir.join(&self.partials_dir),
            templates_dir: project_dir.join(&self.templates_dir),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Directory overrides given on the command line. Like the config file's
/// own values they are relative to the project directory unless absolute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub content_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl SiteConfig {
    /// Replace the directories `overrides` sets, then re-validate.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Result<Self, ConfigError> {
        if let Some(dir) = &overrides.content_dir {
            self.content_dir = dir.clone();
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        self.validate()?;
        Ok(self)
    }
}

/// Parse and validate config text. Keys it leaves out take their defaults.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from the project directory. A project without one
/// gets the defaults.
pub fn load_config(project_dir: &Path) -> Result<SiteConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(SiteConfig::default());
    }
    let content = fs::read_to_string(&config_path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Trellis Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# Content tree: every file becomes a route. Files named index.* are their
# directory's own page; [name] segments expand into one route per value.
content_dir = "content"

# Where the generated site is written.
output_dir = "dist"

# Every *.html file here can be included from any page:
#   {% include "nav.html" %}
partials_dir = "partials"

# Named layouts. A page selects one with `template: base.html` in its
# front matter.
templates_dir = "templates"

# ---------------------------------------------------------------------------
# Route resolution
# ---------------------------------------------------------------------------
[resolve]
# Metadata expressions and [placeholder] expansion are re-run until the set
# of routes stops changing. Give up with an error after this many passes.
max_iterations = 64
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.content_dir, Path::new("content"));
        assert_eq!(config.output_dir, Path::new("dist"));
        assert_eq!(config.partials_dir, Path::new("partials"));
        assert_eq!(config.templates_dir, Path::new("templates"));
        assert_eq!(config.resolve.max_iterations, 64);
    }

    #[test]
    fn parse_partial_config() {
        let config: SiteConfig = toml::from_str(r#"output_dir = "public""#).unwrap();
        assert_eq!(config.output_dir, Path::new("public"));
        // Default values preserved
        assert_eq!(config.content_dir, Path::new("content"));
        assert_eq!(config.resolve.max_iterations, 64);
    }

    #[test]
    fn render_config_joins_project_dir() {
        let config = SiteConfig::default();
        let render = config.render_config(Path::new("/site"));
        assert_eq!(render.output_dir, Path::new("/site/dist"));
        assert_eq!(render.partials_dir, Path::new("/site/partials"));
        assert_eq!(render.templates_dir, Path::new("/site/templates"));
        assert_eq!(config.content_path(Path::new("/site")), Path::new("/site/content"));
    }

    #[test]
    fn absolute_dirs_are_kept() {
        let config: SiteConfig = toml::from_str(r#"output_dir = "/var/www""#).unwrap();
        let render = config.render_config(Path::new("/site"));
        assert_eq!(render.output_dir, Path::new("/var/www"));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
content_dir = "pages"

[resolve]
max_iterations = 8
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.content_dir, Path::new("pages"));
        assert_eq!(config.resolve.max_iterations, 8);
        // Unspecified values should be defaults
        assert_eq!(config.output_dir, Path::new("dist"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[resolve]\nmax_iterations = 0\n").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Override tests
    // =========================================================================

    #[test]
    fn overrides_replace_directories() {
        let overrides = Overrides {
            content_dir: Some(PathBuf::from("pages")),
            output_dir: Some(PathBuf::from("/srv/www")),
        };
        let config = SiteConfig::default().with_overrides(&overrides).unwrap();
        assert_eq!(config.content_path(Path::new("/site")), Path::new("/site/pages"));
        assert_eq!(
            config.render_config(Path::new("/site")).output_dir,
            Path::new("/srv/www")
        );
        assert_eq!(config.partials_dir, Path::new("partials"));
    }

    #[test]
    fn absent_overrides_keep_file_values() {
        let config = parse_config(r#"output_dir = "public""#)
            .unwrap()
            .with_overrides(&Overrides::default())
            .unwrap();
        assert_eq!(config.output_dir, Path::new("public"));
        assert_eq!(config.content_dir, Path::new("content"));
    }

    #[test]
    fn override_wins_over_config_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "content_dir = \"pages\"\n").unwrap();
        let overrides = Overrides {
            content_dir: Some(PathBuf::from("drafts")),
            output_dir: None,
        };
        let config = load_config(tmp.path())
            .unwrap()
            .with_overrides(&overrides)
            .unwrap();
        assert_eq!(config.content_dir, Path::new("drafts"));
        assert_eq!(config.output_dir, Path::new("dist"));
    }

    #[test]
    fn empty_override_is_rejected() {
        let overrides = Overrides {
            content_dir: None,
            output_dir: Some(PathBuf::new()),
        };
        let result = SiteConfig::default().with_overrides(&overrides);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str(r#"content_dri = "x""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[resolve]\nmax_iter = 3\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[render]\nfoo = 1\n").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[resolve]"));
        assert!(content.contains("templates_dir"));
    }
}
