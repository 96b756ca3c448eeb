//! Decal configuration system
//!
//! This crate provides centralized configuration management for the import
//! pipeline, loading settings from `decal.toml` with `DECAL_*` environment
//! variables as overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the import pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DecalConfig {
    /// Extraction viewport settings
    pub viewport: ViewportConfig,
    /// Extractor settings
    pub extract: ExtractConfig,
    /// Font catalog settings
    pub fonts: FontsConfig,
    /// CLI output settings
    pub output: OutputConfig,
}

/// Extraction viewport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Viewport width in CSS pixels
    pub width: f32,
    /// Viewport height in CSS pixels
    pub height: f32,
}

/// Extractor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Number of layout settle passes before measuring
    pub settle_passes: usize,
    /// Base URL for resolving relative image sources
    pub base_url: Option<String>,
}

/// Font catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontsConfig {
    /// Resolve fonts against the system font database instead of the fixed
    /// catalog
    pub use_system: bool,
    /// Extra families seeded into the fixed catalog
    pub families: Vec<String>,
}

/// CLI output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Print the extracted IR as JSON
    pub ir: bool,
    /// Print the rebuilt scene as JSON
    pub scene: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Fill for image and failed-vector placeholders, in any supported
    /// color syntax (e.g. "#d9d9d9")
    pub placeholder_fill: Option<String>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self { width: 1280.0, height: 800.0 }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            settle_passes: 2, // Matches the extractor's default
            base_url: None,
        }
    }
}

impl Default for FontsConfig {
    fn default() -> Self {
        Self { use_system: false, families: Vec::new() }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { ir: false, scene: false, pretty: true, placeholder_fill: None }
    }
}

impl DecalConfig {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the decal.toml configuration file
    ///
    /// # Returns
    /// * `Ok(DecalConfig)` - Successfully loaded configuration
    /// * `Err(String)` - Error message if loading failed
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Load configuration from the default location (decal.toml in the
    /// current directory) or return default configuration if file doesn't
    /// exist
    pub fn load_or_default() -> Self {
        Self::load_from_file("decal.toml").unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    /// This allows for temporary overrides without modifying the config file.
    pub fn merge_with_env(&mut self) {
        // Viewport settings
        if let Ok(val) = std::env::var("DECAL_VIEWPORT_WIDTH") {
            if let Ok(width) = val.parse::<f32>() {
                self.viewport.width = width;
            }
        }
        if let Ok(val) = std::env::var("DECAL_VIEWPORT_HEIGHT") {
            if let Ok(height) = val.parse::<f32>() {
                self.viewport.height = height;
            }
        }

        // Extractor settings
        if let Ok(val) = std::env::var("DECAL_SETTLE_PASSES") {
            if let Ok(passes) = val.parse::<usize>() {
                self.extract.settle_passes = passes;
            }
        }
        if let Ok(base_url) = std::env::var("DECAL_BASE_URL") {
            self.extract.base_url = Some(base_url);
        }

        // Font settings
        if let Ok(val) = std::env::var("DECAL_USE_SYSTEM_FONTS") {
            self.fonts.use_system = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("DECAL_FONT_FAMILIES") {
            self.fonts.families =
                val.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
        }

        // Output settings
        if let Ok(val) = std::env::var("DECAL_OUTPUT_IR") {
            self.output.ir = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("DECAL_OUTPUT_SCENE") {
            self.output.scene = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(val) = std::env::var("DECAL_OUTPUT_PRETTY") {
            self.output.pretty = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Ok(fill) = std::env::var("DECAL_PLACEHOLDER_FILL") {
            self.output.placeholder_fill = Some(fill);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// This is the recommended way to load configuration:
    /// 1. Load from decal.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DecalConfig::default();
        assert_eq!(config.viewport.width, 1280.0);
        assert_eq!(config.viewport.height, 800.0);
        assert_eq!(config.extract.settle_passes, 2);
        assert!(!config.fonts.use_system);
        assert!(config.output.pretty);
        assert!(!config.output.ir);
    }

    #[test]
    fn test_toml_serialization() {
        let config = DecalConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: DecalConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.viewport.width, 1280.0);
        assert_eq!(parsed.extract.settle_passes, 2);
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let parsed: DecalConfig =
            toml::from_str("[viewport]\nwidth = 640.0\n\n[output]\nscene = true\n").unwrap();
        assert_eq!(parsed.viewport.width, 640.0);
        // Unset fields fall back per section.
        assert_eq!(parsed.viewport.height, 800.0);
        assert_eq!(parsed.extract.settle_passes, 2);
        assert!(parsed.output.scene);
        assert!(parsed.output.pretty);
    }

    #[test]
    fn test_load_or_default() {
        // Should not panic even if decal.toml doesn't exist
        let config = DecalConfig::load_or_default();
        assert_eq!(config.extract.settle_passes, 2);
    }

    #[test]
    fn test_merge_with_env() {
        // Set environment variables
        unsafe {
            std::env::set_var("DECAL_SETTLE_PASSES", "4");
            std::env::set_var("DECAL_OUTPUT_IR", "true");
            std::env::set_var("DECAL_FONT_FAMILIES", "Inter, Roboto");
        }

        let mut config = DecalConfig::default();
        config.merge_with_env();

        assert_eq!(config.extract.settle_passes, 4);
        assert!(config.output.ir);
        assert_eq!(config.fonts.families, vec!["Inter".to_owned(), "Roboto".to_owned()]);

        // Clean up
        unsafe {
            std::env::remove_var("DECAL_SETTLE_PASSES");
            std::env::remove_var("DECAL_OUTPUT_IR");
            std::env::remove_var("DECAL_FONT_FAMILIES");
        }
    }
}
