//! Engine configuration
//!
//! Geometry constants for cover-and-redraw, history policy and output limits.
//! The host hands configuration in memory, optionally as a TOML string; the
//! engine never reads configuration files itself.

use crate::color::Rgb;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra width (points) added to a covering rectangle, split between both sides
    pub cover_margin: f64,
    /// Cover height as a multiple of the font size
    pub cover_height_factor: f64,
    /// How far below the baseline the cover starts, as a multiple of the font size
    pub descent_factor: f64,
    /// Cover color when no background fill can be sampled from the page
    pub default_background: Rgb,
    /// Text color used when a caller does not specify one
    pub default_text_color: Rgb,
    /// Highlight alpha used when an annotation leaves opacity unset
    pub highlight_opacity: f64,
    /// Maximum number of undoable operations kept by an edit session
    pub max_history: Option<usize>,
    /// Upper bound on a serialized document, in bytes
    pub max_output_bytes: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cover_margin: 4.0,
            cover_height_factor: 1.2,
            descent_factor: 0.25,
            default_background: Rgb::WHITE,
            default_text_color: Rgb::BLACK,
            highlight_opacity: 0.4,
            max_history: Some(100),
            max_output_bytes: None,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string. Missing keys take their defaults.
    ///
    /// ```
    /// use pdfedit_core::EngineConfig;
    ///
    /// let config = EngineConfig::from_toml_str("cover_margin = 6.0").unwrap();
    /// assert_eq!(config.cover_margin, 6.0);
    /// assert_eq!(config.cover_height_factor, 1.2);
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("cover_margin", self.cover_margin),
            ("descent_factor", self.descent_factor),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }

        if !self.cover_height_factor.is_finite() || self.cover_height_factor <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "cover_height_factor must be positive (got {})",
                self.cover_height_factor
            )));
        }

        if !(self.highlight_opacity > 0.0 && self.highlight_opacity <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "highlight_opacity must be in (0, 1] (got {})",
                self.highlight_opacity
            )));
        }

        if !self.default_background.is_valid() || !self.default_text_color.is_valid() {
            return Err(EngineError::InvalidConfig(
                "color channels must be within 0-1".into(),
            ));
        }

        if self.max_history == Some(0) {
            return Err(EngineError::InvalidConfig(
                "max_history must be at least 1 (omit it for unbounded history)".into(),
            ));
        }

        Ok(())
    }
}
