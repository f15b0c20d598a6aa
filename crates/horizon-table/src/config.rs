//! Table controller configuration.
//!
//! [`TableConfig`] collects the defaults a [`DataController`](crate::DataController)
//! falls back on. It can be built in code with `with_*` methods or loaded
//! from TOML:
//!
//! ```
//! use horizon_table::TableConfig;
//!
//! let config = TableConfig::from_toml_str(r#"
//!     default_row_height = 52.0
//!     date_format = "%Y-%m-%d"
//!
//!     [auto_text]
//!     characters_per_line = 32
//! "#).unwrap();
//!
//! assert_eq!(config.default_row_height, 52.0);
//! assert_eq!(config.auto_text.characters_per_line, 32);
//! assert_eq!(config.default_text_field_tag, 9999);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::widget::RowAnimation;

/// Tag given to the text field a row uses for text editing, unless the row
/// overrides it.
pub const DEFAULT_TEXT_FIELD_TAG: i64 = 9999;

/// Metrics for the text-based height estimate.
///
/// The estimate is `padding + lines * line_height`, where `lines` is the
/// character count divided by `characters_per_line`, rounded up, and at least
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTextMetrics {
    /// Characters that fit on one line.
    pub characters_per_line: usize,
    /// Height of one line of text.
    pub line_height: f64,
    /// Vertical padding added around the text.
    pub padding: f64,
}

impl Default for AutoTextMetrics {
    fn default() -> Self {
        Self {
            characters_per_line: 38,
            line_height: 21.0,
            padding: 22.0,
        }
    }
}

impl AutoTextMetrics {
    /// Estimated height for `text`.
    pub fn estimate(&self, text: &str) -> f64 {
        let characters = text.chars().count();
        let per_line = self.characters_per_line.max(1);
        let lines = characters.div_ceil(per_line).max(1);
        self.padding + lines as f64 * self.line_height
    }
}

/// Configuration for a data controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Row height used when no other height source applies.
    pub default_row_height: f64,
    /// Estimated height reported before the first layout pass.
    pub estimated_row_height: f64,
    /// Metrics for text-based height estimates.
    pub auto_text: AutoTextMetrics,
    /// `chrono` format string used by the shared date formatter.
    pub date_format: String,
    /// Default tag of a row's text field.
    pub default_text_field_tag: i64,
    /// Animation used for structural updates.
    pub row_animation: RowAnimation,
    /// Give rows with an action a disclosure indicator when they don't set
    /// an accessory.
    pub automatic_disclosure_indicator: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            default_row_height: 44.0,
            estimated_row_height: 44.0,
            auto_text: AutoTextMetrics::default(),
            date_format: "%-d %b %Y".to_string(),
            default_text_field_tag: DEFAULT_TEXT_FIELD_TAG,
            row_animation: RowAnimation::Automatic,
            automatic_disclosure_indicator: true,
        }
    }
}

impl TableConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML. Missing fields keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that values are in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("default_row_height", self.default_row_height),
            ("estimated_row_height", self.estimated_row_height),
            ("auto_text.line_height", self.auto_text.line_height),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidValue {
                    field,
                    message: format!("must be a positive number, got {value}"),
                });
            }
        }
        if self.auto_text.characters_per_line == 0 {
            return Err(ConfigError::InvalidValue {
                field: "auto_text.characters_per_line",
                message: "must be at least 1".to_string(),
            });
        }
        if self.date_format.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "date_format",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Set the default row height.
    pub fn with_default_row_height(mut self, height: f64) -> Self {
        self.default_row_height = height;
        self
    }

    /// Set the estimated row height.
    pub fn with_estimated_row_height(mut self, height: f64) -> Self {
        self.estimated_row_height = height;
        self
    }

    /// Set the text height metrics.
    pub fn with_auto_text(mut self, metrics: AutoTextMetrics) -> Self {
        self.auto_text = metrics;
        self
    }

    /// Set the date display format.
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Set the default text field tag.
    pub fn with_default_text_field_tag(mut self, tag: i64) -> Self {
        self.default_text_field_tag = tag;
        self
    }

    /// Set the structural update animation.
    pub fn with_row_animation(mut self, animation: RowAnimation) -> Self {
        self.row_animation = animation;
        self
    }

    /// Enable or disable the automatic disclosure indicator.
    pub fn with_automatic_disclosure_indicator(mut self, enabled: bool) -> Self {
        self.automatic_disclosure_indicator = enabled;
        self
    }
}
