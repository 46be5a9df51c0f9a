//! Widget configuration parsed from environment variables.
//!
//! This is the rcParams equivalent: save defaults used by downloads, the
//! interactive drawing policy, deferred display, and view chrome flags.

use crate::backend::{Dpi, ExportFormat};
use crate::frame::ErrorCode;
use crate::toolbar::{ButtonStyle, ToolbarPosition};

pub const ENV_SAVEFIG_FORMAT: &str = "FIGWIDGET_SAVEFIG_FORMAT";
pub const ENV_SAVEFIG_DPI: &str = "FIGWIDGET_SAVEFIG_DPI";
pub const ENV_SAVEFIG_TRANSPARENT: &str = "FIGWIDGET_SAVEFIG_TRANSPARENT";
pub const ENV_TRANSPARENT: &str = "FIGWIDGET_TRANSPARENT";
pub const ENV_INTERACTIVE: &str = "FIGWIDGET_INTERACTIVE";
pub const ENV_DEFER_DISPLAY: &str = "FIGWIDGET_DEFER_DISPLAY";
pub const ENV_TOOLBAR_VISIBLE: &str = "FIGWIDGET_TOOLBAR_VISIBLE";
pub const ENV_TOOLBAR_POSITION: &str = "FIGWIDGET_TOOLBAR_POSITION";
pub const ENV_HEADER_VISIBLE: &str = "FIGWIDGET_HEADER_VISIBLE";
pub const ENV_FOOTER_VISIBLE: &str = "FIGWIDGET_FOOTER_VISIBLE";
pub const ENV_RESIZABLE: &str = "FIGWIDGET_RESIZABLE";
pub const ENV_CAPTURE_SCROLL: &str = "FIGWIDGET_CAPTURE_SCROLL";
pub const ENV_BUTTON_STYLE: &str = "FIGWIDGET_BUTTON_STYLE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({expected})")]
    InvalidValue { var: &'static str, value: String, expected: &'static str },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidValue { .. } => "E_CONFIG_PARSE",
        }
    }
}

/// Defaults for downloads triggered without explicit arguments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaveDefaults {
    pub format: ExportFormat,
    pub dpi: Dpi,
    pub transparent: bool,
}

impl Default for SaveDefaults {
    fn default() -> Self {
        Self { format: ExportFormat::Png, dpi: Dpi::Figure, transparent: false }
    }
}

/// Layout flags mirrored to every view of a canvas.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    pub toolbar_visible: bool,
    pub toolbar_position: ToolbarPosition,
    pub header_visible: bool,
    pub footer_visible: bool,
    pub resizable: bool,
    pub capture_scroll: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            toolbar_visible: true,
            toolbar_position: ToolbarPosition::Left,
            header_visible: true,
            footer_visible: true,
            resizable: true,
            capture_scroll: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    pub save: SaveDefaults,
    /// New figures get a transparent background.
    pub transparent_figures: bool,
    /// Draws are batched and flushed once per unit of interactive work.
    pub interactive: bool,
    /// Hold a requested display until the first non-blank frame.
    pub defer_display: bool,
    pub view: ViewOptions,
    pub button_style: ButtonStyle,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            save: SaveDefaults::default(),
            transparent_figures: false,
            interactive: true,
            defer_display: false,
            view: ViewOptions::default(),
            button_style: ButtonStyle::None,
        }
    }
}

impl WidgetConfig {
    /// Build typed config from environment variables.
    ///
    /// All optional:
    /// - `FIGWIDGET_SAVEFIG_FORMAT`: `png` (default), `pdf`, `svg`, `pgf`
    /// - `FIGWIDGET_SAVEFIG_DPI`: `figure` (default) or a positive number
    /// - `FIGWIDGET_SAVEFIG_TRANSPARENT`, `FIGWIDGET_TRANSPARENT`: default false
    /// - `FIGWIDGET_INTERACTIVE`: default true
    /// - `FIGWIDGET_DEFER_DISPLAY`: default false
    /// - `FIGWIDGET_TOOLBAR_VISIBLE`, `FIGWIDGET_HEADER_VISIBLE`,
    ///   `FIGWIDGET_FOOTER_VISIBLE`, `FIGWIDGET_RESIZABLE`: default true
    /// - `FIGWIDGET_TOOLBAR_POSITION`: `left` (default), `right`, `top`, `bottom`
    /// - `FIGWIDGET_CAPTURE_SCROLL`: default false
    /// - `FIGWIDGET_BUTTON_STYLE`: empty (default), `primary`, `success`,
    ///   `info`, `warning`, `danger`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var_os(key).map(|v| v.to_string_lossy().into_owned()))
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a value that does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let flag = |var: &'static str, default: bool| match lookup(var) {
            Some(raw) => parse_bool(var, &raw),
            None => Ok(default),
        };

        let format = match lookup(ENV_SAVEFIG_FORMAT) {
            Some(raw) => raw.parse::<ExportFormat>().map_err(|_| ConfigError::InvalidValue {
                var: ENV_SAVEFIG_FORMAT,
                value: raw,
                expected: "png, pdf, svg or pgf",
            })?,
            None => defaults.save.format,
        };
        let dpi = match lookup(ENV_SAVEFIG_DPI) {
            Some(raw) => parse_dpi(&raw)?,
            None => defaults.save.dpi,
        };
        let save = SaveDefaults { format, dpi, transparent: flag(ENV_SAVEFIG_TRANSPARENT, defaults.save.transparent)? };

        let toolbar_position = match lookup(ENV_TOOLBAR_POSITION) {
            Some(raw) => raw.parse::<ToolbarPosition>().map_err(|()| ConfigError::InvalidValue {
                var: ENV_TOOLBAR_POSITION,
                value: raw,
                expected: "top, bottom, left or right",
            })?,
            None => defaults.view.toolbar_position,
        };
        let view = ViewOptions {
            toolbar_visible: flag(ENV_TOOLBAR_VISIBLE, defaults.view.toolbar_visible)?,
            toolbar_position,
            header_visible: flag(ENV_HEADER_VISIBLE, defaults.view.header_visible)?,
            footer_visible: flag(ENV_FOOTER_VISIBLE, defaults.view.footer_visible)?,
            resizable: flag(ENV_RESIZABLE, defaults.view.resizable)?,
            capture_scroll: flag(ENV_CAPTURE_SCROLL, defaults.view.capture_scroll)?,
        };

        let button_style = match lookup(ENV_BUTTON_STYLE) {
            Some(raw) => raw.parse::<ButtonStyle>().map_err(|()| ConfigError::InvalidValue {
                var: ENV_BUTTON_STYLE,
                value: raw,
                expected: "primary, success, info, warning, danger or empty",
            })?,
            None => defaults.button_style,
        };

        Ok(Self {
            save,
            transparent_figures: flag(ENV_TRANSPARENT, defaults.transparent_figures)?,
            interactive: flag(ENV_INTERACTIVE, defaults.interactive)?,
            defer_display: flag(ENV_DEFER_DISPLAY, defaults.defer_display)?,
            view,
            button_style,
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value: raw.to_string(), expected: "a boolean" }),
    }
}

fn parse_dpi(raw: &str) -> Result<Dpi, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("figure") {
        return Ok(Dpi::Figure);
    }
    match trimmed.parse::<f64>() {
        Ok(dpi) if dpi.is_finite() && dpi > 0.0 => Ok(Dpi::Value(dpi)),
        _ => Err(ConfigError::InvalidValue {
            var: ENV_SAVEFIG_DPI,
            value: raw.to_string(),
            expected: "`figure` or a positive number",
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
