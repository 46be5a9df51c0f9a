//! Toolbar controller: the navigation actions a canvas view can offer.
//!
//! The toolbar is owned by exactly one canvas. It holds the curated tool list
//! and the exclusive pan/zoom mode; the canvas turns button presses into
//! renderer events, downloads, or exports.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Interactive navigation mode. At most one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavMode {
    #[default]
    #[serde(rename = "")]
    None,
    Pan,
    Zoom,
}

/// Predefined button styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Success,
    Info,
    Warning,
    Danger,
    #[default]
    #[serde(rename = "")]
    None,
}

impl FromStr for ButtonStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "success" => Ok(Self::Success),
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "danger" => Ok(Self::Danger),
            "" | "none" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Where the view places the toolbar relative to the figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolbarPosition {
    Top,
    Bottom,
    #[default]
    Left,
    Right,
}

impl FromStr for ToolbarPosition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(Self::Top),
            "bottom" => Ok(Self::Bottom),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

impl From<ToolbarPosition> for Orientation {
    fn from(position: ToolbarPosition) -> Self {
        match position {
            ToolbarPosition::Top | ToolbarPosition::Bottom => Self::Horizontal,
            ToolbarPosition::Left | ToolbarPosition::Right => Self::Vertical,
        }
    }
}

/// One button: `(label, tooltip, icon, action)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolItem {
    pub label: String,
    pub tooltip: String,
    pub icon: String,
    pub action: String,
}

/// What a button press means to the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarCommand {
    /// View history step, handled by the renderer (`home`, `back`, `forward`).
    Navigate(String),
    /// Toggle a navigation mode; the renderer is told as well.
    Toggle(NavMode),
    Download,
    Export,
}

// =============================================================================
// TOOL ITEMS
// =============================================================================

/// The generic navigation action set as `(label, tooltip, icon name, action)`.
/// Entries whose icon has no mapping are never shown.
const NAVIGATION_ITEMS: [(&str, &str, &str, &str); 8] = [
    ("Home", "Reset original view", "home", "home"),
    ("Back", "Back to previous view", "back", "back"),
    ("Forward", "Forward to next view", "forward", "forward"),
    ("Pan", "Left button pans, Right button zooms\nx/y fixes axis, CTRL fixes aspect", "move", "pan"),
    ("Zoom", "Zoom to rectangle\nx/y fixes axis", "zoom_to_rect", "zoom"),
    ("Subplots", "Configure subplots", "subplots", "configure_subplots"),
    ("Download", "Download plot", "download", "download"),
    ("Export", "Export plot", "export", "export"),
];

fn icon_for(name: &str) -> Option<&'static str> {
    match name {
        "home" => Some("home"),
        "back" => Some("arrow-left"),
        "forward" => Some("arrow-right"),
        "zoom_to_rect" => Some("square-o"),
        "move" => Some("arrows"),
        "download" => Some("floppy-o"),
        "export" => Some("file-picture-o"),
        _ => None,
    }
}

/// The curated tool list, in display order.
#[must_use]
pub fn default_tool_items() -> Vec<ToolItem> {
    NAVIGATION_ITEMS
        .iter()
        .filter_map(|(label, tooltip, icon, action)| {
            icon_for(icon).map(|icon| ToolItem {
                label: (*label).to_string(),
                tooltip: (*tooltip).to_string(),
                icon: icon.to_string(),
                action: (*action).to_string(),
            })
        })
        .collect()
}

// =============================================================================
// TOOLBAR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolbar {
    items: Vec<ToolItem>,
    mode: NavMode,
    button_style: ButtonStyle,
    orientation: Orientation,
    collapsed: bool,
}

impl Toolbar {
    #[must_use]
    pub fn new(button_style: ButtonStyle, position: ToolbarPosition) -> Self {
        Self {
            items: default_tool_items(),
            mode: NavMode::None,
            button_style,
            orientation: position.into(),
            collapsed: true,
        }
    }

    #[must_use]
    pub fn items(&self) -> &[ToolItem] {
        &self.items
    }

    #[must_use]
    pub fn mode(&self) -> NavMode {
        self.mode
    }

    #[must_use]
    pub fn button_style(&self) -> ButtonStyle {
        self.button_style
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    /// Follow the view's toolbar placement.
    pub fn set_position(&mut self, position: ToolbarPosition) {
        self.orientation = position.into();
    }

    /// Activate `mode`, or return to none if it is already active.
    pub fn toggle(&mut self, mode: NavMode) -> NavMode {
        self.mode = if self.mode == mode { NavMode::None } else { mode };
        self.mode
    }

    /// Map a button action name to a command. Unknown names yield `None`.
    #[must_use]
    pub fn command_for(action: &str) -> Option<ToolbarCommand> {
        match action {
            "home" | "back" | "forward" => Some(ToolbarCommand::Navigate(action.to_string())),
            "pan" => Some(ToolbarCommand::Toggle(NavMode::Pan)),
            "zoom" => Some(ToolbarCommand::Toggle(NavMode::Zoom)),
            "download" | "save_figure" => Some(ToolbarCommand::Download),
            "export" => Some(ToolbarCommand::Export),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "toolbar_test.rs"]
mod tests;
