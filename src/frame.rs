//! Frame: the message codec between a canvas model and its browser view.
//!
//! ARCHITECTURE
//! ============
//! Every exchange between the model and the view is a tagged JSON record with
//! a `type` key. Inbound records arrive as decoded JSON objects from the
//! transport; outbound records leave as a JSON string in `data` plus zero or
//! more binary buffers (rendered frames, saved files).
//!
//! DESIGN
//! ======
//! - Inbound kinds the canvas consumes itself get their own variant. Every
//!   other kind is kept as `Event` and forwarded to the renderer untouched,
//!   payload included.
//! - Outbound kinds the canvas mirrors into display state get their own
//!   variant. Unknown kinds travel as `Opaque` and are written verbatim.
//! - Binary frames are tagged with a fixed `{"type": "binary"}` header so the
//!   view can tell them apart from saved files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::backend::ExportFormat;
use crate::surface::{ImageMode, png_data_url};

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Key carrying the message kind on every record.
pub const FRAME_TYPE: &str = "type";

/// Header sent in `data` alongside a rendered frame buffer.
pub const BINARY_HEADER: &str = r#"{"type": "binary"}"#;

/// Prefix of the text frames sent to views without binary support.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, Value>;

/// Cursor shapes the view knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorKind {
    #[default]
    Pointer,
    Default,
    Crosshair,
    Move,
    Wait,
}

impl CursorKind {
    /// CSS cursor name sent to the view.
    #[must_use]
    pub fn as_css(self) -> &'static str {
        match self {
            Self::Pointer => "pointer",
            Self::Default => "default",
            Self::Crosshair => "crosshair",
            Self::Move => "move",
            Self::Wait => "wait",
        }
    }
}

/// A message received from the browser view.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// The view is going away.
    Closing,
    /// The view has mounted and knows its real bounding box.
    Initialized,
    /// The view reports its device-pixel ratio. The raw payload is kept
    /// because the renderer needs the event too.
    SetDpiRatio { dpi_ratio: f64, payload: Data },
    /// Legacy capability negotiation for binary buffers.
    SupportsBinary { value: bool },
    /// A toolbar button was pressed.
    ToolbarButton { name: String, payload: Data },
    /// Anything else. Forwarded to the renderer verbatim.
    Event { kind: String, payload: Data },
}

/// A message sent to the browser view.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Cursor { cursor: CursorKind },
    Message { message: String },
    FigureLabel { label: String },
    Resize { size: [f64; 2] },
    ImageMode { mode: ImageMode },
    Rubberband { x0: f64, y0: f64, x1: f64, y1: f64 },
    /// Accompanies a saved-file buffer; the view offers it as a download.
    Save { format: ExportFormat },
    /// Ask the view to request a fresh frame.
    Draw,
    Opaque { kind: String, payload: Data },
}

/// A record ready for the transport: JSON text plus attached buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub data: String,
    pub buffers: Vec<Vec<u8>>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// Grepable error code and retryable flag for structured errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// A message that breaks the wire contract. Fatal to that message only.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("message is not a JSON object")]
    NotAnObject,
    #[error("message has no `type` key")]
    MissingType,
    #[error("message `type` is not a string")]
    InvalidType,
    #[error("`{kind}` message is missing field `{field}`")]
    MissingField { kind: String, field: &'static str },
    #[error("`{kind}` message has an invalid `{field}` field")]
    InvalidField { kind: String, field: &'static str },
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ErrorCode for ProtocolError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotAnObject => "E_NOT_AN_OBJECT",
            Self::MissingType => "E_MISSING_TYPE",
            Self::InvalidType => "E_INVALID_TYPE",
            Self::MissingField { .. } => "E_MISSING_FIELD",
            Self::InvalidField { .. } => "E_INVALID_FIELD",
            Self::Encode(_) => "E_ENCODE",
        }
    }
}

// =============================================================================
// INBOUND
// =============================================================================

impl InboundMessage {
    /// Decode a message received from the view.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] when the record is not an object, has no
    /// string `type`, or lacks a field its kind requires.
    pub fn decode(content: &Value) -> Result<Self, ProtocolError> {
        let Value::Object(map) = content else {
            return Err(ProtocolError::NotAnObject);
        };
        let kind = match map.get(FRAME_TYPE) {
            None => return Err(ProtocolError::MissingType),
            Some(Value::String(kind)) => kind.clone(),
            Some(_) => return Err(ProtocolError::InvalidType),
        };
        let payload: Data = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

        match kind.as_str() {
            "closing" => Ok(Self::Closing),
            "initialized" => Ok(Self::Initialized),
            "set_dpi_ratio" => {
                let dpi_ratio = required(&payload, &kind, "dpi_ratio")?
                    .as_f64()
                    .filter(|r| r.is_finite() && *r > 0.0)
                    .ok_or_else(|| invalid(&kind, "dpi_ratio"))?;
                Ok(Self::SetDpiRatio { dpi_ratio, payload })
            }
            "supports_binary" => {
                let value = required(&payload, &kind, "value")?
                    .as_bool()
                    .ok_or_else(|| invalid(&kind, "value"))?;
                Ok(Self::SupportsBinary { value })
            }
            "toolbar_button" => {
                let name = required(&payload, &kind, "name")?
                    .as_str()
                    .ok_or_else(|| invalid(&kind, "name"))?
                    .to_string();
                Ok(Self::ToolbarButton { name, payload })
            }
            _ => Ok(Self::Event { kind, payload }),
        }
    }

    /// The wire `type` of this message.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Closing => "closing",
            Self::Initialized => "initialized",
            Self::SetDpiRatio { .. } => "set_dpi_ratio",
            Self::SupportsBinary { .. } => "supports_binary",
            Self::ToolbarButton { .. } => "toolbar_button",
            Self::Event { kind, .. } => kind,
        }
    }
}

fn required<'a>(payload: &'a Data, kind: &str, field: &'static str) -> Result<&'a Value, ProtocolError> {
    payload
        .get(field)
        .ok_or_else(|| ProtocolError::MissingField { kind: kind.to_string(), field })
}

fn invalid(kind: &str, field: &'static str) -> ProtocolError {
    ProtocolError::InvalidField { kind: kind.to_string(), field }
}

// =============================================================================
// OUTBOUND
// =============================================================================

impl OutboundMessage {
    /// The wire `type` of this message.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Cursor { .. } => "cursor",
            Self::Message { .. } => "message",
            Self::FigureLabel { .. } => "figure_label",
            Self::Resize { .. } => "resize",
            Self::ImageMode { .. } => "image_mode",
            Self::Rubberband { .. } => "rubberband",
            Self::Save { .. } => "save",
            Self::Draw => "draw",
            Self::Opaque { kind, .. } => kind,
        }
    }

    /// JSON form of this message, `type` key included.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let kind = self.kind();
        match self {
            Self::Cursor { cursor } => json!({ "type": kind, "cursor": cursor.as_css() }),
            Self::Message { message } => json!({ "type": kind, "message": message }),
            Self::FigureLabel { label } => json!({ "type": kind, "label": label }),
            Self::Resize { size } => json!({ "type": kind, "size": size }),
            Self::ImageMode { mode } => json!({ "type": kind, "mode": mode.as_str() }),
            Self::Rubberband { x0, y0, x1, y1 } => {
                json!({ "type": kind, "x0": x0, "y0": y0, "x1": x1, "y1": y1 })
            }
            Self::Save { format } => json!({ "type": kind, "format": format.extension() }),
            Self::Draw => json!({ "type": kind }),
            Self::Opaque { kind, payload } => {
                let mut map: serde_json::Map<String, Value> =
                    payload.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                map.insert(FRAME_TYPE.into(), Value::String(kind.clone()));
                Value::Object(map)
            }
        }
    }

    /// Build an opaque message from a kind and payload.
    pub fn opaque(kind: impl Into<String>, payload: Data) -> Self {
        Self::Opaque { kind: kind.into(), payload }
    }
}

// =============================================================================
// WIRE ENCODING
// =============================================================================

/// Encode an outbound control message.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the payload cannot be serialized.
pub fn encode_outbound(message: &OutboundMessage) -> Result<WireMessage, ProtocolError> {
    let data = serde_json::to_string(&message.to_json())?;
    Ok(WireMessage { data, buffers: Vec::new() })
}

/// Encode a rendered frame as a binary-tagged message.
#[must_use]
pub fn encode_binary(frame: Vec<u8>) -> WireMessage {
    WireMessage { data: BINARY_HEADER.to_string(), buffers: vec![frame] }
}

/// Encode a rendered frame as a text data URI for views without binary support.
#[must_use]
pub fn encode_data_uri_frame(frame: &[u8]) -> WireMessage {
    WireMessage { data: png_data_url(frame), buffers: Vec::new() }
}

/// Encode a saved file: a `save` message carrying exactly one buffer.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if the header cannot be serialized.
pub fn encode_save(format: ExportFormat, bytes: Vec<u8>) -> Result<WireMessage, ProtocolError> {
    let mut wire = encode_outbound(&OutboundMessage::Save { format })?;
    wire.buffers.push(bytes);
    Ok(wire)
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
