//! Canvas: the server-side model of one live, synchronized figure view.
//!
//! ARCHITECTURE
//! ============
//! A canvas sits between the external renderer and the browser view. Inbound
//! view messages are either consumed here (`closing`, `initialized`,
//! `set_dpi_ratio`, `supports_binary`, toolbar presses) or forwarded to the
//! renderer. The renderer answers with [`BackendOutput`]s which the canvas
//! turns into outbound messages and binary frames.
//!
//! LIFECYCLE
//! =========
//! `Uninitialized → AwaitingFirstContent → Live → Closed`
//!
//! - Without deferred display a canvas is `Live` from construction, with
//!   `closed = true` until its first show mounts a view.
//! - With deferred display a canvas starts `Uninitialized` with a display
//!   already requested; `show` on a blank canvas moves it to
//!   `AwaitingFirstContent`. The first frame with visible content mounts the
//!   view and goes `Live`. The mount fires at most once per show/close cycle.
//! - `closing` from the view or `close` from the model goes `Closed`.
//!   A later show re-mounts the same canvas without resetting
//!   `displayed_once` or `has_rendered_content`.
//!
//! DESIGN
//! ======
//! The device-pixel ratio is shared by every canvas of a session: the last
//! view to report one wins. Monitors are assumed homogeneous within one
//! session; mixed-DPI setups see the most recent report everywhere.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{BackendError, BackendOutput, Dpi, ExportFormat, RenderBackend};
use crate::config::{SaveDefaults, ViewOptions, WidgetConfig};
use crate::frame::{
    self, CursorKind, Data, ErrorCode, InboundMessage, OutboundMessage, PNG_DATA_URI_PREFIX, ProtocolError,
};
use crate::host::{DisplayHost, Transport};
use crate::keymap::{self, KEY_EVENTS, KeyTranslator};
use crate::surface::{self, ImageMode, RenderSurface, SurfaceError};
use crate::toolbar::{Toolbar, ToolbarCommand, ToolbarPosition};

// =============================================================================
// IDENTITY AND SHARED STATE
// =============================================================================

/// Stable identity of a canvas, used by the host to mount its view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(pub Uuid);

impl CanvasId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CanvasId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Session-wide device-pixel ratio. Single writer at a time, last write wins.
#[derive(Debug, Clone)]
pub struct SharedDpiRatio(Rc<Cell<f64>>);

impl SharedDpiRatio {
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(1.0)))
    }

    #[must_use]
    pub fn get(&self) -> f64 {
        self.0.get()
    }

    pub fn set(&self, ratio: f64) {
        self.0.set(ratio);
    }
}

impl Default for SharedDpiRatio {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// DISPLAY STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasState {
    Uninitialized,
    AwaitingFirstContent,
    Live,
    Closed,
}

/// Zoom selection overlay in logical pixels. All zero when inactive.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RubberBand {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RubberBand {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.width != 0.0 && self.height != 0.0
    }
}

/// What a show request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// A view was mounted.
    Displayed,
    /// Display is waiting for the first non-blank frame.
    Deferred,
    /// Already showing; a redraw was requested instead.
    Redrawn,
    /// The canvas was destroyed; nothing happened.
    Dropped,
}

#[derive(Debug, Clone, PartialEq)]
struct DisplayState {
    cursor: CursorKind,
    message: String,
    figure_label: String,
    size: (f64, f64),
    image_mode: ImageMode,
    rubber_band: RubberBand,
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

impl ErrorCode for CanvasError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.error_code(),
            Self::Backend(e) => e.error_code(),
            Self::Surface(e) => e.error_code(),
        }
    }
}

// =============================================================================
// CANVAS
// =============================================================================

#[allow(clippy::struct_excessive_bools)]
pub struct Canvas {
    id: CanvasId,
    state: CanvasState,
    closed: bool,
    destroyed: bool,
    display_requested: bool,
    displayed_once: bool,
    has_rendered_content: bool,
    view_initialized: bool,
    syncing_data_url: bool,
    supports_binary: bool,
    defer_display: bool,
    display: DisplayState,
    view: ViewOptions,
    save: SaveDefaults,
    dpi_ratio: SharedDpiRatio,
    surface: RenderSurface,
    toolbar: Option<Toolbar>,
    data_url: Option<String>,
    keys: Box<dyn KeyTranslator>,
    backend: Box<dyn RenderBackend>,
    transport: Box<dyn Transport>,
    host: Rc<dyn DisplayHost>,
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("closed", &self.closed)
            .field("displayed_once", &self.displayed_once)
            .field("has_rendered_content", &self.has_rendered_content)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// Create a canvas for `backend`, talking to its view over `transport`.
    pub fn new(
        mut backend: Box<dyn RenderBackend>,
        transport: Box<dyn Transport>,
        host: Rc<dyn DisplayHost>,
        dpi_ratio: SharedDpiRatio,
        config: &WidgetConfig,
    ) -> Self {
        if config.transparent_figures {
            backend.set_transparent_background();
        }
        let keys = keymap::select_translator(&backend.capabilities());
        let size = backend.geometry().bbox();
        let (state, display_requested) =
            if config.defer_display { (CanvasState::Uninitialized, true) } else { (CanvasState::Live, false) };

        Self {
            id: CanvasId::new(),
            state,
            closed: true,
            destroyed: false,
            display_requested,
            displayed_once: false,
            has_rendered_content: false,
            view_initialized: false,
            syncing_data_url: true,
            supports_binary: true,
            defer_display: config.defer_display,
            display: DisplayState {
                cursor: CursorKind::Pointer,
                message: String::new(),
                figure_label: "Figure".into(),
                size,
                image_mode: ImageMode::Full,
                rubber_band: RubberBand::default(),
            },
            view: config.view,
            save: config.save,
            dpi_ratio,
            surface: RenderSurface::new(),
            toolbar: Some(Toolbar::new(config.button_style, config.view.toolbar_position)),
            data_url: None,
            keys,
            backend,
            transport,
            host,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn id(&self) -> CanvasId {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> CanvasState {
        self.state
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub fn display_requested(&self) -> bool {
        self.display_requested
    }

    #[must_use]
    pub fn displayed_once(&self) -> bool {
        self.displayed_once
    }

    #[must_use]
    pub fn has_rendered_content(&self) -> bool {
        self.has_rendered_content
    }

    #[must_use]
    pub fn supports_binary(&self) -> bool {
        self.supports_binary
    }

    #[must_use]
    pub fn cursor(&self) -> CursorKind {
        self.display.cursor
    }

    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.display.message
    }

    #[must_use]
    pub fn figure_label(&self) -> &str {
        &self.display.figure_label
    }

    /// Size in logical pixels.
    #[must_use]
    pub fn size(&self) -> (f64, f64) {
        self.display.size
    }

    #[must_use]
    pub fn image_mode(&self) -> ImageMode {
        self.display.image_mode
    }

    #[must_use]
    pub fn rubber_band(&self) -> RubberBand {
        self.display.rubber_band
    }

    #[must_use]
    pub fn dpi_ratio(&self) -> f64 {
        self.dpi_ratio.get()
    }

    #[must_use]
    pub fn view_options(&self) -> ViewOptions {
        self.view
    }

    #[must_use]
    pub fn toolbar(&self) -> Option<&Toolbar> {
        self.toolbar.as_ref()
    }

    /// Latest full-frame data URL. For static embedding only, never the live
    /// channel.
    #[must_use]
    pub fn static_snapshot(&self) -> Option<&str> {
        self.data_url.as_deref()
    }

    /// Static representations for contexts without a live transport.
    #[must_use]
    pub fn mime_bundle(&self) -> HashMap<String, String> {
        let mut bundle = HashMap::new();
        bundle.insert("text/plain".to_string(), format!("Canvas(label={:?})", self.display.figure_label));
        if let Some(png) = self.data_url.as_deref().and_then(|url| url.strip_prefix(PNG_DATA_URI_PREFIX)) {
            bundle.insert("image/png".to_string(), png.to_string());
        }
        bundle
    }

    // --- View options ---

    pub fn set_toolbar_visible(&mut self, visible: bool) {
        self.view.toolbar_visible = visible;
    }

    pub fn set_toolbar_position(&mut self, position: ToolbarPosition) {
        self.view.toolbar_position = position;
        if let Some(toolbar) = self.toolbar.as_mut() {
            toolbar.set_position(position);
        }
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.view.resizable = resizable;
    }

    // --- Inbound ---

    /// Dispatch one raw record received from the view.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Protocol`] for a malformed record, or the
    /// renderer's error if forwarding fails.
    pub fn handle_inbound(&mut self, content: &Value) -> Result<(), CanvasError> {
        let message = InboundMessage::decode(content)?;
        self.dispatch(message)
    }

    /// Dispatch one decoded message.
    ///
    /// # Errors
    ///
    /// Returns the renderer's or surface's error if handling fails.
    pub fn dispatch(&mut self, message: InboundMessage) -> Result<(), CanvasError> {
        match message {
            InboundMessage::Closing => {
                self.mark_closed("view closing");
                Ok(())
            }
            InboundMessage::Initialized => self.on_initialized(),
            InboundMessage::SetDpiRatio { dpi_ratio, payload } => {
                self.dpi_ratio.set(dpi_ratio);
                debug!(canvas_id = %self.id, dpi_ratio, "canvas: dpi ratio reported");
                self.forward("set_dpi_ratio", &payload)
            }
            InboundMessage::SupportsBinary { value } => {
                self.supports_binary = value;
                Ok(())
            }
            InboundMessage::ToolbarButton { name, payload } => self.on_toolbar_button(&name, &payload),
            InboundMessage::Event { kind, mut payload } => {
                if KEY_EVENTS.contains(&kind.as_str()) {
                    keymap::translate_payload(self.keys.as_ref(), &mut payload);
                }
                self.forward(&kind, &payload)
            }
        }
    }

    fn on_initialized(&mut self) -> Result<(), CanvasError> {
        if self.view_initialized {
            debug!(canvas_id = %self.id, "canvas: duplicate initialized ignored");
            return Ok(());
        }
        self.view_initialized = true;
        self.syncing_data_url = false;
        if self.is_awaiting_view() {
            // The view mounted by another route; nothing left to defer.
            self.display_requested = false;
            self.displayed_once = true;
            self.closed = false;
            self.state = CanvasState::Live;
        }
        let (width, height) = self.backend.geometry().bbox();
        self.resize(width, height)
    }

    fn on_toolbar_button(&mut self, name: &str, payload: &Data) -> Result<(), CanvasError> {
        match Toolbar::command_for(name) {
            Some(ToolbarCommand::Toggle(mode)) => {
                if let Some(toolbar) = self.toolbar.as_mut() {
                    let active = toolbar.toggle(mode);
                    debug!(canvas_id = %self.id, ?active, "canvas: navigation mode");
                }
                self.forward("toolbar_button", payload)
            }
            Some(ToolbarCommand::Download) => self.download(),
            Some(ToolbarCommand::Export) => self.export().map(|_| ()),
            Some(ToolbarCommand::Navigate(_)) | None => self.forward("toolbar_button", payload),
        }
    }

    fn forward(&mut self, kind: &str, payload: &Data) -> Result<(), CanvasError> {
        let outputs = self.backend.handle_event(kind, payload)?;
        self.apply_outputs(outputs)
    }

    fn apply_outputs(&mut self, outputs: Vec<BackendOutput>) -> Result<(), CanvasError> {
        for output in outputs {
            match output {
                BackendOutput::Message(message) => self.emit_outbound(message)?,
                BackendOutput::Draw { full } => {
                    if full {
                        self.surface.request_full_frame();
                    }
                    self.draw()?;
                }
            }
        }
        Ok(())
    }

    // --- Outbound ---

    /// Send a message to the view, mirroring display-state kinds first.
    /// `resize` always goes out, even when the size is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Protocol`] if the message cannot be encoded.
    pub fn emit_outbound(&mut self, message: OutboundMessage) -> Result<(), CanvasError> {
        match &message {
            OutboundMessage::Cursor { cursor } => self.display.cursor = *cursor,
            OutboundMessage::Message { message } => self.display.message.clone_from(message),
            OutboundMessage::FigureLabel { label } => self.display.figure_label.clone_from(label),
            OutboundMessage::Resize { size } => self.display.size = (size[0], size[1]),
            OutboundMessage::ImageMode { mode } => self.display.image_mode = *mode,
            OutboundMessage::Rubberband { x0, y0, x1, y1 } => {
                self.display.rubber_band = self.rubber_band_from(*x0, *y0, *x1, *y1);
            }
            OutboundMessage::Save { .. } | OutboundMessage::Draw | OutboundMessage::Opaque { .. } => {}
        }
        self.transport.send(frame::encode_outbound(&message)?);
        Ok(())
    }

    /// Renderer coordinates have y up and are scaled by the pixel ratio.
    fn rubber_band_from(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> RubberBand {
        if x0 < 0.0 || y0 < 0.0 || x1 < 0.0 || y1 < 0.0 {
            return RubberBand::default();
        }
        let ratio = self.dpi_ratio.get();
        let height = self.display.size.1;
        let x0 = (x0 / ratio).floor() + 0.5;
        let x1 = (x1 / ratio).floor() + 0.5;
        let y0 = (height - y0 / ratio).floor() + 0.5;
        let y1 = (height - y1 / ratio).floor() + 0.5;
        RubberBand { x: x0.min(x1), y: y0.min(y1), width: (x1 - x0).abs(), height: (y1 - y0).abs() }
    }

    /// Ship one PNG frame to the view.
    ///
    /// Until a frame with visible content has been seen, each frame is
    /// checked. While no view has confirmed `initialized`, the static data URL
    /// follows the latest frame. A display deferred until first content fires
    /// here, once.
    ///
    /// While the view composites in diff mode, `png` holds only changed
    /// pixels. The content check and the data URL then use the last full
    /// raster instead.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Surface`] if the frame is not a PNG image or
    /// the full raster cannot be re-encoded.
    pub fn emit_binary_frame(&mut self, png: Vec<u8>) -> Result<(), CanvasError> {
        let full = match self.surface.image_mode() {
            ImageMode::Diff => self.surface.last_raster(),
            ImageMode::Full => None,
        };
        let visible = self.has_rendered_content
            || match full {
                Some(raster) => surface::has_visible_content(raster),
                None => surface::frame_has_visible_content(&png)?,
            };
        let snapshot = match full {
            Some(raster) if self.syncing_data_url => Some(surface::encode_static(raster)?),
            None if self.syncing_data_url => Some(surface::png_data_url(&png)),
            _ => None,
        };
        self.ship_frame(png, visible, snapshot);
        Ok(())
    }

    fn ship_frame(&mut self, png: Vec<u8>, visible: bool, snapshot: Option<String>) {
        if visible && !self.has_rendered_content {
            self.has_rendered_content = true;
            debug!(canvas_id = %self.id, "canvas: first content rendered");
        }

        if let Some(url) = snapshot {
            self.data_url = Some(url);
        }

        if self.display_requested && self.has_rendered_content && self.is_awaiting_view() {
            self.mount_view();
        }

        let wire = if self.supports_binary { frame::encode_binary(png) } else { frame::encode_data_uri_frame(&png) };
        self.transport.send(wire);
    }

    // --- Drawing ---

    /// Render the current figure and ship it as a full or diff frame.
    ///
    /// # Errors
    ///
    /// Returns the renderer's capture error or a PNG encoding error.
    pub fn draw(&mut self) -> Result<(), CanvasError> {
        let raster = self.surface.capture_frame(self.backend.as_ref())?;
        // Judged on the full raster: a diff frame zeroes unchanged pixels.
        let visible = self.has_rendered_content || surface::has_visible_content(&raster);
        let encoded = self.surface.encode_frame(raster)?;
        debug!(canvas_id = %self.id, mode = encoded.mode.as_str(), bytes = encoded.png.len(), "canvas: frame");
        if encoded.mode_changed {
            self.emit_outbound(OutboundMessage::ImageMode { mode: encoded.mode })?;
        }
        let snapshot = match self.surface.last_raster() {
            Some(raster) if self.syncing_data_url => Some(surface::encode_static(raster)?),
            _ => None,
        };
        self.ship_frame(encoded.png, visible, snapshot);
        Ok(())
    }

    /// Ask the view to request a fresh frame.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Protocol`] if the message cannot be encoded.
    pub fn request_redraw(&mut self) -> Result<(), CanvasError> {
        self.emit_outbound(OutboundMessage::Draw)
    }

    /// Resize the figure to `width` x `height` logical pixels.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error if it rejects the size.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), CanvasError> {
        let outputs = self.backend.resize_to(width, height)?;
        self.apply_outputs(outputs)
    }

    // --- Lifecycle ---

    /// Show the canvas: mount a view if none is showing, otherwise request a
    /// redraw. Under deferred display a blank canvas waits for content, and
    /// each later show pushes a fresh frame until one has content.
    ///
    /// # Errors
    ///
    /// Returns an error if the redraw request or the first frame fails.
    pub fn show(&mut self) -> Result<ShowOutcome, CanvasError> {
        if self.destroyed {
            return Ok(ShowOutcome::Dropped);
        }
        if !self.closed {
            if self.is_awaiting_view() {
                // No view yet to answer a redraw request.
                return self.draw_for_deferred_display();
            }
            self.request_redraw()?;
            return Ok(ShowOutcome::Redrawn);
        }

        self.closed = false;
        self.view_initialized = false;
        if self.defer_display && !self.has_rendered_content {
            self.display_requested = true;
            self.state = CanvasState::AwaitingFirstContent;
            debug!(canvas_id = %self.id, "canvas: display deferred until first content");
            return self.draw_for_deferred_display();
        }

        self.mount_view();
        Ok(ShowOutcome::Displayed)
    }

    fn is_awaiting_view(&self) -> bool {
        matches!(self.state, CanvasState::Uninitialized | CanvasState::AwaitingFirstContent)
    }

    /// Push a frame from the renderer so a deferred display can fire on it.
    fn draw_for_deferred_display(&mut self) -> Result<ShowOutcome, CanvasError> {
        self.draw()?;
        Ok(if self.state == CanvasState::Live { ShowOutcome::Displayed } else { ShowOutcome::Deferred })
    }

    fn mount_view(&mut self) {
        self.host.display_canvas(self.id);
        self.closed = false;
        self.display_requested = false;
        self.displayed_once = true;
        self.state = CanvasState::Live;
        info!(canvas_id = %self.id, "canvas: view mounted");
    }

    fn mark_closed(&mut self, reason: &str) -> bool {
        if self.state == CanvasState::Closed {
            debug!(canvas_id = %self.id, reason, "canvas: already closed");
            return false;
        }
        self.closed = true;
        self.display_requested = false;
        self.view_initialized = false;
        self.state = CanvasState::Closed;
        info!(canvas_id = %self.id, reason, "canvas: closed");
        true
    }

    /// Close from the model side. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.mark_closed("model close") {
            self.transport.close();
        }
    }

    /// Close and release the toolbar. The canvas cannot be shown again.
    pub fn destroy(&mut self) {
        self.close();
        self.destroyed = true;
        self.toolbar = None;
    }

    // --- Export ---

    /// Rasterize the figure at its nominal DPI and show it inline as HTML.
    /// Independent of the live view's pixel ratio.
    ///
    /// # Errors
    ///
    /// Returns the renderer's export error.
    pub fn export(&mut self) -> Result<String, CanvasError> {
        let png = self.backend.export_to(ExportFormat::Png, Dpi::Figure, false)?;
        let geometry = self.backend.geometry();
        let (width, _) = geometry.bbox();
        let html = format!("<img src='{PNG_DATA_URI_PREFIX}{}' width={}/>", BASE64.encode(&png), width.round());
        self.host.display_html(&html);
        Ok(html)
    }

    /// Serialize the figure and hand it to the view as a named download.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnsupportedFormat`] before anything is sent if
    /// the renderer cannot produce `format`, or the renderer's export error.
    pub fn trigger_download(&mut self, format: ExportFormat, dpi: Dpi, transparent: bool) -> Result<(), CanvasError> {
        if !self.backend.capabilities().supports(format) {
            return Err(BackendError::UnsupportedFormat(format).into());
        }
        let bytes = self.backend.export_to(format, dpi, transparent)?;
        debug!(canvas_id = %self.id, %format, bytes = bytes.len(), "canvas: download");
        self.transport.send(frame::encode_save(format, bytes)?);
        Ok(())
    }

    /// Download with the configured save defaults.
    ///
    /// # Errors
    ///
    /// See [`Canvas::trigger_download`].
    pub fn download(&mut self) -> Result<(), CanvasError> {
        let SaveDefaults { format, dpi, transparent } = self.save;
        self.trigger_download(format, dpi, transparent)
    }
}

#[cfg(test)]
#[path = "canvas_test.rs"]
mod tests;
