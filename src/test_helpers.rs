//! In-memory fakes for unit tests: a scripted renderer, a recording
//! transport, a recording display host, and recording post-execute hooks.
//! Each fake hands out an `Rc<RefCell<..>>` log the test keeps after the fake
//! itself has been moved into a canvas.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use serde_json::Value;

use crate::backend::{
    BackendError, BackendOutput, Dpi, ExportFormat, FigureGeometry, Raster, RenderBackend, RenderCapabilities,
};
use crate::canvas::{Canvas, CanvasId, SharedDpiRatio};
use crate::config::WidgetConfig;
use crate::frame::{BINARY_HEADER, Data, OutboundMessage, WireMessage};
use crate::host::{DisplayHost, PostExecuteHooks, Transport};
use crate::surface;

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const RED: [u8; 4] = [255, 0, 0, 255];

// =============================================================================
// RENDERER
// =============================================================================

/// Observable and scriptable state of a [`FakeBackend`].
#[derive(Debug)]
pub struct FakeState {
    pub geometry: FigureGeometry,
    pub fill: [u8; 4],
    /// Pixels painted over the fill on every capture.
    pub marks: Vec<(u32, u32, [u8; 4])>,
    pub capabilities: RenderCapabilities,
    pub events: Vec<(String, Data)>,
    pub resizes: Vec<(f64, f64)>,
    pub exports: Vec<(ExportFormat, Dpi, bool)>,
    pub transparent_background: bool,
    /// Returned (and drained) by the next non-draw event.
    pub scripted: Vec<BackendOutput>,
    /// Every capture fails while set.
    pub fail_capture: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            geometry: FigureGeometry { width_in: 2.0, height_in: 1.5, dpi: 10.0 },
            fill: WHITE,
            marks: Vec::new(),
            capabilities: RenderCapabilities {
                decodes_browser_keys: true,
                formats: vec![ExportFormat::Png, ExportFormat::Pdf, ExportFormat::Svg],
            },
            events: Vec::new(),
            resizes: Vec::new(),
            exports: Vec::new(),
            transparent_background: false,
            scripted: Vec::new(),
            fail_capture: false,
        }
    }
}

impl FakeState {
    /// Paint one non-white pixel so the figure counts as drawn.
    pub fn paint(&mut self) {
        self.marks.push((0, 0, RED));
    }

    #[must_use]
    pub fn event_kinds(&self) -> Vec<String> {
        self.events.iter().map(|(kind, _)| kind.clone()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Rc<RefCell<FakeState>>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> (Self, Rc<RefCell<FakeState>>) {
        let backend = Self::default();
        let state = Rc::clone(&backend.state);
        (backend, state)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn pixels(value: f64) -> u32 {
    value.round().max(1.0) as u32
}

impl RenderBackend for FakeBackend {
    fn capabilities(&self) -> RenderCapabilities {
        self.state.borrow().capabilities.clone()
    }

    fn geometry(&self) -> FigureGeometry {
        self.state.borrow().geometry
    }

    fn capture_frame(&self) -> Result<Raster, BackendError> {
        let state = self.state.borrow();
        if state.fail_capture {
            return Err(BackendError::Render("capture failed".into()));
        }
        let (width, height) = state.geometry.bbox();
        let mut raster = Raster::filled(pixels(width), pixels(height), state.fill);
        for (x, y, rgba) in &state.marks {
            raster.set_pixel(*x, *y, *rgba);
        }
        Ok(raster)
    }

    fn resize_to(&mut self, width: f64, height: f64) -> Result<Vec<BackendOutput>, BackendError> {
        let mut state = self.state.borrow_mut();
        state.resizes.push((width, height));
        let dpi = state.geometry.dpi;
        state.geometry.width_in = width / dpi;
        state.geometry.height_in = height / dpi;
        Ok(vec![
            BackendOutput::Message(OutboundMessage::Resize { size: [width, height] }),
            BackendOutput::Draw { full: true },
        ])
    }

    fn handle_event(&mut self, kind: &str, payload: &Data) -> Result<Vec<BackendOutput>, BackendError> {
        self.state.borrow_mut().events.push((kind.to_string(), payload.clone()));
        match kind {
            "draw" => Ok(vec![BackendOutput::Draw { full: false }]),
            "refresh" => Ok(vec![BackendOutput::Draw { full: true }]),
            "resize" => {
                let width = payload.get("width").and_then(Value::as_f64).unwrap_or_default();
                let height = payload.get("height").and_then(Value::as_f64).unwrap_or_default();
                self.resize_to(width, height)
            }
            _ => Ok(mem::take(&mut self.state.borrow_mut().scripted)),
        }
    }

    fn export_to(&self, format: ExportFormat, dpi: Dpi, transparent: bool) -> Result<Vec<u8>, BackendError> {
        let mut state = self.state.borrow_mut();
        if !state.capabilities.supports(format) {
            return Err(BackendError::UnsupportedFormat(format));
        }
        state.exports.push((format, dpi, transparent));
        match format {
            ExportFormat::Png => {
                let (width, height) = state.geometry.pixel_size(dpi.resolve(state.geometry.dpi));
                let fill = if transparent { [255, 255, 255, 0] } else { state.fill };
                surface::encode_png(&Raster::filled(pixels(width), pixels(height), fill))
                    .map_err(|e| BackendError::Export(e.to_string()))
            }
            ExportFormat::Pdf => Ok(b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\n%%EOF\n".to_vec()),
            ExportFormat::Svg => Ok(br#"<?xml version="1.0" encoding="utf-8" standalone="no"?>
<svg xmlns="http://www.w3.org/2000/svg" width="144pt" height="108pt"></svg>
"#
            .to_vec()),
            ExportFormat::Pgf => Err(BackendError::UnsupportedFormat(format)),
        }
    }

    fn set_transparent_background(&mut self) {
        let mut state = self.state.borrow_mut();
        state.transparent_background = true;
        state.fill = [255, 255, 255, 0];
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

#[derive(Debug, Default)]
pub struct TransportLog {
    pub sent: Vec<WireMessage>,
    pub closes: usize,
}

impl TransportLog {
    /// Every text message parsed as JSON, in send order. Binary-tagged
    /// frames appear as `{"type": "binary"}`.
    #[must_use]
    pub fn messages(&self) -> Vec<Value> {
        self.sent.iter().flat_map(|m| serde_json::from_str::<Value>(&m.data)).collect()
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|m| m.get("type").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    #[must_use]
    pub fn count_kind(&self, kind: &str) -> usize {
        self.kinds().iter().filter(|k| k.as_str() == kind).count()
    }

    /// Buffers of binary-tagged frame messages.
    #[must_use]
    pub fn binary_frames(&self) -> Vec<Vec<u8>> {
        self.sent
            .iter()
            .filter(|m| m.data == BINARY_HEADER)
            .flat_map(|m| m.buffers.first().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    log: Rc<RefCell<TransportLog>>,
}

impl RecordingTransport {
    #[must_use]
    pub fn new() -> (Self, Rc<RefCell<TransportLog>>) {
        let transport = Self::default();
        let log = Rc::clone(&transport.log);
        (transport, log)
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, message: WireMessage) {
        self.log.borrow_mut().sent.push(message);
    }

    fn close(&mut self) {
        self.log.borrow_mut().closes += 1;
    }
}

// =============================================================================
// HOST
// =============================================================================

#[derive(Debug, Default)]
pub struct HostLog {
    pub displayed: Vec<CanvasId>,
    pub html: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    log: Rc<RefCell<HostLog>>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> (Rc<Self>, Rc<RefCell<HostLog>>) {
        let host = Self::default();
        let log = Rc::clone(&host.log);
        (Rc::new(host), log)
    }
}

impl DisplayHost for RecordingHost {
    fn display_canvas(&self, id: CanvasId) {
        self.log.borrow_mut().displayed.push(id);
    }

    fn display_html(&self, html: &str) {
        self.log.borrow_mut().html.push(html.to_string());
    }
}

#[derive(Default)]
pub struct RecordingHooks {
    callbacks: Vec<Box<dyn FnMut()>>,
}

impl RecordingHooks {
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Simulate the end of one unit of interactive work.
    pub fn fire(&mut self) {
        for callback in &mut self.callbacks {
            callback();
        }
    }
}

impl PostExecuteHooks for RecordingHooks {
    fn register_post_execute(&mut self, callback: Box<dyn FnMut()>) {
        self.callbacks.push(callback);
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

/// A canvas wired to fakes, plus handles onto every fake's log.
pub struct Fixture {
    pub canvas: Canvas,
    pub backend: Rc<RefCell<FakeState>>,
    pub transport: Rc<RefCell<TransportLog>>,
    pub host: Rc<RefCell<HostLog>>,
    pub dpi_ratio: SharedDpiRatio,
}

#[must_use]
pub fn fixture(config: &WidgetConfig) -> Fixture {
    let (backend, backend_state) = FakeBackend::new();
    let (transport, transport_log) = RecordingTransport::new();
    let (host, host_log) = RecordingHost::new();
    let dpi_ratio = SharedDpiRatio::new();
    let canvas = Canvas::new(Box::new(backend), Box::new(transport), host, dpi_ratio.clone(), config);
    Fixture { canvas, backend: backend_state, transport: transport_log, host: host_log, dpi_ratio }
}

#[must_use]
pub fn deferred_config() -> WidgetConfig {
    WidgetConfig { defer_display: true, ..WidgetConfig::default() }
}

/// A `width` x `height` PNG of one color.
#[must_use]
pub fn png_frame(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    surface::encode_png(&Raster::filled(width, height, rgba)).unwrap_or_default()
}

/// A white PNG with one red pixel.
#[must_use]
pub fn marked_png_frame(width: u32, height: u32) -> Vec<u8> {
    let mut raster = Raster::filled(width, height, WHITE);
    raster.set_pixel(0, 0, RED);
    surface::encode_png(&raster).unwrap_or_default()
}
