//! Render-target capability: the contract with the external figure renderer.
//!
//! DESIGN
//! ======
//! The renderer owns drawing. This crate only pulls rasters from it, forwards
//! browser events to it, and asks it to export files. The renderer never calls
//! back into the canvas: event handling returns a list of [`BackendOutput`]s
//! that the canvas applies in order.

use std::fmt;
use std::str::FromStr;

use crate::frame::{Data, ErrorCode, OutboundMessage};

// =============================================================================
// EXPORT FORMATS
// =============================================================================

/// Portable file formats a renderer may export to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Png,
    Pdf,
    Svg,
    Pgf,
}

impl ExportFormat {
    /// File extension, also used as the wire name.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
            Self::Svg => "svg",
            Self::Pgf => "pgf",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Pdf => "application/pdf",
            Self::Svg => "image/svg+xml",
            Self::Pgf => "text/x-pgf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "pdf" => Ok(Self::Pdf),
            "svg" => Ok(Self::Svg),
            "pgf" => Ok(Self::Pgf),
            other => Err(BackendError::UnknownFormat(other.to_string())),
        }
    }
}

/// Export resolution: the figure's own DPI, or an explicit value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dpi {
    #[default]
    Figure,
    Value(f64),
}

impl Dpi {
    /// Resolve against the figure's nominal DPI.
    #[must_use]
    pub fn resolve(self, figure_dpi: f64) -> f64 {
        match self {
            Self::Figure => figure_dpi,
            Self::Value(dpi) => dpi,
        }
    }
}

// =============================================================================
// GEOMETRY AND RASTERS
// =============================================================================

/// Figure size in inches and its nominal resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FigureGeometry {
    pub width_in: f64,
    pub height_in: f64,
    pub dpi: f64,
}

impl FigureGeometry {
    /// Size in logical pixels at the given DPI.
    #[must_use]
    pub fn pixel_size(&self, dpi: f64) -> (f64, f64) {
        (self.width_in * dpi, self.height_in * dpi)
    }

    /// Size in logical pixels at the nominal DPI (the figure bounding box).
    #[must_use]
    pub fn bbox(&self) -> (f64, f64) {
        self.pixel_size(self.dpi)
    }
}

/// An RGBA8 pixel buffer, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Raster {
    /// Wrap an RGBA8 buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::RasterShape`] if the buffer length does not
    /// match `width * height * 4`.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, BackendError> {
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(BackendError::RasterShape { width, height, len: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    /// A raster filled with one color.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        Self { width, height, pixels: rgba.repeat(count) }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the raster.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let at = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.pixels.get(at..at + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let at = ((y as usize) * (self.width as usize) + x as usize) * 4;
        if let Some(px) = self.pixels.get_mut(at..at + 4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Whether any pixel is less than fully opaque.
    #[must_use]
    pub fn has_transparency(&self) -> bool {
        self.pixels.chunks_exact(4).any(|px| px[3] != u8::MAX)
    }

    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }
}

// =============================================================================
// CAPABILITIES AND OUTPUTS
// =============================================================================

/// What a renderer reports about itself. Read once per canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCapabilities {
    /// The renderer decodes browser key names (`ctrl+kArrowLeft`) itself.
    pub decodes_browser_keys: bool,
    /// Formats `export_to` accepts.
    pub formats: Vec<ExportFormat>,
}

impl RenderCapabilities {
    #[must_use]
    pub fn supports(&self, format: ExportFormat) -> bool {
        self.formats.contains(&format)
    }
}

impl Default for RenderCapabilities {
    fn default() -> Self {
        Self { decodes_browser_keys: true, formats: vec![ExportFormat::Png] }
    }
}

/// Work the renderer hands back to the canvas after an event.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOutput {
    /// Emit a message to the view.
    Message(OutboundMessage),
    /// The figure changed; ship a new frame. `full` discards the diff base.
    Draw { full: bool },
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
    #[error("export format not supported by the renderer: {0}")]
    UnsupportedFormat(ExportFormat),
    #[error("raster buffer of {len} bytes does not match {width}x{height} RGBA")]
    RasterShape { width: u32, height: u32, len: usize },
    #[error("render failed: {0}")]
    Render(String),
    #[error("export failed: {0}")]
    Export(String),
}

impl ErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownFormat(_) => "E_UNKNOWN_FORMAT",
            Self::UnsupportedFormat(_) => "E_UNSUPPORTED_FORMAT",
            Self::RasterShape { .. } => "E_RASTER_SHAPE",
            Self::Render(_) => "E_RENDER",
            Self::Export(_) => "E_EXPORT",
        }
    }
}

// =============================================================================
// RENDER BACKEND
// =============================================================================

/// The external figure renderer, as seen by one canvas.
pub trait RenderBackend {
    /// Reported once at canvas construction.
    fn capabilities(&self) -> RenderCapabilities;

    /// Current figure size and nominal DPI.
    fn geometry(&self) -> FigureGeometry;

    /// Pull the current raster. Must not mutate renderer state.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the figure cannot be rasterized.
    fn capture_frame(&self) -> Result<Raster, BackendError>;

    /// Resize the figure to `width` x `height` logical pixels.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the renderer rejects the size.
    fn resize_to(&mut self, width: f64, height: f64) -> Result<Vec<BackendOutput>, BackendError>;

    /// Handle a browser event (mouse, key, draw, refresh, toolbar, ...).
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the renderer fails while handling it.
    fn handle_event(&mut self, kind: &str, payload: &Data) -> Result<Vec<BackendOutput>, BackendError>;

    /// Serialize the figure. Output must match the renderer's standalone
    /// save path byte for byte for identical inputs.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::UnsupportedFormat`] for formats missing from
    /// [`RenderCapabilities::formats`], or an export failure.
    fn export_to(&self, format: ExportFormat, dpi: Dpi, transparent: bool) -> Result<Vec<u8>, BackendError>;

    /// Make the figure background transparent.
    fn set_transparent_background(&mut self) {}
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
