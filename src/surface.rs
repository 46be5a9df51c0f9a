//! Render surface: the last rendered raster and full/diff framing.
//!
//! DESIGN
//! ======
//! Each frame is compared against the previous one. Unchanged pixels are
//! zeroed in a diff frame, so the view composites only what moved. A diff
//! cannot be composited correctly over stale transparent regions, so once any
//! frame has carried transparency the surface ratchets into full-frame mode
//! for the rest of its life.
//!
//! Frames are PNG encoded. The same encoder produces the static data URL used
//! by embedding contexts that have no live transport.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, Raster, RenderBackend};
use crate::frame::{ErrorCode, PNG_DATA_URI_PREFIX};

// =============================================================================
// TYPES
// =============================================================================

/// How the view should composite an incoming frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMode {
    #[default]
    Full,
    Diff,
}

impl ImageMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Diff => "diff",
        }
    }
}

/// A frame ready for `emit_binary_frame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub mode: ImageMode,
    /// The mode differs from the previous frame's; the view must be told.
    pub mode_changed: bool,
    pub png: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("png encode failed: {0}")]
    Encode(String),
    #[error("png decode failed: {0}")]
    Decode(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl ErrorCode for SurfaceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Encode(_) => "E_PNG_ENCODE",
            Self::Decode(_) => "E_PNG_DECODE",
            Self::Backend(e) => e.error_code(),
        }
    }
}

// =============================================================================
// RENDER SURFACE
// =============================================================================

#[derive(Debug, Default)]
pub struct RenderSurface {
    last: Option<Raster>,
    transparency_seen: bool,
    full_requested: bool,
    mode: ImageMode,
}

impl RenderSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pull the current raster from the renderer.
    ///
    /// # Errors
    ///
    /// Propagates the renderer's capture failure.
    pub fn capture_frame(&self, backend: &dyn RenderBackend) -> Result<Raster, SurfaceError> {
        Ok(backend.capture_frame()?)
    }

    /// One-way ratchet: true forever once any frame had transparency.
    pub fn should_force_full_frame(&mut self, has_transparency: bool) -> bool {
        if has_transparency {
            self.transparency_seen = true;
        }
        self.transparency_seen
    }

    /// Make the next frame full regardless of the diff base (a refresh).
    pub fn request_full_frame(&mut self) {
        self.full_requested = true;
    }

    /// Mode of the most recent frame.
    #[must_use]
    pub fn image_mode(&self) -> ImageMode {
        self.mode
    }

    /// The last full raster, the diff base for the next frame.
    #[must_use]
    pub fn last_raster(&self) -> Option<&Raster> {
        self.last.as_ref()
    }

    /// Frame `raster` against the previous one and PNG-encode the result.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Encode`] if PNG encoding fails.
    pub fn encode_frame(&mut self, raster: Raster) -> Result<EncodedFrame, SurfaceError> {
        let ratchet = self.should_force_full_frame(raster.has_transparency());
        let base = match &self.last {
            Some(last) if last.same_shape(&raster) && !ratchet && !self.full_requested => Some(last),
            _ => None,
        };

        let (mode, png) = match base {
            Some(last) => (ImageMode::Diff, encode_png(&diff_against(last, &raster)?)?),
            None => (ImageMode::Full, encode_png(&raster)?),
        };

        let mode_changed = mode != self.mode;
        self.mode = mode;
        self.full_requested = false;
        self.last = Some(raster);
        Ok(EncodedFrame { mode, mode_changed, png })
    }
}

/// Keep changed pixels, zero the rest.
fn diff_against(last: &Raster, next: &Raster) -> Result<Raster, SurfaceError> {
    let pixels: Vec<u8> = last
        .pixels()
        .chunks_exact(4)
        .zip(next.pixels().chunks_exact(4))
        .flat_map(|(old, new)| if old == new { [0; 4] } else { [new[0], new[1], new[2], new[3]] })
        .collect();
    Ok(Raster::new(next.width(), next.height(), pixels)?)
}

// =============================================================================
// ENCODING
// =============================================================================

/// PNG-encode an RGBA raster.
///
/// # Errors
///
/// Returns [`SurfaceError::Encode`] if the encoder rejects the buffer.
pub fn encode_png(raster: &Raster) -> Result<Vec<u8>, SurfaceError> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(raster.pixels(), raster.width(), raster.height(), ExtendedColorType::Rgba8)
        .map_err(|e| SurfaceError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode PNG bytes into an RGBA raster.
///
/// # Errors
///
/// Returns [`SurfaceError::Decode`] for bytes that are not a PNG image.
pub fn decode_png(bytes: &[u8]) -> Result<Raster, SurfaceError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| SurfaceError::Decode(e.to_string()))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    Ok(Raster::new(width, height, image.into_raw())?)
}

/// Encode a raster as a `data:image/png;base64,` URL for static embedding.
///
/// # Errors
///
/// Returns [`SurfaceError::Encode`] if PNG encoding fails.
pub fn encode_static(raster: &Raster) -> Result<String, SurfaceError> {
    Ok(png_data_url(&encode_png(raster)?))
}

/// Wrap already-encoded PNG bytes in a data URL.
#[must_use]
pub fn png_data_url(png: &[u8]) -> String {
    format!("{PNG_DATA_URI_PREFIX}{}", BASE64.encode(png))
}

/// Heuristic "has the figure drawn anything": some pixel whose color
/// channels are not all 255. Alpha is not inspected: a fully transparent
/// white frame counts as blank.
#[must_use]
pub fn has_visible_content(raster: &Raster) -> bool {
    raster
        .pixels()
        .chunks_exact(4)
        .any(|px| px[..3].iter().any(|&c| c != u8::MAX))
}

/// Decode-and-check variant of [`has_visible_content`] for encoded frames.
///
/// # Errors
///
/// Returns [`SurfaceError::Decode`] for bytes that are not a PNG image.
pub fn frame_has_visible_content(png: &[u8]) -> Result<bool, SurfaceError> {
    Ok(has_visible_content(&decode_png(png)?))
}

#[cfg(test)]
#[path = "surface_test.rs"]
mod tests;
