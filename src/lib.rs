//! Live, synchronized plotting widgets for notebook front-ends.
//!
//! This crate sits between an external figure renderer and a browser view. It
//! owns the canvas synchronization protocol: which messages flow each way,
//! when frames are shipped full or as diffs, when a view is mounted, and how
//! figures are batched for display after each unit of interactive work. The
//! renderer, the transport, and the notebook host are consumed through traits
//! and injected by the embedding application.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`frame`] | Inbound/outbound message types, wire encoding, [`frame::ErrorCode`] |
//! | [`backend`] | The [`backend::RenderBackend`] trait, rasters, export formats |
//! | [`host`] | Transport, display host, and post-execute hook traits |
//! | [`surface`] | Full/diff framing, transparency ratchet, PNG encoding |
//! | [`keymap`] | Browser key-name translation |
//! | [`config`] | Typed configuration from `FIGWIDGET_*` environment variables |
//! | [`toolbar`] | Navigation toolbar controller |
//! | [`canvas`] | Per-figure canvas state machine |
//! | [`manager`] | Figure registry, show queue, session coordinator |

pub mod backend;
pub mod canvas;
pub mod config;
pub mod frame;
pub mod host;
pub mod keymap;
pub mod manager;
pub mod surface;
pub mod toolbar;

#[cfg(test)]
pub mod test_helpers;

/// A global tracing subscriber was already installed.
#[derive(Debug, thiserror::Error)]
#[error("tracing subscriber init failed: {0}")]
pub struct TracingInitError(String);

/// Install a `tracing-subscriber` fmt subscriber for hosts that have none.
///
/// # Errors
///
/// Returns [`TracingInitError`] if a global subscriber is already set.
pub fn init_tracing() -> Result<(), TracingInitError> {
    tracing_subscriber::fmt().try_init().map_err(|e| TracingInitError(e.to_string()))
}
