//! Host-facing capabilities: the message transport, the display surface of
//! the notebook front-end, and the post-execute hook registry.
//!
//! All three are fire-and-forget. Nothing here waits for acknowledgement.

use crate::canvas::CanvasId;
use crate::frame::WireMessage;

/// Bidirectional channel to one canvas view. Inbound delivery is the
/// host's job: it calls `Canvas::handle_inbound` for each received record.
pub trait Transport {
    /// Queue a message for the view. Per-canvas order must be preserved.
    fn send(&mut self, message: WireMessage);

    /// Tear down the channel from the model side.
    fn close(&mut self);
}

/// The notebook output area.
pub trait DisplayHost {
    /// Mount a live view of the canvas.
    fn display_canvas(&self, id: CanvasId);

    /// Show static HTML in the output area (side channel, not live).
    fn display_html(&self, html: &str);
}

/// Callbacks the host fires once after each completed unit of interactive
/// work (a notebook cell, a REPL statement).
pub trait PostExecuteHooks {
    fn register_post_execute(&mut self, callback: Box<dyn FnMut()>);
}
