//! Figure managers, the figure registry, and the session coordinator.
//!
//! DESIGN
//! ======
//! A `Session` owns everything one interpreter session needs: the registry of
//! figures keyed by slot number, the show queue, the shared device-pixel
//! ratio, and the widget config. Nothing here is a global; tests build as many
//! isolated sessions as they like.
//!
//! SHOW POLICY
//! ===========
//! - Interactive: mutations never display eagerly. They enqueue the figure
//!   and mark a draw as requested. The host fires `flush_figures` once per
//!   unit of work, which shows every queued figure that is still alive,
//!   exactly once, and clears the queue.
//! - Non-interactive: only an explicit show displays. After it, the figure is
//!   evicted from the active list so a later implicit show-all skips it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::backend::RenderBackend;
use crate::canvas::{Canvas, CanvasError, CanvasState, SharedDpiRatio, ShowOutcome};
use crate::config::WidgetConfig;
use crate::host::{DisplayHost, PostExecuteHooks, Transport};

/// Figure slot number, unique within a registry.
pub type FigureNum = u32;

// =============================================================================
// FIGURE MANAGER
// =============================================================================

/// Mediates one canvas's lifecycle against the registry.
#[derive(Debug)]
pub struct FigureManager {
    num: FigureNum,
    canvas: Canvas,
}

impl FigureManager {
    #[must_use]
    pub fn new(num: FigureNum, canvas: Canvas) -> Self {
        Self { num, canvas }
    }

    #[must_use]
    pub fn num(&self) -> FigureNum {
        self.num
    }

    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Mount a view if the canvas is closed, otherwise request a redraw.
    ///
    /// # Errors
    ///
    /// Propagates the canvas's show error.
    pub fn show(&mut self) -> Result<ShowOutcome, CanvasError> {
        self.canvas.show()
    }

    /// Close the canvas and release its toolbar.
    pub fn destroy(&mut self) {
        self.canvas.destroy();
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Live figures keyed by slot number, plus the active list (last = current).
#[derive(Debug, Default)]
pub struct Registry {
    managers: BTreeMap<FigureNum, FigureManager>,
    active: Vec<FigureNum>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manager and make it the current figure. Returns the
    /// manager previously registered under the same number, if any.
    pub fn insert(&mut self, manager: FigureManager) -> Option<FigureManager> {
        let num = manager.num();
        let previous = self.managers.insert(num, manager);
        self.set_active(num);
        previous
    }

    pub fn remove(&mut self, num: FigureNum) -> Option<FigureManager> {
        self.active.retain(|n| *n != num);
        self.managers.remove(&num)
    }

    #[must_use]
    pub fn get(&self, num: FigureNum) -> Option<&FigureManager> {
        self.managers.get(&num)
    }

    pub fn get_mut(&mut self, num: FigureNum) -> Option<&mut FigureManager> {
        self.managers.get_mut(&num)
    }

    #[must_use]
    pub fn contains(&self, num: FigureNum) -> bool {
        self.managers.contains_key(&num)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Registered slot numbers in ascending order.
    #[must_use]
    pub fn nums(&self) -> Vec<FigureNum> {
        self.managers.keys().copied().collect()
    }

    /// Lowest unused slot number, starting at 1.
    #[must_use]
    pub fn next_num(&self) -> FigureNum {
        (1..).find(|n| !self.managers.contains_key(n)).unwrap_or(FigureNum::MAX)
    }

    /// Make `num` the current figure. Returns false if it is not registered.
    pub fn set_active(&mut self, num: FigureNum) -> bool {
        if !self.managers.contains_key(&num) {
            return false;
        }
        self.active.retain(|n| *n != num);
        self.active.push(num);
        true
    }

    /// The current figure.
    #[must_use]
    pub fn active(&self) -> Option<FigureNum> {
        self.active.last().copied()
    }

    /// Figures an implicit show-all would still consider, oldest first.
    #[must_use]
    pub fn pending_show(&self) -> &[FigureNum] {
        &self.active
    }

    /// Drop `num` from the active list without unregistering it.
    pub fn evict_pending(&mut self, num: FigureNum) {
        self.active.retain(|n| *n != num);
    }
}

// =============================================================================
// SHOW QUEUE
// =============================================================================

/// Figures waiting for the next flush. A figure appears at most once.
#[derive(Debug, Default)]
pub struct ShowQueue {
    pending: Vec<FigureNum>,
    draw_called: bool,
}

impl ShowQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `num`, moving it to the back if already present.
    pub fn enqueue(&mut self, num: FigureNum) {
        self.pending.retain(|n| *n != num);
        self.pending.push(num);
        self.draw_called = true;
    }

    pub fn remove(&mut self, num: FigureNum) {
        self.pending.retain(|n| *n != num);
    }

    #[must_use]
    pub fn pending(&self) -> &[FigureNum] {
        &self.pending
    }

    #[must_use]
    pub fn draw_called(&self) -> bool {
        self.draw_called
    }

    /// Empty the queue and reset the draw flag in one step.
    pub fn take(&mut self) -> Vec<FigureNum> {
        self.draw_called = false;
        mem::take(&mut self.pending)
    }
}

// =============================================================================
// SESSION
// =============================================================================

pub struct Session {
    config: WidgetConfig,
    registry: Registry,
    queue: ShowQueue,
    host: Rc<dyn DisplayHost>,
    dpi_ratio: SharedDpiRatio,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[must_use]
    pub fn new(config: WidgetConfig, host: Rc<dyn DisplayHost>) -> Self {
        Self { config, registry: Registry::new(), queue: ShowQueue::new(), host, dpi_ratio: SharedDpiRatio::new() }
    }

    #[must_use]
    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn queue(&self) -> &ShowQueue {
        &self.queue
    }

    #[must_use]
    pub fn dpi_ratio(&self) -> f64 {
        self.dpi_ratio.get()
    }

    #[must_use]
    pub fn figure(&self, num: FigureNum) -> Option<&FigureManager> {
        self.registry.get(num)
    }

    pub fn figure_mut(&mut self, num: FigureNum) -> Option<&mut FigureManager> {
        self.registry.get_mut(num)
    }

    /// Switch between batched (interactive) and explicit-show drawing.
    pub fn set_interactive(&mut self, interactive: bool) {
        self.config.interactive = interactive;
    }

    /// Register a new figure and make it current. In interactive mode it is
    /// queued for the next flush.
    ///
    /// # Errors
    ///
    /// Returns the canvas error if the redraw request cannot be sent.
    pub fn new_figure(
        &mut self,
        backend: Box<dyn RenderBackend>,
        transport: Box<dyn Transport>,
    ) -> Result<FigureNum, CanvasError> {
        let num = self.registry.next_num();
        let canvas = Canvas::new(backend, transport, Rc::clone(&self.host), self.dpi_ratio.clone(), &self.config);
        info!(num, canvas_id = %canvas.id(), "manager: figure registered");
        self.registry.insert(FigureManager::new(num, canvas));

        if self.config.interactive {
            self.queue.enqueue(num);
            if let Some(manager) = self.registry.get_mut(num) {
                manager.canvas_mut().request_redraw()?;
            }
        }
        Ok(num)
    }

    /// Make `num` the current figure.
    pub fn set_active(&mut self, num: FigureNum) -> bool {
        self.registry.set_active(num)
    }

    /// Note a mutation of the current figure. Interactive mode queues it for
    /// the next flush; otherwise nothing happens.
    pub fn draw_if_interactive(&mut self) -> bool {
        if !self.config.interactive {
            return false;
        }
        let Some(num) = self.registry.active() else {
            return false;
        };
        self.queue.enqueue(num);
        debug!(num, "manager: figure queued for flush");
        true
    }

    /// Show every queued figure that is still alive, once, then clear the
    /// queue. Returns how many figures had a view mounted by this flush.
    ///
    /// Every queued figure is attempted even if one fails. The queue is
    /// cleared either way.
    ///
    /// # Errors
    ///
    /// Returns the first show error encountered.
    pub fn flush_figures(&mut self) -> Result<usize, CanvasError> {
        if !self.queue.draw_called() {
            return Ok(0);
        }

        // PHASE: SNAPSHOT AND CLEAR
        let pending = self.queue.take();

        // PHASE: SHOW LIVE FIGURES
        let mut displayed = 0;
        let mut first_error = None;
        for num in pending {
            // EDGE: destroyed between enqueue and flush; drop silently.
            let Some(manager) = self.registry.get_mut(num) else {
                debug!(num, "manager: queued figure gone before flush");
                continue;
            };
            // EDGE: closed by either side after it was queued; never remount.
            if manager.canvas().is_destroyed() || manager.canvas().state() == CanvasState::Closed {
                debug!(num, "manager: queued figure closed before flush");
                continue;
            }
            match manager.show() {
                Ok(ShowOutcome::Displayed) => {
                    debug!(num, "manager: flushed");
                    displayed += 1;
                }
                Ok(outcome) => debug!(num, ?outcome, "manager: flushed without mount"),
                Err(e) => {
                    warn!(num, error = %e, "manager: flush show failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(displayed),
        }
    }

    /// Explicitly show one figure. In non-interactive mode the figure leaves
    /// the pending list whether or not the show succeeds.
    ///
    /// # Errors
    ///
    /// Propagates the canvas's show error.
    pub fn show(&mut self, num: FigureNum) -> Result<ShowOutcome, CanvasError> {
        let interactive = self.config.interactive;
        let Some(manager) = self.registry.get_mut(num) else {
            debug!(num, "manager: show for unknown figure");
            return Ok(ShowOutcome::Dropped);
        };
        let outcome = manager.show();
        if !interactive {
            self.registry.evict_pending(num);
        }
        outcome
    }

    /// Show every registered figure.
    ///
    /// # Errors
    ///
    /// Returns the first show error; figures after it are not shown.
    pub fn show_all(&mut self) -> Result<Vec<(FigureNum, ShowOutcome)>, CanvasError> {
        let mut outcomes = Vec::new();
        for num in self.registry.nums() {
            outcomes.push((num, self.show(num)?));
        }
        Ok(outcomes)
    }

    /// Unregister a figure, close its canvas, and release its toolbar.
    pub fn destroy(&mut self, num: FigureNum) -> bool {
        self.queue.remove(num);
        let Some(mut manager) = self.registry.remove(num) else {
            return false;
        };
        manager.destroy();
        info!(num, canvas_id = %manager.canvas().id(), "manager: figure destroyed");
        true
    }

    /// Destroy every figure.
    pub fn close_all(&mut self) {
        for num in self.registry.nums() {
            self.destroy(num);
        }
    }

    /// Route a record received from figure `num`'s view. Messages for figures
    /// that no longer exist are dropped.
    ///
    /// # Errors
    ///
    /// Propagates the canvas's dispatch error.
    pub fn handle_inbound(&mut self, num: FigureNum, content: &Value) -> Result<(), CanvasError> {
        match self.registry.get_mut(num) {
            Some(manager) => manager.canvas_mut().handle_inbound(content),
            None => {
                debug!(num, "manager: message for unknown figure dropped");
                Ok(())
            }
        }
    }

    /// One line per figure: `<label> - <canvas id>`. Non-interactive sessions
    /// also report how many figures are pending show.
    #[must_use]
    pub fn connection_info(&self) -> String {
        let mut lines: Vec<String> = self
            .registry
            .managers
            .values()
            .map(|manager| {
                let canvas = manager.canvas();
                let label = match canvas.figure_label() {
                    "" => format!("Figure {}", manager.num()),
                    label => label.to_string(),
                };
                format!("{label} - {}", canvas.id())
            })
            .collect();
        if !self.config.interactive {
            lines.push(format!("Figures pending show: {}", self.registry.pending_show().len()));
        }
        lines.join("\n")
    }

    /// Hook `flush_figures` into the host's post-execute callbacks. The hook
    /// holds only a weak reference; once the session is dropped it does
    /// nothing. A flush fired while the session is already borrowed is
    /// skipped.
    pub fn register_flush(session: &Rc<RefCell<Self>>, hooks: &mut dyn PostExecuteHooks) {
        let weak: Weak<RefCell<Self>> = Rc::downgrade(session);
        hooks.register_post_execute(Box::new(move || {
            let Some(session) = weak.upgrade() else {
                return;
            };
            let Ok(mut guard) = session.try_borrow_mut() else {
                warn!("manager: re-entrant flush skipped");
                return;
            };
            if let Err(e) = guard.flush_figures() {
                warn!(error = %e, "manager: flush failed");
            }
        }));
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
