//! UI boundary
//!
//! Everything the pipeline knows about the window: the control events it
//! receives, the output notifications it sends, and the dispatcher that
//! posts work onto the single UI context.

use crate::job::{JobNotice, JobOutcome};
use image::RgbaImage;
use photoblur_common::events::JobRole;
use photoblur_common::{Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Layer a result is painted on (one per job role)
pub type LayerTarget = JobRole;

/// Output side of the window
///
/// Called only from the UI context. Implementations render, the pipeline
/// makes no assumptions about how.
pub trait UiSink: Send {
    /// Replace the image shown on a layer
    fn set_layer(&mut self, target: LayerTarget, image: Arc<RgbaImage>);

    /// Show or hide the busy indicator
    fn set_busy(&mut self, busy: bool);

    /// Set the intensity label text (empty hides the label)
    fn set_label(&mut self, text: &str);

    /// Enable or disable the save/reset/compare controls
    fn set_controls_enabled(&mut self, enabled: bool);

    /// Remove both layers (new image opened or image cleared)
    fn clear_layers(&mut self) {}
}

/// Input events raised by the window controls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Intensity control moved (raw value, nominally 0..=100)
    IntensityChanged(i64),
    /// User picked a source image
    ImageOpened(PathBuf),
    /// Source image removed
    ImageCleared,
    /// Reset button: intensity back to zero
    ResetRequested,
    /// Save the current foreground preview
    SaveRequested(PathBuf),
    /// Compare control pressed: show the unblurred original
    CompareStarted,
    /// Compare control released: back to the current preview
    CompareEnded,
}

/// Messages processed by the UI context, in posting order
#[derive(Debug)]
pub enum UiMessage {
    /// Event from a window control
    Control(ControlEvent),
    /// Result of a finished blur job
    JobOutcome(JobOutcome),
    /// Blur job that finished without an image
    JobUnavailable(JobNotice),
    /// Stop the UI context loop
    Shutdown,
}

/// Post-to-context primitive for the UI context
///
/// Worker code never touches UI state directly; it posts a message here and
/// the UI context applies it.
#[derive(Clone, Debug)]
pub struct UiDispatcher {
    tx: mpsc::UnboundedSender<UiMessage>,
}

impl UiDispatcher {
    /// Create a dispatcher and the receiving end owned by the UI context
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UiMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Post a message onto the UI context
    pub fn post(&self, message: UiMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| Error::Shutdown("UI context has stopped".to_string()))
    }

    /// True once the UI context has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// UiSink that reports every notification through tracing
///
/// Used by the headless driver in place of a window.
#[derive(Debug, Default)]
pub struct TracingSink {
    busy: bool,
}

impl UiSink for TracingSink {
    fn set_layer(&mut self, target: LayerTarget, image: Arc<RgbaImage>) {
        info!(
            "Layer {} updated ({}x{})",
            target,
            image.width(),
            image.height()
        );
    }

    fn set_busy(&mut self, busy: bool) {
        if self.busy != busy {
            debug!("Busy indicator {}", if busy { "shown" } else { "hidden" });
            self.busy = busy;
        }
    }

    fn set_label(&mut self, text: &str) {
        if !text.is_empty() {
            debug!("Intensity label: {}", text);
        }
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        debug!("Controls {}", if enabled { "enabled" } else { "disabled" });
    }

    fn clear_layers(&mut self) {
        debug!("Layers cleared");
    }
}
