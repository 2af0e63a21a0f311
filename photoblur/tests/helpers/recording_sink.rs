//! UiSink that records every notification for later assertions

use image::RgbaImage;
use photoblur::ui::LayerTarget;
use photoblur::UiSink;
use std::sync::{Arc, Mutex};

/// One recorded UI notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCall {
    /// Layer painted; carries the red channel of the first pixel
    Layer(LayerTarget, u8),
    Busy(bool),
    Label(String),
    Controls(bool),
    ClearLayers,
}

/// Cloneable recorder; hand one clone to the pipeline, keep one to inspect
#[derive(Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<UiCall>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<UiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Red-channel markers of every image painted on a layer, in order
    pub fn layers(&self, target: LayerTarget) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                UiCall::Layer(t, marker) if t == target => Some(marker),
                _ => None,
            })
            .collect()
    }

    pub fn last_busy(&self) -> Option<bool> {
        self.calls().into_iter().rev().find_map(|call| match call {
            UiCall::Busy(busy) => Some(busy),
            _ => None,
        })
    }

    fn push(&self, call: UiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl UiSink for RecordingSink {
    fn set_layer(&mut self, target: LayerTarget, image: Arc<RgbaImage>) {
        let marker = image.get_pixel(0, 0)[0];
        self.push(UiCall::Layer(target, marker));
    }

    fn set_busy(&mut self, busy: bool) {
        self.push(UiCall::Busy(busy));
    }

    fn set_label(&mut self, text: &str) {
        self.push(UiCall::Label(text.to_string()));
    }

    fn set_controls_enabled(&mut self, enabled: bool) {
        self.push(UiCall::Controls(enabled));
    }

    fn clear_layers(&mut self) {
        self.push(UiCall::ClearLayers);
    }
}
