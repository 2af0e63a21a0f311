//! Blur filter with test-controlled completion
//!
//! Each call blocks its worker thread until the test releases the call's
//! intensity (or everything). Always call `release_all` before a test ends:
//! the runtime waits for blocking threads on drop.

use image::{Rgba, RgbaImage};
use photoblur::{BlurFilter, Intensity};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

#[derive(Default)]
struct GateInner {
    released: HashSet<u8>,
    failing: HashSet<u8>,
    open_all: bool,
    started: Vec<(PathBuf, u8)>,
}

#[derive(Default)]
pub struct GatedFilter {
    inner: Mutex<GateInner>,
    cv: Condvar,
}

impl GatedFilter {
    /// Filter where every call blocks until released
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Filter where no call blocks
    pub fn open() -> Arc<Self> {
        let filter = Self::new();
        filter.release_all();
        filter
    }

    /// Let calls at this intensity finish
    pub fn release(&self, value: u8) {
        self.inner.lock().unwrap().released.insert(value);
        self.cv.notify_all();
    }

    /// Let every call finish, now and later
    pub fn release_all(&self) {
        self.inner.lock().unwrap().open_all = true;
        self.cv.notify_all();
    }

    /// Calls at this intensity produce no image
    pub fn fail(&self, value: u8) {
        self.inner.lock().unwrap().failing.insert(value);
    }

    /// Intensities the filter has been entered with, in call order
    pub fn started(&self) -> Vec<u8> {
        self.inner.lock().unwrap().started.iter().map(|(_, v)| *v).collect()
    }

    /// Paths the filter has been entered with, in call order
    pub fn started_paths(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().started.iter().map(|(p, _)| p.clone()).collect()
    }

    /// Wait (polling) until a call at this intensity has entered the filter
    pub async fn wait_started(&self, value: u8) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !self.started().contains(&value) {
            assert!(
                tokio::time::Instant::now() < deadline,
                "filter never started intensity {}",
                value
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl BlurFilter for GatedFilter {
    fn apply_blur(&self, path: &Path, intensity: Intensity) -> Option<RgbaImage> {
        let value = intensity.value();
        let mut inner = self.inner.lock().unwrap();
        inner.started.push((path.to_path_buf(), value));

        while !(inner.open_all || inner.released.contains(&value)) {
            inner = self.cv.wait(inner).unwrap();
        }

        if inner.failing.contains(&value) {
            return None;
        }
        // Red channel carries the intensity so painted layers are identifiable
        Some(RgbaImage::from_pixel(2, 2, Rgba([value, 0, 0, 255])))
    }
}
