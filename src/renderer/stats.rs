use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Why a frame produced no image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Swapchain was lost or outdated and has been reconfigured.
    SurfaceReconfigured,
    SurfaceTimeout,
    SurfaceError,
    EmptyViewport,
}

/// Frame counters shared with the UI. A skipped frame is normal (resize,
/// minimise) but is counted so a stall shows up.
#[derive(Default)]
pub struct FrameStats {
    pub presented: AtomicU64,
    pub skipped: AtomicU64,
    pub fps: Mutex<f32>,
}

impl FrameStats {
    pub fn record_presented(&self) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self, reason: SkipReason) {
        let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(?reason, skipped, "frame skipped");
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = FrameStats::default();
        stats.record_presented();
        stats.record_presented();
        stats.record_skipped(SkipReason::SurfaceTimeout);

        assert_eq!(stats.presented(), 2);
        assert_eq!(stats.skipped(), 1);
        assert_eq!(*stats.fps.lock(), 0.0);
    }
}
