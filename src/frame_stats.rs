//! Frame statistics for debugging and performance analysis.
//!
//! Enable with the `frame-stats` feature:
//! ```bash
//! RUST_LOG=info cargo run --features frame-stats
//! ```
//!
//! Once a second the counters are logged and reset:
//! - Frames run by the stage loop
//! - Act layouts (docking of the UI regions and content)
//! - Combined-transform recomputations (lazy cache misses)

#[cfg(feature = "frame-stats")]
mod inner {
    use std::cell::RefCell;
    use std::time::Instant;

    thread_local! {
        static STATS: RefCell<FrameStats> = RefCell::new(FrameStats::new());
    }

    struct FrameStats {
        frames: u64,
        layouts: u64,
        transform_recomputes: u64,
        /// Last time stats were printed
        last_print: Instant,
    }

    impl FrameStats {
        fn new() -> Self {
            Self {
                frames: 0,
                layouts: 0,
                transform_recomputes: 0,
                last_print: Instant::now(),
            }
        }

        fn reset(&mut self) {
            self.frames = 0;
            self.layouts = 0;
            self.transform_recomputes = 0;
            self.last_print = Instant::now();
        }
    }

    #[inline]
    pub fn record_layout() {
        STATS.with(|s| s.borrow_mut().layouts += 1);
    }

    #[inline]
    pub fn record_transform_recompute() {
        STATS.with(|s| s.borrow_mut().transform_recomputes += 1);
    }

    /// Called at the end of each frame; logs once a second.
    pub fn end_frame() {
        STATS.with(|s| {
            let mut stats = s.borrow_mut();
            stats.frames += 1;

            if stats.last_print.elapsed().as_secs() >= 1 {
                let per_frame = stats.transform_recomputes as f64 / stats.frames as f64;
                log::info!(
                    "[Frame Stats] frames={} layouts={} recomputes={} ({:.1}/frame)",
                    stats.frames,
                    stats.layouts,
                    stats.transform_recomputes,
                    per_frame
                );
                stats.reset();
            }
        });
    }
}

#[cfg(feature = "frame-stats")]
pub use inner::*;

// No-op implementations when feature is disabled - these get completely inlined away
#[cfg(not(feature = "frame-stats"))]
#[inline(always)]
pub fn record_layout() {}

#[cfg(not(feature = "frame-stats"))]
#[inline(always)]
pub fn record_transform_recompute() {}

#[cfg(not(feature = "frame-stats"))]
#[inline(always)]
pub fn end_frame() {}
