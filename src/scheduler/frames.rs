//! Frame pacing primitives.
//!
//! The scheduler performs one unit of work per frame and yields to the host
//! between frames. A [`FrameSource`] decides how long "one frame" is, which
//! lets a test harness replace display timing with something deterministic.

use std::future::{self, Future};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Produces the next frame the scheduler may continue on.
pub trait FrameSource {
    /// Resolve when the next frame starts.
    fn next_frame(&mut self) -> impl Future<Output = ()> + Send;
}

/// Frames driven by a tokio interval, e.g. 60 per second.
///
/// The first frame starts one period after construction. Frames missed while
/// the host was busy are skipped rather than replayed in a burst, like a
/// display that drops frames.
#[derive(Debug)]
pub struct IntervalFrames {
    interval: Interval,
}

impl IntervalFrames {
    /// Must be called within a tokio runtime.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_micros(1));
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

impl FrameSource for IntervalFrames {
    fn next_frame(&mut self) -> impl Future<Output = ()> + Send {
        async move {
            self.interval.tick().await;
        }
    }
}

/// Frames that are always ready.
///
/// Runs the whole workload without suspending, which makes runs
/// deterministic under test and fast in benchmarks.
#[derive(Debug, Default)]
pub struct UnpacedFrames {
    frames: u64,
}

impl UnpacedFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames handed out so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl FrameSource for UnpacedFrames {
    fn next_frame(&mut self) -> impl Future<Output = ()> + Send {
        self.frames += 1;
        future::ready(())
    }
}
