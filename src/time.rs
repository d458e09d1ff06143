//! Frame timing for the host loop.
//!
//! The simulation never reads a clock itself: every tick is handed a
//! `(delta_time, time)` pair. [`FrameClock`] produces that pair from wall
//! time, with pause, a fixed step for deterministic runs and a clamp on
//! long frames (a dragged window or a breakpoint would otherwise throw
//! every particle across the scene in one step).
//!
//! # Example
//!
//! ```ignore
//! let mut clock = FrameClock::new();
//!
//! // In the redraw handler:
//! if let Some((dt, time)) = clock.tick() {
//!     sim.tick(dt, time, &source);
//! }
//! ```

use std::time::{Duration, Instant};

/// Longest step a single tick may take, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.1;

/// Wall-clock source of tick times.
#[derive(Debug)]
pub struct FrameClock {
    start: Instant,
    last_frame: Instant,
    /// Seconds since start, excluding paused spans.
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    pause_elapsed: Duration,
    fixed_delta: Option<f32>,
    max_delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            pause_elapsed: Duration::ZERO,
            fixed_delta: None,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }

    /// Step every tick by exactly `delta` seconds, whatever the frame rate.
    pub fn with_fixed_delta(mut self, delta: f32) -> Self {
        self.set_fixed_delta(Some(delta));
        self
    }

    pub fn with_max_delta(mut self, max: f32) -> Self {
        self.max_delta = max.max(0.0);
        self
    }

    /// Advance the clock. Call once per frame.
    ///
    /// Returns `(delta_time, time)` for the next tick, or `None` while
    /// paused (the simulation should not tick at all).
    pub fn tick(&mut self) -> Option<(f32, f32)> {
        if self.paused {
            self.delta_secs = 0.0;
            return None;
        }

        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.delta_secs = match self.fixed_delta {
            Some(fixed) => fixed,
            None => raw_delta.min(self.max_delta),
        };

        // Fixed steps advance time by the step so runs replay exactly.
        self.elapsed_secs = match self.fixed_delta {
            Some(_) => self.elapsed_secs + self.delta_secs,
            None => (now.duration_since(self.start) - self.pause_elapsed).as_secs_f32(),
        };

        self.frame_count += 1;

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
            log::trace!("{:.1} fps", self.fps);
        }

        Some((self.delta_secs, self.elapsed_secs))
    }

    /// Seconds since start, excluding paused spans.
    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    /// Step of the last tick.
    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    /// Ticks since start.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            let now = Instant::now();
            self.pause_elapsed += now.duration_since(self.last_frame);
            self.last_frame = now;
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// `None` returns to wall-clock steps.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta.map(|d| d.max(0.0));
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.max_delta(), DEFAULT_MAX_DELTA);
    }

    #[test]
    fn test_clock_tick() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let (dt, time) = clock.tick().unwrap();

        assert!(dt > 0.0);
        assert!(time > 0.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_pause_skips_ticks() {
        let mut clock = FrameClock::new();
        clock.tick();

        clock.pause();
        let elapsed_before = clock.elapsed();
        thread::sleep(Duration::from_millis(10));
        assert!(clock.tick().is_none());
        assert_eq!(clock.elapsed(), elapsed_before);
        assert_eq!(clock.delta(), 0.0);
        assert_eq!(clock.frame(), 1);

        clock.toggle_pause();
        assert!(clock.tick().is_some());
    }

    #[test]
    fn test_long_frames_are_clamped() {
        let mut clock = FrameClock::new().with_max_delta(0.005);
        thread::sleep(Duration::from_millis(20));
        let (dt, _) = clock.tick().unwrap();
        assert_eq!(dt, 0.005);
    }

    #[test]
    fn test_fixed_delta() {
        let mut clock = FrameClock::new().with_fixed_delta(1.0 / 60.0);
        thread::sleep(Duration::from_millis(50));

        let (dt, t1) = clock.tick().unwrap();
        let (_, t2) = clock.tick().unwrap();
        assert_eq!(dt, 1.0 / 60.0);
        assert_eq!(t1, 1.0 / 60.0);
        assert_eq!(t2, 2.0 / 60.0);
    }
}
