//! Frame clocks and the frame-time/FPS aggregate shown in the window title.

use std::time::{Duration, Instant};

use crate::error::ConfigError;

/// Source of the elapsed time fed to each scene update.
pub trait FrameClock {
    /// Seconds since the previous call (or since creation on the first).
    fn tick(&mut self) -> f32;
}

/// Wall-clock timer for interactive runs.
#[derive(Debug, Clone)]
pub struct SystemClock {
    last: Instant,
    /// Upper bound on a single step, so a stalled frame (window drag,
    /// debugger) does not fling animated objects across the scene.
    max_step: Duration,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            max_step: Duration::from_millis(250),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for SystemClock {
    fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last).min(self.max_step);
        self.last = now;
        elapsed.as_secs_f32()
    }
}

/// Constant step, used by headless runs and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock {
    pub step: f32,
}

impl FixedClock {
    pub fn new(step: f32) -> Result<Self, ConfigError> {
        if !step.is_finite() || step < 0.0 {
            return Err(ConfigError::TimeStep(step));
        }
        Ok(Self { step })
    }
}

impl FrameClock for FixedClock {
    fn tick(&mut self) -> f32 {
        self.step
    }
}

/// Averages reported once per aggregation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStats {
    /// Mean frame time in seconds.
    pub frame_time: f32,
    pub frames: u32,
}

impl FrameStats {
    pub fn fps(&self) -> u32 {
        if self.frame_time > 0.0 {
            (1.0 / self.frame_time).round() as u32
        } else {
            0
        }
    }

    pub fn window_title(&self, base: &str) -> String {
        format!(
            "{base} - Frame Time: {:.2}ms, FPS: {}",
            self.frame_time * 1000.0,
            self.fps()
        )
    }
}

/// Accumulates frame times and emits an average once more than `window`
/// seconds have passed.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: f32,
    total: f32,
    frames: u32,
    latest: Option<FrameStats>,
}

impl FpsCounter {
    pub const DEFAULT_WINDOW: f32 = 0.5;

    pub fn new(window: f32) -> Self {
        Self {
            window,
            total: 0.0,
            frames: 0,
            latest: None,
        }
    }

    pub fn record(&mut self, dt: f32) -> Option<FrameStats> {
        self.total += dt;
        self.frames += 1;
        if self.total <= self.window {
            return None;
        }
        let stats = FrameStats {
            frame_time: self.total / self.frames as f32,
            frames: self.frames,
        };
        self.total = 0.0;
        self.frames = 0;
        self.latest = Some(stats);
        Some(stats)
    }

    /// Most recent completed window.
    pub fn latest(&self) -> Option<FrameStats> {
        self.latest
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WINDOW)
    }
}
