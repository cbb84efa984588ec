use std::cell::Cell;
use std::time::{Duration, Instant};

/// Monotonic time source for the frame clock.
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// Production time source backed by [`Instant`], which never goes backwards
/// when the wall clock is adjusted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SteadyClock;

impl TimeSource for SteadyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven time source for tests and replays.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Fixed-timestep frame clock.
///
/// Each outer loop iteration calls [`begin_frame`](Self::begin_frame) once,
/// then [`drain`](Self::drain) to run the simulation in constant steps. The
/// lag is integer nanoseconds, so the step count per frame is exactly
/// `floor((carry + elapsed) / step)` and the residual stays in `[0, step)`.
#[derive(Debug)]
pub struct FixedTimestep<C: TimeSource = SteadyClock> {
    clock: C,
    step: Duration,
    lag: Duration,
    previous: Instant,
    max_frame_time: Option<Duration>,
    total_steps: u64,
    total_frames: u64,
}

impl<C: TimeSource> FixedTimestep<C> {
    /// Create a clock with the given step. The first frame measures from now.
    ///
    /// # Panics
    /// If `step` is zero.
    pub fn new(clock: C, step: Duration) -> Self {
        assert!(!step.is_zero(), "fixed timestep must be non-zero");
        let previous = clock.now();
        Self {
            clock,
            step,
            lag: Duration::ZERO,
            previous,
            max_frame_time: None,
            total_steps: 0,
            total_frames: 0,
        }
    }

    /// Clamp the elapsed time accepted per frame, so a long stall does not
    /// turn into a burst of catch-up steps.
    pub fn with_max_frame_time(mut self, max: Option<Duration>) -> Self {
        self.max_frame_time = max;
        self
    }

    /// Measure the time since the previous frame and add it to the lag.
    ///
    /// Returns the elapsed time that was accounted for.
    pub fn begin_frame(&mut self) -> Duration {
        let now = self.clock.now();
        let mut elapsed = now.saturating_duration_since(self.previous);
        self.previous = now;
        if let Some(max) = self.max_frame_time {
            if elapsed > max {
                tracing::debug!(?elapsed, ?max, "frame time clamped");
                elapsed = max;
            }
        }
        self.lag += elapsed;
        self.total_frames += 1;
        elapsed
    }

    /// Consume one step from the lag if a whole step is available.
    pub fn next_step(&mut self) -> bool {
        if self.lag >= self.step {
            self.lag -= self.step;
            self.total_steps += 1;
            true
        } else {
            false
        }
    }

    /// Run `update` once per whole step in the lag. Returns the step count.
    pub fn drain(&mut self, mut update: impl FnMut(Duration)) -> u32 {
        let mut steps = 0;
        while self.next_step() {
            update(self.step);
            steps += 1;
        }
        steps
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Time accumulated but not yet simulated.
    pub fn lag(&self) -> Duration {
        self.lag
    }

    /// Fraction of a step left in the lag, in `[0, 1)` after a drain.
    pub fn interpolation_alpha(&self) -> f32 {
        self.lag.as_secs_f32() / self.step.as_secs_f32()
    }

    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEP: Duration = Duration::from_millis(10);

    #[test]
    fn drains_whole_steps_and_keeps_remainder() {
        let clock = ManualClock::new();
        let mut timestep = FixedTimestep::new(&clock, STEP);

        clock.advance(Duration::from_millis(35));
        timestep.begin_frame();
        assert_eq!(timestep.drain(|_| {}), 3);
        assert_eq!(timestep.lag(), Duration::from_millis(5));
    }

    #[test]
    fn carry_from_previous_frame_counts() {
        let clock = ManualClock::new();
        let mut timestep = FixedTimestep::new(&clock, STEP);

        clock.advance(Duration::from_millis(7));
        timestep.begin_frame();
        assert_eq!(timestep.drain(|_| {}), 0);

        clock.advance(Duration::from_millis(7));
        timestep.begin_frame();
        assert_eq!(timestep.drain(|_| {}), 1);
        assert_eq!(timestep.lag(), Duration::from_millis(4));
    }

    #[test]
    fn step_count_equals_floor_of_accumulated_time() {
        let clock = ManualClock::new();
        let step = Duration::from_nanos(16_666_667);
        let mut timestep = FixedTimestep::new(&clock, step);
        let frames = [3_000_000u64, 16_000_000, 40_000_001, 1, 33_333_334, 250_000_000];

        let mut carry = 0u64;
        for elapsed in frames {
            clock.advance(Duration::from_nanos(elapsed));
            timestep.begin_frame();
            let steps = timestep.drain(|dt| assert_eq!(dt, step));
            let total = carry + elapsed;
            let step_ns = step.as_nanos() as u64;
            assert_eq!(u64::from(steps), total / step_ns);
            carry = total % step_ns;
            assert_eq!(timestep.lag().as_nanos() as u64, carry);
            assert!(timestep.lag() < step);
        }
    }

    #[test]
    fn max_frame_time_clamps_elapsed() {
        let clock = ManualClock::new();
        let mut timestep =
            FixedTimestep::new(&clock, STEP).with_max_frame_time(Some(Duration::from_millis(50)));

        clock.advance(Duration::from_secs(2));
        assert_eq!(timestep.begin_frame(), Duration::from_millis(50));
        assert_eq!(timestep.drain(|_| {}), 5);
    }

    #[test]
    fn counters_and_alpha() {
        let clock = ManualClock::new();
        let mut timestep = FixedTimestep::new(&clock, STEP);

        clock.advance(Duration::from_millis(25));
        timestep.begin_frame();
        timestep.drain(|_| {});
        assert_eq!(timestep.total_frames(), 1);
        assert_eq!(timestep.total_steps(), 2);
        assert!((timestep.interpolation_alpha() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn frame_without_elapsed_time_runs_no_steps() {
        let clock = ManualClock::new();
        let mut timestep = FixedTimestep::new(&clock, STEP);
        timestep.begin_frame();
        assert_eq!(timestep.drain(|_| {}), 0);
        assert_eq!(timestep.lag(), Duration::ZERO);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_step_is_rejected() {
        let _ = FixedTimestep::new(ManualClock::new(), Duration::ZERO);
    }
}
