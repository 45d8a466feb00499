//! Wall-clock timing for pagination passes.

use std::time::{Duration, Instant};

/// An accumulating stopwatch.
///
/// A pass may be paused while the host renders a batch of pages, so the
/// timer only counts the spans between [`Timer::start`] and [`Timer::pause`].
#[derive(Debug, Default, Clone)]
pub struct Timer {
    total: Duration,
    started: Option<Instant>,
}

impl Timer {
    /// Create a stopped timer with nothing accumulated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the timer is currently counting.
    #[must_use]
    pub const fn running(&self) -> bool {
        self.started.is_some()
    }

    /// Start (or restart) counting. Has no effect on an already running timer.
    pub fn start(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    /// Stop counting and return the accumulated total.
    pub fn pause(&mut self) -> Duration {
        if let Some(started) = self.started.take() {
            self.total += started.elapsed();
        }
        self.total
    }

    /// Total time counted so far, including the running span.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.total + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }

    /// Stop the timer and format the total for display.
    pub fn end(&mut self) -> String {
        format_duration(self.pause())
    }
}

/// Format a duration the way pass summaries print it: `"0.42 ms"`,
/// `"37 ms"`, `"2.5 s"`, `"1.2 min"`.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_secs_f64() * 1000.0;
    if ms < 1.0 {
        return format!("{} ms", trim_float(format!("{ms:.2}")));
    }
    if ms < 1000.0 {
        return format!("{} ms", ms.round());
    }

    let seconds = ms / 1000.0;
    if seconds < 60.0 {
        return format!("{} s", trim_float(format!("{seconds:.1}")));
    }

    let minutes = seconds / 60.0;
    format!("{} min", trim_float(format!("{minutes:.1}")))
}

/// Drop trailing zeros (and a dangling point) from a fixed-precision number.
fn trim_float(formatted: String) -> String {
    if formatted.contains('.') {
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_unit() {
        assert_eq!(format_duration(Duration::from_micros(420)), "0.42 ms");
        assert_eq!(format_duration(Duration::from_millis(37)), "37 ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5 s");
        assert_eq!(format_duration(Duration::from_secs(72)), "1.2 min");
        assert_eq!(format_duration(Duration::from_secs(3)), "3 s");
    }

    #[test]
    fn paused_timer_keeps_total() {
        let mut timer = Timer::new();
        assert!(!timer.running());
        timer.start();
        assert!(timer.running());
        let total = timer.pause();
        assert!(!timer.running());
        assert_eq!(timer.elapsed(), total);
    }
}
