use std::time::{Duration, Instant};

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(5);

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Only the seconds within a day are shown, so 25 hours renders as `01:00:00`.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs() % SECONDS_PER_DAY;
    let (hours, rem) = (secs / 3600, secs % 3600);
    let (minutes, seconds) = (rem / 60, rem % 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentTracker {
    current: u32,
    started: Instant,
}

impl SegmentTracker {
    pub fn new(started: Instant) -> Self {
        Self { current: 1, started }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Duration of the current segment if `number` marks a later one.
    pub fn completed_by(&self, number: u32, now: Instant) -> Option<Duration> {
        (number > self.current).then(|| self.elapsed(now))
    }

    pub fn advance(&mut self, number: u32, now: Instant) {
        self.current = number;
        self.started = now;
    }
}

/// Nothing here runs on a timer: the ticker is polled whenever a line arrives
/// from ffmpeg, so a silent process produces no progress output.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTicker {
    started: Instant,
    last_emit: Instant,
    interval: Duration,
}

impl ProgressTicker {
    pub fn new(started: Instant) -> Self {
        Self::with_interval(started, PROGRESS_INTERVAL)
    }

    pub fn with_interval(started: Instant, interval: Duration) -> Self {
        Self {
            started,
            last_emit: started,
            interval,
        }
    }

    /// Total elapsed time if a progress line is due at `now`.
    pub fn poll(&mut self, now: Instant) -> Option<Duration> {
        if now.saturating_duration_since(self.last_emit) < self.interval {
            return None;
        }
        self.last_emit = now;
        Some(now.saturating_duration_since(self.started))
    }
}

pub fn progress_message(total: Duration, segment: Option<(u32, Duration)>) -> String {
    match segment {
        Some((index, elapsed)) => format!(
            "Recording: {} (Current segment {}: {})",
            format_hms(total),
            index,
            format_hms(elapsed)
        ),
        None => format!("Recording duration: {}", format_hms(total)),
    }
}
