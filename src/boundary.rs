use regex::Regex;

use crate::error::Result;

/// Recognizes the line a tool prints when it starts writing a new segment file.
pub trait BoundaryDetector: Send + Sync {
    /// Number of the segment file opened by `line`, if it announces one.
    fn detect(&self, line: &str) -> Option<u32>;
}

/// ffmpeg's segment muxer logs `Opening 'dir/name_003.mp4' for writing`.
pub const FFMPEG_SEGMENT_PATTERN: &str = r"Opening '.*?(\d+)\.mp4'";

pub struct RegexBoundaryDetector {
    pattern: Regex,
}

impl RegexBoundaryDetector {
    /// The first capture group of `pattern` must match the segment number.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    pub fn ffmpeg() -> Result<Self> {
        Self::new(FFMPEG_SEGMENT_PATTERN)
    }
}

impl BoundaryDetector for RegexBoundaryDetector {
    fn detect(&self, line: &str) -> Option<u32> {
        self.pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|number| number.as_str().parse().ok())
    }
}
