use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to launch {}: {source}", .tool.display())]
    Launch {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read ffmpeg {stream}: {source}")]
    StreamRead {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("ffmpeg exited with code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    SubprocessFailure { code: Option<i32> },

    #[error("Invalid segment time format: {0}")]
    InvalidSegmentDuration(String),

    #[error("The --complete-segment option requires --segment to be specified")]
    CompleteSegmentWithoutSegment,

    #[error("Invalid boundary pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Capture session has already run")]
    SessionFinished,

    #[error("Capture aborted by user")]
    Aborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CaptureError>;
