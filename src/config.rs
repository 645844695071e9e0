use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::output::OutputPolicy;

pub const DEFAULT_TOOL: &str = "ffmpeg";
pub const DEFAULT_OUTPUT_DIR: &str = "recordings";

/// Everything a capture session needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Stream URL handed to ffmpeg as its input.
    pub source: String,
    /// ffmpeg executable, looked up on `PATH` when relative.
    pub tool: PathBuf,
    pub policy: OutputPolicy,
}

impl CaptureConfig {
    pub fn new(source: impl Into<String>, policy: OutputPolicy) -> Self {
        Self {
            source: source.into(),
            tool: PathBuf::from(DEFAULT_TOOL),
            policy,
        }
    }

    pub fn with_tool(mut self, tool: impl Into<PathBuf>) -> Self {
        self.tool = tool.into();
        self
    }

    /// Create the directory ffmpeg writes into.
    pub fn ensure_output_dir(&self) -> Result<()> {
        if let Some(dir) = self.policy.output_dir().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_to_ffmpeg_on_path() {
        let config = CaptureConfig::new("http://x/a.m3u8", OutputPolicy::single("rec", "a.mp4"));
        assert_eq!(config.tool, PathBuf::from("ffmpeg"));
        let config = config.with_tool("/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.tool, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn creates_nested_output_dir() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a/b/c");
        let config = CaptureConfig::new(
            "http://x/a.m3u8",
            OutputPolicy::segmented(&dir, "a.mp4", None, 60, false),
        );
        config.ensure_output_dir().unwrap();
        assert!(dir.is_dir());
        // second call is a no-op
        config.ensure_output_dir().unwrap();
    }

    #[test]
    fn bare_filename_needs_no_dir() {
        let config = CaptureConfig::new("http://x/a.m3u8", OutputPolicy::single("", "a.mp4"));
        config.ensure_output_dir().unwrap();
    }
}
