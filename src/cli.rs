use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;

use crate::config::{CaptureConfig, DEFAULT_OUTPUT_DIR, DEFAULT_TOOL};
use crate::error::{CaptureError, Result};
use crate::output::{resolve_filename, OutputPolicy};

#[derive(Parser, Debug)]
#[command(name = "hlsrec")]
#[command(about = "Capture an HLS live stream (m3u8) until interrupted with Ctrl+C")]
pub struct Args {
    #[arg(help = "URL of the m3u8 stream to capture")]
    pub url: String,

    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR, help = "Directory to save recordings")]
    pub output_dir: PathBuf,

    #[arg(short = 'f', long, help = "Output filename (default: stream_TIMESTAMP.mp4)")]
    pub filename: Option<String>,

    #[arg(
        short = 'd',
        long,
        help = "Add date and time to the filename even when a custom filename is provided"
    )]
    pub add_datetime: bool,

    #[arg(short = 'p', long, env = "FFMPEG_PATH", default_value = DEFAULT_TOOL, help = "Path to the ffmpeg binary")]
    pub ffmpeg_path: PathBuf,

    #[arg(short = 'v', long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short = 's',
        long = "segment",
        value_name = "DURATION",
        help = "Segment the output into files of this duration ('60' for 60 seconds, '5:00' for 5 minutes)"
    )]
    pub segment_time: Option<String>,

    #[arg(
        short = 'F',
        long,
        value_name = "TEMPLATE",
        help = "Format string for segmented filenames (e.g. 'stream_%03d.mp4'). Default is based on filename"
    )]
    pub segment_format: Option<String>,

    #[arg(
        short = 'c',
        long,
        help = "When stopping with Ctrl+C, continue until the current segment completes"
    )]
    pub complete_segment: bool,

    #[arg(short = 'y', long, help = "Do not ask for confirmation when the URL does not look like HLS")]
    pub yes: bool,
}

impl Args {
    /// Check option combinations and resolve the capture configuration.
    pub fn into_config(self, timestamp: &str) -> Result<CaptureConfig> {
        let segment_time = self
            .segment_time
            .as_deref()
            .map(parse_segment_duration)
            .transpose()?;

        if self.complete_segment && segment_time.is_none() {
            return Err(CaptureError::CompleteSegmentWithoutSegment);
        }

        let filename = resolve_filename(self.filename.as_deref(), self.add_datetime, timestamp);
        let policy = match segment_time {
            Some(segment_time) => OutputPolicy::segmented(
                self.output_dir,
                &filename,
                self.segment_format,
                segment_time,
                self.complete_segment,
            ),
            None => OutputPolicy::single(&self.output_dir, &filename),
        };

        Ok(CaptureConfig::new(self.url, policy).with_tool(self.ffmpeg_path))
    }
}

/// Parse `"N"` seconds or `"M:SS"` into a positive number of seconds.
pub fn parse_segment_duration(value: &str) -> Result<u32> {
    let invalid = |reason: &str| CaptureError::InvalidSegmentDuration(format!("'{value}': {reason}"));
    let number = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|_| invalid("expected whole seconds or M:SS"))
    };

    let seconds = match value.split_once(':') {
        Some((minutes, seconds)) => number(minutes)?
            .checked_mul(60)
            .and_then(|m| m.checked_add(number(seconds).ok()?))
            .ok_or_else(|| invalid("expected whole seconds or M:SS"))?,
        None => number(value)?,
    };

    if seconds == 0 {
        return Err(invalid("segment time must be positive"));
    }
    Ok(seconds)
}

pub fn looks_like_hls(source: &str) -> bool {
    source.contains("m3u8")
}

/// Ask the user whether to go ahead with a URL that does not look like HLS.
pub fn confirm_source<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<bool> {
    write!(output, "Continue anyway? (y/n): ")?;
    output.flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
