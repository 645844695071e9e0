use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::error::{CaptureError, Result};
use crate::output::OutputPolicy;

/// Build the ffmpeg arguments for capturing `source` under `policy`.
///
/// The stream is always copied without re-encoding and existing output is
/// overwritten.
pub fn ffmpeg_args(source: &str, policy: &OutputPolicy) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        "-i".to_string(),
        source.to_string(),
        "-c".to_string(),
        "copy".to_string(),
    ];

    if let OutputPolicy::Segmented { segment_time, .. } = policy {
        args.extend([
            "-f".to_string(),
            "segment".to_string(),
            "-segment_time".to_string(),
            segment_time.to_string(),
            "-reset_timestamps".to_string(),
            "1".to_string(),
            "-segment_start_number".to_string(),
            "1".to_string(),
            "-segment_format".to_string(),
            "mp4".to_string(),
        ]);
    }

    args.push(policy.output_target().to_string_lossy().into_owned());
    args
}

/// Spawn the tool with piped stdout and stderr.
///
/// On unix the child gets its own process group, so a Ctrl+C in the terminal
/// reaches only this process and the stop policy decides what ffmpeg sees.
pub fn launch(tool: &Path, args: &[String]) -> Result<Child> {
    let mut cmd = Command::new(tool);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn()
        .map_err(|source| CaptureError::Launch {
            tool: tool.to_path_buf(),
            source,
        })
}

/// Ask the process to shut down cleanly so it can finalize its output.
#[cfg(unix)]
pub fn request_termination(pid: u32) -> std::io::Result<()> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: kill only sends a signal; an unknown pid is reported through errno.
    if unsafe { libc::kill(pid, libc::SIGTERM) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
pub fn request_termination(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "graceful termination is only supported on unix",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn single_file_args() {
        let policy = OutputPolicy::single("rec", "live.mp4");
        let args = ffmpeg_args("http://x/stream.m3u8", &policy);
        assert_eq!(
            args,
            ["-y", "-i", "http://x/stream.m3u8", "-c", "copy", "rec/live.mp4"]
        );
        assert!(!args.iter().any(|a| a.starts_with("-segment")));
    }

    #[test]
    fn segmented_args() {
        let policy = OutputPolicy::segmented("rec", "live.mp4", None, 300, false);
        let args = ffmpeg_args("http://x/stream.m3u8", &policy);
        assert_eq!(
            args,
            [
                "-y",
                "-i",
                "http://x/stream.m3u8",
                "-c",
                "copy",
                "-f",
                "segment",
                "-segment_time",
                "300",
                "-reset_timestamps",
                "1",
                "-segment_start_number",
                "1",
                "-segment_format",
                "mp4",
                "rec/live_%03d.mp4",
            ]
        );
    }

    #[tokio::test]
    async fn missing_tool_is_a_launch_error() {
        let tool = PathBuf::from("/nonexistent/hlsrec-ffmpeg");
        let err = launch(&tool, &[]).unwrap_err();
        assert!(matches!(err, CaptureError::Launch { .. }));
        assert!(err.to_string().contains("/nonexistent/hlsrec-ffmpeg"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn termination_reaches_child() {
        let mut child = launch(Path::new("sleep"), &["30".to_string()]).unwrap();
        let pid = child.id().unwrap();
        request_termination(pid).unwrap();
        let status = child.wait().await.unwrap();
        assert!(!status.success());
    }
}
