use std::path::{Path, PathBuf};

const DEFAULT_EXTENSION: &str = ".mp4";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    SingleFile {
        path: PathBuf,
    },
    Segmented {
        dir: PathBuf,
        /// File name containing a printf-style counter, e.g. `stream_%03d.mp4`.
        template: String,
        /// Seconds per segment, always positive.
        segment_time: u32,
        /// Keep recording until the current segment is finished when asked to stop.
        complete_current: bool,
    },
}

impl OutputPolicy {
    pub fn single(dir: impl AsRef<Path>, filename: &str) -> Self {
        OutputPolicy::SingleFile {
            path: dir.as_ref().join(filename),
        }
    }

    /// Segmented output; the template falls back to one derived from `filename`.
    pub fn segmented(
        dir: impl Into<PathBuf>,
        filename: &str,
        template: Option<String>,
        segment_time: u32,
        complete_current: bool,
    ) -> Self {
        OutputPolicy::Segmented {
            dir: dir.into(),
            template: template.unwrap_or_else(|| segment_template(filename)),
            segment_time,
            complete_current,
        }
    }

    pub fn is_segmented(&self) -> bool {
        matches!(self, OutputPolicy::Segmented { .. })
    }

    /// True when a stop request should wait for the next segment boundary.
    pub fn defers_stop(&self) -> bool {
        matches!(
            self,
            OutputPolicy::Segmented {
                complete_current: true,
                ..
            }
        )
    }

    pub fn output_target(&self) -> PathBuf {
        match self {
            OutputPolicy::SingleFile { path } => path.clone(),
            OutputPolicy::Segmented { dir, template, .. } => dir.join(template),
        }
    }

    pub fn output_dir(&self) -> Option<&Path> {
        match self {
            OutputPolicy::SingleFile { path } => path.parent(),
            OutputPolicy::Segmented { dir, .. } => Some(dir),
        }
    }

    pub fn describe_saved(&self) -> String {
        match self {
            OutputPolicy::SingleFile { path } => {
                format!("Stream capture completed: {}", path.display())
            }
            OutputPolicy::Segmented { dir, .. } => {
                format!("Stream segments saved to: {}", dir.display())
            }
        }
    }
}

/// `foo.ts` becomes `foo_%03d.mp4`; segments are always written as mp4.
pub fn segment_template(filename: &str) -> String {
    let stem = Path::new(filename).with_extension("");
    format!("{}_%03d{}", stem.to_string_lossy(), DEFAULT_EXTENSION)
}

pub fn filename_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Without a name the capture is called `stream_<timestamp>.mp4`. With
/// `add_datetime` the timestamp goes between the name and its extension;
/// otherwise `.mp4` is appended unless already present.
pub fn resolve_filename(filename: Option<&str>, add_datetime: bool, timestamp: &str) -> String {
    match filename {
        None => format!("stream_{timestamp}{DEFAULT_EXTENSION}"),
        Some(name) if add_datetime => {
            let path = Path::new(name);
            let ext = path
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
            let stem = path.with_extension("");
            format!("{}_{timestamp}{ext}", stem.to_string_lossy())
        }
        Some(name) if name.ends_with(DEFAULT_EXTENSION) => name.to_string(),
        Some(name) => format!("{name}{DEFAULT_EXTENSION}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_normalizes_extension() {
        assert_eq!(segment_template("foo.ts"), "foo_%03d.mp4");
        assert_eq!(segment_template("foo.mp4"), "foo_%03d.mp4");
        assert_eq!(segment_template("foo"), "foo_%03d.mp4");
        assert_eq!(segment_template("show.part1.mkv"), "show.part1_%03d.mp4");
    }

    #[test]
    fn segmented_policy_uses_explicit_template() {
        let policy = OutputPolicy::segmented("rec", "foo.mp4", Some("cam_%05d.mp4".into()), 60, false);
        assert_eq!(policy.output_target(), PathBuf::from("rec/cam_%05d.mp4"));
        assert!(policy.is_segmented());
        assert!(!policy.defers_stop());
    }

    #[test]
    fn segmented_policy_derives_template() {
        let policy = OutputPolicy::segmented("rec", "foo.ts", None, 300, true);
        assert_eq!(policy.output_target(), PathBuf::from("rec/foo_%03d.mp4"));
        assert!(policy.defers_stop());
        assert_eq!(policy.describe_saved(), "Stream segments saved to: rec");
    }

    #[test]
    fn single_file_policy() {
        let policy = OutputPolicy::single("rec", "live.mp4");
        assert_eq!(policy.output_target(), PathBuf::from("rec/live.mp4"));
        assert_eq!(policy.output_dir(), Some(Path::new("rec")));
        assert!(!policy.defers_stop());
        assert_eq!(policy.describe_saved(), "Stream capture completed: rec/live.mp4");
    }

    #[test]
    fn filename_defaults_to_timestamped_stream() {
        assert_eq!(
            resolve_filename(None, false, "20240101_120000"),
            "stream_20240101_120000.mp4"
        );
        assert_eq!(
            resolve_filename(None, true, "20240101_120000"),
            "stream_20240101_120000.mp4"
        );
    }

    #[test]
    fn filename_gets_mp4_extension() {
        assert_eq!(resolve_filename(Some("news"), false, "ts"), "news.mp4");
        assert_eq!(resolve_filename(Some("news.mp4"), false, "ts"), "news.mp4");
        assert_eq!(resolve_filename(Some("news.ts"), false, "ts"), "news.ts.mp4");
    }

    #[test]
    fn filename_with_datetime_keeps_extension() {
        assert_eq!(
            resolve_filename(Some("news.ts"), true, "20240101_120000"),
            "news_20240101_120000.ts"
        );
        assert_eq!(
            resolve_filename(Some("news"), true, "20240101_120000"),
            "news_20240101_120000.mp4"
        );
    }

    #[test]
    fn timestamp_shape() {
        let ts = filename_timestamp();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
    }
}
