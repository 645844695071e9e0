use std::io;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};

/// Lines from one of the subprocess's output streams.
pub type LineStream = BoxStream<'static, io::Result<String>>;

/// Split `reader` into trimmed lines.
///
/// Both `\n` and `\r` end a line, and invalid UTF-8 is replaced rather than
/// rejected. The stream ends after the first read error.
pub fn line_stream<R>(reader: R) -> LineStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(Some(BufReader::new(reader)), |state| async move {
        let mut reader = state?;
        match read_line_lossy(&mut reader).await {
            Ok(Some(line)) => Some((Ok(line), Some(reader))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
    .fuse()
    .boxed()
}

async fn read_line_lossy<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok((!buf.is_empty()).then(|| decode(&buf)));
        }
        let (used, done) = match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
            Some(end) => {
                buf.extend_from_slice(&available[..end]);
                (end + 1, true)
            }
            None => {
                buf.extend_from_slice(available);
                (available.len(), false)
            }
        };
        reader.consume(used);
        if done {
            return Ok(Some(decode(&buf)));
        }
    }
}

fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorMode {
    /// Lines are interpreted.
    Active,
    /// Lines are read and discarded so the pipe never fills up.
    Draining,
    Closed,
}

/// One output stream of the subprocess and how much attention it still gets.
pub struct StreamMonitor {
    name: &'static str,
    lines: LineStream,
    mode: MonitorMode,
}

impl StreamMonitor {
    pub fn new<R>(name: &'static str, reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        match reader {
            Some(reader) => Self {
                name,
                lines: line_stream(reader),
                mode: MonitorMode::Active,
            },
            None => Self {
                name,
                lines: stream::empty().boxed(),
                mode: MonitorMode::Closed,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_open(&self) -> bool {
        self.mode != MonitorMode::Closed
    }

    pub fn is_active(&self) -> bool {
        self.mode == MonitorMode::Active
    }

    pub fn drain(&mut self) {
        if self.mode == MonitorMode::Active {
            self.mode = MonitorMode::Draining;
        }
    }

    pub fn close(&mut self) {
        self.mode = MonitorMode::Closed;
    }

    /// Next line, or `None` once the stream has ended. Cancel safe.
    pub async fn next_line(&mut self) -> Option<io::Result<String>> {
        self.lines.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(input: &'static [u8]) -> Vec<String> {
        line_stream(input)
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn splits_on_newlines_and_carriage_returns() {
        let lines = collect(b"first\nframe=1\rframe=2\r\nlast").await;
        assert_eq!(lines, ["first", "frame=1", "frame=2", "", "last"]);
    }

    #[tokio::test]
    async fn trims_and_replaces_invalid_utf8() {
        let lines = collect(b"  Opening 'a_002.mp4'  \n\xffbad\n").await;
        assert_eq!(lines, ["Opening 'a_002.mp4'", "\u{fffd}bad"]);
    }

    #[tokio::test]
    async fn empty_input_has_no_lines() {
        assert!(collect(b"").await.is_empty());
    }

    #[tokio::test]
    async fn monitor_modes() {
        let mut monitor = StreamMonitor::new("stderr", Some(&b"one\ntwo\n"[..]));
        assert!(monitor.is_active());
        assert_eq!(monitor.next_line().await.unwrap().unwrap(), "one");

        monitor.drain();
        assert!(monitor.is_open());
        assert!(!monitor.is_active());
        assert_eq!(monitor.next_line().await.unwrap().unwrap(), "two");
        assert!(monitor.next_line().await.is_none());
        assert!(monitor.next_line().await.is_none());

        monitor.close();
        monitor.drain();
        assert!(!monitor.is_open());
    }

    #[tokio::test]
    async fn missing_reader_is_closed() {
        let mut monitor = StreamMonitor::new::<&[u8]>("stdout", None);
        assert!(!monitor.is_open());
        assert_eq!(monitor.name(), "stdout");
        assert!(monitor.next_line().await.is_none());
    }
}
