use std::future::Future;
use std::io;
use std::process::ExitStatus;
use std::time::Instant;

use tokio::process::Child;
use tokio::sync::mpsc;

use crate::boundary::{BoundaryDetector, RegexBoundaryDetector};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::launcher::{ffmpeg_args, launch, request_termination};
use crate::log::{CaptureLog, TracingLog};
use crate::monitor::StreamMonitor;
use crate::output::OutputPolicy;
use crate::progress::{format_hms, progress_message, ProgressTicker, SegmentTracker};
use crate::shutdown::{SessionState, StopAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRequest {
    /// Honors the "complete current segment" policy.
    Graceful { origin: String },
    /// Terminates the subprocess right away.
    Immediate { origin: String },
}

/// Cloneable handle for stopping a session from another task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: mpsc::UnboundedSender<StopRequest>,
}

impl StopHandle {
    /// Returns false once the session is gone.
    pub fn request_stop(&self, origin: impl Into<String>) -> bool {
        self.tx
            .send(StopRequest::Graceful {
                origin: origin.into(),
            })
            .is_ok()
    }

    pub fn abort(&self, origin: impl Into<String>) -> bool {
        self.tx
            .send(StopRequest::Immediate {
                origin: origin.into(),
            })
            .is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    Completed,
    StoppedByUser,
    Failed { code: Option<i32> },
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, CaptureOutcome::Failed { .. })
    }

    pub fn into_result(self) -> Result<()> {
        match self {
            CaptureOutcome::Failed { code } => Err(CaptureError::SubprocessFailure { code }),
            _ => Ok(()),
        }
    }
}

/// All state is touched from the task running [`CaptureSession::run`]; output,
/// stop requests and the process wait are multiplexed with `tokio::select!`.
pub struct CaptureSession<L: CaptureLog = TracingLog> {
    config: CaptureConfig,
    detector: Box<dyn BoundaryDetector>,
    log: L,
    state: SessionState,
    /// Set by any user stop, deferred or not.
    stop_requested: bool,
    /// Pid of the running subprocess; taken when it is signalled or reaped.
    pid: Option<u32>,
    started: Option<Instant>,
    segments: Option<SegmentTracker>,
    ticker: Option<ProgressTicker>,
    stop_tx: mpsc::UnboundedSender<StopRequest>,
    stop_rx: mpsc::UnboundedReceiver<StopRequest>,
}

impl CaptureSession<TracingLog> {
    pub fn new(config: CaptureConfig) -> Result<Self> {
        Self::with_log(config, TracingLog)
    }
}

impl<L: CaptureLog> CaptureSession<L> {
    pub fn with_log(config: CaptureConfig, log: L) -> Result<Self> {
        let detector = RegexBoundaryDetector::ffmpeg()?;
        Ok(Self::with_detector(config, log, Box::new(detector)))
    }

    pub fn with_detector(config: CaptureConfig, log: L, detector: Box<dyn BoundaryDetector>) -> Self {
        let (stop_tx, stop_rx) = mpsc::unbounded_channel();
        Self {
            config,
            detector,
            log,
            state: SessionState::default(),
            stop_requested: false,
            pid: None,
            started: None,
            segments: None,
            ticker: None,
            stop_tx,
            stop_rx,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn is_stopping(&self) -> bool {
        self.state.is_stopping()
    }

    /// Only a failure to start ffmpeg is an error; later faults are logged and
    /// reported as [`CaptureOutcome::Failed`]. Runs at most once per session.
    /// Dropping the future while ffmpeg runs sends it SIGTERM.
    pub async fn run(&mut self) -> Result<CaptureOutcome> {
        if self.state != SessionState::Idle {
            return Err(CaptureError::SessionFinished);
        }

        let mut child = self.launch()?;
        let stdout = StreamMonitor::new("stdout", child.stdout.take());
        let stderr = StreamMonitor::new("stderr", child.stderr.take());

        let guard = RunGuard { session: self };
        let outcome = guard.session.supervise(stdout, stderr, child.wait()).await;

        guard.session.state.exited();
        guard.session.segments = None;
        guard.session.ticker = None;
        Ok(outcome)
    }

    fn launch(&mut self) -> Result<Child> {
        self.log
            .info(&format!("Starting stream capture from: {}", self.config.source));

        match &self.config.policy {
            OutputPolicy::SingleFile { path } => {
                self.log
                    .info(&format!("Output will be saved to: {}", path.display()));
            }
            OutputPolicy::Segmented {
                template,
                segment_time,
                complete_current,
                ..
            } => {
                self.log
                    .info(&format!("Segmenting output every {segment_time} seconds"));
                self.log.info(&format!("Segment format: {template}"));
                if *complete_current {
                    self.log
                        .info("Will complete current segment when stopping (Ctrl+C)");
                }
            }
        }

        let args = ffmpeg_args(&self.config.source, &self.config.policy);
        self.log.debug(&format!(
            "Running {} {}",
            self.config.tool.display(),
            args.join(" ")
        ));
        let child = launch(&self.config.tool, &args)?;

        let now = Instant::now();
        self.started = Some(now);
        self.segments = self.config.policy.is_segmented().then(|| SegmentTracker::new(now));
        self.ticker = Some(ProgressTicker::new(now));
        self.pid = child.id();
        self.state.launched();

        self.log.info("Press Ctrl+C to stop recording...");
        Ok(child)
    }

    async fn supervise<F>(
        &mut self,
        mut stdout: StreamMonitor,
        mut stderr: StreamMonitor,
        exit: F,
    ) -> CaptureOutcome
    where
        F: Future<Output = io::Result<ExitStatus>>,
    {
        match self.wait_for_exit(&mut stdout, &mut stderr, exit).await {
            Ok(status) => self.finish(status),
            Err(e) => {
                self.log.error(&format!("Error capturing stream: {e}"));
                self.immediate_stop();
                self.pid = None;
                CaptureOutcome::Failed { code: None }
            }
        }
    }

    async fn wait_for_exit<F>(
        &mut self,
        stdout: &mut StreamMonitor,
        stderr: &mut StreamMonitor,
        exit: F,
    ) -> Result<ExitStatus>
    where
        F: Future<Output = io::Result<ExitStatus>>,
    {
        tokio::pin!(exit);

        loop {
            tokio::select! {
                biased;
                Some(request) = self.stop_rx.recv() => self.handle_request(request),
                line = stdout.next_line(), if stdout.is_open() => {
                    self.on_line(stdout, line);
                }
                line = stderr.next_line(), if stderr.is_open() => {
                    self.on_line(stderr, line);
                }
                status = &mut exit => {
                    self.pid = None;
                    return Ok(status?);
                }
            }
        }
    }

    fn on_line(&mut self, monitor: &mut StreamMonitor, line: Option<io::Result<String>>) {
        match line {
            Some(Ok(line)) => {
                if monitor.is_active() {
                    self.interpret(monitor, &line);
                }
            }
            Some(Err(source)) => {
                let err = CaptureError::StreamRead {
                    stream: monitor.name(),
                    source,
                };
                self.log.warn(&err.to_string());
                monitor.close();
            }
            None => monitor.close(),
        }
    }

    fn interpret(&mut self, monitor: &mut StreamMonitor, line: &str) {
        let is_stderr = monitor.name() == "stderr";
        self.log.debug(&format!("ffmpeg {}: {line}", monitor.name()));
        let now = Instant::now();

        if is_stderr {
            if let Some(number) = self.detector.detect(line) {
                if self.on_boundary(number, now) {
                    monitor.drain();
                    return;
                }
            }

            let lower = line.to_lowercase();
            if lower.contains("error") || lower.contains("warning") {
                self.log.warn(&format!("ffmpeg: {line}"));
            }
        }

        self.report_progress(now);
    }

    /// Returns true when the boundary ended a deferred stop.
    fn on_boundary(&mut self, number: u32, now: Instant) -> bool {
        let Some(segments) = self.segments.as_mut() else {
            return false;
        };
        let Some(duration) = segments.completed_by(number, now) else {
            return false;
        };

        self.log.info(&format!(
            "Segment {} completed (duration: {})",
            segments.current(),
            format_hms(duration)
        ));

        if self.state.is_stopping() {
            self.log.info("Stopping as requested after segment completion");
            self.immediate_stop();
            return true;
        }

        segments.advance(number, now);
        false
    }

    fn report_progress(&mut self, now: Instant) {
        let Some(total) = self.ticker.as_mut().and_then(|ticker| ticker.poll(now)) else {
            return;
        };
        let segment = self
            .segments
            .as_ref()
            .map(|segments| (segments.current(), segments.elapsed(now)));
        self.log.info(&progress_message(total, segment));
    }

    fn handle_request(&mut self, request: StopRequest) {
        match request {
            StopRequest::Graceful { origin } => {
                match self.state.request_stop(self.config.policy.defers_stop()) {
                    StopAction::Defer => {
                        self.stop_requested = true;
                        self.log.info(&format!(
                            "Received {origin}, will stop after current segment completes..."
                        ));
                    }
                    StopAction::Terminate => {
                        self.stop_requested = true;
                        self.log
                            .info(&format!("Received {origin}, stopping capture..."));
                        self.terminate();
                    }
                    StopAction::Ignore => {
                        self.log
                            .debug(&format!("Ignoring {origin}: capture is not running"));
                    }
                }
            }
            StopRequest::Immediate { origin } => {
                if self.state.immediate_stop() == StopAction::Terminate {
                    self.stop_requested = true;
                    self.log.info(&format!("Received {origin}, stopping capture..."));
                    self.terminate();
                }
            }
        }
    }

    fn immediate_stop(&mut self) {
        if self.state.immediate_stop() == StopAction::Terminate {
            self.terminate();
        }
    }

    fn terminate(&mut self) {
        self.log.info("Stopping stream capture gracefully...");

        if let Some(pid) = self.pid.take() {
            if let Err(e) = request_termination(pid) {
                self.log.error(&format!("Error stopping ffmpeg: {e}"));
            }
        }

        if let Some(started) = self.started {
            self.log.info(&self.config.policy.describe_saved());
            self.log.info(&format!(
                "Total recording time: {}",
                format_hms(started.elapsed())
            ));
        }
    }

    fn finish(&mut self, status: ExitStatus) -> CaptureOutcome {
        if self.stop_requested {
            self.log.info("Capture stopped by user");
            CaptureOutcome::StoppedByUser
        } else if status.success() {
            self.log.info("Stream capture completed successfully");
            CaptureOutcome::Completed
        } else {
            let err = CaptureError::SubprocessFailure {
                code: status.code(),
            };
            self.log.error(&format!("Error: {err}"));
            CaptureOutcome::Failed {
                code: status.code(),
            }
        }
    }
}

struct RunGuard<'a, L: CaptureLog> {
    session: &'a mut CaptureSession<L>,
}

impl<L: CaptureLog> Drop for RunGuard<'_, L> {
    fn drop(&mut self) {
        if self.session.pid.is_some() {
            self.session.log.warn("Capture cancelled while ffmpeg was running");
            self.session.immediate_stop();
        }
    }
}
