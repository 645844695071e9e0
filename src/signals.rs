use tokio::task::JoinHandle;

use crate::session::StopHandle;

/// Forward SIGINT and SIGTERM to a session as graceful stop requests.
///
/// Each signal becomes one request, so a second Ctrl+C stops a session that
/// is waiting for its segment to complete. The task ends when the session
/// stops accepting requests.
#[cfg(unix)]
pub fn forward_signals(handle: StopHandle) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let origin = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                else => break,
            };
            if !handle.request_stop(format!("signal {origin}")) {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn forward_signals(handle: StopHandle) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle.request_stop("signal Ctrl+C") {
                break;
            }
        }
    }))
}
