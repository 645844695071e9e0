/// Lifecycle of one capture session.
///
/// `Idle -> Running -> (Stopping) -> Stopped`. `Stopped` is terminal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    /// Stop requested; waiting for the current segment to finish.
    Stopping,
    Stopped,
}

/// What the session has to do after a stop request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopAction {
    /// Keep recording until the next segment boundary.
    Defer,
    /// Ask the subprocess to terminate now.
    Terminate,
    /// Nothing is running, or it is already being stopped.
    Ignore,
}

impl SessionState {
    pub fn is_running(self) -> bool {
        matches!(self, SessionState::Running | SessionState::Stopping)
    }

    pub fn is_stopping(self) -> bool {
        self == SessionState::Stopping
    }

    pub fn launched(&mut self) {
        if *self == SessionState::Idle {
            *self = SessionState::Running;
        }
    }

    /// A stop request from the user or a signal.
    ///
    /// The first request on a session that completes segments is deferred;
    /// any further request stops immediately.
    pub fn request_stop(&mut self, defer_allowed: bool) -> StopAction {
        match *self {
            SessionState::Running if defer_allowed => {
                *self = SessionState::Stopping;
                StopAction::Defer
            }
            _ => self.immediate_stop(),
        }
    }

    pub fn immediate_stop(&mut self) -> StopAction {
        match *self {
            SessionState::Running | SessionState::Stopping => {
                *self = SessionState::Stopped;
                StopAction::Terminate
            }
            SessionState::Idle | SessionState::Stopped => StopAction::Ignore,
        }
    }

    /// The subprocess is gone, whatever the reason.
    pub fn exited(&mut self) {
        *self = SessionState::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_session_ignores_stops() {
        let mut state = SessionState::default();
        assert_eq!(state.request_stop(true), StopAction::Ignore);
        assert_eq!(state.immediate_stop(), StopAction::Ignore);
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn first_request_defers_when_completing_segments() {
        let mut state = SessionState::default();
        state.launched();
        assert_eq!(state.request_stop(true), StopAction::Defer);
        assert!(state.is_stopping());
        assert!(state.is_running());

        assert_eq!(state.request_stop(true), StopAction::Terminate);
        assert_eq!(state, SessionState::Stopped);
        assert!(!state.is_running());
    }

    #[test]
    fn request_without_deferral_terminates() {
        let mut state = SessionState::default();
        state.launched();
        assert_eq!(state.request_stop(false), StopAction::Terminate);
        assert_eq!(state, SessionState::Stopped);
    }

    #[test]
    fn immediate_stop_overrides_deferral() {
        let mut state = SessionState::default();
        state.launched();
        state.request_stop(true);
        assert_eq!(state.immediate_stop(), StopAction::Terminate);
        assert_eq!(state, SessionState::Stopped);
    }

    #[test]
    fn stopped_is_absorbing() {
        let mut state = SessionState::default();
        state.launched();
        state.exited();
        assert_eq!(state.request_stop(true), StopAction::Ignore);
        assert_eq!(state.request_stop(false), StopAction::Ignore);
        assert_eq!(state.immediate_stop(), StopAction::Ignore);
        state.launched();
        assert_eq!(state, SessionState::Stopped);
    }
}
