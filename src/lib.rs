pub mod boundary;
pub mod cli;
pub mod config;
pub mod error;
pub mod launcher;
pub mod log;
pub mod monitor;
pub mod output;
pub mod progress;
pub mod session;
pub mod shutdown;
pub mod signals;

pub use cli::Args;
pub use config::CaptureConfig;
pub use error::CaptureError;
pub use output::OutputPolicy;
pub use session::{CaptureOutcome, CaptureSession, StopHandle};
