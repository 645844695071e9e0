use anyhow::{Context, Result};
use clap::Parser;
use hlsrec::cli::{confirm_source, looks_like_hls};
use hlsrec::output::filename_timestamp;
use hlsrec::signals::forward_signals;
use hlsrec::{Args, CaptureError, CaptureSession};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "hlsrec=debug" } else { "hlsrec=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let hls_source = looks_like_hls(&args.url);
    let skip_prompt = args.yes;
    let config = args
        .into_config(&filename_timestamp())
        .context("Invalid arguments")?;

    if !hls_source && !skip_prompt {
        warn!("The URL doesn't appear to be an m3u8 stream. Make sure it's a valid HLS stream URL.");
        let proceed = confirm_source(&mut std::io::stdin().lock(), &mut std::io::stdout())
            .context("Failed to read confirmation")?;
        if !proceed {
            return Err(CaptureError::Aborted.into());
        }
    }

    config
        .ensure_output_dir()
        .context("Failed to create output directory")?;

    let mut session = CaptureSession::new(config)?;
    let signals = forward_signals(session.stop_handle()).context("Failed to install signal handlers")?;
    let outcome = session.run().await.context("Failed to start ffmpeg")?;
    signals.abort();

    outcome.into_result().context("Stream capture failed")?;
    Ok(())
}
