//! Replay command implementation.
//!
//! Pushes a captured stream body through the reassembler, decoder and sink
//! exactly as a live connection would, in chunks of `--chunk-size` bytes.

use tokio_util::io::ReaderStream;
use tracing::info;

use super::shutdown_token;
use crate::cli::{Cli, ReplayArgs};
use crate::error::{EdcError, Result};
use crate::session::{SessionEnd, SessionSettings, StreamSession};
use crate::sink::open_sink;

/// Run the replay command.
pub async fn run(cli: &Cli, args: &ReplayArgs) -> Result<()> {
    let config = cli.load_config()?;
    config.validate()?;

    let stream = config.stream(args.stream.as_deref())?;
    let settings = SessionSettings::from_config(&config, stream)?;
    let publisher = settings.publisher.clone();
    let sink = open_sink(&config, stream)?;

    let file = tokio::fs::File::open(&args.file).await.map_err(|e| {
        EdcError::io(format!("Failed to open capture: {}", args.file.display()), e)
    })?;
    let chunk_size = usize::try_from(args.chunk_size).unwrap_or(usize::MAX);
    let chunks = ReaderStream::with_capacity(file, chunk_size);

    info!(publisher = %publisher, file = %args.file.display(), chunk_size, "replaying capture");
    let report = StreamSession::new(settings, sink)
        .run_stream(chunks, shutdown_token())
        .await?;

    println!("{publisher}: {report}");
    if report.end == SessionEnd::Cancelled {
        return Err(EdcError::Interrupted);
    }
    Ok(())
}
