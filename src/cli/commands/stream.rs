//! Stream command implementation.
//!
//! Runs one configured stream, or all of them concurrently, until the
//! server closes the connection or the user interrupts.

use tokio::task::JoinSet;
use tracing::error;

use super::shutdown_token;
use crate::cli::{Cli, StreamArgs};
use crate::config::{Config, StreamConfig};
use crate::error::{EdcError, Result};
use crate::session::{SessionEnd, SessionReport, SessionSettings, StreamSession};
use crate::sink::open_sink;

/// Run the stream command.
pub async fn run(cli: &Cli, args: &StreamArgs) -> Result<()> {
    let config = cli.load_config()?;
    config.validate()?;

    let streams = selected_streams(&config, args)?;
    let mut sessions = Vec::with_capacity(streams.len());
    for stream in streams {
        // Sinks are opened up front so a bad out_box or database fails
        // before any connection is made.
        let settings = SessionSettings::from_config(&config, stream)?;
        let sink = open_sink(&config, stream)?;
        sessions.push(StreamSession::new(settings, sink));
    }

    let cancel = shutdown_token();
    let mut tasks = JoinSet::new();
    for session in sessions {
        let publisher = session.settings().publisher.clone();
        let cancel = cancel.clone();
        tasks.spawn(async move { (publisher, session.run(cancel).await) });
    }

    let mut first_error = None;
    let mut interrupted = false;
    while let Some(joined) = tasks.join_next().await {
        let (publisher, outcome) =
            joined.map_err(|e| EdcError::internal(format!("stream task failed: {e}")))?;
        match outcome {
            Ok(report) => {
                interrupted |= report.end == SessionEnd::Cancelled;
                print_report(&publisher, &report);
            }
            Err(e) => {
                error!(publisher = %publisher, error = %e, "stream ended with an error");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None if interrupted => Err(EdcError::Interrupted),
        None => Ok(()),
    }
}

fn selected_streams<'a>(config: &'a Config, args: &StreamArgs) -> Result<Vec<&'a StreamConfig>> {
    if args.all {
        return Ok(config.streams.iter().collect());
    }
    Ok(vec![config.stream(args.stream.as_deref())?])
}

fn print_report(publisher: &str, report: &SessionReport) {
    println!("{publisher}: {report}");
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[account]
machine_name = "acme"
user_name = "u"
password = "p"

[edc]
out_box = "out"

[[stream]]
name = "Twitter Stream"
id = "1"

[[stream]]
name = "Reddit Comments"
id = "2"
"#;

    #[test]
    fn test_selected_streams() {
        let config = Config::from_toml(CONFIG).unwrap();

        let all = StreamArgs {
            stream: None,
            all: true,
        };
        assert_eq!(selected_streams(&config, &all).unwrap().len(), 2);

        let named = StreamArgs {
            stream: Some("Reddit".to_string()),
            all: false,
        };
        assert_eq!(selected_streams(&config, &named).unwrap()[0].id, "2");

        let first = StreamArgs {
            stream: None,
            all: false,
        };
        assert_eq!(selected_streams(&config, &first).unwrap()[0].id, "1");
    }
}
