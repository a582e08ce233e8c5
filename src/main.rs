//! edc-stream: streaming client for Enterprise Data Collector activity feeds.

use std::process::ExitCode;

use edc_stream::cli;

fn main() -> ExitCode {
    // Logging is initialized by cli::run from --log-level, --log-format and --log-file
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");

            if std::env::var("RUST_BACKTRACE").is_ok() {
                if let Some(source) = std::error::Error::source(&e) {
                    eprintln!("Caused by: {source}");
                }
            }

            ExitCode::from(e.exit_code() as u8)
        }
    }
}
