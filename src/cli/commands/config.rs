//! Config command implementation.
//!
//! Validates the configuration and shows what each stream resolves to.
//! Credentials are never printed.

use crate::cli::{Cli, ConfigAction, ConfigArgs};
use crate::config::{resolve_default_path, Config};
use crate::error::Result;

/// Run the config command.
pub fn run(cli: &Cli, args: &ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Check => check(cli),
        ConfigAction::Path => {
            let path = match &cli.config {
                Some(path) => path.clone(),
                None => resolve_default_path()?,
            };
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn check(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    config.validate()?;
    print!("{}", summarize(&config)?);
    Ok(())
}

fn summarize(config: &Config) -> Result<String> {
    let credentials = config.account.credentials()?;
    let mut out = String::new();
    out.push_str(&format!("user: {}\n", credentials.user_name));
    out.push_str(&format!("storage: {}\n", config.edc.storage));
    if let Some(out_box) = &config.edc.out_box {
        out.push_str(&format!("out_box: {}\n", out_box.display()));
    }
    if let Some(database) = &config.database {
        out.push_str(&format!("database: {}\n", database.path.display()));
    }
    if let Some(timeout) = config.edc.idle_timeout()? {
        out.push_str(&format!("idle_timeout: {}\n", humantime::format_duration(timeout)));
    }
    for stream in &config.streams {
        out.push_str(&format!(
            "stream {} ({}): {}\n",
            stream.name,
            stream.publisher(),
            config.endpoint(stream)?
        ));
    }
    Ok(out)
}
