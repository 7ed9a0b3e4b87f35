use std::path::Path;

use crate::cli::commands::{ConfigArgs, InitArgs};
use crate::io::config_io;

pub fn cmd_init(args: &InitArgs, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    config_io::init_config(path, args.force)?;
    println!("Created {}", path.display());
    Ok(())
}

/// Apply `--server`, `--timeout` and `--inbox` to the config file, keeping
/// its comments and layout. With nothing to set, print the current values.
pub fn cmd_config(
    args: &ConfigArgs,
    server: Option<&str>,
    path: &Path,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut doc) = config_io::read_config(path)?;

    if server.is_none() && args.timeout.is_none() && args.inbox.is_none() {
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!("config: {}", path.display());
            println!("server.url = {}", config.server.url);
            println!("server.timeout_secs = {}", config.server.timeout_secs);
            println!(
                "ui.inbox = {}",
                config.ui.inbox.as_deref().unwrap_or("(none)")
            );
        }
        return Ok(());
    }

    if let Some(url) = server {
        config_io::set_server_url(&mut doc, url);
    }
    if let Some(secs) = args.timeout {
        config_io::set_timeout(&mut doc, secs);
    }
    if let Some(inbox) = &args.inbox {
        config_io::set_inbox(&mut doc, inbox);
    }
    // Refuse to write something we could not read back
    toml::from_str::<crate::model::FexConfig>(&doc.to_string())?;
    config_io::write_config(path, &doc)?;
    tracing::info!(path = %path.display(), "updated config");
    println!("Updated {}", path.display());
    Ok(())
}
