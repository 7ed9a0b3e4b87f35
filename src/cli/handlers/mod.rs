mod init;
pub use init::{cmd_config, cmd_init};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{Backend, HttpBackend, JsonlBackend};
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::{config_io, export};
use crate::model::FexConfig;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config_path = config_io::config_path(cli.config.as_deref(), &cwd);

    match &cli.command {
        Some(Commands::Init(args)) => return cmd_init(args, &config_path),
        Some(Commands::Config(args)) => {
            return cmd_config(args, cli.server.as_deref(), &config_path, cli.json);
        }
        _ => {}
    }

    let config = config_io::load_config(&config_path)?;
    let backend = open_backend(&cli, &config, &config_path)?;
    let json = cli.json;

    match cli.command {
        None | Some(Commands::Label) => cmd_label(&config, backend),
        Some(Commands::Schema) => cmd_schema(backend.as_ref(), json),
        Some(Commands::Count) => cmd_count(backend.as_ref(), json),
        Some(Commands::Get(args)) => cmd_get(backend.as_ref(), args, json),
        Some(Commands::Search(args)) => cmd_search(backend.as_ref(), args, json),
        Some(Commands::Export(args)) => cmd_export(backend.as_ref(), args, json),
        Some(Commands::Init(_)) | Some(Commands::Config(_)) => Ok(()),
    }
}

/// `--data` selects the local JSONL backend, which takes its schema from
/// the config. Otherwise items come from `--server` or server.url.
pub fn open_backend(
    cli: &Cli,
    config: &FexConfig,
    config_path: &Path,
) -> Result<Arc<dyn Backend>, Box<dyn std::error::Error>> {
    if let Some(data) = &cli.data {
        let schema = config_io::config_schema(config)?.ok_or_else(|| {
            format!(
                "{} has no [schema] table, which local data needs",
                config_path.display()
            )
        })?;
        tracing::info!(path = %data.display(), "serving items from local file");
        return Ok(Arc::new(JsonlBackend::open(data, schema)?));
    }
    let url = cli.server.as_deref().unwrap_or(&config.server.url);
    tracing::info!(url, "using labeling server");
    Ok(Arc::new(HttpBackend::new(
        url,
        Duration::from_secs(config.server.timeout_secs),
    )))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_label(config: &FexConfig, backend: Arc<dyn Backend>) -> Result<(), Box<dyn std::error::Error>> {
    let schema = backend.schema()?;
    if schema.is_empty() {
        tracing::warn!("schema has no fields, the form will be empty");
    }
    crate::tui::run(config, backend, schema)
}

fn cmd_schema(backend: &dyn Backend, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let schema = backend.schema()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&schema.to_json())?);
    } else {
        for line in format_schema(&schema) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_count(backend: &dyn Backend, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let count = backend.count()?;
    if json {
        println!("{}", serde_json::to_string(&CountJson { count })?);
    } else {
        println!("{}", count);
    }
    Ok(())
}

fn cmd_get(backend: &dyn Backend, args: GetArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let item = backend.get(args.index)?;
    if json {
        println!("{}", serde_json::to_string(&item)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&item)?);
    }
    Ok(())
}

fn cmd_search(
    backend: &dyn Backend,
    args: SearchArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let matches = backend.search(&args.query)?;
    if json {
        let out = SearchJson {
            query: &args.query,
            matches: &matches,
        };
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!("{}", format_matches(&matches));
    }
    Ok(())
}

fn cmd_export(
    backend: &dyn Backend,
    args: ExportArgs,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let written = export::export_rendered(backend, &args.output)?;
    if json {
        let out = ExportJson {
            dir: args.output.display().to_string(),
            written,
        };
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!("Wrote {} files to {}", written, args.output.display());
    }
    Ok(())
}
