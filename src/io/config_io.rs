use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::FexConfig;
use crate::model::{Schema, SchemaError};

/// Error type for reading and writing fex.toml
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config document: {0}")]
    Document(#[from] toml_edit::TomlError),
    #[error("{} already exists (use --force to overwrite)", .0.display())]
    Exists(PathBuf),
    #[error("invalid [schema] table: {0}")]
    Schema(#[from] SchemaError),
}

pub const CONFIG_FILE: &str = "fex.toml";

pub const CONFIG_TEMPLATE: &str = r##"[server]
# Base URL of the labeling backend
url = "http://localhost:8080"
timeout_secs = 10

[ui]
show_key_hints = true
# File an embedding host appends JSON commands to, one per line
# inbox = "fex-inbox.jsonl"

# --- Schema ---
# Only used when items are served from a local file (fex --data items.jsonl).
# A server supplies its own schema through /schema/.
#
# [schema]
# intent = { type = "multilabel" }
# summary = { type = "text", optional = true }
# spans = { type = "record", repeated = true, useMap = true, fields = { label = { type = "multilabel" } } }
"##;

/// `explicit` if given, else fex.toml in `dir`
pub fn config_path(explicit: Option<&Path>, dir: &Path) -> PathBuf {
    match explicit {
        Some(p) => p.to_path_buf(),
        None => dir.join(CONFIG_FILE),
    }
}

/// Load the config. A missing file means defaults.
pub fn load_config(path: &Path) -> Result<FexConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(FexConfig::default());
    }
    let (config, _) = read_config(path)?;
    Ok(config)
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit document for formatting-preserving edits.
pub fn read_config(path: &Path) -> Result<(FexConfig, toml_edit::DocumentMut), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: FexConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    fs::write(path, doc.to_string()).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write the default config. Refuses to overwrite unless `force`.
pub fn init_config(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::Exists(path.to_path_buf()));
    }
    fs::write(path, CONFIG_TEMPLATE).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), "wrote default config");
    Ok(())
}

fn ensure_table(doc: &mut toml_edit::DocumentMut, name: &str) {
    if !doc.contains_key(name) {
        doc[name] = toml_edit::Item::Table(toml_edit::Table::new());
    }
}

pub fn set_server_url(doc: &mut toml_edit::DocumentMut, url: &str) {
    ensure_table(doc, "server");
    doc["server"]["url"] = toml_edit::value(url);
}

pub fn set_timeout(doc: &mut toml_edit::DocumentMut, secs: u64) {
    ensure_table(doc, "server");
    doc["server"]["timeout_secs"] = toml_edit::value(secs as i64);
}

pub fn set_inbox(doc: &mut toml_edit::DocumentMut, inbox: &str) {
    ensure_table(doc, "ui");
    doc["ui"]["inbox"] = toml_edit::value(inbox);
}

/// The `[schema]` table as a schema, if there is one
pub fn config_schema(config: &FexConfig) -> Result<Option<Schema>, ConfigError> {
    match &config.schema {
        Some(table) => Ok(Some(Schema::from_toml(table)?)),
        None => Ok(None),
    }
}
