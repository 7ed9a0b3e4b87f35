use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, BackendError};

/// Error type for exporting rendered items
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Items fetched from `/render/` per request
const PAGE_SIZE: usize = 10;

/// Write `{i}.html` into `dir` for every item, using the backend's rendered
/// HTML. Returns the number of files written.
pub fn export_rendered(backend: &dyn Backend, dir: &Path) -> Result<usize, ExportError> {
    fs::create_dir_all(dir).map_err(|e| ExportError::Write {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let total = backend.count()?;
    let mut written = 0;
    let mut start = 0;
    while start < total {
        let page = backend.render(start, PAGE_SIZE)?;
        if page.html.is_empty() {
            tracing::warn!(start, total, "render returned an empty page, stopping");
            break;
        }
        for (offset, html) in page.html.iter().enumerate() {
            let path = dir.join(format!("{}.html", start + offset));
            fs::write(&path, html).map_err(|e| ExportError::Write {
                path: path.clone(),
                source: e,
            })?;
            written += 1;
        }
        start += page.html.len();
    }
    tracing::info!(dir = %dir.display(), written, "exported rendered items");
    Ok(written)
}
