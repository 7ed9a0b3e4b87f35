//! Inbound host commands delivered through a file.
//!
//! The host appends one JSON object per line. Lines already in the file when
//! watching starts are skipped; after that each complete line is read once.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Watches the inbox file and hands back new lines
pub struct InboxWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<()>,
    path: PathBuf,
    offset: u64,
}

impl InboxWatcher {
    /// Start watching `path`. The file need not exist yet; its directory must.
    pub fn start(path: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let name = path.file_name().map(|n| n.to_os_string());
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {}
                    _ => return,
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == name);
                if ours {
                    let _ = tx.send(());
                }
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let offset = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        tracing::info!(path = %path.display(), offset, "watching inbox");
        Ok(InboxWatcher {
            _watcher: watcher,
            rx,
            path: path.to_path_buf(),
            offset,
        })
    }

    /// Non-blocking poll. Returns lines appended since the last poll.
    pub fn poll(&mut self) -> Vec<String> {
        let mut changed = false;
        while self.rx.try_recv().is_ok() {
            changed = true;
        }
        if !changed {
            return Vec::new();
        }
        match read_new_lines(&self.path, self.offset) {
            Ok((lines, offset)) => {
                self.offset = offset;
                lines
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "could not read inbox: {}", e);
                Vec::new()
            }
        }
    }
}

/// Complete lines after byte `offset`, and the offset to resume from. A
/// trailing partial line is left for the next read. If the file shrank it
/// is read again from the start.
pub fn read_new_lines(path: &Path, offset: u64) -> io::Result<(Vec<String>, u64)> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };
    let len = file.metadata()?.len();
    let start = if len < offset {
        tracing::debug!(path = %path.display(), "inbox was truncated, rereading");
        0
    } else {
        offset
    };
    file.seek(SeekFrom::Start(start))?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;

    let consumed = text.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let lines = text[..consumed]
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    Ok((lines, start + consumed as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::{self, OpenOptions};
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn reads_only_complete_new_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inbox.jsonl");
        fs::write(&path, "{\"a\":1}\n{\"b\":2}").unwrap();

        let (lines, offset) = read_new_lines(&path, 0).unwrap();
        assert_eq!(lines, vec!["{\"a\":1}"]);
        assert_eq!(offset, 8);

        let mut f = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "  ").unwrap();
        writeln!(f, "{{\"c\":3}}").unwrap();
        let (lines, offset) = read_new_lines(&path, offset).unwrap();
        assert_eq!(lines, vec!["{\"b\":2}", "{\"c\":3}"]);
        assert_eq!(offset, fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn truncated_file_is_reread() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("inbox.jsonl");
        fs::write(&path, "x\n").unwrap();
        let (lines, offset) = read_new_lines(&path, 100).unwrap();
        assert_eq!(lines, vec!["x"]);
        assert_eq!(offset, 2);
    }

    #[test]
    fn missing_file_reads_nothing() {
        let tmp = TempDir::new().unwrap();
        let (lines, offset) = read_new_lines(&tmp.path().join("none"), 5).unwrap();
        assert!(lines.is_empty());
        assert_eq!(offset, 0);
    }
}
