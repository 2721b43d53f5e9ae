//! Append-only visit log.
//!
//! Stored as JSON lines in `history.jsonl`, one visit per line. The whole log
//! is read into memory on open. Visits land in memory immediately; a
//! dedicated writer thread appends them to the file in order, so callers on
//! the event pump never wait on disk.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::JoinHandle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub visited_at: DateTime<Utc>,
}

/// Where finished page loads are recorded.
pub trait HistorySink: Send + Sync {
    fn add(&self, url: &str, title: &str);
}

pub struct HistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    writer: Option<Writer>,
}

/// Appends visits to the log file off the caller's thread.
struct Writer {
    tx: Mutex<Option<mpsc::Sender<HistoryEntry>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Writer {
    fn spawn(path: PathBuf) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<HistoryEntry>();
        let handle = std::thread::Builder::new()
            .name("zenium-history".into())
            .spawn(move || {
                for entry in rx {
                    if let Err(e) = append_line(&path, &entry) {
                        log::warn!("Failed to record visit to {}: {:#}", entry.url, e);
                    }
                }
            })
            .context("Failed to start history writer")?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, entry: HistoryEntry) {
        if let Some(tx) = self.tx.lock().as_ref()
            && tx.send(entry).is_err()
        {
            log::warn!("History writer has stopped, visit not persisted");
        }
    }

    /// Close the queue and wait until every queued visit is on disk.
    fn finish(&self) {
        self.tx.lock().take();
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            log::error!("History writer panicked");
        }
    }
}

impl HistoryStore {
    /// Open the log at the default location.
    pub fn open() -> Result<Self> {
        Self::open_at(zenium_config::paths::history_path())
    }

    /// Open (or start) the log at `path`. Unparsable lines are skipped with a
    /// warning so one torn write does not lose the whole history.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read history from {:?}", path))?;
            parse_lines(&contents, &path)
        } else {
            Vec::new()
        };

        log::info!("Loaded {} history entries from {:?}", entries.len(), path);
        Ok(Self {
            entries: Mutex::new(entries),
            writer: Some(Writer::spawn(path)?),
        })
    }

    /// A log that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            writer: None,
        }
    }

    /// Record a visit. It is visible to queries at once and reaches the file
    /// once the writer thread gets to it; write failures are logged there.
    pub fn record(&self, url: &str, title: &str) {
        let entry = HistoryEntry {
            url: url.to_string(),
            title: title.to_string(),
            visited_at: Utc::now(),
        };

        if let Some(writer) = &self.writer {
            writer.send(entry.clone());
        }
        self.entries.lock().push(entry);
    }

    /// Block until every recorded visit has been written. Later visits are
    /// kept in memory only.
    pub fn flush(&self) {
        if let Some(writer) = &self.writer {
            writer.finish();
        }
    }

    /// Every visit, newest first.
    pub fn get_all(&self) -> Vec<HistoryEntry> {
        self.entries.lock().iter().rev().cloned().collect()
    }

    /// The `limit` most recent visits, newest first.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl HistorySink for HistoryStore {
    fn add(&self, url: &str, title: &str) {
        self.record(url, title);
    }
}

impl Drop for HistoryStore {
    fn drop(&mut self) {
        self.flush();
    }
}

fn parse_lines(contents: &str, path: &Path) -> Vec<HistoryEntry> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping history line {} in {:?}: {}", n + 1, path, e);
                None
            }
        })
        .collect()
}

fn append_line(path: &Path, entry: &HistoryEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create history directory {:?}", parent))?;
    }

    let mut line = serde_json::to_string(entry).context("Failed to serialize history entry")?;
    line.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open history log {:?}", path))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("Failed to append to history log {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_newest_first() {
        let store = HistoryStore::in_memory();
        store.add("https://a.example/", "A");
        store.add("https://b.example/", "B");
        store.add("https://c.example/", "C");

        let urls: Vec<_> = store.get_all().into_iter().map(|e| e.url).collect();
        assert_eq!(
            urls,
            vec!["https://c.example/", "https://b.example/", "https://a.example/"]
        );
        assert_eq!(store.recent(1)[0].title, "C");
    }

    #[test]
    fn test_persists_across_open() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("history.jsonl");

        let store = HistoryStore::open_at(&path).unwrap();
        store.record("https://a.example/", "A");
        store.record("https://b.example/", "B");
        drop(store);

        let reopened = HistoryStore::open_at(&path).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get_all()[0].url, "https://b.example/");
    }

    #[test]
    fn test_skips_corrupt_lines() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("history.jsonl");
        let good = serde_json::to_string(&HistoryEntry {
            url: "https://a.example/".to_string(),
            title: "A".to_string(),
            visited_at: Utc::now(),
        })
        .unwrap();
        std::fs::write(&path, format!("{good}\n{{truncated\n\n")).unwrap();

        let store = HistoryStore::open_at(&path).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_visit_is_queryable_before_it_is_written() {
        let temp = tempdir().unwrap();
        // The parent is a plain file, so every append fails
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let path = blocker.join("history.jsonl");

        let store = HistoryStore::open_at(&path).unwrap();
        store.add("https://a.example/", "A");
        assert_eq!(store.len(), 1);
        assert_eq!(store.recent(1)[0].title, "A");

        store.flush();
        assert!(!path.exists());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_flush_writes_every_queued_visit_in_order() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("history.jsonl");

        let store = HistoryStore::open_at(&path).unwrap();
        for n in 0..50 {
            store.add(&format!("https://example.com/{n}"), "page");
        }
        store.flush();

        let lines: Vec<HistoryEntry> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 50);
        assert_eq!(lines[0].url, "https://example.com/0");
        assert_eq!(lines[49].url, "https://example.com/49");
    }
}
