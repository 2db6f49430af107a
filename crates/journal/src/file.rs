// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed journal writer
//!
//! Each journal is one append-only file within a locked directory. Appends
//! are queued to a single flusher thread, which writes everything queued in
//! submission order, syncs each touched file once, and only then resolves
//! the batch's appends and publishes a Fragment per touched journal to
//! subscribers.

use fs2::FileExt;
use gz_core::{AppendError, AppendSignal, AsyncAppend, Fragment, JournalName, WriteError, Writer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Name of the directory lock file
pub const LOCK_FILE: &str = "LOCK";

#[derive(Debug, Error)]
pub enum FileWriterError {
    #[error("creating directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("directory {path} is locked by another writer: {source}")]
    Locked {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("fragment {journal}@{begin}..{end} is not backed by a local file")]
    NotLocal {
        journal: JournalName,
        begin: u64,
        end: u64,
    },
    #[error("offset {offset} is outside of fragment {begin}..{end}")]
    OutOfRange { offset: u64, begin: u64, end: u64 },
    #[error("writer closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration of a `FileWriter`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileWriterConfig {
    /// Directory holding journal files
    pub dir: PathBuf,
}

impl FileWriterConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Path of the file holding `journal` within `dir`
pub fn journal_path(dir: &Path, journal: &JournalName) -> PathBuf {
    let name = journal.as_str().replace('%', "%25").replace('/', "%2F");
    dir.join(format!("{name}.log"))
}

/// Read `[offset, fragment.end)` from a file-backed fragment
pub fn read_fragment(fragment: &Fragment, offset: u64) -> Result<Vec<u8>, FileWriterError> {
    let Some(path) = &fragment.backing else {
        return Err(FileWriterError::NotLocal {
            journal: fragment.journal.clone(),
            begin: fragment.begin,
            end: fragment.end,
        });
    };
    if offset < fragment.begin || offset > fragment.end {
        return Err(FileWriterError::OutOfRange {
            offset,
            begin: fragment.begin,
            end: fragment.end,
        });
    }

    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    file.take(fragment.end - offset).read_to_end(&mut buf)?;
    if (buf.len() as u64) < fragment.end - offset {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "fragment file is short").into());
    }
    Ok(buf)
}

enum Request {
    Append {
        journal: JournalName,
        bytes: Vec<u8>,
        signal: AppendSignal,
    },
    Subscribe {
        journal: JournalName,
        updates: mpsc::UnboundedSender<Fragment>,
    },
}

struct Inner {
    dir: PathBuf,
    requests: Mutex<Option<mpsc::UnboundedSender<Request>>>,
    flusher: Mutex<Option<JoinHandle<()>>>,
    // Held for the exclusive directory lock; released on drop.
    _lock: File,
}

/// Journal writer appending to files of a local directory
#[derive(Clone)]
pub struct FileWriter {
    inner: Arc<Inner>,
}

impl FileWriter {
    /// Lock `config.dir` (creating it if needed) and start the flusher
    pub fn open(config: FileWriterConfig) -> Result<Self, FileWriterError> {
        let dir = config.dir;
        std::fs::create_dir_all(&dir).map_err(|source| FileWriterError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let lock_path = dir.join(LOCK_FILE);
        let lock = File::create(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|source| FileWriterError::Locked {
                path: dir.clone(),
                source,
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let flusher = Flusher {
            dir: dir.clone(),
            files: HashMap::new(),
            subscribers: HashMap::new(),
        };
        let handle = std::thread::Builder::new()
            .name("gz-flusher".into())
            .spawn(move || flusher.run(rx))?;

        info!(dir = %dir.display(), "file writer opened");
        Ok(Self {
            inner: Arc::new(Inner {
                dir,
                requests: Mutex::new(Some(tx)),
                flusher: Mutex::new(Some(handle)),
                _lock: lock,
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.inner.dir
    }

    /// Path of the file holding `journal`
    pub fn journal_path(&self, journal: &JournalName) -> PathBuf {
        journal_path(&self.inner.dir, journal)
    }

    /// Stream of Fragments published for `journal`
    ///
    /// The first Fragment covers content already in the journal, if any. The
    /// stream closes when the writer does.
    pub fn subscribe(
        &self,
        journal: &JournalName,
    ) -> Result<mpsc::UnboundedReceiver<Fragment>, WriteError> {
        let (updates, rx) = mpsc::unbounded_channel();
        self.send(Request::Subscribe {
            journal: journal.clone(),
            updates,
        })?;
        Ok(rx)
    }

    /// Flush queued appends, then stop the flusher
    ///
    /// Appends submitted afterwards fail with `WriteError::Closed`.
    pub fn close(&self) {
        let requests = self
            .inner
            .requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(requests);

        let handle = self
            .inner
            .flusher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!(dir = %self.inner.dir.display(), "flusher thread panicked");
            }
        }
    }

    fn send(&self, request: Request) -> Result<(), WriteError> {
        let requests = self.inner.requests.lock().unwrap_or_else(|e| e.into_inner());
        let tx = requests.as_ref().ok_or(WriteError::Closed)?;
        tx.send(request).map_err(|_| WriteError::Closed)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let requests = self.requests.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        drop(requests);
        let handle = self.flusher.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Writer for FileWriter {
    fn write(&self, journal: &JournalName, frame: Vec<u8>) -> Result<AsyncAppend, WriteError> {
        let (append, signal) = AsyncAppend::pending();
        self.send(Request::Append {
            journal: journal.clone(),
            bytes: frame,
            signal,
        })?;
        Ok(append)
    }
}

struct JournalFile {
    file: File,
    path: PathBuf,
    head: u64,
    /// Set when a partial append could not be rolled back
    broken: Option<String>,
}

struct Flusher {
    dir: PathBuf,
    files: HashMap<JournalName, JournalFile>,
    subscribers: HashMap<JournalName, Vec<mpsc::UnboundedSender<Fragment>>>,
}

impl Flusher {
    fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) {
        while let Some(first) = requests.blocking_recv() {
            let mut batch = vec![first];
            while let Ok(request) = requests.try_recv() {
                batch.push(request);
            }
            self.flush(batch);
        }
        info!(dir = %self.dir.display(), "flusher exiting");
    }

    fn flush(&mut self, batch: Vec<Request>) {
        let mut completions = Vec::new();
        let mut subscribes = Vec::new();
        // Journal => [begin, end) of this batch's successfully appended content.
        let mut touched: BTreeMap<JournalName, (u64, u64)> = BTreeMap::new();

        for request in batch {
            match request {
                Request::Subscribe { journal, updates } => subscribes.push((journal, updates)),
                Request::Append {
                    journal,
                    bytes,
                    signal,
                } => {
                    let outcome = self.append(&journal, &bytes);
                    if let Ok(head) = outcome {
                        if !bytes.is_empty() {
                            touched
                                .entry(journal.clone())
                                .or_insert((head - bytes.len() as u64, head))
                                .1 = head;
                        }
                    }
                    completions.push((journal, signal, outcome));
                }
            }
        }

        let mut failed_syncs = HashMap::new();
        for journal in touched.keys() {
            if let Some(file) = self.files.get(journal) {
                if let Err(err) = file.file.sync_data() {
                    error!(journal = %journal, error = %err, "syncing journal file");
                    failed_syncs.insert(journal.clone(), err.to_string());
                }
            }
        }

        for (journal, signal, outcome) in completions {
            match (outcome, failed_syncs.get(&journal)) {
                (Ok(_), Some(err)) => signal.fail(AppendError::Failed(err.clone())),
                (Ok(head), None) => signal.resolve(head),
                (Err(err), _) => signal.fail(AppendError::Failed(err.to_string())),
            }
        }

        for (journal, (begin, end)) in touched {
            if failed_syncs.contains_key(&journal) {
                continue;
            }
            if let Some(file) = self.files.get(&journal) {
                let fragment = Fragment::new(journal, begin, end).with_backing(file.path.clone());
                self.publish(fragment);
            }
        }

        for (journal, updates) in subscribes {
            self.subscribe(journal, updates);
        }
    }

    fn file(&mut self, journal: &JournalName) -> io::Result<&mut JournalFile> {
        if !self.files.contains_key(journal) {
            let path = journal_path(&self.dir, journal);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .read(true)
                .open(&path)?;
            let head = file.metadata()?.len();
            debug!(journal = %journal, path = %path.display(), head, "opened journal file");
            self.files.insert(
                journal.clone(),
                JournalFile {
                    file,
                    path,
                    head,
                    broken: None,
                },
            );
        }
        self.files
            .get_mut(journal)
            .ok_or_else(|| io::Error::other("journal file missing after open"))
    }

    fn append(&mut self, journal: &JournalName, bytes: &[u8]) -> io::Result<u64> {
        let file = self.file(journal)?;
        if let Some(reason) = &file.broken {
            return Err(io::Error::other(reason.clone()));
        }
        if !bytes.is_empty() {
            if let Err(err) = file.file.write_all(bytes) {
                warn!(journal = %journal, error = %err, "appending to journal file");
                // Drop any partially written bytes so the file ends at the last complete append.
                if let Err(truncate) = file.file.set_len(file.head) {
                    error!(journal = %journal, error = %truncate, "truncating partial append");
                    file.broken = Some(format!("partial append was not rolled back: {truncate}"));
                }
                return Err(err);
            }
            file.head += bytes.len() as u64;
        }
        Ok(file.head)
    }

    fn subscribe(&mut self, journal: JournalName, updates: mpsc::UnboundedSender<Fragment>) {
        match self.file(&journal) {
            Ok(file) if file.head > 0 => {
                let existing =
                    Fragment::new(journal.clone(), 0, file.head).with_backing(file.path.clone());
                let _ = updates.send(existing);
            }
            Ok(_) => {}
            Err(err) => {
                // Dropping |updates| closes the subscriber's stream.
                error!(journal = %journal, error = %err, "opening journal file for subscriber");
                return;
            }
        }
        self.subscribers.entry(journal).or_default().push(updates);
    }

    fn publish(&mut self, fragment: Fragment) {
        if let Some(subscribers) = self.subscribers.get_mut(&fragment.journal) {
            subscribers.retain(|updates| updates.send(fragment.clone()).is_ok());
        }
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
