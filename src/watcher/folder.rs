//! Inbox folder watcher.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::WatchSettings;

use super::source::{EventSource, WatchError};

/// Receives each document that arrived and settled in the inbox.
pub trait DocumentHandler: Send + Sync {
    fn handle_document(&self, path: &Path);
}

/// Whether an arrival should be skipped: directories and partial files.
pub fn should_ignore(path: &Path, ignored_suffixes: &[String]) -> bool {
    if path.is_dir() {
        return true;
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return true;
    };
    ignored_suffixes
        .iter()
        .any(|suffix| name.ends_with(&suffix.to_lowercase()))
}

/// Watches one directory and hands new documents to a handler.
pub struct FolderWatcher<S: EventSource> {
    dir: PathBuf,
    settings: WatchSettings,
    source: S,
    handler: Arc<dyn DocumentHandler>,
}

impl<S: EventSource> FolderWatcher<S> {
    pub fn new(
        dir: impl Into<PathBuf>,
        settings: WatchSettings,
        source: S,
        handler: Arc<dyn DocumentHandler>,
    ) -> Self {
        Self {
            dir: dir.into(),
            settings,
            source,
            handler,
        }
    }

    /// Create the directory if needed, subscribe and start dispatching.
    pub fn start(mut self) -> Result<WatchHandle<S>, WatchError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| WatchError::Directory {
            path: self.dir.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        self.source.subscribe(&self.dir, tx)?;
        tracing::info!("Watching {}", self.dir.display());

        let dispatcher = tokio::spawn(dispatch(rx, self.handler, self.settings));
        Ok(WatchHandle {
            dir: self.dir,
            source: self.source,
            dispatcher,
        })
    }
}

/// A running watcher.
pub struct WatchHandle<S: EventSource> {
    dir: PathBuf,
    source: S,
    dispatcher: JoinHandle<usize>,
}

impl<S: EventSource> WatchHandle<S> {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Unsubscribe, finish in-flight documents and return how many were handled.
    pub async fn stop(mut self) -> usize {
        self.source.unsubscribe();
        match self.dispatcher.await {
            Ok(handled) => {
                tracing::info!("Stopped watching {} ({} handled)", self.dir.display(), handled);
                handled
            }
            Err(e) => {
                tracing::error!("Watch dispatcher failed: {}", e);
                0
            }
        }
    }
}

/// Receive arrivals until the source closes, one task per document.
///
/// A path already waiting or being handled is not started again.
async fn dispatch(
    mut events: mpsc::UnboundedReceiver<PathBuf>,
    handler: Arc<dyn DocumentHandler>,
    settings: WatchSettings,
) -> usize {
    let mut tasks: JoinSet<(PathBuf, bool)> = JoinSet::new();
    let mut pending: HashSet<PathBuf> = HashSet::new();
    let mut handled = 0;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(path) = event else { break };
                if should_ignore(&path, &settings.ignored_suffixes) {
                    tracing::debug!("Ignoring {}", path.display());
                    continue;
                }
                if !pending.insert(path.clone()) {
                    tracing::debug!("{} is already pending", path.display());
                    continue;
                }
                tracing::info!("New document: {}", path.display());
                tasks.spawn(settle_and_handle(path, Arc::clone(&handler), settings.settle_delay));
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                handled += finish(result, &mut pending);
            }
        }
    }

    while let Some(result) = tasks.join_next().await {
        handled += finish(result, &mut pending);
    }
    handled
}

fn finish(
    result: Result<(PathBuf, bool), tokio::task::JoinError>,
    pending: &mut HashSet<PathBuf>,
) -> usize {
    match result {
        Ok((path, ok)) => {
            pending.remove(&path);
            usize::from(ok)
        }
        Err(e) => {
            tracing::error!("Document task failed: {}", e);
            0
        }
    }
}

/// Wait for the file to settle, then run the handler on a blocking thread.
///
/// Returns the path with whether the handler ran to completion.
async fn settle_and_handle(
    path: PathBuf,
    handler: Arc<dyn DocumentHandler>,
    settle_delay: std::time::Duration,
) -> (PathBuf, bool) {
    tokio::time::sleep(settle_delay).await;

    if !path.exists() {
        tracing::debug!("{} disappeared before processing", path.display());
        return (path, false);
    }

    let blocking_path = path.clone();
    let task = tokio::task::spawn_blocking(move || handler.handle_document(&blocking_path));
    let ok = match task.await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Processing {} panicked: {}", path.display(), e);
            false
        }
    };
    (path, ok)
}
