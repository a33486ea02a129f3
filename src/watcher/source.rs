//! Sources of "new file" events.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Errors from setting up a watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Cannot use watched directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// Capability to observe file arrivals in a directory.
///
/// Arrived paths are pushed into the sender given to [`subscribe`]; dropping
/// every clone of that sender (on [`unsubscribe`]) closes the stream.
///
/// [`subscribe`]: EventSource::subscribe
/// [`unsubscribe`]: EventSource::unsubscribe
pub trait EventSource: Send {
    fn subscribe(
        &mut self,
        dir: &Path,
        events: UnboundedSender<PathBuf>,
    ) -> Result<(), WatchError>;

    fn unsubscribe(&mut self);
}

/// Paths of an event that count as a file arriving.
///
/// A rename inside the watched directory is reported as `To` and again as
/// `Both`; only the `To` half is an arrival. A move from elsewhere has no
/// `Both` partner.
fn arrived_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths,
        _ => Vec::new(),
    }
}

/// OS notifications through the `notify` crate, non-recursive.
#[derive(Default)]
pub struct NotifySource {
    watcher: Option<RecommendedWatcher>,
}

impl NotifySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventSource for NotifySource {
    fn subscribe(
        &mut self,
        dir: &Path,
        events: UnboundedSender<PathBuf>,
    ) -> Result<(), WatchError> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for path in arrived_paths(event) {
                    // Receiver gone means we are shutting down
                    let _ = events.send(path);
                }
            }
            Err(e) => tracing::error!("Watch error: {}", e),
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        // Dropping the watcher drops the sender held by its callback
        self.watcher = None;
    }
}

/// In-process event source; arrivals are pushed with [`ChannelSource::emit`].
///
/// Clones share the subscription, so one clone can be handed to the watcher
/// while another emits.
#[derive(Clone, Default)]
pub struct ChannelSource {
    sender: Arc<Mutex<Option<UnboundedSender<PathBuf>>>>,
}

impl ChannelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a file arrival. Returns false when nobody is subscribed.
    pub fn emit(&self, path: impl Into<PathBuf>) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .is_some_and(|tx| tx.send(path.into()).is_ok()),
            Err(_) => false,
        }
    }
}

impl EventSource for ChannelSource {
    fn subscribe(
        &mut self,
        _dir: &Path,
        events: UnboundedSender<PathBuf>,
    ) -> Result<(), WatchError> {
        if let Ok(mut guard) = self.sender.lock() {
            *guard = Some(events);
        }
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }
}
