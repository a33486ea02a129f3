//! Inbox watching.
//!
//! An [`EventSource`] reports file arrivals; the [`FolderWatcher`] filters
//! them, waits for each file to settle and hands it to a
//! [`DocumentHandler`] on a blocking thread.

mod folder;
mod source;

pub use folder::{should_ignore, DocumentHandler, FolderWatcher, WatchHandle};
pub use source::{ChannelSource, EventSource, NotifySource, WatchError};
