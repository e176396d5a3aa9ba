// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! A log channel, shared between the emulator and whatever displays its log.
//!
//! Anything that wants to emit diagnostics is handed a [Journal]. The one
//! [Reader] belongs to the log pane. Every entry is also forwarded to the
//! [log] facade.

use log::Level;
use std::{
    fmt::{Display, Formatter},
    sync::mpsc::{sync_channel, Receiver, SyncSender, TryIter},
};

/// Default number of entries held before new ones are dropped
pub const DEFAULT_CAPACITY: usize = 1024;

/// A single line of the journal
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Entry {
    /// How important the entry is
    pub level: Level,
    /// Which component emitted it
    pub source: &'static str,
    /// What happened
    pub message: String,
}

impl Display for Entry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.source, self.message)
    }
}

/// The sending half of the journal. Cheap to clone.
///
/// Never blocks: entries are dropped when the [Reader] falls behind or goes away.
#[derive(Clone, Debug)]
pub struct Journal {
    tx: SyncSender<Entry>,
}

/// The receiving half of the journal
#[derive(Debug)]
pub struct Reader {
    rx: Receiver<Entry>,
}

/// Creates a journal holding at most `capacity` unread entries
/// # Examples
/// ```rust
/// # use chipd::journal::journal;
/// let (journal, reader) = journal(16);
/// journal.info("cpu", "hello");
/// let lines: Vec<String> = reader.drain().map(|e| e.to_string()).collect();
/// assert_eq!(lines, ["[cpu] hello"]);
/// ```
pub fn journal(capacity: usize) -> (Journal, Reader) {
    let (tx, rx) = sync_channel(capacity);
    (Journal { tx }, Reader { rx })
}

impl Journal {
    /// Emits an entry at `level`
    pub fn log(&self, level: Level, source: &'static str, message: impl Into<String>) {
        let message = message.into();
        log::log!(target: source, level, "{message}");
        // a full or disconnected journal just loses the entry
        let _ = self.tx.try_send(Entry {
            level,
            source,
            message,
        });
    }
    /// Emits an [Level::Error] entry
    pub fn error(&self, source: &'static str, message: impl Into<String>) {
        self.log(Level::Error, source, message)
    }
    /// Emits a [Level::Warn] entry
    pub fn warn(&self, source: &'static str, message: impl Into<String>) {
        self.log(Level::Warn, source, message)
    }
    /// Emits an [Level::Info] entry
    pub fn info(&self, source: &'static str, message: impl Into<String>) {
        self.log(Level::Info, source, message)
    }
    /// Emits a [Level::Trace] entry
    pub fn trace(&self, source: &'static str, message: impl Into<String>) {
        self.log(Level::Trace, source, message)
    }
}

impl Reader {
    /// Takes every entry that's arrived so far, without waiting
    pub fn drain(&self) -> TryIter<'_, Entry> {
        self.rx.try_iter()
    }
}
