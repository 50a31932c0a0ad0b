//! Ordered logs kept by the console: what was typed and what came back.

use crate::command::CommandInfo;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// An ordered, append-only list.
///
/// Insertion order is the only order. Entries are only ever removed by
/// [`HistoryList::clear`] or, when a capacity is configured, by dropping the
/// oldest entries once the list grows past it.
#[derive(Debug, Clone)]
pub struct HistoryList<T> {
    entries: VecDeque<T>,
    capacity: Option<usize>,
    appended: u64,
}

impl<T> HistoryList<T> {
    /// Unbounded list.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// List that keeps at most `capacity` entries when `Some`.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            appended: 0,
        }
    }

    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        self.appended += 1;
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                self.entries.pop_front();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, oldest first.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    /// The `back`-th most recent entry; `recall(0)` is the latest one.
    pub fn recall(&self, back: usize) -> Option<&T> {
        let len = self.entries.len();
        if back >= len {
            return None;
        }
        self.entries.get(len - 1 - back)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Total number of entries ever appended, including dropped and cleared ones.
    ///
    /// Pass the value to [`HistoryList::since`] later to get only what was
    /// appended in between.
    pub fn appended(&self) -> u64 {
        self.appended
    }

    /// Entries appended after `mark` was read from [`HistoryList::appended`]
    /// that are still retained.
    pub fn since(&self, mark: u64) -> impl Iterator<Item = &T> {
        let fresh = self.appended.saturating_sub(mark);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(self.entries.len());
        self.entries.iter().skip(self.entries.len() - fresh)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T: Clone> HistoryList<T> {
    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

impl<T> Default for HistoryList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether an output line echoes user input or reports an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputKind {
    Echo,
    Result,
}

/// A single line of console output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEntry {
    pub kind: OutputKind,
    pub text: String,
    /// Position in the stream of all entries ever appended, starting at 0.
    pub seq: u64,
}

impl fmt::Display for OutputEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OutputKind::Echo => write!(f, "> {}", self.text),
            OutputKind::Result => write!(f, ": {}", self.text),
        }
    }
}

pub type OutputHistory = HistoryList<OutputEntry>;
pub type CommandHistory = HistoryList<CommandInfo>;

impl HistoryList<OutputEntry> {
    /// Record a line as typed by the user.
    pub fn push_echo(&mut self, text: impl Into<String>) {
        self.push_output(OutputKind::Echo, text.into());
    }

    /// Record a result or failure message.
    pub fn push_result(&mut self, text: impl Into<String>) {
        self.push_output(OutputKind::Result, text.into());
    }

    fn push_output(&mut self, kind: OutputKind, text: String) {
        let seq = self.appended;
        self.push(OutputEntry { kind, text, seq });
    }
}
