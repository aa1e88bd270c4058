//! Edit history for the workflow editor
//!
//! Every entry is a zstd-compressed JSON snapshot of the whole workflow
//! tagged with the edit that produced it ("add node", "connect", ...).
//! Restoring a snapshot never needs an inverse edit, so anything the
//! editor can change is undoable.
//!
//! The history also remembers which entry was last saved. The editor asks
//! it whether the workflow is dirty instead of tracking that separately,
//! so undoing back to the saved state makes the workflow clean again.

use std::collections::VecDeque;

use crate::error::{FlowEngineError, Result};
use crate::graph::Workflow;

/// Label of the entry a history starts from
pub const OPENED: &str = "open";

struct Entry {
    label: String,
    compressed: Vec<u8>,
}

/// Bounded undo/redo history of compressed workflow snapshots
pub struct UndoStack {
    entries: VecDeque<Entry>,
    /// Index of the entry the workflow currently matches
    cursor: usize,
    /// Index of the last saved entry; gone once evicted or overwritten
    saved: Option<usize>,
    limit: usize,
    level: i32,
}

impl UndoStack {
    pub fn new(limit: usize) -> Self {
        Self::with_level(limit, crate::config::defaults::HISTORY_COMPRESSION_LEVEL)
    }

    /// History keeping at most `limit` entries, compressed at `level`
    pub fn with_level(limit: usize, level: i32) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: 0,
            saved: None,
            limit: limit.max(1),
            level,
        }
    }

    /// Record the workflow after an edit.
    ///
    /// Anything that could have been redone is discarded. When the limit is
    /// reached the oldest entry is evicted.
    pub fn record(&mut self, label: impl Into<String>, workflow: &Workflow) -> Result<()> {
        let json = serde_json::to_vec(workflow)?;
        let compressed = zstd::encode_all(&json[..], self.level)
            .map_err(|e| FlowEngineError::Compression(e.to_string()))?;

        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
            if self.saved.is_some_and(|saved| saved > self.cursor) {
                self.saved = None;
            }
        }
        self.entries.push_back(Entry {
            label: label.into(),
            compressed,
        });
        self.cursor = self.entries.len() - 1;

        while self.entries.len() > self.limit {
            self.entries.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
            self.saved = match self.saved {
                Some(0) | None => None,
                Some(saved) => Some(saved - 1),
            };
        }
        Ok(())
    }

    /// Step back; the returned workflow is the state before the last edit
    pub fn undo(&mut self) -> Option<Result<Workflow>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.decompress(self.cursor))
    }

    /// Step forward again after an undo
    pub fn redo(&mut self) -> Option<Result<Workflow>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.decompress(self.cursor))
    }

    /// The state the workflow currently matches
    pub fn current(&self) -> Option<Result<Workflow>> {
        (!self.entries.is_empty()).then(|| self.decompress(self.cursor))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Label of the edit `undo` would revert, for "Undo ..." menu items
    pub fn undo_label(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.entries[self.cursor].label.as_str())
    }

    /// Label of the edit `redo` would reapply
    pub fn redo_label(&self) -> Option<&str> {
        self.can_redo()
            .then(|| self.entries[self.cursor + 1].label.as_str())
    }

    /// Remember the current entry as the saved state
    pub fn mark_saved(&mut self) {
        if !self.entries.is_empty() {
            self.saved = Some(self.cursor);
        }
    }

    /// Whether the current entry is the one last marked saved
    pub fn is_at_saved(&self) -> bool {
        self.saved == Some(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.saved = None;
    }

    /// Bytes held by all snapshots
    pub fn compressed_size(&self) -> usize {
        self.entries.iter().map(|e| e.compressed.len()).sum()
    }

    fn decompress(&self, index: usize) -> Result<Workflow> {
        let json = zstd::decode_all(&self.entries[index].compressed[..])
            .map_err(|e| FlowEngineError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(crate::config::defaults::HISTORY_LIMIT)
    }
}
