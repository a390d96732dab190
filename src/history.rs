//! Undo/redo history over schedule snapshots.
//!
//! Every structural change records the state it replaced. Undo puts the
//! current state on the redo stack and restores the recorded one, redo does
//! the reverse. Descriptions are supplied by the caller and shown verbatim.

use crate::model::{ScheduleState, Snapshot};
use chrono::{DateTime, Duration, Timelike, Utc};
use log::*;
use std::collections::BTreeMap;

/// Undo entries kept by default.
pub const MAX_HISTORY: usize = 100;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    CreateTrain,
    EditTrain,
    DeleteTrain,
    MoveTrain,
    ResizeTrain,
    SwapTrains,
    SplitTrain,
    ViewChange,
    Batch,
    ImportData,
    ClearAll,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HistoryEntry {
    pub kind: ActionKind,
    pub description: String,
    /// State to restore when this entry is taken off its stack.
    pub before: Snapshot,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStatus {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_description: Option<String>,
    pub redo_description: Option<String>,
    pub undo_depth: usize,
    pub redo_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySummary {
    pub index: usize,
    pub kind: ActionKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// The most recently applied entry.
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStatistics {
    pub total_actions: usize,
    pub actions_by_kind: BTreeMap<ActionKind, usize>,
    /// Keyed by UTC hour of day.
    pub actions_per_hour: BTreeMap<u32, usize>,
    pub most_active_hour: Option<u32>,
    pub session_duration: Duration,
    pub average_time_between_actions: Option<Duration>,
}

#[derive(Debug, Clone)]
struct OpenBatch {
    description: String,
    start: Snapshot,
}

#[derive(Debug, Clone)]
pub struct HistoryEngine {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    limit: usize,
    batch: Option<OpenBatch>,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        HistoryEngine::new(MAX_HISTORY)
    }
}

impl HistoryEngine {
    pub fn new(limit: usize) -> HistoryEngine {
        HistoryEngine {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
            batch: None,
        }
    }

    /// Resumes from persisted undo entries, oldest first.
    pub fn with_entries(entries: Vec<HistoryEntry>, limit: usize) -> HistoryEngine {
        let mut history = HistoryEngine::new(limit);
        history.undo_stack = entries;
        history.enforce_limit();
        history
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.undo_stack
    }

    fn enforce_limit(&mut self) {
        if self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            debug!("Dropping {} oldest history entries", excess);
            self.undo_stack.drain(..excess);
        }
    }

    /// Records an action given the state from before it. While a batch is
    /// open the action is absorbed into the batch and `false` is returned.
    pub fn record(&mut self, kind: ActionKind, description: impl Into<String>, before: Snapshot) -> bool {
        let description = description.into();
        if let Some(batch) = &self.batch {
            debug!("Batch {:?} absorbs {:?}", batch.description, description);
            return false;
        }

        info!("Action recorded: {} ({:?})", description, kind);
        self.redo_stack.clear();
        self.undo_stack.push(HistoryEntry {
            kind,
            description,
            before,
            timestamp: Utc::now(),
        });
        self.enforce_limit();
        true
    }

    /// Does nothing while a batch is open, since the batch would record a
    /// start state from before the undo.
    pub fn undo(&mut self, state: &mut ScheduleState) -> bool {
        if let Some(batch) = &self.batch {
            warn!("Batch {:?} is open, not undoing", batch.description);
            return false;
        }
        match self.undo_stack.pop() {
            Some(entry) => {
                info!("Undoing: {}", entry.description);
                let current = state.snapshot();
                state.restore(entry.before);
                self.redo_stack.push(HistoryEntry {
                    before: current,
                    ..entry
                });
                true
            }
            None => {
                debug!("Nothing to undo");
                false
            }
        }
    }

    pub fn redo(&mut self, state: &mut ScheduleState) -> bool {
        if let Some(batch) = &self.batch {
            warn!("Batch {:?} is open, not redoing", batch.description);
            return false;
        }
        match self.redo_stack.pop() {
            Some(entry) => {
                info!("Redoing: {}", entry.description);
                let current = state.snapshot();
                state.restore(entry.before);
                self.undo_stack.push(HistoryEntry {
                    before: current,
                    ..entry
                });
                self.enforce_limit();
                true
            }
            None => {
                debug!("Nothing to redo");
                false
            }
        }
    }

    pub fn status(&self) -> HistoryStatus {
        HistoryStatus {
            can_undo: !self.undo_stack.is_empty(),
            can_redo: !self.redo_stack.is_empty(),
            undo_description: self.undo_stack.last().map(|e| e.description.clone()),
            redo_description: self.redo_stack.last().map(|e| e.description.clone()),
            undo_depth: self.undo_stack.len(),
            redo_depth: self.redo_stack.len(),
        }
    }

    /// Every entry on the timeline, oldest first: applied entries followed
    /// by the ones that can be redone.
    fn timeline(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo_stack.iter().chain(self.redo_stack.iter().rev())
    }

    pub fn summary(&self) -> Vec<HistorySummary> {
        let current = self.undo_stack.len().checked_sub(1);
        self.timeline()
            .enumerate()
            .map(|(index, e)| HistorySummary {
                index,
                kind: e.kind,
                description: e.description.clone(),
                timestamp: e.timestamp,
                is_current: Some(index) == current,
            })
            .collect()
    }

    /// Moves along the timeline until the entry at `index` (as numbered by
    /// `summary`) is the most recently applied one. Skipped entries stay
    /// reachable through undo and redo.
    pub fn revert_to(&mut self, index: usize, state: &mut ScheduleState) -> bool {
        let total = self.undo_stack.len() + self.redo_stack.len();
        if index >= total || self.batch.is_some() {
            warn!("Cannot revert to history entry {} of {}", index, total);
            return false;
        }
        info!("Reverting to history entry {}", index);
        while self.undo_stack.len() > index + 1 {
            self.undo(state);
        }
        while self.undo_stack.len() < index + 1 {
            self.redo(state);
        }
        true
    }

    pub fn statistics(&self) -> HistoryStatistics {
        let mut stats = HistoryStatistics {
            total_actions: 0,
            actions_by_kind: BTreeMap::new(),
            actions_per_hour: BTreeMap::new(),
            most_active_hour: None,
            session_duration: Duration::zero(),
            average_time_between_actions: None,
        };
        for entry in self.timeline() {
            stats.total_actions += 1;
            *stats.actions_by_kind.entry(entry.kind).or_insert(0) += 1;
            *stats
                .actions_per_hour
                .entry(entry.timestamp.hour())
                .or_insert(0) += 1;
        }

        let mut busiest = 0;
        for (hour, count) in &stats.actions_per_hour {
            if *count > busiest {
                busiest = *count;
                stats.most_active_hour = Some(*hour);
            }
        }

        let first = self.timeline().next().map(|e| e.timestamp);
        let last = self.timeline().last().map(|e| e.timestamp);
        if let (Some(first), Some(last)) = (first, last) {
            stats.session_duration = last - first;
            if stats.total_actions > 1 {
                stats.average_time_between_actions =
                    Some(stats.session_duration / (stats.total_actions as i32 - 1));
            }
        }
        stats
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        info!("History cleared");
    }

    pub fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// Starts grouping the following actions into a single entry.
    pub fn begin_batch(&mut self, description: impl Into<String>, state: &ScheduleState) {
        let description = description.into();
        if let Some(open) = &self.batch {
            warn!("Batch {:?} already open, ignoring {:?}", open.description, description);
            return;
        }
        debug!("Batch started: {}", description);
        self.batch = Some(OpenBatch {
            description,
            start: state.snapshot(),
        });
    }

    /// Closes the open batch as one `Batch` entry. A batch that left the
    /// state unchanged records nothing.
    pub fn end_batch(&mut self, state: &ScheduleState) -> bool {
        let batch = match self.batch.take() {
            Some(batch) => batch,
            None => return false,
        };
        if batch.start == state.snapshot() {
            debug!("Batch {:?} changed nothing", batch.description);
            return false;
        }
        self.record(ActionKind::Batch, batch.description, batch.start)
    }

    /// Drops the open batch and puts the state back to where it started.
    pub fn cancel_batch(&mut self, state: &mut ScheduleState) -> bool {
        match self.batch.take() {
            Some(batch) => {
                info!("Batch cancelled: {}", batch.description);
                state.restore(batch.start);
                true
            }
            None => false,
        }
    }
}
