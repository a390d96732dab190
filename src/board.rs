//! The schedule board: one live `ScheduleState`, its history, and the user
//! actions that change them.

use crate::command::{Command, NewTrain, TrainChanges};
use crate::config::BoardConfig;
use crate::error::BoardError;
use crate::history::{ActionKind, HistoryEngine, HistoryStatus};
use crate::layout::{compute_layout, position_trains, PositionedTrain, TrackLayout};
use crate::model::*;
use crate::notify::{Notice, Notifier, SilentNotifier};
use crate::persistence::PersistedState;
use crate::search::{highlight, Highlight};
use log::*;

pub struct Board<N: Notifier = SilentNotifier> {
    state: ScheduleState,
    history: HistoryEngine,
    config: BoardConfig,
    notifier: N,
}

fn snap(minutes: Minutes, step: Minutes) -> Minutes {
    if step == 0 {
        minutes
    } else {
        minutes.saturating_add(step / 2) / step * step
    }
}

impl Board<SilentNotifier> {
    pub fn silent(state: ScheduleState, config: BoardConfig) -> Board<SilentNotifier> {
        Board::new(state, config, SilentNotifier)
    }
}

impl<N: Notifier> Board<N> {
    pub fn new(state: ScheduleState, config: BoardConfig, notifier: N) -> Board<N> {
        let history = HistoryEngine::new(config.history_limit);
        Board {
            state,
            history,
            config,
            notifier,
        }
    }

    pub fn from_persisted(persisted: PersistedState, config: BoardConfig, notifier: N) -> Board<N> {
        let mut state = ScheduleState::default();
        state.restore(persisted.snapshot);
        let history = HistoryEngine::with_entries(persisted.history, config.history_limit);
        Board {
            state,
            history,
            config,
            notifier,
        }
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    pub fn history(&self) -> &HistoryEngine {
        &self.history
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn status(&self) -> HistoryStatus {
        self.history.status()
    }

    /// Self-contained copy for a snapshot store.
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            snapshot: self.state.snapshot(),
            history: self.history.entries().to_vec(),
        }
    }

    pub fn layout(&self) -> Vec<TrackLayout> {
        compute_layout(&self.state.tracks, self.state.trains.values(), &self.config.layout)
    }

    pub fn positioned(&self) -> Vec<PositionedTrain> {
        position_trains(&self.state, &self.layout(), &self.config)
    }

    /// Trains left out of the layout: unassigned, on an unknown track or
    /// with an empty interval.
    pub fn not_laid_out(&self) -> Vec<TrainId> {
        let placed = self.positioned().into_iter().map(|p| p.id).collect::<Vec<_>>();
        self.state
            .trains
            .keys()
            .copied()
            .filter(|id| !placed.contains(id))
            .collect()
    }

    pub fn search(&self, query: &str, viewport_width: f64) -> Highlight {
        highlight(query, &self.positioned(), viewport_width)
    }

    /// Applies one user action. Returns whether anything changed.
    pub fn apply(&mut self, command: Command) -> Result<bool, BoardError> {
        trace!("Applying {:?}", command);
        match command {
            Command::AddTrain { train } => self.add_train(train).map(|_| true),
            Command::EditTrain { id, changes } => self.edit_train(id, &changes).map(|_| true),
            Command::DeleteTrain { id } => self.delete_train(id).map(|_| true),
            Command::MoveTrain { id, start, track } => self.move_train(id, start, track).map(|_| true),
            Command::ResizeTrain { id, start, end } => self.resize_train(id, start, end).map(|_| true),
            Command::Select { id } => self.select(id),
            Command::ClearSelection => Ok(self.clear_selection()),
            Command::BeginSwap { id } => self.begin_swap(id).map(|_| true),
            Command::PickSwap { id } => self.pick_swap(id),
            Command::CancelSwap => Ok(self.cancel_swap()),
            Command::SplitTrain { id } => self.split_train(id).map(|_| true),
            Command::SetView {
                start_hour,
                view_hours,
            } => Ok(self.set_view(start_hour, view_hours)),
            Command::ImportSchedule { schedule } => self.import_schedule(schedule).map(|_| true),
            Command::ClearAll => Ok(self.clear_all()),
            Command::Undo => Ok(self.undo()),
            Command::Redo => Ok(self.redo()),
            Command::RevertTo { index } => Ok(self.revert_to(index)),
            Command::BeginBatch { description } => {
                self.history.begin_batch(description, &self.state);
                Ok(false)
            }
            Command::EndBatch => Ok(self.history.end_batch(&self.state)),
            Command::CancelBatch => Ok(self.history.cancel_batch(&mut self.state)),
        }
    }

    fn validate(&self, train: &Train) -> Result<(), BoardError> {
        validate_train(train, &self.state.tracks, self.config.min_service_minutes)
    }

    fn record(&mut self, kind: ActionKind, description: String, before: Snapshot) {
        self.history.record(kind, description.as_str(), before);
        self.notifier.notify(Notice::Success, &description);
    }

    pub fn add_train(&mut self, new: NewTrain) -> Result<TrainId, BoardError> {
        let train = new.into_train(self.state.next_train_id);
        self.validate(&train)?;

        let before = self.state.snapshot();
        let id = self.state.allocate_train_id();
        let description = format!("Added train {}", train.label());
        self.state.trains.insert(id, train);
        self.record(ActionKind::CreateTrain, description, before);
        Ok(id)
    }

    pub fn edit_train(&mut self, id: TrainId, changes: &TrainChanges) -> Result<(), BoardError> {
        let mut train = self.state.train(id)?.clone();
        changes.apply_to(&mut train);
        self.validate(&train)?;

        let before = self.state.snapshot();
        let description = format!("Edited train {}", train.label());
        self.state.trains.insert(id, train);
        self.record(ActionKind::EditTrain, description, before);
        Ok(())
    }

    pub fn delete_train(&mut self, id: TrainId) -> Result<Train, BoardError> {
        let before = self.state.snapshot();
        let removed = self.state.train(id)?.clone();
        let label = removed.label();
        self.state.trains.remove(&id);

        if self.state.selection == Some(id) {
            self.state.selection = None;
        }
        if self.state.swap == (SwapMode::Active { source: id }) {
            self.state.swap = SwapMode::Inactive;
        }
        self.record(ActionKind::DeleteTrain, format!("Deleted train {}", label), before);
        Ok(removed)
    }

    /// Moves a train in time, and to another track if given, keeping its
    /// duration. The new start snaps to the configured grid.
    pub fn move_train(
        &mut self,
        id: TrainId,
        start: Minutes,
        track: Option<TrackId>,
    ) -> Result<(), BoardError> {
        let mut train = self.state.train(id)?.clone();
        let span = train.span();
        train.start = snap(start, self.config.snap_minutes);
        train.end = train.start.saturating_add(span);
        if track.is_some() {
            train.track = track;
        }
        self.validate(&train)?;

        let before = self.state.snapshot();
        let description = match train.track {
            Some(track) => format!(
                "Moved train {} to {} on track {}",
                train.label(),
                format_hhmm(train.start),
                track
            ),
            None => format!("Moved train {} to {}", train.label(), format_hhmm(train.start)),
        };
        self.state.trains.insert(id, train);
        self.record(ActionKind::MoveTrain, description, before);
        Ok(())
    }

    pub fn resize_train(&mut self, id: TrainId, start: Minutes, end: Minutes) -> Result<(), BoardError> {
        let mut train = self.state.train(id)?.clone();
        train.start = snap(start, self.config.snap_minutes);
        train.end = snap(end, self.config.snap_minutes);
        self.validate(&train)?;

        let before = self.state.snapshot();
        let description = format!(
            "Changed train {} to {}-{}",
            train.label(),
            format_hhmm(train.start),
            format_hhmm(train.end)
        );
        self.state.trains.insert(id, train);
        self.record(ActionKind::ResizeTrain, description, before);
        Ok(())
    }

    /// Selection is frozen while a swap is being picked.
    pub fn select(&mut self, id: TrainId) -> Result<bool, BoardError> {
        self.state.train(id)?;
        if self.state.swap != SwapMode::Inactive {
            debug!("Ignoring selection of {} during swap", id);
            return Ok(false);
        }
        self.state.selection = Some(id);
        Ok(true)
    }

    pub fn clear_selection(&mut self) -> bool {
        if self.state.swap != SwapMode::Inactive || self.state.selection.is_none() {
            return false;
        }
        self.state.selection = None;
        true
    }

    pub fn begin_swap(&mut self, source: TrainId) -> Result<(), BoardError> {
        self.state.train(source)?;
        self.state.swap = SwapMode::Active { source };
        self.state.selection = Some(source);
        self.notifier
            .notify(Notice::Info, "Pick another train to swap places with");
        Ok(())
    }

    pub fn cancel_swap(&mut self) -> bool {
        if self.state.swap == SwapMode::Inactive {
            return false;
        }
        self.state.swap = SwapMode::Inactive;
        self.notifier.notify(Notice::Info, "Swap cancelled");
        true
    }

    /// Second pick of a swap: the two trains exchange times and tracks.
    /// Picking the source again ends swap mode without a change.
    pub fn pick_swap(&mut self, target: TrainId) -> Result<bool, BoardError> {
        let source = match self.state.swap {
            SwapMode::Active { source } => source,
            SwapMode::Inactive => return Err(BoardError::SwapNotActive),
        };
        if source == target {
            self.cancel_swap();
            return Ok(false);
        }
        if !self.state.trains.contains_key(&target) {
            self.state.swap = SwapMode::Inactive;
            return Err(BoardError::UnknownTrain(target));
        }

        let before = self.state.snapshot();
        let a = self.state.train(source)?.clone();
        let b = self.state.train(target)?.clone();
        for (id, from) in [(source, &b), (target, &a)] {
            let train = self.state.train_mut(id)?;
            train.start = from.start;
            train.end = from.end;
            train.track = from.track;
        }
        self.state.swap = SwapMode::Inactive;
        self.state.selection = None;

        let description = format!("Swapped {} and {}", a.label(), b.label());
        self.record(ActionKind::SwapTrains, description, before);
        Ok(true)
    }

    /// Cuts a service in two at its midpoint. The original keeps the first
    /// half and its arrival number, a new train takes the second half and
    /// the departure number.
    pub fn split_train(&mut self, id: TrainId) -> Result<TrainId, BoardError> {
        let original = self.state.train(id)?.clone();
        let span = original.span();
        if span < self.config.min_split_minutes {
            return Err(BoardError::TooShortToSplit {
                id,
                span,
                min: self.config.min_split_minutes,
            });
        }

        let split_at = original.start + span / 2;
        let origin = SplitOrigin {
            arrival_number: original.arrival_number.clone(),
            departure_number: original.departure_number.clone(),
        };

        let before = self.state.snapshot();
        let new_id = self.state.allocate_train_id();
        let arrival_part = Train {
            end: split_at,
            departure_number: String::new(),
            split_from: Some(origin.clone()),
            ..original.clone()
        };
        let departure_part = Train {
            id: new_id,
            start: split_at,
            arrival_number: String::new(),
            split_from: Some(origin),
            ..original.clone()
        };
        self.state.trains.insert(id, arrival_part);
        self.state.trains.insert(new_id, departure_part);

        self.record(
            ActionKind::SplitTrain,
            format!("Split train {}", original.label()),
            before,
        );
        Ok(new_id)
    }

    /// Clamps the requested window to the day and the configured bounds.
    pub fn set_view(&mut self, start_hour: u32, view_hours: u32) -> bool {
        let max_hours = self.config.max_view_hours.min(24).max(1);
        let min_hours = self.config.min_view_hours.clamp(1, max_hours);
        let view_hours = view_hours.clamp(min_hours, max_hours);
        let start_hour = start_hour.min(24 - view_hours);
        let viewport = Viewport {
            start_hour,
            view_hours,
        };
        if viewport == self.state.viewport {
            return false;
        }

        let before = self.state.snapshot();
        self.state.viewport = viewport;
        self.record(
            ActionKind::ViewChange,
            format!("View {:02}:00, {} h", start_hour, view_hours),
            before,
        );
        true
    }

    /// Replaces the whole schedule. Every train must be valid against the
    /// imported tracks.
    pub fn import_schedule(&mut self, file: ScheduleFile) -> Result<(), BoardError> {
        let imported = ScheduleState::from_file(file);
        for train in imported.trains.values() {
            validate_train(train, &imported.tracks, self.config.min_service_minutes)?;
        }

        let before = self.state.snapshot();
        let description = format!(
            "Imported {} trains on {} tracks",
            imported.trains.len(),
            imported.tracks.len()
        );
        let mut snapshot = imported.snapshot();
        snapshot.next_train_id = snapshot.next_train_id.max(self.state.next_train_id);
        self.state.restore(snapshot);
        self.record(ActionKind::ImportData, description, before);
        Ok(())
    }

    /// Removes every train, keeping tracks and view.
    pub fn clear_all(&mut self) -> bool {
        if self.state.trains.is_empty() {
            return false;
        }
        let before = self.state.snapshot();
        let count = self.state.trains.len();
        self.state.trains.clear();
        self.state.selection = None;
        self.state.swap = SwapMode::Inactive;
        self.record(ActionKind::ClearAll, format!("Removed all {} trains", count), before);
        true
    }

    fn batch_blocks(&mut self, what: &str) -> bool {
        if self.history.in_batch() {
            self.notifier.notify(
                Notice::Warning,
                &format!("Finish or cancel the open batch before {}", what),
            );
            true
        } else {
            false
        }
    }

    pub fn undo(&mut self) -> bool {
        if self.batch_blocks("undoing") {
            return false;
        }
        if self.history.undo(&mut self.state) {
            let description = self.history.status().redo_description.unwrap_or_default();
            self.notifier
                .notify(Notice::Success, &format!("Undid: {}", description));
            true
        } else {
            self.notifier.notify(Notice::Info, "Nothing to undo");
            false
        }
    }

    pub fn redo(&mut self) -> bool {
        if self.batch_blocks("redoing") {
            return false;
        }
        if self.history.redo(&mut self.state) {
            let description = self.history.status().undo_description.unwrap_or_default();
            self.notifier
                .notify(Notice::Success, &format!("Redid: {}", description));
            true
        } else {
            self.notifier.notify(Notice::Info, "Nothing to redo");
            false
        }
    }

    /// Jumps to an entry of the history panel, numbered as in
    /// `HistoryEngine::summary`.
    pub fn revert_to(&mut self, index: usize) -> bool {
        if self.batch_blocks("reverting") {
            return false;
        }
        if self.history.revert_to(index, &mut self.state) {
            let description = self.history.status().undo_description.unwrap_or_default();
            self.notifier
                .notify(Notice::Success, &format!("Reverted to: {}", description));
            true
        } else {
            self.notifier
                .notify(Notice::Error, &format!("No history entry {}", index));
            false
        }
    }
}
