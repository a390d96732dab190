//! User actions as plain data. Front ends translate their input events into
//! these and hand them to `Board::apply`; replay files are lists of them.

use crate::model::{hhmm, hhmm_opt, ColorMode, Minutes, ScheduleFile, TrackId, Train, TrainId};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NewTrain {
    #[serde(default)]
    pub arrival_number: String,
    #[serde(default)]
    pub departure_number: String,
    #[serde(with = "hhmm")]
    pub start: Minutes,
    #[serde(with = "hhmm")]
    pub end: Minutes,
    #[serde(default)]
    pub track: Option<TrackId>,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub color_mode: Option<ColorMode>,
}

impl NewTrain {
    pub fn into_train(self, id: TrainId) -> Train {
        Train {
            id,
            arrival_number: self.arrival_number,
            departure_number: self.departure_number,
            start: self.start,
            end: self.end,
            track: self.track,
            length: self.length,
            origin: self.origin,
            destination: self.destination,
            color_mode: self.color_mode,
            split_from: None,
        }
    }
}

/// Field edits; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainChanges {
    pub arrival_number: Option<String>,
    pub departure_number: Option<String>,
    #[serde(with = "hhmm_opt")]
    pub start: Option<Minutes>,
    #[serde(with = "hhmm_opt")]
    pub end: Option<Minutes>,
    pub track: Option<TrackId>,
    /// Takes the train off its track. Wins over `track`.
    pub unassign_track: bool,
    pub length: Option<f64>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub color_mode: Option<ColorMode>,
}

impl TrainChanges {
    pub fn apply_to(&self, train: &mut Train) {
        if let Some(v) = &self.arrival_number {
            train.arrival_number = v.clone();
        }
        if let Some(v) = &self.departure_number {
            train.departure_number = v.clone();
        }
        if let Some(v) = self.start {
            train.start = v;
        }
        if let Some(v) = self.end {
            train.end = v;
        }
        if self.unassign_track {
            train.track = None;
        } else if let Some(v) = self.track {
            train.track = Some(v);
        }
        if let Some(v) = self.length {
            train.length = v;
        }
        if let Some(v) = &self.origin {
            train.origin = v.clone();
        }
        if let Some(v) = &self.destination {
            train.destination = v.clone();
        }
        if let Some(v) = self.color_mode {
            train.color_mode = Some(v);
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    AddTrain {
        train: NewTrain,
    },
    EditTrain {
        id: TrainId,
        changes: TrainChanges,
    },
    DeleteTrain {
        id: TrainId,
    },
    MoveTrain {
        id: TrainId,
        #[serde(with = "hhmm")]
        start: Minutes,
        #[serde(default)]
        track: Option<TrackId>,
    },
    ResizeTrain {
        id: TrainId,
        #[serde(with = "hhmm")]
        start: Minutes,
        #[serde(with = "hhmm")]
        end: Minutes,
    },
    Select {
        id: TrainId,
    },
    ClearSelection,
    BeginSwap {
        id: TrainId,
    },
    PickSwap {
        id: TrainId,
    },
    CancelSwap,
    SplitTrain {
        id: TrainId,
    },
    SetView {
        start_hour: u32,
        view_hours: u32,
    },
    ImportSchedule {
        schedule: ScheduleFile,
    },
    ClearAll,
    Undo,
    Redo,
    RevertTo {
        index: usize,
    },
    BeginBatch {
        description: String,
    },
    EndBatch,
    CancelBatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_file_format() {
        let json = r#"[
            {"command": "add_train", "train": {"arrival_number": "101", "start": "10:00", "end": "10:30", "track": 1}},
            {"command": "move_train", "id": 4, "start": "11:15"},
            {"command": "edit_train", "id": 4, "changes": {"end": "12:00", "origin": "Alingsås"}},
            {"command": "set_view", "start_hour": 6, "view_hours": 4},
            {"command": "undo"}
        ]"#;
        let commands: Vec<Command> = serde_json::from_str(json).unwrap();
        assert_eq!(commands.len(), 5);
        assert_eq!(
            commands[1],
            Command::MoveTrain {
                id: 4,
                start: 675,
                track: None
            }
        );
        match &commands[2] {
            Command::EditTrain { changes, .. } => {
                assert_eq!(changes.end, Some(720));
                assert_eq!(changes.start, None);
                assert_eq!(changes.origin.as_deref(), Some("Alingsås"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(commands[4], Command::Undo);
    }

    #[test]
    fn changes_leave_other_fields() {
        let mut train = NewTrain {
            arrival_number: "1".to_string(),
            departure_number: "2".to_string(),
            start: 60,
            end: 90,
            track: Some(3),
            length: 80.0,
            origin: String::new(),
            destination: String::new(),
            color_mode: None,
        }
        .into_train(5);
        TrainChanges {
            departure_number: Some("22".to_string()),
            track: Some(4),
            ..Default::default()
        }
        .apply_to(&mut train);
        assert_eq!(train.departure_number, "22");
        assert_eq!(train.arrival_number, "1");
        assert_eq!(train.track, Some(4));
        assert_eq!(train.end, 90);
    }

    #[test]
    fn changes_can_unassign_track() {
        let mut train = crate::model::tests::train(1, Some(3), 60, 90);
        let changes: TrainChanges =
            serde_json::from_str(r#"{"unassign_track": true, "track": 4}"#).unwrap();
        changes.apply_to(&mut train);
        assert_eq!(train.track, None);

        let changes: TrainChanges = serde_json::from_str(r#"{"track": 4}"#).unwrap();
        assert!(!changes.unassign_track);
        changes.apply_to(&mut train);
        assert_eq!(train.track, Some(4));
    }
}
