use crate::error::BoardError;
use log::*;
use std::collections::BTreeMap;

pub type TrainId = u32;
pub type TrackId = u32;

/// Minutes since midnight.
pub type Minutes = u32;

pub const MINUTES_PER_DAY: Minutes = 24 * 60;

pub fn parse_hhmm(s: &str) -> Option<Minutes> {
    let (h, m) = s.trim().split_once(':')?;
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 24 || m > 59 || (h == 24 && m > 0) {
        return None;
    }
    Some(h * 60 + m)
}

pub fn format_hhmm(minutes: Minutes) -> String {
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

/// Serde adapter storing `Minutes` as "HH:MM" in schedule files.
pub mod hhmm {
    use super::{format_hhmm, parse_hhmm, Minutes};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(minutes: &Minutes, s: S) -> Result<S::Ok, S::Error> {
        // 24:00 is a valid end of day, don't wrap it to 00:00
        if *minutes == super::MINUTES_PER_DAY {
            s.serialize_str("24:00")
        } else {
            s.serialize_str(&format_hhmm(*minutes))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Minutes, D::Error> {
        let s = String::deserialize(d)?;
        parse_hhmm(&s).ok_or_else(|| D::Error::custom(format!("invalid time {:?}", s)))
    }
}

/// Like `hhmm`, for optional times.
pub mod hhmm_opt {
    use super::{parse_hhmm, Minutes};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(minutes: &Option<Minutes>, s: S) -> Result<S::Ok, S::Error> {
        match minutes {
            Some(m) => super::hhmm::serialize(m, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Minutes>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(s) => parse_hhmm(&s)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid time {:?}", s))),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    Length,
    Single,
}

/// Numbers of the service a train was split from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SplitOrigin {
    pub arrival_number: String,
    pub departure_number: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Train {
    pub id: TrainId,
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
    /// Meters.
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_mode: Option<ColorMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_from: Option<SplitOrigin>,
}

impl Train {
    pub fn span(&self) -> Minutes {
        self.end.saturating_sub(self.start)
    }

    /// Name shown to the user: arrival number, departure number, or the id.
    pub fn label(&self) -> String {
        if !self.arrival_number.is_empty() {
            self.arrival_number.clone()
        } else if !self.departure_number.is_empty() {
            self.departure_number.clone()
        } else {
            format!("#{}", self.id)
        }
    }

    pub fn overlaps(&self, other: &Train) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Meters.
    #[serde(default)]
    pub length: f64,
    /// Default vertical order, top to bottom.
    pub position: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub start_hour: u32,
    pub view_hours: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            start_hour: 9,
            view_hours: 3,
        }
    }
}

impl Viewport {
    pub fn start_minutes(&self) -> Minutes {
        self.start_hour * 60
    }

    /// Canvas offset of the view start, in pixels from 00:00.
    pub fn scroll_left(&self, pixels_per_minute: f64) -> f64 {
        self.start_minutes() as f64 * pixels_per_minute
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapMode {
    Inactive,
    Active { source: TrainId },
}

/// Owning copy of the undoable part of a `ScheduleState`. Selection and swap
/// mode are transient and never captured.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub tracks: Vec<Track>,
    pub trains: BTreeMap<TrainId, Train>,
    pub viewport: Viewport,
    pub next_train_id: TrainId,
}

/// On-disk schedule format.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleFile {
    pub tracks: Vec<Track>,
    pub trains: Vec<Train>,
    #[serde(default)]
    pub viewport: Viewport,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleState {
    pub tracks: Vec<Track>,
    pub trains: BTreeMap<TrainId, Train>,
    pub viewport: Viewport,
    pub selection: Option<TrainId>,
    pub swap: SwapMode,
    pub next_train_id: TrainId,
}

impl Default for ScheduleState {
    fn default() -> Self {
        ScheduleState::new(Vec::new(), Vec::new())
    }
}

impl ScheduleState {
    pub fn new(mut tracks: Vec<Track>, trains: Vec<Train>) -> ScheduleState {
        tracks.sort_by_key(|t| (t.position, t.id));
        for pair in tracks.windows(2) {
            if pair[0].position == pair[1].position {
                warn!(
                    "Tracks {} and {} share position {}, ordering by id",
                    pair[0].id, pair[1].id, pair[0].position
                );
            }
        }

        let mut map = BTreeMap::new();
        for train in trains {
            if let Some(old) = map.insert(train.id, train) {
                warn!("Duplicate train id {}, keeping the last one", old.id);
            }
        }

        let next_train_id = next_id(&map);
        ScheduleState {
            tracks,
            trains: map,
            viewport: Viewport::default(),
            selection: None,
            swap: SwapMode::Inactive,
            next_train_id,
        }
    }

    pub fn from_file(file: ScheduleFile) -> ScheduleState {
        let mut state = ScheduleState::new(file.tracks, file.trains);
        state.viewport = file.viewport;
        state
    }

    pub fn to_file(&self) -> ScheduleFile {
        ScheduleFile {
            tracks: self.tracks.clone(),
            trains: self.trains.values().cloned().collect(),
            viewport: self.viewport,
        }
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn train(&self, id: TrainId) -> Result<&Train, BoardError> {
        self.trains.get(&id).ok_or(BoardError::UnknownTrain(id))
    }

    pub fn train_mut(&mut self, id: TrainId) -> Result<&mut Train, BoardError> {
        self.trains.get_mut(&id).ok_or(BoardError::UnknownTrain(id))
    }

    pub fn allocate_train_id(&mut self) -> TrainId {
        let id = self.next_train_id;
        self.next_train_id += 1;
        id
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            tracks: self.tracks.clone(),
            trains: self.trains.clone(),
            viewport: self.viewport,
            next_train_id: self.next_train_id,
        }
    }

    /// Replaces the undoable part of the state. Selection and swap mode are
    /// reset since the trains they point at may no longer exist.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.tracks = snapshot.tracks;
        self.trains = snapshot.trains;
        self.viewport = snapshot.viewport;
        self.next_train_id = snapshot.next_train_id.max(next_id(&self.trains));
        self.selection = None;
        self.swap = SwapMode::Inactive;
    }
}

fn next_id(trains: &BTreeMap<TrainId, Train>) -> TrainId {
    trains.keys().next_back().map(|id| id + 1).unwrap_or(1)
}

pub fn validate_train(
    train: &Train,
    tracks: &[Track],
    min_service_minutes: Minutes,
) -> Result<(), BoardError> {
    if train.start >= train.end {
        return Err(BoardError::InvalidTimes {
            id: train.id,
            reason: "departure must be after arrival",
        });
    }
    if train.end > MINUTES_PER_DAY {
        return Err(BoardError::InvalidTimes {
            id: train.id,
            reason: "service must end within the day",
        });
    }
    if train.span() < min_service_minutes {
        return Err(BoardError::InvalidTimes {
            id: train.id,
            reason: "service is too short",
        });
    }
    if let Some(track) = train.track {
        if !tracks.iter().any(|t| t.id == track) {
            return Err(BoardError::UnknownTrack(track));
        }
    }
    Ok(())
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn track(id: TrackId, position: u32) -> Track {
        Track {
            id,
            name: format!("{}", id),
            length: 400.0,
            position,
        }
    }

    pub fn train(id: TrainId, track: Option<TrackId>, start: Minutes, end: Minutes) -> Train {
        Train {
            id,
            arrival_number: format!("{}", 100 + id),
            departure_number: format!("{}", 200 + id),
            start,
            end,
            track,
            length: 200.0,
            origin: String::new(),
            destination: String::new(),
            color_mode: None,
            split_from: None,
        }
    }

    pub fn sample_state() -> ScheduleState {
        ScheduleState::new(
            vec![track(2, 1), track(1, 0)],
            vec![
                train(1, Some(1), 9 * 60, 9 * 60 + 30),
                train(2, Some(2), 9 * 60 + 10, 10 * 60),
            ],
        )
    }

    #[test]
    fn hhmm_round_trip_edges() {
        assert_eq!(parse_hhmm("09:05"), Some(545));
        assert_eq!(parse_hhmm(" 0:00 "), Some(0));
        assert_eq!(parse_hhmm("24:00"), Some(MINUTES_PER_DAY));
        assert_eq!(parse_hhmm("24:01"), None);
        assert_eq!(parse_hhmm("12:60"), None);
        assert_eq!(parse_hhmm("noon"), None);
        assert_eq!(format_hhmm(545), "09:05");
        assert_eq!(format_hhmm(25 * 60 + 1), "01:01");
    }

    #[test]
    fn tracks_sorted_by_position_and_next_id() {
        let state = sample_state();
        assert_eq!(state.tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.next_train_id, 3);
        assert_eq!(ScheduleState::default().next_train_id, 1);
    }

    #[test]
    fn snapshot_does_not_alias_live_state() {
        let mut state = sample_state();
        let snapshot = state.snapshot();
        let copy = snapshot.clone();

        state.train_mut(1).unwrap().arrival_number.push_str("X");
        state.train_mut(2).unwrap().track = None;
        state.trains.remove(&1);
        state.tracks[0].name = "renamed".to_string();
        state.viewport.start_hour = 20;

        assert_eq!(snapshot, copy);
        assert_eq!(snapshot.trains[&1].arrival_number, "101");
        assert_eq!(snapshot.tracks[0].name, "1");
    }

    #[test]
    fn restore_resets_transient_state() {
        let mut state = sample_state();
        let snapshot = state.snapshot();
        state.selection = Some(2);
        state.swap = SwapMode::Active { source: 2 };
        state.trains.remove(&2);
        state.restore(snapshot);
        assert!(state.trains.contains_key(&2));
        assert_eq!(state.selection, None);
        assert_eq!(state.swap, SwapMode::Inactive);
    }

    #[test]
    fn validation() {
        let tracks = vec![track(1, 0)];
        assert!(validate_train(&train(1, Some(1), 60, 90), &tracks, 5).is_ok());
        assert!(validate_train(&train(1, None, 60, 90), &tracks, 5).is_ok());
        assert!(matches!(
            validate_train(&train(1, Some(1), 90, 60), &tracks, 5),
            Err(BoardError::InvalidTimes { .. })
        ));
        assert!(matches!(
            validate_train(&train(1, Some(1), 60, 63), &tracks, 5),
            Err(BoardError::InvalidTimes { .. })
        ));
        assert!(matches!(
            validate_train(&train(1, Some(7), 60, 90), &tracks, 5),
            Err(BoardError::UnknownTrack(7))
        ));
    }

    #[test]
    fn schedule_file_uses_hhmm() {
        let json = r#"{
            "tracks": [{"id": 1, "name": "1", "length": 450, "position": 0}],
            "trains": [{"id": 4, "arrival_number": "3201", "start": "09:15", "end": "24:00", "track": 1}]
        }"#;
        let file: ScheduleFile = serde_json::from_str(json).unwrap();
        let state = ScheduleState::from_file(file);
        assert_eq!(state.trains[&4].start, 555);
        assert_eq!(state.trains[&4].end, MINUTES_PER_DAY);
        assert_eq!(state.next_train_id, 5);

        let out = serde_json::to_string(&state.to_file()).unwrap();
        assert!(out.contains("\"09:15\""));
        assert!(out.contains("\"24:00\""));
    }
}
