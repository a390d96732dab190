use crate::config::{BoardConfig, LayoutConfig};
use crate::model::{Minutes, ScheduleState, Track, TrackId, Train, TrainId};
use log::*;
use std::collections::HashMap;
use velcro::iter;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackLayout {
    pub track: TrackId,
    pub top: f64,
    pub height: f64,
    /// Stacked sub-rows, at least one.
    pub lanes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainPlacement {
    pub train: TrainId,
    pub lane: usize,
}

/// Largest number of trains occupying the track at the same minute. Times
/// are half-open, so a departure and an arrival at the same minute do not
/// overlap.
pub fn max_concurrent(trains: &[&Train]) -> usize {
    let mut events = trains
        .iter()
        .flat_map(|t| iter![(t.end, -1i32), (t.start, 1i32)])
        .collect::<Vec<(Minutes, i32)>>();
    // departures (-1) sort before arrivals at the same minute
    events.sort_unstable();

    let mut current = 0i32;
    let mut maximum = 0i32;
    for (_, delta) in events {
        current += delta;
        maximum = maximum.max(current);
    }
    maximum as usize
}

pub fn row_height(max_concurrent: usize, config: &LayoutConfig) -> f64 {
    let extra = max_concurrent.saturating_sub(2) as f64;
    (config.min_row_height + extra * config.row_height_step)
        .min(config.max_row_height)
        .max(config.min_row_height)
}

/// Assigns each train the lowest free sub-row, taking trains by start time
/// and then by id.
pub fn place_trains(trains: &[&Train]) -> Vec<TrainPlacement> {
    let mut sorted = trains.to_vec();
    sorted.sort_by_key(|t| (t.start, t.id));

    let mut lane_ends: Vec<Minutes> = Vec::new();
    let mut placements = Vec::with_capacity(sorted.len());
    for train in sorted {
        let lane = match lane_ends.iter().position(|end| *end <= train.start) {
            Some(lane) => {
                lane_ends[lane] = train.end;
                lane
            }
            None => {
                lane_ends.push(train.end);
                lane_ends.len() - 1
            }
        };
        placements.push(TrainPlacement {
            train: train.id,
            lane,
        });
    }
    placements
}

/// Groups the drawable trains by track. Unassigned trains are skipped
/// silently; trains on unknown tracks or with empty intervals are logged and
/// skipped. They stay in the schedule either way.
fn trains_by_track<'a>(
    tracks: &[Track],
    trains: impl IntoIterator<Item = &'a Train>,
) -> HashMap<TrackId, Vec<&'a Train>> {
    let mut by_track: HashMap<TrackId, Vec<&Train>> =
        tracks.iter().map(|t| (t.id, Vec::new())).collect();
    for train in trains {
        let track = match train.track {
            Some(track) => track,
            None => {
                trace!("Train {} has no track, not laid out", train.id);
                continue;
            }
        };
        if train.start >= train.end {
            warn!(
                "Train {} has empty interval {}..{}, not laid out",
                train.id, train.start, train.end
            );
            continue;
        }
        match by_track.get_mut(&track) {
            Some(list) => list.push(train),
            None => warn!("Train {} refers to unknown track {}, not laid out", train.id, track),
        }
    }
    by_track
}

/// Stacks the tracks vertically in the given order. Each row is tall enough
/// for the largest number of concurrent trains on it.
pub fn compute_layout<'a>(
    tracks: &[Track],
    trains: impl IntoIterator<Item = &'a Train>,
    config: &LayoutConfig,
) -> Vec<TrackLayout> {
    let by_track = trains_by_track(tracks, trains);

    let mut layouts = Vec::with_capacity(tracks.len());
    let mut top = 0.0;
    for track in tracks {
        let on_track = by_track.get(&track.id).map(|v| v.as_slice()).unwrap_or(&[]);
        let concurrent = max_concurrent(on_track);
        let height = row_height(concurrent, config);
        layouts.push(TrackLayout {
            track: track.id,
            top,
            height,
            lanes: concurrent.max(1),
        });
        top += height;
    }
    debug!("Laid out {} tracks, total height {}", layouts.len(), top);
    layouts
}

/// A train projected onto the board in pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedTrain {
    pub id: TrainId,
    pub arrival_number: String,
    pub departure_number: String,
    pub left: f64,
    pub width: f64,
    pub top: f64,
    pub height: f64,
}

impl PositionedTrain {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Pixel geometry for every laid-out train on the full day canvas, with
/// `left` measured from 00:00. Subtract `Viewport::scroll_left` to get
/// positions inside the visible window.
pub fn position_trains(
    state: &ScheduleState,
    layout: &[TrackLayout],
    config: &BoardConfig,
) -> Vec<PositionedTrain> {
    let by_track = trains_by_track(&state.tracks, state.trains.values());

    let mut positioned = Vec::new();
    for row in layout {
        let on_track = match by_track.get(&row.track) {
            Some(on_track) => on_track,
            None => continue,
        };
        let lane_height = row.height / row.lanes as f64;
        for placement in place_trains(on_track) {
            let train = &state.trains[&placement.train];
            positioned.push(PositionedTrain {
                id: train.id,
                arrival_number: train.arrival_number.clone(),
                departure_number: train.departure_number.clone(),
                left: train.start as f64 * config.pixels_per_minute,
                width: train.span() as f64 * config.pixels_per_minute,
                top: row.top + placement.lane as f64 * lane_height,
                height: lane_height,
            });
        }
    }
    positioned
}
