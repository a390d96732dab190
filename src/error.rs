use crate::model::{TrackId, TrainId};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("no train with id {0}")]
    UnknownTrain(TrainId),

    #[error("no track with id {0}")]
    UnknownTrack(TrackId),

    #[error("train {id}: {reason}")]
    InvalidTimes { id: TrainId, reason: &'static str },

    #[error("train {id} runs {span} minutes, at least {min} are needed to split it")]
    TooShortToSplit { id: TrainId, span: u32, min: u32 },

    #[error("no swap in progress")]
    SwapNotActive,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
