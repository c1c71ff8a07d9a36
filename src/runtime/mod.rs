//! Runtime adapters and the API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{
    http_status, ApiError, DraftView, Health, MakePickRequest, NoticeView, PickResponse,
    StartDraftRequest, TurnSlot,
};
pub use tokio_spawner::TokioSpawner;
