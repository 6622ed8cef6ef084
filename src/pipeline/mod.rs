//! Batch processing pipeline

pub mod orchestrator;

pub use orchestrator::{
    cleanup_track, process_track, run_batch, spawn, BatchHandle, BatchSummary, Collaborators,
    PipelineEvent, TrackOutcome, TrackReport, TrackStage,
};
