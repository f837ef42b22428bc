//! Media producer pipelines and track pumps

pub mod pipeline;
pub mod pump;

pub use pump::TrackPump;
