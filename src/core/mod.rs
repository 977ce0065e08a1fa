pub mod aggregator;
pub mod coordinates;
pub mod engine;
pub mod export;
pub mod report;
pub mod session;

pub use crate::domain::model::{AggregateResult, Point, SourceOutcome, SourceSpec};
pub use crate::domain::ports::{SourceCall, Storage};
pub use crate::utils::error::Result;
