pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{http::HttpSource, storage::LocalStorage};
pub use config::registry::RegistryConfig;
pub use core::{
    aggregator::MultiSourceAggregator, coordinates::CoordinateResolver, engine::ReportEngine,
    session::ReportSession,
};
pub use domain::model::{AggregateResult, Point, SourceOutcome, SourceSpec};
pub use utils::error::{Result, SiteGeoError};
