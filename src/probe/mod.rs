//! Probing targets
//!
//! A probe turns a configured target into an [`Observation`]. It never
//! fails: transport problems are recorded in `Observation::error`.

pub mod http;

pub use http::HttpProber;

use async_trait::async_trait;

use crate::config::TargetConfig;
use crate::data::Observation;

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &TargetConfig) -> Observation;
}
