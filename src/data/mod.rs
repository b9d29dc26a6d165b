pub mod duration;
pub mod health;
pub mod observation;
pub mod target;

pub use health::{HealthState, ParseHealthError};
pub use observation::{Observation, ObservationSummary};
pub use target::TargetId;
