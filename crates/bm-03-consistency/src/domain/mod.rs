//! Domain Layer - Consistency management over belief-set populations
//!
//! - **tracker**: versions, sync times, convergence history
//! - **planner**: batch scheduling, pairwise sync, time-to-consistency estimation
//! - **alignment**: global state construction and enforcement levels
//! - **verification**: composite audit with recommendations
//!
//! Everything here is synchronous; batch timing lives in the service layer.

mod alignment;
mod planner;
mod tracker;
mod verification;

pub use alignment::*;
pub use planner::*;
pub use tracker::*;
pub use verification::*;
