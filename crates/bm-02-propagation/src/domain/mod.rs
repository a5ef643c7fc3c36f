//! Domain Layer - Pure propagation logic
//!
//! - **admission**: whether an incoming atom may enter a local set
//! - **convergence**: presence coverage and content agreement across sets
//! - **partition**: average-link clustering over belief-id similarity
//! - **delivery**: propagation modes, per-target outcomes and configuration
//!
//! RULES:
//! - No I/O operations
//! - No async code

mod admission;
mod convergence;
mod delivery;
mod partition;

pub use admission::*;
pub use convergence::*;
pub use delivery::*;
pub use partition::*;
