//! Ports (hexagonal architecture boundaries) for belief propagation.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
