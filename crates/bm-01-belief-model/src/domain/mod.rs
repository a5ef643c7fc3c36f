//! # Domain Layer for the Belief Model
//!
//! Pure, synchronous logic with no I/O.
//!
//! ## Contents
//!
//! - **atom**: `BeliefAtom` and its creation options
//! - **belief_set**: `BeliefSet` with merge, conflict query and scoring
//! - **conflict**: structural conflict predicate and resolution strategies
//! - **uncertainty**: uncertainty models, aggregation and agreement
//! - **error**: error types

mod atom;
mod belief_set;
mod conflict;
mod error;
pub mod uncertainty;

pub use atom::*;
pub use belief_set::*;
pub use conflict::*;
pub use error::*;
pub use uncertainty::{
    aggregate, agree, AggregationMethod, UncertaintyModel, UNCERTAINTY_MODEL_KEY,
};
