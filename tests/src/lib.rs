//! # Belief-Mesh Test Suite
//!
//! Cross-crate scenarios that no single subsystem crate can exercise alone.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # criterion benchmarks (merge, convergence, planning)
//! └── src/integration/
//!     ├── merge_properties.rs    # idempotence, commutativity, score bounds
//!     ├── admission.rs           # ordering of inbound updates
//!     ├── convergence.rs         # three-agent scenario, monotonicity, partitions
//!     ├── planning.rs            # batching, early stop, bounded consistency
//!     ├── resolution.rs          # sampled probabilistic resolution
//!     └── runtime.rs             # actors end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p bm-tests
//! cargo test -p bm-tests integration::runtime::
//! cargo bench -p bm-tests
//! ```

#![allow(dead_code)]

pub mod integration;
