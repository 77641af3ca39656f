//! Host resource sampling and data structures.
//!
//! This module provides the samplers for memory, CPU, disk and network
//! counters, the host-backed sources they read from, and the snapshot types
//! a monitoring cycle produces.

pub mod collector;
pub mod data;
pub mod samplers;
pub mod traits;

// Re-export commonly used items
pub use data::{Domain, DomainReading, Snapshot};
pub use samplers::{SampleOutcome, SamplerRegistry};
pub use traits::Sampler;
