//! Enrollment event pipeline: classify, enrich, render, dispatch.

pub mod classifier;
pub mod enrichment;
pub mod processor;
pub mod render;

pub use processor::{BatchSummary, EnrollmentProcessor, ProcessOutcome};
