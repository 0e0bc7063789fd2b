//! Shared application state for the Axum API server.

use std::sync::Arc;

use enrollwatch_engine::EnrollmentProcessor;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<EnrollmentProcessor>,
}

impl AppState {
    pub fn new(processor: EnrollmentProcessor) -> Self {
        Self {
            processor: Arc::new(processor),
        }
    }
}
