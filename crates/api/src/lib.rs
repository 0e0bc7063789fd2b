//! EnrollWatch HTTP surface.
//!
//! Endpoints:
//! - POST /api/events: run one pushed enrollment event through the pipeline
//! - GET  /health: per-channel connectivity

pub mod routes;
pub mod state;
