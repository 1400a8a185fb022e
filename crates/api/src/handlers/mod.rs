//! Request handlers, grouped by resource.

pub mod artifacts;
pub mod demo;
pub mod detections;
pub mod downloads;
pub mod progress;
pub mod queue;
pub mod upload;
