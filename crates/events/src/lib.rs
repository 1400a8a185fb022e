//! Progress eventing for the benthos service.
//!
//! One process-wide [`ProgressChannel`] carries coarse progress updates from
//! whatever job is currently running (upload pipeline or queue worker) to
//! the `/progress` long-poll stream.

pub mod progress;

pub use progress::{ProgressChannel, COMPLETE, NO_UPDATE};
