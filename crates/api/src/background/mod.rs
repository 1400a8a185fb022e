//! Background processing.
//!
//! One module: the FIFO video queue and its single drain worker, spawned
//! on demand via `tokio::spawn` and guarded against duplicate starts.

pub mod queue;
