//! Benthos API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! pipeline, background queue) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod router;
pub mod routes;
pub mod state;
