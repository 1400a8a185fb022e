//! Core domain logic for the benthos organism-detection service.
//!
//! Holds the pieces that do not depend on the HTTP layer: the detection and
//! batch data model, the annotation reader, the reconciliation engine, the
//! in-memory detection store, ffmpeg/ffprobe wrappers (video normalization
//! and probing), and the timeline chart renderer.

pub mod annotation;
pub mod detection;
pub mod error;
pub mod ffmpeg;
pub mod reconcile;
pub mod store;
pub mod timeline;

pub use error::{CoreError, CoreResult};
