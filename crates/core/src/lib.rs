//! Workflow extraction core.
//!
//! Recovers the node graph a ComfyUI-style tool embedded in an image, audio,
//! video or JSON file, normalizes both graph encodings into one canonical
//! shape, enriches nodes from the node-type catalog, and derives a flat
//! summary of generation parameters.

pub mod catalog;
pub mod container;
pub mod decode;
pub mod enrich;
pub mod error;
pub mod graph;
pub mod normalize;
pub mod parameters;
pub mod pipeline;
pub mod registry;
pub mod types;
