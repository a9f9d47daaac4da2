//! ComfyUI node catalog client.
//!
//! Loads the node-type catalog (`object_info`) the extraction pipeline needs
//! before it can run, either over HTTP or from a local snapshot.

pub mod api;
pub mod source;
