//! HTTP API layer: request parsing and response shaping only.

pub mod banner;
pub mod songs;
