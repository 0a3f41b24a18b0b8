//! Vertex AI REST client and payload types.

pub mod client;
pub mod models;
