//! Sentiment model operations on Vertex AI.
//!
//! Each command in [`commands`] is one step of the model lifecycle: train,
//! deploy, predict, shut down, and the pipeline that chains the first three.

pub mod commands;
