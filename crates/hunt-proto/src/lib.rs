//! Shared types for the hunt daemon: the upstream catalog model, the quality
//! cutoff check, configuration and the persisted dedup state.

pub mod catalog;
pub mod config;
pub mod platform;
pub mod quality;
pub mod state;
