//! Shared layer: models used by every feature.

pub mod models;
