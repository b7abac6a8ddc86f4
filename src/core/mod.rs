//! Core monitor logic

pub mod clock;
pub mod component_scorer;
pub mod config;
pub mod error;
pub mod events;
pub mod optimizer;
pub mod patterns;
