//! Structural analysis over the formula registry.
pub mod topology;
