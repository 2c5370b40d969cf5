//! Application services layer.

pub mod commands;
pub mod derivation;
pub mod error;
pub mod reports;
pub mod source;
