//! CLI command implementations.

pub mod check;
pub mod materialize;
pub mod servers;
