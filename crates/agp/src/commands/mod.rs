//! Command implementations

pub mod deploy;
