// Infrastructure layer - Technical implementations of domain contracts

pub mod logging;
pub mod memory;
pub mod persistence;
