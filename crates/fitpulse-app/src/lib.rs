// Application layer - services, scheduled sweeps and read-only projections
// built on top of the domain contracts.

pub mod application;
