//! Kepler orbits and anomaly solvers.

pub mod orbits;
