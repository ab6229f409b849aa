//! Simulation kernel: floor-field computations, conflict resolution, fire
//! propagation, and the pedestrian state machine. No I/O lives here; see
//! `crate::io` and `crate::config` for the surrounding plumbing.

pub mod cell;
pub mod conflict;
pub mod diagnostic;
pub mod dynamic_field;
pub mod environment;
pub mod error;
pub mod exit;
pub mod fire;
pub mod geometry;
pub mod grid;
pub mod pedestrian;
pub mod simulation;
pub mod static_field;

pub use error::{SimResult, SimulationError};
pub use simulation::Simulation;
