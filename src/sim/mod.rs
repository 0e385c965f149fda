//! Deterministic ball drop simulation
//!
//! This module must stay pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only (`Pcg32`, one stream per drop)
//! - No rendering or platform dependencies
//!
//! Given the same config, target bucket and seed, two runs produce
//! bit-identical keyframe sequences.

pub mod collision;
pub mod drop;
pub mod state;

pub use collision::{Contact, ball_peg_contact, reflect, resolve_peg_bounce};
pub use drop::simulate_ball_drop;
pub use state::{MissReason, QualityThreshold, SimStats, SimulationConfig, SimulationResult};
