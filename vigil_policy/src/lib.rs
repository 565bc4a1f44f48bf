//! The permission decision engine of the Vigil authorization system.
//!
//! External subsystems call exactly three queries before touching
//! persistent state: [`DecisionEngine::can_read`],
//! [`DecisionEngine::can_write`] and [`DecisionEngine::can_snoop`]. The
//! precedence chains behind them are internal; every answer is a plain
//! boolean and denial is never an error.
//!
//! Live simulation facts (protected locations, active snoops) come in
//! through the [`WorldProbe`] trait so the engine stays testable without
//! a running world.

pub mod engine;
pub mod snoop;
pub mod world;

pub use engine::DecisionEngine;
pub use world::{NullProbe, WorldProbe};
