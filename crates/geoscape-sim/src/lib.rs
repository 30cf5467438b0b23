//! Geoscape simulation: the time-advancement and event-scheduling engine.
//!
//! `GeoscapeEngine` owns the campaign, advances it in 5-second ticks with a
//! coarse-to-fine handler cascade, schedules alien missions monthly, and
//! pauses for popups and dogfights. Completely headless and deterministic
//! for a given seed.

pub mod campaign;
pub mod dogfight;
pub mod engine;
pub mod persistence;
pub mod popups;
pub mod rng;
pub mod scenario;
pub mod strategy;
pub mod systems;

pub use engine::GeoscapeEngine;

#[cfg(test)]
mod tests;
