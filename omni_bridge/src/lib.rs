//! Haptic bridge internals.
//!
//! The bridge couples a high-rate device sampler to the shared-memory
//! channel through a soft real-time control loop:
//!
//! - [`state`] holds the live device state shared between sampler and loop.
//! - [`velocity`] smooths position samples into velocity.
//! - [`force`] turns consumer feedback into a safe commanded force.
//! - [`driver`] abstracts the raw-sample source and force sink.
//! - [`sampler`] schedules the driver at its fixed device rate.
//! - [`cycle`] runs the publish/fetch/force loop at the configured rate.

pub mod cycle;
pub mod driver;
pub mod force;
pub mod sampler;
pub mod shutdown;
pub mod state;
pub mod velocity;
