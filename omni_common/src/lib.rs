//! Omni Bridge Common Library
//!
//! Shared definitions for the haptic shared-memory bridge workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Channel key, loop rate and sampler rate defaults
//! - [`regions`] - Byte-exact wire layout of the shared segment
//! - [`config`] - Bridge process configuration loading and validation
//!
//! The wire structs in [`regions`] are the single source of truth for the
//! segment layout. Every external consumer (Python, MATLAB) carries a
//! mirror of these struct shapes; there is no live schema negotiation, so
//! any layout change here is a breaking protocol change.

pub mod config;
pub mod consts;
pub mod regions;
