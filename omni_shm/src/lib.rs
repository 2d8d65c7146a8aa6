//! System V shared-memory channel between the haptic bridge and external
//! consumers.
//!
//! The bridge side creates (or attaches to) a fixed-size segment addressed
//! by a numeric key and publishes the device state into it every control
//! cycle; consumers attach to the same key and exchange data through the
//! [`omni_common::regions`] wire structs. [`client`] adds the one-shot
//! command surface used by external tooling, [`discovery`] the on-disk
//! metadata that lets tools find live segments.

pub mod channel;
pub mod client;
pub mod discovery;
pub mod error;

pub use channel::ShmChannel;
pub use error::{ShmError, ShmResult};
