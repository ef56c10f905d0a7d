//! Core shared types.
//!
//! - [`token::TriggerToken`]: what the control inbox carries
//! - [`device::DeviceState`]: device-wide flags, speeds and counters

pub mod device;
pub mod token;
