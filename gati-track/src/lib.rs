//! GatiTrack - Tracking worker for vehicle telemetry devices
//!
//! Decides on each trigger whether a position/status report is produced,
//! frames it with an XOR checksum and stages it for an independent delivery
//! consumer.
//!
//! ## Components
//!
//! - [`frame`]: record framing and checksum
//! - [`snapshot`]: position payload resolution from the two fix stores
//! - [`gate`]: speed hysteresis for periodic samples
//! - [`handoff`]: staging register + ring buffer behind one lock
//! - [`worker`]: session control state machine driving all of the above

pub mod bearer;
pub mod config;
pub mod core;
pub mod error;
pub mod frame;
pub mod gate;
pub mod handoff;
pub mod snapshot;
pub mod worker;

// Re-export commonly used types
pub use config::AppConfig;
pub use crate::core::device::DeviceState;
pub use crate::core::token::TriggerToken;
pub use error::{Error, Result};
pub use handoff::HandoffQueue;
pub use worker::{TrackingContext, TrackingThread, TrackingWorker, WorkerExit};
