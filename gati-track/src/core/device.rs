//! Shared device state read and written by the tracking worker.
//!
//! Scalar fields are atomics so the worker and the rest of the firmware can
//! read them without locking; the code value is the only text field and sits
//! behind a short-lived mutex.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Atomic f64 wrapper using AtomicU64
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(val: f64) -> Self {
        Self(AtomicU64::new(val.to_bits()))
    }

    fn load(&self, order: Ordering) -> f64 {
        f64::from_bits(self.0.load(order))
    }

    fn store(&self, val: f64, order: Ordering) {
        self.0.store(val.to_bits(), order);
    }
}

/// Which speed reading drives the sampling gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedSource {
    /// Speed from the positioning fix
    Primary,
    /// Alternate diagnostic source
    Alternate,
}

impl SpeedSource {
    pub fn from_debug_flag(speed_debug: bool) -> Self {
        if speed_debug {
            SpeedSource::Alternate
        } else {
            SpeedSource::Primary
        }
    }
}

/// Device-wide state shared with the tracking worker
///
/// # Fields
///
/// - `identity`: device IMEI, fixed at construction
/// - `code`: last code/event value, reported with `COD<..>` suffixes
/// - `delivery_enabled`: CSD/delivery channel enable flag
/// - `close_requested`: worker should close and notify the supervisor
/// - `shutdown_requested`: permanent close, checked before each session
/// - `tracking_active`: a session is open
/// - `speed` / `alternate_speed`: the two speed sources
/// - `speed_for_tracking`: speed used by the last sampling decision
/// - `previous_alive`: the previous alive report was suppressed
/// - `liveness`: worker loop iteration counter
pub struct DeviceState {
    identity: String,
    code: Mutex<String>,
    delivery_enabled: AtomicBool,
    close_requested: AtomicBool,
    shutdown_requested: AtomicBool,
    tracking_active: AtomicBool,
    speed: AtomicF64,
    alternate_speed: AtomicF64,
    speed_for_tracking: AtomicF64,
    previous_alive: AtomicBool,
    liveness: AtomicU64,
}

impl DeviceState {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            code: Mutex::new(String::new()),
            delivery_enabled: AtomicBool::new(false),
            close_requested: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            tracking_active: AtomicBool::new(false),
            speed: AtomicF64::new(0.0),
            alternate_speed: AtomicF64::new(0.0),
            speed_for_tracking: AtomicF64::new(0.0),
            previous_alive: AtomicBool::new(false),
            liveness: AtomicU64::new(0),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    // === Code value ===

    pub fn code(&self) -> String {
        self.code.lock().clone()
    }

    pub fn set_code(&self, code: impl Into<String>) {
        *self.code.lock() = code.into();
    }

    // === Flags ===

    pub fn delivery_enabled(&self) -> bool {
        self.delivery_enabled.load(Ordering::Acquire)
    }

    pub fn set_delivery_enabled(&self, enabled: bool) {
        self.delivery_enabled.store(enabled, Ordering::Release);
    }

    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    pub fn set_close_requested(&self, requested: bool) {
        self.close_requested.store(requested, Ordering::Release);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    pub fn tracking_active(&self) -> bool {
        self.tracking_active.load(Ordering::Relaxed)
    }

    pub fn set_tracking_active(&self, active: bool) {
        self.tracking_active.store(active, Ordering::Relaxed);
    }

    pub fn previous_alive_suppressed(&self) -> bool {
        self.previous_alive.load(Ordering::Relaxed)
    }

    pub fn set_previous_alive_suppressed(&self, suppressed: bool) {
        self.previous_alive.store(suppressed, Ordering::Relaxed);
    }

    // === Speed ===

    /// Current speed from the selected source
    pub fn speed(&self, source: SpeedSource) -> f64 {
        match source {
            SpeedSource::Primary => self.speed.load(Ordering::Relaxed),
            SpeedSource::Alternate => self.alternate_speed.load(Ordering::Relaxed),
        }
    }

    pub fn set_speed(&self, speed: f64) {
        self.speed.store(speed, Ordering::Relaxed);
    }

    pub fn set_alternate_speed(&self, speed: f64) {
        self.alternate_speed.store(speed, Ordering::Relaxed);
    }

    pub fn speed_for_tracking(&self) -> f64 {
        self.speed_for_tracking.load(Ordering::Relaxed)
    }

    pub fn set_speed_for_tracking(&self, speed: f64) {
        self.speed_for_tracking.store(speed, Ordering::Relaxed);
    }

    // === Liveness ===

    /// Bump the worker liveness counter, returning the new value
    pub fn tick_liveness(&self) -> u64 {
        self.liveness.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn liveness(&self) -> u64 {
        self.liveness.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_quiet() {
        let state = DeviceState::new("354000000000001");
        assert_eq!(state.identity(), "354000000000001");
        assert!(!state.delivery_enabled());
        assert!(!state.close_requested());
        assert!(!state.shutdown_requested());
        assert!(!state.tracking_active());
        assert_eq!(state.code(), "");
        assert_eq!(state.liveness(), 0);
    }

    #[test]
    fn test_speed_sources_are_independent() {
        let state = DeviceState::new("imei");
        state.set_speed(42.5);
        state.set_alternate_speed(7.25);
        assert_eq!(state.speed(SpeedSource::Primary), 42.5);
        assert_eq!(state.speed(SpeedSource::Alternate), 7.25);
        assert_eq!(SpeedSource::from_debug_flag(true), SpeedSource::Alternate);
        assert_eq!(SpeedSource::from_debug_flag(false), SpeedSource::Primary);
    }

    #[test]
    fn test_liveness_counts_up() {
        let state = DeviceState::new("imei");
        assert_eq!(state.tick_liveness(), 1);
        assert_eq!(state.tick_liveness(), 2);
        assert_eq!(state.liveness(), 2);
    }

    #[test]
    fn test_code_value() {
        let state = DeviceState::new("imei");
        state.set_code("7F");
        assert_eq!(state.code(), "7F");
    }
}
