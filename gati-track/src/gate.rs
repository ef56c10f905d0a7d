//! Speed hysteresis gate for periodic samples.
//!
//! Only the periodic (`Normal`) trigger is gated. While moving every sample
//! is sent; when the vehicle stops, one falling-edge sample and one
//! confirmation sample are sent, then samples are dropped until it moves
//! again.
//!
//! ```text
//!   speed ≥ min ───────────────▶ accept, clear pending_stop
//!   falling edge (prev > min) ─▶ accept, clear pending_stop
//!   !pending_stop ─────────────▶ accept once, set pending_stop
//!   otherwise ─────────────────▶ reject
//! ```

/// Gate decision for one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject,
}

impl GateDecision {
    pub fn is_accept(self) -> bool {
        self == GateDecision::Accept
    }
}

/// Speed history carried across evaluations for the life of the worker
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedHistory {
    pub current_speed: f64,
    pub previous_speed: f64,
    pub previous_alive_suppressed: bool,
    pub pending_stop: bool,
}

/// Hysteresis gate over a configured minimum speed
#[derive(Debug, Clone)]
pub struct SamplingGate {
    threshold: f64,
    history: SpeedHistory,
}

impl SamplingGate {
    pub fn new(min_speed: i32) -> Self {
        Self {
            threshold: f64::from(min_speed),
            history: SpeedHistory::default(),
        }
    }

    pub fn history(&self) -> &SpeedHistory {
        &self.history
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluate one periodic sample and roll the history forward
    pub fn evaluate(
        &mut self,
        current_speed: f64,
        previous_alive_suppressed: bool,
    ) -> GateDecision {
        let threshold = self.threshold;
        let history = &mut self.history;
        history.current_speed = current_speed;
        history.previous_alive_suppressed = previous_alive_suppressed;

        let decision = if current_speed >= threshold {
            history.pending_stop = false;
            GateDecision::Accept
        } else if !previous_alive_suppressed
            && current_speed <= threshold
            && history.previous_speed > threshold
        {
            history.pending_stop = false;
            GateDecision::Accept
        } else if !history.pending_stop {
            history.pending_stop = true;
            GateDecision::Accept
        } else {
            GateDecision::Reject
        };

        history.previous_speed = current_speed;
        log::trace!(
            "Gate: speed={} min={} pending_stop={} -> {:?}",
            current_speed,
            threshold,
            history.pending_stop,
            decision
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(gate: &mut SamplingGate, speeds: &[f64]) -> Vec<GateDecision> {
        speeds.iter().map(|&s| gate.evaluate(s, false)).collect()
    }

    #[test]
    fn test_stop_sequence() {
        use GateDecision::*;
        let mut gate = SamplingGate::new(5);
        let decisions = run(&mut gate, &[10.0, 10.0, 2.0, 2.0, 2.0]);
        assert_eq!(decisions, vec![Accept, Accept, Accept, Accept, Reject]);
        assert!(gate.history().pending_stop);
        assert_eq!(gate.history().previous_speed, 2.0);
    }

    #[test]
    fn test_stationary_start_sends_one_sample() {
        use GateDecision::*;
        let mut gate = SamplingGate::new(5);
        let decisions = run(&mut gate, &[0.0, 0.0, 0.0]);
        assert_eq!(decisions, vec![Accept, Reject, Reject]);
    }

    #[test]
    fn test_moving_again_rearms_the_gate() {
        use GateDecision::*;
        let mut gate = SamplingGate::new(5);
        run(&mut gate, &[0.0, 0.0]);
        let decisions = run(&mut gate, &[8.0, 1.0, 1.0, 1.0]);
        assert_eq!(decisions, vec![Accept, Accept, Accept, Reject]);
    }

    #[test]
    fn test_speed_at_threshold_is_moving() {
        let mut gate = SamplingGate::new(5);
        for _ in 0..4 {
            assert!(gate.evaluate(5.0, false).is_accept());
        }
        assert!(!gate.history().pending_stop);
    }

    #[test]
    fn test_suppressed_alive_skips_falling_edge() {
        use GateDecision::*;
        let mut gate = SamplingGate::new(5);
        gate.evaluate(10.0, false);
        // Falling edge ignored, pending-stop sample still goes out once
        assert_eq!(gate.evaluate(2.0, true), Accept);
        assert!(gate.history().pending_stop);
        assert_eq!(gate.evaluate(2.0, true), Reject);
    }

    #[test]
    fn test_zero_threshold_accepts_everything() {
        let mut gate = SamplingGate::new(0);
        assert!(run(&mut gate, &[0.0, 0.0, 3.0, 0.0]).iter().all(|d| d.is_accept()));
    }
}
