//! Tracking worker: session control loop
//!
//! The worker owns the session state and the sampling gate exclusively. Its
//! only suspension point is the blocking receive on the control inbox; gate
//! evaluation, encoding and the handoff push all run to completion.
//!
//! # Session lifecycle
//!
//! ```text
//!            begin_session                 ExitSession (Active)
//!   Idle ─────────────────▶ Active ──────────────────────────▶ Suspending
//!    ▲                         │            SendCompleted       + force exit
//!    │                         └──────────────────────────────▶ Suspending
//!    │   inner loop ends (RebootSession, ExitSession,               │
//!    └── forced exit, inbox closed) ◀───────────────────────────────┘
//! ```
//!
//! Suspending is sticky: it is never cleared by a token, and a session that
//! ended while suspending resumes suspending after a restart. Every token
//! handled while suspending re-enables the delivery channel before normal
//! processing continues.
//!
//! # Per-token transitions (first match short-circuits)
//!
//! 1. `TimeoutExpired`: detach the modem, continue
//! 2. `RebootSession`: end the session
//! 3. `ExitSession`: Active → Suspending + force exit; otherwise end the session
//! 4. `SendCompleted`: Suspending
//! 5. Suspending: enable delivery; end the session if forcing exit
//! 6. Sampling tokens: resolve, encode, gate (`Normal` only), push
//! 7. Anything else is ignored

use crate::bearer::{self, BearerRegistry, SharedModem};
use crate::config::TrackingConfig;
use crate::core::device::{DeviceState, SpeedSource};
use crate::core::token::{CLOSE_TOKEN, TriggerToken};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::gate::SamplingGate;
use crate::handoff::{HandoffQueue, PushOutcome};
use crate::snapshot::{FixStore, PositionFormatter, SnapshotResolver};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
    Suspending,
}

/// What the inner loop does after a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    EndSession,
}

/// Why the worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Close was requested; the supervisor has been notified
    Closed,
    /// Permanent shutdown flag observed before a new session
    Shutdown,
    /// Every inbox sender was dropped and no close was requested
    InboxDisconnected,
}

/// External collaborators of the tracking worker
pub struct TrackingContext {
    pub device: Arc<DeviceState>,
    pub primary: Arc<dyn FixStore>,
    pub secondary: Arc<dyn FixStore>,
    pub formatter: Box<dyn PositionFormatter>,
    pub queue: Arc<HandoffQueue>,
    pub modem: SharedModem,
    pub bearer: Box<dyn BearerRegistry>,
    /// Control inbox (single consumer)
    pub inbox: Receiver<String>,
    /// Supervisor inbox, notified once on close
    pub supervisor: Sender<String>,
}

/// Tracking worker state machine
pub struct TrackingWorker {
    config: TrackingConfig,
    speed_source: SpeedSource,
    device: Arc<DeviceState>,
    resolver: SnapshotResolver,
    gate: SamplingGate,
    queue: Arc<HandoffQueue>,
    modem: SharedModem,
    bearer: Box<dyn BearerRegistry>,
    inbox: Receiver<String>,
    supervisor: Sender<String>,
    state: SessionState,
    force_exiting: bool,
    resume_suspended: bool,
}

impl TrackingWorker {
    pub fn new(config: TrackingConfig, ctx: TrackingContext) -> Self {
        let resolver = SnapshotResolver::new(
            &config,
            ctx.device.identity(),
            ctx.primary,
            ctx.secondary,
            ctx.formatter,
        );
        Self {
            speed_source: SpeedSource::from_debug_flag(config.speed_debug),
            gate: SamplingGate::new(config.min_speed),
            config,
            device: ctx.device,
            resolver,
            queue: ctx.queue,
            modem: ctx.modem,
            bearer: ctx.bearer,
            inbox: ctx.inbox,
            supervisor: ctx.supervisor,
            state: SessionState::Idle,
            force_exiting: false,
            resume_suspended: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_force_exiting(&self) -> bool {
        self.force_exiting
    }

    pub fn gate(&self) -> &SamplingGate {
        &self.gate
    }

    /// Run sessions until the worker closes
    pub fn run(&mut self) -> Result<WorkerExit> {
        log::info!("Tracking worker started");

        while !self.device.shutdown_requested() {
            self.begin_session();
            let disconnected = self.run_session();
            self.end_session();

            thread::sleep(self.config.settle_delay());

            if self.device.close_requested() {
                self.device.set_close_requested(false);
                if self.supervisor.send(CLOSE_TOKEN.to_string()).is_err() {
                    log::warn!("Supervisor inbox closed, close notification dropped");
                }
                log::info!("Tracking worker closed");
                return Ok(WorkerExit::Closed);
            }

            if disconnected {
                log::warn!("Control inbox disconnected, tracking worker exiting");
                return Ok(WorkerExit::InboxDisconnected);
            }

            log::info!("Tracking session restarting");
        }

        log::info!("Tracking worker shut down");
        Ok(WorkerExit::Shutdown)
    }

    /// Inner loop. Returns true if the inbox disconnected.
    fn run_session(&mut self) -> bool {
        loop {
            let message = match self.inbox.recv() {
                Ok(message) => message,
                Err(_) => return true,
            };
            let token = TriggerToken::classify(&message);
            if self.config.general_debug {
                log::info!("Tracking received: {} ({:?})", message, token);
            } else {
                log::debug!("Tracking received: {} ({:?})", message, token);
            }

            let step = self.handle(token);
            let ticks = self.device.tick_liveness();
            log::trace!("Tracking liveness {}", ticks);

            if step == Step::EndSession {
                return false;
            }
        }
    }

    fn begin_session(&mut self) {
        if let Err(e) = self.bearer.register() {
            log::warn!("Bearer listener registration failed: {}", e);
        }
        self.force_exiting = false;
        self.state = if self.resume_suspended {
            SessionState::Suspending
        } else {
            SessionState::Active
        };
        self.device.set_tracking_active(true);
        log::info!("Tracking session started ({:?})", self.state);
    }

    fn end_session(&mut self) {
        self.resume_suspended = self.state == SessionState::Suspending;
        self.state = SessionState::Idle;
        self.device.set_tracking_active(false);
        self.bearer.unregister();
        log::info!("Tracking session ended");
    }

    /// Apply one token to the session
    pub fn handle(&mut self, token: TriggerToken) -> Step {
        match token {
            TriggerToken::TimeoutExpired => {
                if let Err(e) = bearer::detach(&self.modem) {
                    log::error!("Modem detach failed: {}", e);
                } else {
                    log::info!("Bearer timeout, modem detached");
                }
                return Step::Continue;
            }
            TriggerToken::RebootSession => return Step::EndSession,
            TriggerToken::ExitSession => {
                if self.state == SessionState::Active {
                    self.state = SessionState::Suspending;
                    self.force_exiting = true;
                } else {
                    return Step::EndSession;
                }
            }
            TriggerToken::SendCompleted => {
                log::debug!("Transmission cycle finished");
                self.state = SessionState::Suspending;
            }
            _ => {}
        }

        if self.state == SessionState::Suspending {
            self.device.set_delivery_enabled(true);
            if self.force_exiting {
                return Step::EndSession;
            }
        }

        if token.is_sampling() {
            self.sample(token);
        }
        Step::Continue
    }

    /// Resolve, encode, gate and hand off one sample
    fn sample(&mut self, token: TriggerToken) {
        let Some(payload) = self.resolver.resolve() else {
            log::debug!("No position to report for {}, sample dropped", token);
            return;
        };

        let record = if self.resolver.is_framed() {
            let device = &self.device;
            Frame::for_trigger(payload, token, || device.code()).to_wire()
        } else {
            payload
        };

        if self.config.general_debug {
            log::info!("Trk {}", record);
        } else {
            log::debug!("Trk {}", record);
        }

        let speed = self.device.speed(self.speed_source);
        self.device.set_speed_for_tracking(speed);

        if token == TriggerToken::Normal {
            let alive_suppressed = self.device.previous_alive_suppressed();
            if !self.gate.evaluate(speed, alive_suppressed).is_accept() {
                log::debug!("Sample dropped by gate (speed {})", speed);
                return;
            }
        }

        match self.queue.push(record) {
            Ok(PushOutcome::Staged) => log::trace!("Record staged"),
            Ok(PushOutcome::Archived { slot }) => log::debug!("Record archived, slot {}", slot),
            Err(e) => log::error!("Record dropped: {}", e),
        }
    }
}

/// Tracking worker thread handle
pub struct TrackingThread {
    handle: JoinHandle<Result<WorkerExit>>,
}

impl TrackingThread {
    /// Spawn the worker on a dedicated thread
    pub fn spawn(mut worker: TrackingWorker) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("tracking".to_string())
            .spawn(move || worker.run())
            .map_err(|e| Error::Other(format!("Failed to spawn tracking thread: {}", e)))?;
        Ok(Self { handle })
    }

    /// Wait for the worker to stop
    pub fn join(self) -> Result<WorkerExit> {
        self.handle.join().map_err(|_| Error::ThreadPanic)?
    }
}
