//! Trigger tokens delivered to the tracking worker's control inbox.
//!
//! Senders put plain strings into the inbox; [`TriggerToken::classify`] maps
//! them (case-insensitively) onto the closed set the worker understands.

use std::fmt;
use std::str::FromStr;

/// Token sent to the supervisor inbox when the worker closes for good
pub const CLOSE_TOKEN: &str = "close-tracking";

/// Something happened that the tracking worker must react to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerToken {
    // Sampling triggers
    /// Periodic position report (the only gated trigger)
    Normal,
    Motion,
    KeyOn,
    KeyOff,
    AlarmIn1,
    AlarmIn2,
    LowBattery,
    SmsReceived,
    Alive,
    CodeEvent,
    UrcSim,

    // Control triggers
    /// Bearer timer owned elsewhere expired; detach the modem
    TimeoutExpired,
    /// Restart the session (bearer churn)
    RebootSession,
    /// Cooperative exit request
    ExitSession,
    /// External transmission cycle finished
    SendCompleted,

    /// Anything else; ignored
    Unrecognized,
}

/// Every recognized token with its wire string
const WIRE_NAMES: [(TriggerToken, &str); 15] = [
    (TriggerToken::Normal, "track-normal"),
    (TriggerToken::Motion, "track-motion"),
    (TriggerToken::KeyOn, "track-key-on"),
    (TriggerToken::KeyOff, "track-key-off"),
    (TriggerToken::AlarmIn1, "track-alarm-in1"),
    (TriggerToken::AlarmIn2, "track-alarm-in2"),
    (TriggerToken::LowBattery, "track-battery"),
    (TriggerToken::SmsReceived, "track-sms"),
    (TriggerToken::Alive, "track-alive"),
    (TriggerToken::CodeEvent, "track-code"),
    (TriggerToken::UrcSim, "track-urc-sim"),
    (TriggerToken::TimeoutExpired, "timeout-expired"),
    (TriggerToken::RebootSession, "reboot-track"),
    (TriggerToken::ExitSession, "exit-track"),
    (TriggerToken::SendCompleted, "send-completed"),
];

impl TriggerToken {
    /// Classify an inbox message. Comparison ignores ASCII case.
    pub fn classify(message: &str) -> Self {
        let message = message.trim();
        WIRE_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(message))
            .map(|(token, _)| *token)
            .unwrap_or(TriggerToken::Unrecognized)
    }

    /// Canonical wire string, `None` for [`TriggerToken::Unrecognized`]
    pub fn wire_name(self) -> Option<&'static str> {
        WIRE_NAMES
            .iter()
            .find(|(token, _)| *token == self)
            .map(|(_, name)| *name)
    }

    /// Whether this token runs the sampling pipeline
    pub fn is_sampling(self) -> bool {
        matches!(
            self,
            TriggerToken::Normal
                | TriggerToken::Motion
                | TriggerToken::KeyOn
                | TriggerToken::KeyOff
                | TriggerToken::AlarmIn1
                | TriggerToken::AlarmIn2
                | TriggerToken::LowBattery
                | TriggerToken::SmsReceived
                | TriggerToken::Alive
                | TriggerToken::CodeEvent
                | TriggerToken::UrcSim
        )
    }
}

impl fmt::Display for TriggerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name().unwrap_or("unrecognized"))
    }
}

impl FromStr for TriggerToken {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::classify(s))
    }
}
