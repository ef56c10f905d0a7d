//! Framed record encoding
//!
//! A framed record is `payload[,suffix]*CS` where `CS` is the two-digit,
//! upper-case hex XOR of every character before the `*`:
//!
//! ```text
//! $,354000000000001,<NO FIX>,ALR<MOTION>*0C
//! └──────── payload ───────┘ └─ suffix ─┘ └┘ checksum
//! ```

use crate::core::token::TriggerToken;
use std::fmt;

/// Alarm names carried in `ALR<..>` suffixes
pub const ALARM_MOTION: &str = "MOTION";
pub const ALARM_KEY_ON: &str = "KEY ON";
pub const ALARM_KEY_OFF: &str = "KEY OFF";
pub const ALARM_BATTERY: &str = "BATTERY";
pub const ALARM_INPUT_1: &str = "INPUT1";
pub const ALARM_INPUT_2: &str = "INPUT2";
pub const ALARM_ALIVE: &str = "ALIVE";
pub const ALARM_URC_SIM: &str = "URC SIM";

/// Separator between payload and suffix
const FIELD_SEPARATOR: char = ',';

/// 8-bit XOR checksum rendered as two upper-case hex digits
///
/// Folds the low byte of each character code left to right. A single
/// character yields its own code; the empty string yields `"00"`.
pub fn checksum(sentence: &str) -> String {
    let mut chars = sentence.chars();
    let Some(first) = chars.next() else {
        return "00".to_string();
    };
    let acc = chars.fold(char_code(first), |acc, c| acc ^ char_code(c));
    format!("{:02X}", acc)
}

#[inline]
fn char_code(c: char) -> u8 {
    (u32::from(c) & 0xFF) as u8
}

/// Suffix a sampling trigger contributes to the record, if any
///
/// `code` is only consulted for [`TriggerToken::CodeEvent`].
pub fn trigger_suffix(token: TriggerToken, code: impl FnOnce() -> String) -> Option<String> {
    let alarm = match token {
        TriggerToken::Motion => ALARM_MOTION,
        TriggerToken::KeyOn => ALARM_KEY_ON,
        TriggerToken::KeyOff => ALARM_KEY_OFF,
        TriggerToken::LowBattery => ALARM_BATTERY,
        TriggerToken::AlarmIn1 => ALARM_INPUT_1,
        TriggerToken::AlarmIn2 => ALARM_INPUT_2,
        TriggerToken::Alive => ALARM_ALIVE,
        TriggerToken::UrcSim => ALARM_URC_SIM,
        TriggerToken::CodeEvent => return Some(format!("COD<{}>", code())),
        _ => return None,
    };
    Some(format!("ALR<{}>", alarm))
}

/// Encoded, checksummed record. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: String,
    alarm_suffix: Option<String>,
    checksum: String,
}

impl Frame {
    /// Build a frame; the checksum covers payload, separator and suffix.
    pub fn encode(payload: impl Into<String>, alarm_suffix: Option<String>) -> Self {
        let payload = payload.into();
        let checksum = match &alarm_suffix {
            Some(suffix) => checksum(&format!("{}{}{}", payload, FIELD_SEPARATOR, suffix)),
            None => checksum(&payload),
        };
        Self {
            payload,
            alarm_suffix,
            checksum,
        }
    }

    /// Encode the record a sampling trigger produces for `payload`
    pub fn for_trigger(
        payload: impl Into<String>,
        token: TriggerToken,
        code: impl FnOnce() -> String,
    ) -> Self {
        Self::encode(payload, trigger_suffix(token, code))
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn alarm_suffix(&self) -> Option<&str> {
        self.alarm_suffix.as_deref()
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Wire text of the record
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.payload)?;
        if let Some(suffix) = &self.alarm_suffix {
            write!(f, "{}{}", FIELD_SEPARATOR, suffix)?;
        }
        write!(f, "*{}", self.checksum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_empty_is_zero() {
        assert_eq!(checksum(""), "00");
    }

    #[test]
    fn test_checksum_single_char_is_its_code() {
        assert_eq!(checksum("A"), "41");
        assert_eq!(checksum("\n"), "0A");
    }

    #[test]
    fn test_checksum_folds_left_to_right() {
        assert_eq!(checksum("AB"), "03");
        // Reference NMEA sentence
        assert_eq!(checksum("GPGLL,5057.970,N,00146.110,E,142451,A"), "27");
    }

    #[test]
    fn test_checksum_is_deterministic_and_upper_case() {
        let s = "$,354000000000001,<NO FIX>,ALR<MOTION>";
        assert_eq!(checksum(s), checksum(s));
        assert_eq!(checksum(s), "0C");
        assert!(checksum("zz~").chars().all(|c| !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_checksum_masks_wide_chars_to_eight_bits() {
        // U+0141 has low byte 0x41
        assert_eq!(checksum("\u{0141}"), "41");
        assert_eq!(checksum("\u{0141}B"), "03");
    }

    #[test]
    fn test_frame_without_suffix() {
        let frame = Frame::for_trigger("$,IMEI123,<NO FIX>", TriggerToken::Normal, String::new);
        assert_eq!(frame.alarm_suffix(), None);
        assert_eq!(frame.checksum(), "68");
        assert_eq!(frame.to_wire(), "$,IMEI123,<NO FIX>*68");
    }

    #[test]
    fn test_code_suffix_is_covered_by_checksum() {
        let frame = Frame::for_trigger("$,IMEI123,<NO FIX>", TriggerToken::CodeEvent, || {
            "7F".to_string()
        });
        assert_eq!(frame.alarm_suffix(), Some("COD<7F>"));
        assert_eq!(frame.checksum(), "7F");
        assert_eq!(frame.to_wire(), "$,IMEI123,<NO FIX>,COD<7F>*7F");
    }

    #[test]
    fn test_trigger_suffixes() {
        let suffix = |token| trigger_suffix(token, || "00".to_string());
        assert_eq!(suffix(TriggerToken::Motion).as_deref(), Some("ALR<MOTION>"));
        assert_eq!(suffix(TriggerToken::KeyOn).as_deref(), Some("ALR<KEY ON>"));
        assert_eq!(suffix(TriggerToken::KeyOff).as_deref(), Some("ALR<KEY OFF>"));
        assert_eq!(suffix(TriggerToken::LowBattery).as_deref(), Some("ALR<BATTERY>"));
        assert_eq!(suffix(TriggerToken::AlarmIn1).as_deref(), Some("ALR<INPUT1>"));
        assert_eq!(suffix(TriggerToken::AlarmIn2).as_deref(), Some("ALR<INPUT2>"));
        assert_eq!(suffix(TriggerToken::Alive).as_deref(), Some("ALR<ALIVE>"));
        assert_eq!(suffix(TriggerToken::UrcSim).as_deref(), Some("ALR<URC SIM>"));
        assert_eq!(suffix(TriggerToken::Normal), None);
        assert_eq!(suffix(TriggerToken::SmsReceived), None);
    }

    #[test]
    fn test_code_only_read_for_code_event() {
        let suffix = trigger_suffix(TriggerToken::Motion, || panic!("code read for motion"));
        assert_eq!(suffix.as_deref(), Some("ALR<MOTION>"));
    }
}
