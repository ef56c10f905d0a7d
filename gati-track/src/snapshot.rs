//! Position snapshot resolution
//!
//! Turns the two positioning feeds (primary = RMC, secondary = GGA) into the
//! payload of the next record. Missing or malformed data never aborts the
//! sample: it degrades to a placeholder, or to an explicit `<ERROR>` payload
//! when the formatter produced something unusable.

use crate::config::TrackingConfig;
use parking_lot::Mutex;
use std::sync::Arc;

/// Marker written in place of a position when no fix is available
pub const NO_FIX_MARKER: &str = "<NO FIX>";

/// Marker appended when the composed payload is unusable
pub const ERROR_MARKER: &str = "<ERROR>";

/// Literal that flags a malformed upstream payload
const NULL_LITERAL: &str = "null";

/// A positioning feed that remembers its last valid sentence
pub trait FixStore: Send + Sync {
    /// Last valid sentence, if any was ever stored
    fn last_valid(&self) -> Option<String>;
}

/// Composes the primary and secondary sentences into one payload
pub trait PositionFormatter: Send {
    fn compose(&self, header: &str, client_id: &str, primary: &str, secondary: &str)
    -> Option<String>;
}

/// In-memory fix store updated by the sentence decoder
#[derive(Debug, Default)]
pub struct MemoryFixStore {
    last: Mutex<Option<String>>,
}

impl MemoryFixStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new valid sentence
    pub fn store(&self, sentence: impl Into<String>) {
        *self.last.lock() = Some(sentence.into());
    }

    pub fn clear(&self) {
        *self.last.lock() = None;
    }
}

impl FixStore for MemoryFixStore {
    fn last_valid(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

/// Default formatter: `header,client_id,<rmc fields>,<gga fields>`
///
/// Each sentence loses its leading `$` and trailing `*CS`; an empty secondary
/// is omitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct UsrFormatter;

impl UsrFormatter {
    fn strip_sentence(sentence: &str) -> &str {
        let body = sentence.trim().trim_start_matches('$');
        match body.rfind('*') {
            Some(star) => &body[..star],
            None => body,
        }
    }
}

impl PositionFormatter for UsrFormatter {
    fn compose(
        &self,
        header: &str,
        client_id: &str,
        primary: &str,
        secondary: &str,
    ) -> Option<String> {
        let rmc = Self::strip_sentence(primary);
        if rmc.is_empty() {
            return None;
        }
        let gga = Self::strip_sentence(secondary);
        if gga.is_empty() {
            Some(format!("{},{},{}", header, client_id, rmc))
        } else {
            Some(format!("{},{},{},{}", header, client_id, rmc, gga))
        }
    }
}

/// Resolves the payload of the next record from the two fix stores
pub struct SnapshotResolver {
    primary: Arc<dyn FixStore>,
    secondary: Arc<dyn FixStore>,
    formatter: Box<dyn PositionFormatter>,
    framed: bool,
    header: String,
    client_id: String,
}

impl SnapshotResolver {
    /// Create a resolver
    ///
    /// `identity` is the device identity used when no client id is configured.
    pub fn new(
        config: &TrackingConfig,
        identity: &str,
        primary: Arc<dyn FixStore>,
        secondary: Arc<dyn FixStore>,
        formatter: Box<dyn PositionFormatter>,
    ) -> Self {
        Self {
            primary,
            secondary,
            formatter,
            framed: config.is_framed(),
            header: config.header.clone(),
            client_id: config.client_id_or(identity).to_string(),
        }
    }

    /// Whether payloads are destined for checksum framing
    pub fn is_framed(&self) -> bool {
        self.framed
    }

    /// Payload used when no fix is available
    pub fn placeholder(&self) -> String {
        format!("{},{},{}", self.header, self.client_id, NO_FIX_MARKER)
    }

    /// Payload used when the composed payload is unusable
    pub fn error_payload(&self) -> String {
        format!("{},{}", self.placeholder(), ERROR_MARKER)
    }

    /// Resolve the next payload
    ///
    /// Framed mode always yields a payload. Raw mode returns the primary
    /// store's content untouched, `None` when it is empty.
    pub fn resolve(&self) -> Option<String> {
        if !self.framed {
            return self.primary.last_valid().filter(|s| !s.is_empty());
        }

        let mut primary = self.primary.last_valid().unwrap_or_default();
        let secondary = self.secondary.last_valid().unwrap_or_default();

        // Identical feeds mean the primary is stale
        if primary == secondary {
            primary.clear();
        }

        let payload = if primary.is_empty() {
            Some(self.placeholder())
        } else {
            self.formatter
                .compose(&self.header, &self.client_id, &primary, &secondary)
        };

        match payload {
            Some(payload) if !payload.contains(NULL_LITERAL) => Some(payload),
            other => {
                log::warn!("Unusable position payload {:?}, substituting error marker", other);
                Some(self.error_payload())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    struct FixedFormatter(Option<&'static str>);

    impl PositionFormatter for FixedFormatter {
        fn compose(&self, _: &str, _: &str, _: &str, _: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn config(format: &str) -> TrackingConfig {
        TrackingConfig {
            format: format.to_string(),
            header: "$".to_string(),
            client_id: Some("IMEI123".to_string()),
            ..TrackingConfig::default()
        }
    }

    fn resolver_with(
        format: &str,
        primary: Option<&str>,
        secondary: Option<&str>,
        formatter: Box<dyn PositionFormatter>,
    ) -> SnapshotResolver {
        let rmc = Arc::new(MemoryFixStore::new());
        let gga = Arc::new(MemoryFixStore::new());
        if let Some(s) = primary {
            rmc.store(s);
        }
        if let Some(s) = secondary {
            gga.store(s);
        }
        SnapshotResolver::new(&config(format), "354000000000001", rmc, gga, formatter)
    }

    #[test]
    fn test_empty_stores_yield_placeholder() {
        let resolver = resolver_with("USR", None, None, Box::new(UsrFormatter));
        assert_eq!(resolver.resolve().as_deref(), Some("$,IMEI123,<NO FIX>"));
    }

    #[test]
    fn test_identical_feeds_are_treated_as_stale() {
        let resolver = resolver_with("USR", Some(RMC), Some(RMC), Box::new(UsrFormatter));
        assert_eq!(resolver.resolve().as_deref(), Some("$,IMEI123,<NO FIX>"));
    }

    #[test]
    fn test_primary_fix_is_composed() {
        let resolver = resolver_with("USR", Some(RMC), Some(GGA), Box::new(UsrFormatter));
        let payload = resolver.resolve().unwrap();
        assert!(payload.starts_with("$,IMEI123,GPRMC,123519,A"));
        assert!(
            payload.ends_with(",GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,")
        );
        assert!(!payload.contains("*6A"));
    }

    #[test]
    fn test_primary_without_secondary() {
        let resolver = resolver_with("USR", Some(RMC), None, Box::new(UsrFormatter));
        let payload = resolver.resolve().unwrap();
        assert!(payload.starts_with("$,IMEI123,GPRMC"));
        assert!(!payload.contains("GPGGA"));
    }

    #[test]
    fn test_null_literal_is_replaced_by_error_payload() {
        let resolver = resolver_with(
            "USR",
            Some(RMC),
            None,
            Box::new(FixedFormatter(Some("$,IMEI123,null,null"))),
        );
        assert_eq!(resolver.resolve().as_deref(), Some("$,IMEI123,<NO FIX>,<ERROR>"));
    }

    #[test]
    fn test_absent_composition_is_replaced_by_error_payload() {
        let resolver = resolver_with("USR", Some(RMC), None, Box::new(FixedFormatter(None)));
        assert_eq!(resolver.resolve().as_deref(), Some("$,IMEI123,<NO FIX>,<ERROR>"));
    }

    #[test]
    fn test_raw_mode_passes_primary_through() {
        let resolver = resolver_with("NMEA", Some(RMC), Some(GGA), Box::new(UsrFormatter));
        assert!(!resolver.is_framed());
        assert_eq!(resolver.resolve().as_deref(), Some(RMC));
    }

    #[test]
    fn test_raw_mode_skips_substitution() {
        let resolver = resolver_with("NMEA", None, Some(GGA), Box::new(UsrFormatter));
        assert_eq!(resolver.resolve(), None);

        let resolver = resolver_with("NMEA", Some("null"), None, Box::new(UsrFormatter));
        assert_eq!(resolver.resolve().as_deref(), Some("null"));
    }

    #[test]
    fn test_raw_mode_empty_primary_is_absent() {
        let resolver = resolver_with("NMEA", Some(""), None, Box::new(UsrFormatter));
        assert_eq!(resolver.resolve(), None);
    }

    #[test]
    fn test_client_id_defaults_to_identity() {
        let rmc = Arc::new(MemoryFixStore::new());
        let gga = Arc::new(MemoryFixStore::new());
        let resolver = SnapshotResolver::new(
            &TrackingConfig::default(),
            "354000000000001",
            rmc,
            gga,
            Box::new(UsrFormatter),
        );
        assert_eq!(resolver.placeholder(), "$,354000000000001,<NO FIX>");
    }
}
