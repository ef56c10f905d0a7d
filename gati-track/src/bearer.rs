//! Wireless bearer collaborators: the modem AT channel and the bearer
//! connectivity listener registry.
//!
//! The modem channel is shared with the rest of the firmware; every writer
//! holds its mutex for the duration of one AT command.

use crate::error::Result;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Arc;

/// AT command detaching the packet-data bearer
pub const AT_DETACH: &str = "AT+CGATT=0\r";

/// Modem AT channel shared between writers
pub type SharedModem = Arc<Mutex<Box<dyn Write + Send>>>;

/// Open the modem AT channel
///
/// An empty path gives a channel that discards every write.
pub fn open_modem(path: &str) -> Result<SharedModem> {
    let channel: Box<dyn Write + Send> = if path.is_empty() {
        log::info!("Modem channel disabled, AT commands are discarded");
        Box::new(io::sink())
    } else {
        log::info!("Opening modem channel {}", path);
        Box::new(OpenOptions::new().write(true).open(path)?)
    };
    Ok(Arc::new(Mutex::new(channel)))
}

/// Detach the packet-data bearer
pub fn detach(modem: &SharedModem) -> io::Result<()> {
    let mut channel = modem.lock();
    channel.write_all(AT_DETACH.as_bytes())?;
    channel.flush()
}

/// Registration point for asynchronous bearer connectivity events
///
/// Handling of fired events belongs to the implementor.
pub trait BearerRegistry: Send {
    /// Start listening for bearer events
    fn register(&mut self) -> Result<()>;

    /// Stop listening for bearer events
    fn unregister(&mut self);
}

/// Registry that only logs bearer (un)registration
#[derive(Debug, Default)]
pub struct LoggingBearer {
    registered: bool,
}

impl LoggingBearer {
    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl BearerRegistry for LoggingBearer {
    fn register(&mut self) -> Result<()> {
        self.registered = true;
        log::debug!("Bearer listener registered");
        Ok(())
    }

    fn unregister(&mut self) {
        self.registered = false;
        log::debug!("Bearer listener unregistered");
    }
}
