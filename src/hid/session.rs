//! Pad session lifecycle
//!
//! A session owns the serial list from the last enumeration and, while
//! connected, one reader and one writer worker bound to the same serial.

use super::device::{DeviceRegistry, HidError};
use super::protocol::Packet;
use super::worker::{EndpointWorker, WorkerExit, WorkerTiming};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Session operation failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Already connected to {0}")]
    AlreadyConnected(String),

    #[error("Unknown pad serial: {0}")]
    UnknownSerial(String),

    #[error(transparent)]
    Transport(#[from] HidError),
}

struct ActivePad {
    serial: String,
    reader: EndpointWorker,
    writer: EndpointWorker,
}

struct SessionInner {
    state: SessionState,
    serials: Vec<String>,
    active: Option<ActivePad>,
}

/// Connection to at most one pad at a time
pub struct PadSession {
    registry: DeviceRegistry,
    timing: WorkerTiming,
    inner: Mutex<SessionInner>,
}

impl PadSession {
    pub fn new(registry: DeviceRegistry, timing: WorkerTiming) -> Self {
        Self {
            registry,
            timing,
            inner: Mutex::new(SessionInner {
                state: SessionState::Disconnected,
                serials: Vec::new(),
                active: None,
            }),
        }
    }

    /// Refresh the list of attached pads
    pub fn enumerate(&self) -> Result<Vec<String>, SessionError> {
        let serials = self.registry.enumerate()?;
        info!("Enumerated {} pad(s)", serials.len());
        self.inner.lock().serials = serials.clone();
        Ok(serials)
    }

    /// Serials from the last enumeration
    pub fn serials(&self) -> Vec<String> {
        self.inner.lock().serials.clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    pub fn connected_serial(&self) -> Option<String> {
        self.inner.lock().active.as_ref().map(|a| a.serial.clone())
    }

    /// Start both endpoint workers for `serial`
    ///
    /// Open failures surface later through [`PadSession::check_workers`].
    pub fn connect(&self, serial: &str) -> Result<(), SessionError> {
        let mut inner = self.inner.lock();
        if let Some(active) = &inner.active {
            return Err(SessionError::AlreadyConnected(active.serial.clone()));
        }
        if !inner.serials.iter().any(|s| s == serial) {
            return Err(SessionError::UnknownSerial(serial.to_string()));
        }

        inner.state = SessionState::Connecting;
        let reader = EndpointWorker::spawn_reader(self.registry.clone(), serial, self.timing);
        let writer = EndpointWorker::spawn_writer(self.registry.clone(), serial, self.timing);
        inner.active = Some(ActivePad {
            serial: serial.to_string(),
            reader,
            writer,
        });
        inner.state = SessionState::Connected;
        info!("Connected to pad {}", serial);
        Ok(())
    }

    /// Stop both workers; returns whether a pad was connected
    pub fn disconnect(&self) -> bool {
        let active = {
            let mut inner = self.inner.lock();
            inner.state = SessionState::Disconnected;
            inner.active.take()
        };

        match active {
            Some(mut active) => {
                // Joined outside the lock.
                active.reader.terminate();
                active.writer.terminate();
                info!("Disconnected from pad {}", active.serial);
                true
            }
            None => {
                debug!("Disconnect requested with no pad connected");
                false
            }
        }
    }

    /// Connect when disconnected, disconnect otherwise; returns the new
    /// connected flag
    pub fn toggle(&self, serial: &str) -> Result<bool, SessionError> {
        if self.is_connected() {
            self.disconnect();
            Ok(false)
        } else {
            self.connect(serial)?;
            Ok(true)
        }
    }

    /// Every sensor packet read since the last drain, oldest first
    pub fn drain_samples(&self) -> Vec<Packet> {
        self.inner
            .lock()
            .active
            .as_ref()
            .map(|a| a.reader.queue().drain())
            .unwrap_or_default()
    }

    /// Whether the writer has room for another packet
    pub fn has_write_capacity(&self) -> bool {
        self.inner
            .lock()
            .active
            .as_ref()
            .is_some_and(|a| !a.writer.queue().is_full())
    }

    /// Queue one LED packet; refused when disconnected or the queue is full
    pub fn push_frame(&self, packet: Packet) -> bool {
        self.inner
            .lock()
            .active
            .as_ref()
            .is_some_and(|a| a.writer.queue().try_push(packet).is_ok())
    }

    /// Detect a dead worker and tear the session down
    ///
    /// Returns the exit reason when a disconnect was forced.
    pub fn check_workers(&self) -> Option<WorkerExit> {
        let exit = {
            let inner = self.inner.lock();
            let active = inner.active.as_ref()?;
            active
                .reader
                .exit_reason()
                .or_else(|| active.writer.exit_reason())?
        };

        if exit == WorkerExit::Stopped {
            return None;
        }
        warn!("Pad worker exited ({:?}), disconnecting", exit);
        self.disconnect();
        Some(exit)
    }
}

impl Drop for PadSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
