//! Pad session integration tests

use reflex_pad::hid::{
    DeviceRegistry, DeviceSignature, HidBackend, HidEndpoint, HidError, Packet, PadSession,
    SensorSample, SessionError, SessionState, WorkerExit, WorkerTiming, PACKET_SIZE,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared switches controlling a fake pad
#[derive(Default)]
struct FakePad {
    unplugged: AtomicBool,
    refuse_open: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

struct FakeEndpoint {
    pad: Arc<FakePad>,
}

impl HidEndpoint for FakeEndpoint {
    fn read(&mut self, buffer: &mut Packet, _timeout: Duration) -> Result<usize, HidError> {
        thread::sleep(Duration::from_millis(1));
        if self.pad.unplugged.load(Ordering::SeqCst) {
            return Err(HidError::Read("device gone".to_string()));
        }
        let n = self.pad.reads.fetch_add(1, Ordering::SeqCst);
        let value = 1000 + (n % 100) as u16;
        *buffer = SensorSample::from_values([[value; 4]; 4]).to_packet();
        Ok(PACKET_SIZE)
    }

    fn write(&mut self, _packet: &Packet) -> Result<usize, HidError> {
        if self.pad.unplugged.load(Ordering::SeqCst) {
            return Err(HidError::Write("device gone".to_string()));
        }
        self.pad.writes.fetch_add(1, Ordering::SeqCst);
        Ok(PACKET_SIZE)
    }
}

struct FakeBackend {
    serials: Vec<&'static str>,
    pad: Arc<FakePad>,
}

impl HidBackend for FakeBackend {
    fn serials(&self, _signature: &DeviceSignature) -> Result<Vec<String>, HidError> {
        Ok(self.serials.iter().map(|s| s.to_string()).collect())
    }

    fn open(
        &self,
        _signature: &DeviceSignature,
        serial: &str,
    ) -> Result<Box<dyn HidEndpoint>, HidError> {
        if self.pad.refuse_open.load(Ordering::SeqCst) || !self.serials.contains(&serial) {
            return Err(HidError::DeviceNotFound(serial.to_string()));
        }
        Ok(Box::new(FakeEndpoint {
            pad: Arc::clone(&self.pad),
        }))
    }
}

fn session(serials: Vec<&'static str>) -> (PadSession, Arc<FakePad>) {
    let pad = Arc::new(FakePad::default());
    let backend = FakeBackend {
        serials,
        pad: Arc::clone(&pad),
    };
    let registry = DeviceRegistry::new(Arc::new(backend), DeviceSignature::REFLEX_V2);
    (PadSession::new(registry, WorkerTiming::default()), pad)
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(5) {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    false
}

#[test]
fn test_connect_lifecycle() {
    let (session, _pad) = session(vec!["PAD-A", "PAD-B", "PAD-A"]);
    assert_eq!(session.state(), SessionState::Disconnected);

    let serials = session.enumerate().unwrap();
    assert_eq!(serials, vec!["PAD-A", "PAD-B"]);

    assert!(matches!(
        session.connect("PAD-C"),
        Err(SessionError::UnknownSerial(s)) if s == "PAD-C"
    ));

    session.connect("PAD-B").unwrap();
    assert!(session.is_connected());
    assert!(matches!(
        session.connect("PAD-A"),
        Err(SessionError::AlreadyConnected(s)) if s == "PAD-B"
    ));

    assert!(session.disconnect());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.connected_serial(), None);
}

#[test]
fn test_disconnect_twice_is_harmless() {
    let (session, _pad) = session(vec!["PAD-A"]);
    assert!(!session.disconnect());
    assert!(!session.disconnect());
    assert_eq!(session.state(), SessionState::Disconnected);

    session.enumerate().unwrap();
    session.connect("PAD-A").unwrap();
    assert!(session.disconnect());
    assert!(!session.disconnect());
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn test_samples_and_frames_flow() {
    let (session, pad) = session(vec!["PAD-A"]);
    session.enumerate().unwrap();
    session.connect("PAD-A").unwrap();

    let mut samples = Vec::new();
    assert!(wait_until(|| {
        samples.extend(session.drain_samples());
        samples.len() >= 3
    }));
    let first = SensorSample::from_bytes(&samples[0]);
    assert!((1000..1100).contains(&first.value(0, 0).unwrap()));

    assert!(session.push_frame([0u8; PACKET_SIZE]));
    assert!(wait_until(|| pad.writes.load(Ordering::SeqCst) >= 1));
    assert_eq!(session.check_workers(), None);
}

#[test]
fn test_unplug_forces_disconnect() {
    let (session, pad) = session(vec!["PAD-A"]);
    session.enumerate().unwrap();
    session.connect("PAD-A").unwrap();
    assert!(wait_until(|| pad.reads.load(Ordering::SeqCst) > 0));

    pad.unplugged.store(true, Ordering::SeqCst);
    let mut exit = None;
    assert!(wait_until(|| {
        exit = session.check_workers();
        exit.is_some()
    }));
    assert!(matches!(exit, Some(WorkerExit::Io(_))));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.check_workers(), None);
}

#[test]
fn test_open_failure_surfaces_as_not_found() {
    let (session, pad) = session(vec!["PAD-A"]);
    pad.refuse_open.store(true, Ordering::SeqCst);
    session.enumerate().unwrap();
    session.connect("PAD-A").unwrap();

    let mut exit = None;
    assert!(wait_until(|| {
        exit = session.check_workers();
        exit.is_some()
    }));
    assert_eq!(exit, Some(WorkerExit::DeviceNotFound));
    assert!(!session.is_connected());

    // The serial is still known, so a retry is allowed.
    pad.refuse_open.store(false, Ordering::SeqCst);
    assert!(session.toggle("PAD-A").unwrap());
}
