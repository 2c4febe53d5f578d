//! Endpoint workers
//!
//! Each worker owns one direction of the HID transport on its own thread and
//! exchanges packets with the session through a bounded [`DropOldestQueue`].
//! Workers never retry: an open failure or I/O error ends the thread and is
//! recorded as a [`WorkerExit`] for the session to act on.

use super::device::{DeviceRegistry, HidError};
use super::protocol::{Packet, PACKET_SIZE};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Default queue depth between a worker and the session
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Bounded FIFO that can evict its oldest entry instead of blocking
pub struct DropOldestQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
    capacity: usize,
}

impl<T> DropOldestQueue<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Condvar::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.lock().len() >= self.capacity
    }

    /// Enqueue, evicting and returning the oldest entry when full
    pub fn push(&self, item: T) -> Option<T> {
        let mut items = self.items.lock();
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        drop(items);
        self.ready.notify_one();
        evicted
    }

    /// Enqueue only if there is room, handing the item back otherwise
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        drop(items);
        self.ready.notify_one();
        Ok(())
    }

    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Dequeue, waiting up to `timeout` for an entry to arrive
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let mut items = self.items.lock();
        if items.is_empty() {
            // A spurious or timed-out wake simply falls through to the check below.
            let _ = self.ready.wait_for(&mut items, timeout);
        }
        items.pop_front()
    }

    /// Take every queued entry, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.items.lock().drain(..).collect()
    }
}

/// Why a worker thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Stop was requested by the owner
    Stopped,
    /// The device could not be opened at start
    DeviceNotFound,
    /// Steady-state read or write failed
    Io(String),
}

/// Direction of an endpoint worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Read => write!(f, "read"),
            Direction::Write => write!(f, "write"),
        }
    }
}

/// Poll timing shared by both workers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTiming {
    /// Per-call read timeout
    pub read_timeout: Duration,
    /// Wait on an empty outbound queue before re-checking for stop
    pub write_idle: Duration,
    pub queue_capacity: usize,
}

impl Default for WorkerTiming {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(1),
            write_idle: Duration::from_micros(500),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Default)]
struct WorkerShared {
    stop: AtomicBool,
    exit: Mutex<Option<WorkerExit>>,
}

impl WorkerShared {
    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn finish(&self, exit: WorkerExit) {
        *self.exit.lock() = Some(exit);
    }
}

/// Handle to one running endpoint thread
pub struct EndpointWorker {
    direction: Direction,
    queue: Arc<DropOldestQueue<Packet>>,
    shared: Arc<WorkerShared>,
    handle: Option<JoinHandle<()>>,
}

impl EndpointWorker {
    /// Start a thread that reads packets into the queue, dropping the oldest
    /// when the consumer falls behind
    pub fn spawn_reader(registry: DeviceRegistry, serial: &str, timing: WorkerTiming) -> Self {
        Self::spawn(Direction::Read, registry, serial, timing)
    }

    /// Start a thread that writes every packet pushed onto the queue
    pub fn spawn_writer(registry: DeviceRegistry, serial: &str, timing: WorkerTiming) -> Self {
        Self::spawn(Direction::Write, registry, serial, timing)
    }

    fn spawn(
        direction: Direction,
        registry: DeviceRegistry,
        serial: &str,
        timing: WorkerTiming,
    ) -> Self {
        let queue = Arc::new(DropOldestQueue::new(timing.queue_capacity));
        let shared = Arc::new(WorkerShared::default());

        let thread_queue = Arc::clone(&queue);
        let thread_shared = Arc::clone(&shared);
        let serial = serial.to_string();

        let spawned = thread::Builder::new()
            .name(format!("pad-{direction}"))
            .spawn(move || {
                let exit = run_endpoint(direction, &registry, &serial, &thread_queue, &thread_shared, timing);
                match &exit {
                    WorkerExit::Stopped => debug!("{} worker for {} stopped", direction, serial),
                    other => warn!("{} worker for {} exited: {:?}", direction, serial, other),
                }
                thread_shared.finish(exit);
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                let err = HidError::Spawn(e.to_string());
                warn!("{}", err);
                shared.finish(WorkerExit::Io(err.to_string()));
                None
            }
        };

        Self {
            direction,
            queue,
            shared,
            handle,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn queue(&self) -> &Arc<DropOldestQueue<Packet>> {
        &self.queue
    }

    /// Exit reason once the thread has ended
    pub fn exit_reason(&self) -> Option<WorkerExit> {
        self.shared.exit.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.exit_reason().is_none()
    }

    /// Request stop and wait for the thread to end
    pub fn terminate(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("{} worker panicked", self.direction);
                self.shared.finish(WorkerExit::Io("worker panicked".to_string()));
            }
        }
    }
}

impl Drop for EndpointWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run_endpoint(
    direction: Direction,
    registry: &DeviceRegistry,
    serial: &str,
    queue: &DropOldestQueue<Packet>,
    shared: &WorkerShared,
    timing: WorkerTiming,
) -> WorkerExit {
    let mut endpoint = match registry.open_by_serial(serial) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            debug!("Failed to open {} for {}: {}", serial, direction, e);
            return WorkerExit::DeviceNotFound;
        }
    };
    info!("{} worker started for {}", direction, serial);

    match direction {
        Direction::Read => {
            let mut buffer = [0u8; PACKET_SIZE];
            while !shared.stop_requested() {
                match endpoint.read(&mut buffer, timing.read_timeout) {
                    Ok(0) => continue,
                    Ok(n) => {
                        trace!("Read {} bytes", n);
                        // Short reads leave the previous packet's tail behind
                        if let Some(tail) = buffer.get_mut(n..) {
                            tail.fill(0);
                        }
                        if queue.push(buffer).is_some() {
                            trace!("Read queue full, dropped oldest sample");
                        }
                    }
                    Err(e) => return WorkerExit::Io(e.to_string()),
                }
            }
        }
        Direction::Write => {
            while !shared.stop_requested() {
                let Some(packet) = queue.pop_timeout(timing.write_idle) else {
                    continue;
                };
                if let Err(e) = endpoint.write(&packet) {
                    return WorkerExit::Io(e.to_string());
                }
            }
        }
    }
    WorkerExit::Stopped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::device::{HidBackend, HidEndpoint};
    use crate::hid::protocol::DeviceSignature;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_queue_drops_oldest() {
        let queue = DropOldestQueue::new(10);
        for i in 0..10 {
            assert_eq!(queue.push(i), None);
        }
        assert_eq!(queue.push(10), Some(0));
        assert_eq!(queue.len(), 10);
        assert_eq!(queue.drain(), (1..=10).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_queue_try_push_rejects_when_full() {
        let queue = DropOldestQueue::new(2);
        assert!(queue.try_push(1).is_ok());
        assert!(queue.try_push(2).is_ok());
        assert!(queue.is_full());
        assert_eq!(queue.try_push(3), Err(3));
        assert_eq!(queue.pop(), Some(1));
    }

    #[test]
    fn test_queue_pop_timeout_wakes_on_push() {
        let queue = Arc::new(DropOldestQueue::new(4));
        let producer = Arc::clone(&queue);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.push(7u8);
        });
        assert_eq!(queue.pop_timeout(Duration::from_secs(5)), Some(7));
        handle.join().unwrap();
    }

    #[test]
    fn test_queue_pop_timeout_empty() {
        let queue: DropOldestQueue<u8> = DropOldestQueue::new(1);
        let start = Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(5)), None);
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    struct CountingEndpoint {
        reads: Arc<AtomicUsize>,
        fail_after: usize,
    }

    impl HidEndpoint for CountingEndpoint {
        fn read(&mut self, buffer: &mut Packet, _timeout: Duration) -> Result<usize, HidError> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n >= self.fail_after {
                return Err(HidError::Read("unplugged".to_string()));
            }
            buffer[0] = n as u8;
            Ok(PACKET_SIZE)
        }

        fn write(&mut self, _packet: &Packet) -> Result<usize, HidError> {
            Err(HidError::Write("unplugged".to_string()))
        }
    }

    struct OneDevice {
        reads: Arc<AtomicUsize>,
        fail_after: usize,
    }

    impl HidBackend for OneDevice {
        fn serials(&self, _: &DeviceSignature) -> Result<Vec<String>, HidError> {
            Ok(vec!["PAD1".to_string()])
        }

        fn open(&self, _: &DeviceSignature, serial: &str) -> Result<Box<dyn HidEndpoint>, HidError> {
            if serial != "PAD1" {
                return Err(HidError::DeviceNotFound(serial.to_string()));
            }
            Ok(Box::new(CountingEndpoint {
                reads: Arc::clone(&self.reads),
                fail_after: self.fail_after,
            }))
        }
    }

    fn registry(fail_after: usize) -> DeviceRegistry {
        DeviceRegistry::new(
            Arc::new(OneDevice {
                reads: Arc::new(AtomicUsize::new(0)),
                fail_after,
            }),
            DeviceSignature::REFLEX_V2,
        )
    }

    fn wait_for_exit(worker: &EndpointWorker) -> WorkerExit {
        let start = Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            if let Some(exit) = worker.exit_reason() {
                return exit;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("worker did not exit");
    }

    #[test]
    fn test_reader_exits_when_device_missing() {
        let worker = EndpointWorker::spawn_reader(registry(usize::MAX), "OTHER", WorkerTiming::default());
        assert_eq!(wait_for_exit(&worker), WorkerExit::DeviceNotFound);
        assert!(!worker.is_running());
    }

    #[test]
    fn test_reader_keeps_latest_and_dies_on_io_error() {
        let worker = EndpointWorker::spawn_reader(registry(15), "PAD1", WorkerTiming::default());
        assert!(matches!(wait_for_exit(&worker), WorkerExit::Io(_)));
        let packets = worker.queue().drain();
        assert_eq!(packets.len(), 10);
        assert_eq!(packets[0][0], 5);
        assert_eq!(packets[9][0], 14);
    }

    /// Full packet of 0xFF, then a two-byte report, then unplugged
    struct ShortReadEndpoint {
        reads: usize,
    }

    impl HidEndpoint for ShortReadEndpoint {
        fn read(&mut self, buffer: &mut Packet, _timeout: Duration) -> Result<usize, HidError> {
            self.reads += 1;
            match self.reads {
                1 => {
                    buffer.fill(0xFF);
                    Ok(PACKET_SIZE)
                }
                2 => {
                    buffer[..2].copy_from_slice(&[0x12, 0x34]);
                    Ok(2)
                }
                _ => Err(HidError::Read("unplugged".to_string())),
            }
        }

        fn write(&mut self, packet: &Packet) -> Result<usize, HidError> {
            Ok(packet.len())
        }
    }

    struct ShortReadDevice;

    impl HidBackend for ShortReadDevice {
        fn serials(&self, _: &DeviceSignature) -> Result<Vec<String>, HidError> {
            Ok(vec!["PAD1".to_string()])
        }

        fn open(&self, _: &DeviceSignature, _: &str) -> Result<Box<dyn HidEndpoint>, HidError> {
            Ok(Box::new(ShortReadEndpoint { reads: 0 }))
        }
    }

    #[test]
    fn test_short_read_is_zero_padded() {
        let registry = DeviceRegistry::new(Arc::new(ShortReadDevice), DeviceSignature::REFLEX_V2);
        let worker = EndpointWorker::spawn_reader(registry, "PAD1", WorkerTiming::default());
        assert!(matches!(wait_for_exit(&worker), WorkerExit::Io(_)));

        let packets = worker.queue().drain();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0], [0xFF; PACKET_SIZE]);
        assert_eq!(packets[1][..2], [0x12, 0x34]);
        assert!(packets[1][2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_writer_dies_on_write_error() {
        let worker = EndpointWorker::spawn_writer(registry(usize::MAX), "PAD1", WorkerTiming::default());
        assert!(worker.queue().try_push([0u8; PACKET_SIZE]).is_ok());
        assert!(matches!(wait_for_exit(&worker), WorkerExit::Io(_)));
    }

    #[test]
    fn test_terminate_stops_idle_writer() {
        let mut worker = EndpointWorker::spawn_writer(registry(usize::MAX), "PAD1", WorkerTiming::default());
        worker.terminate();
        assert_eq!(worker.exit_reason(), Some(WorkerExit::Stopped));
        assert_eq!(worker.direction(), Direction::Write);
    }
}
