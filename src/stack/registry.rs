use std::sync::Arc;
use std::sync::OnceLock;

use parking_lot::RwLock;
use tracing::trace;

use super::queue::PacketQueue;
use crate::core::{CrtpPacket, CRTP_NBR_OF_PORTS};

/// Handler invoked on the receive pump's context for each inbound packet
///
/// Callback bodies must not block: they run on the same task that drains
/// the link, after the packet has been placed in the port's queue.
pub type CrtpCallback = Arc<dyn Fn(&CrtpPacket) + Send + Sync>;

/// Fixed table of the 16 port endpoints
///
/// Each port may own a bounded inbound queue, a callback, both, or neither;
/// a port with neither silently discards inbound packets. Queue creation is
/// strict (double creation or a bad port id is a fatal assertion) while
/// callback registration is deliberately lenient about out-of-range ids,
/// mirroring the asymmetry of the original firmware API.
pub struct PortRegistry {
    ports: [PortEntry; CRTP_NBR_OF_PORTS],
}

struct PortEntry {
    queue: OnceLock<PacketQueue>,
    callback: RwLock<Option<CrtpCallback>>,
}

impl PortEntry {
    fn new() -> Self {
        PortEntry {
            queue: OnceLock::new(),
            callback: RwLock::new(None),
        }
    }
}

impl PortRegistry {
    pub fn new() -> Self {
        PortRegistry {
            ports: std::array::from_fn(|_| PortEntry::new()),
        }
    }

    /// Creates the inbound queue for `port`, exactly once
    ///
    /// # Panics
    ///
    /// Panics if the port is out of range or already has a queue; both are
    /// caller programming errors.
    pub fn create_queue(&self, port: u8, capacity: usize) {
        assert!(
            (port as usize) < CRTP_NBR_OF_PORTS,
            "port {} out of range",
            port
        );
        assert!(
            self.ports[port as usize]
                .queue
                .set(PacketQueue::new(capacity))
                .is_ok(),
            "queue already created for port {}",
            port
        );
    }

    /// Returns the inbound queue for `port`, if one was created
    pub fn queue(&self, port: u8) -> Option<&PacketQueue> {
        self.ports.get(port as usize)?.queue.get()
    }

    /// Registers, replaces, or clears (`None`) the callback for `port`
    ///
    /// Out-of-range port ids are silently ignored, unlike queue creation.
    pub fn register_callback(&self, port: u8, callback: Option<CrtpCallback>) {
        if let Some(entry) = self.ports.get(port as usize) {
            *entry.callback.write() = callback;
        }
    }

    fn callback(&self, port: u8) -> Option<CrtpCallback> {
        self.ports.get(port as usize)?.callback.read().clone()
    }

    /// Fans one inbound packet out to its port's queue and callback
    ///
    /// The queue push waits for space rather than dropping; backpressure
    /// lands on the receive pump, never on the packet. The callback runs
    /// after the packet is queued.
    pub async fn dispatch(&self, packet: CrtpPacket) {
        let port = packet.port();
        if let Some(queue) = self.queue(port) {
            queue.push(packet).await;
        }
        if let Some(callback) = self.callback(port) {
            callback(&packet);
        }
        trace!(port, size = packet.size(), "packet dispatched");
    }
}

impl Default for PortRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_queue_lookup() {
        let registry = PortRegistry::new();
        assert!(registry.queue(4).is_none());

        registry.create_queue(4, 8);
        assert!(registry.queue(4).is_some());
        assert!(registry.queue(5).is_none());
    }

    #[test]
    #[should_panic(expected = "queue already created")]
    fn test_double_queue_creation_asserts() {
        let registry = PortRegistry::new();
        registry.create_queue(4, 8);
        registry.create_queue(4, 8);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_queue_creation_rejects_bad_port() {
        let registry = PortRegistry::new();
        registry.create_queue(16, 8);
    }

    #[test]
    fn test_callback_registration_is_lenient() {
        let registry = PortRegistry::new();
        // Out of range: ignored without panicking, unlike create_queue
        registry.register_callback(200, Some(Arc::new(|_| {})));
        assert!(registry.callback(200).is_none());
    }

    #[test]
    fn test_last_callback_registration_wins() {
        let registry = PortRegistry::new();
        let hits: Arc<Mutex<Vec<u8>>> = Arc::default();

        let first = hits.clone();
        registry.register_callback(3, Some(Arc::new(move |_| first.lock().push(1))));
        let second = hits.clone();
        registry.register_callback(3, Some(Arc::new(move |_| second.lock().push(2))));

        let callback = registry.callback(3).expect("callback registered");
        callback(&CrtpPacket::new(3, 0, &[]));
        assert_eq!(*hits.lock(), vec![2]);

        registry.register_callback(3, None);
        assert!(registry.callback(3).is_none());
    }

    #[tokio::test]
    async fn test_dispatch_queues_before_callback() {
        let registry = Arc::new(PortRegistry::new());
        registry.create_queue(9, 8);

        let seen_in_queue: Arc<Mutex<Vec<Option<CrtpPacket>>>> = Arc::default();
        let observer = seen_in_queue.clone();
        let lookup = registry.clone();
        registry.register_callback(
            9,
            Some(Arc::new(move |packet| {
                // By the time the callback runs, the packet is already
                // sitting in the port queue.
                let queued = lookup.queue(packet.port()).and_then(|q| q.try_pop());
                observer.lock().push(queued);
            })),
        );

        let packet = CrtpPacket::new(9, 1, &[42]);
        registry.dispatch(packet).await;

        assert_eq!(*seen_in_queue.lock(), vec![Some(packet)]);
    }

    #[tokio::test]
    async fn test_dispatch_without_consumers_discards() {
        let registry = PortRegistry::new();
        // No queue, no callback: the packet just disappears
        registry.dispatch(CrtpPacket::new(1, 0, &[7])).await;
        assert!(registry.queue(1).is_none());
    }
}
