//! The CRTP stack: queues, port registry, pumps, and the public API
//!
//! One [`CrtpStack`] instance owns the whole transport layer: the shared
//! outbound queue, the 16-port registry, the statistics tracker, and the
//! two pump tasks moving packets to and from whichever link is attached.
//! Instances are independent, so tests can run several stacks side by side.

mod pump;
mod queue;
mod registry;
mod stats;

pub use self::queue::PacketQueue;
pub use self::registry::CrtpCallback;
pub use self::stats::{LinkStats, RateSample, STATS_GROUP};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use self::registry::PortRegistry;
use crate::core::{CrtpConfig, CrtpPacket, Result};
use crate::link::{CrtpLink, LinkCell};

/// State shared between the public API and the pump tasks
pub(crate) struct Shared {
    pub(crate) config: CrtpConfig,
    pub(crate) tx_queue: PacketQueue,
    pub(crate) registry: PortRegistry,
    pub(crate) link: LinkCell,
    pub(crate) stats: LinkStats,
}

/// Port-multiplexed packet transport over a swappable link
///
/// Must be created inside a Tokio runtime; construction spawns the
/// transmit and receive pumps, and dropping the stack stops them.
pub struct CrtpStack {
    shared: Arc<Shared>,
    tx_pump: JoinHandle<()>,
    rx_pump: JoinHandle<()>,
    is_init: bool,
}

impl CrtpStack {
    /// Creates a stack with the default firmware configuration
    pub fn new() -> Self {
        Self::with_config(CrtpConfig::default())
    }

    /// Creates a stack with an explicit configuration
    pub fn with_config(config: CrtpConfig) -> Self {
        let shared = Arc::new(Shared {
            tx_queue: PacketQueue::new(config.tx_queue_size),
            registry: PortRegistry::new(),
            link: LinkCell::new(),
            stats: LinkStats::new(config.stats_interval),
            config,
        });

        let tx_pump = tokio::spawn(pump::tx_pump(shared.clone()));
        let rx_pump = tokio::spawn(pump::rx_pump(shared.clone()));
        debug!("crtp stack initialized");

        CrtpStack {
            shared,
            tx_pump,
            rx_pump,
            is_init: true,
        }
    }

    /// Reports whether initialization completed
    pub fn self_test(&self) -> bool {
        self.is_init
    }

    /// Creates the bounded inbound queue for `port`
    ///
    /// Call once per port a higher layer intends to receive on, at setup.
    ///
    /// # Panics
    ///
    /// Panics if the port is out of range or already has a queue.
    pub fn create_port_queue(&self, port: u8) {
        self.shared
            .registry
            .create_queue(port, self.shared.config.port_queue_size);
    }

    /// Registers, replaces, or clears (`None`) the callback for `port`
    ///
    /// The callback runs synchronously on the receive pump's context, after
    /// the packet has been queued, and must not block. Out-of-range port
    /// ids are ignored.
    pub fn register_port_callback(&self, port: u8, callback: Option<CrtpCallback>) {
        self.shared.registry.register_callback(port, callback);
    }

    /// Queues a packet for transmission without blocking
    ///
    /// Fails with [`crate::core::Error::QueueFull`] when the outbound queue
    /// is full, dropping this packet and only this packet: fire-and-forget
    /// for high-rate control loops that prefer freshness over completeness.
    pub fn send_packet(&self, packet: CrtpPacket) -> Result<()> {
        self.shared.tx_queue.try_push(packet)
    }

    /// Queues a packet for transmission, waiting for space if necessary
    pub async fn send_packet_blocking(&self, packet: CrtpPacket) {
        self.shared.tx_queue.push(packet).await;
    }

    /// Takes the next inbound packet for `port` without blocking
    ///
    /// # Panics
    ///
    /// Panics if no queue was created for the port.
    pub fn receive_packet(&self, port: u8) -> Option<CrtpPacket> {
        self.port_queue(port).try_pop()
    }

    /// Waits for the next inbound packet for `port`
    ///
    /// # Panics
    ///
    /// Panics if no queue was created for the port.
    pub async fn receive_packet_blocking(&self, port: u8) -> CrtpPacket {
        self.port_queue(port).pop().await
    }

    /// Waits for the next inbound packet for `port`, up to `wait`
    ///
    /// # Panics
    ///
    /// Panics if no queue was created for the port.
    pub async fn receive_packet_timeout(&self, port: u8, wait: Duration) -> Option<CrtpPacket> {
        self.port_queue(port).pop_timeout(wait).await
    }

    /// Returns the free capacity of the outbound queue
    ///
    /// Callers that want to avoid the non-blocking drop policy can use this
    /// for admission control.
    pub fn free_tx_slots(&self) -> usize {
        self.shared.tx_queue.free_slots()
    }

    /// Clears the outbound queue and forwards the reset to the link
    ///
    /// A link without reset support treats it as a no-op.
    pub fn reset(&self) {
        self.shared.tx_queue.clear();
        self.shared.link.current().reset();
    }

    /// Reports link health, optimistically true when the link (or the lack
    /// of one) does not support the query
    pub fn is_connected(&self) -> bool {
        self.shared.link.current().is_connected()
    }

    /// Attaches a link, or detaches with `None`
    ///
    /// The previous link is disabled before the new one is enabled. While
    /// detached, outbound packets accumulate in the queue and flow again as
    /// soon as a link is attached.
    pub fn set_link(&self, link: Option<Arc<dyn CrtpLink>>) {
        self.shared.link.set_link(link);
    }

    /// Read-only throughput statistics
    pub fn stats(&self) -> &LinkStats {
        &self.shared.stats
    }

    fn port_queue(&self, port: u8) -> &PacketQueue {
        match self.shared.registry.queue(port) {
            Some(queue) => queue,
            None => panic!("no queue created for port {}", port),
        }
    }
}

impl Default for CrtpStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CrtpStack {
    fn drop(&mut self) {
        self.tx_pump.abort();
        self.rx_pump.abort();
    }
}
