use std::collections::VecDeque;
use std::pin::pin;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::{CrtpPacket, Error, Result};

/// Bounded FIFO of packets with blocking and non-blocking ends
///
/// This is the suspension point of the stack: the shared outbound queue and
/// every port's inbound queue are instances of it. Any number of producers
/// and consumers may use it concurrently; packets come out in the order
/// they went in. A full queue refuses `try_push` without evicting anything,
/// while `push` applies backpressure by parking the producer.
pub struct PacketQueue {
    packets: Mutex<VecDeque<CrtpPacket>>,
    capacity: usize,
    not_empty: Notify,
    not_full: Notify,
}

impl PacketQueue {
    /// Creates a queue holding at most `capacity` packets
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        PacketQueue {
            packets: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }

    /// Enqueues without blocking; fails with [`Error::QueueFull`] when full
    pub fn try_push(&self, packet: CrtpPacket) -> Result<()> {
        {
            let mut packets = self.packets.lock();
            if packets.len() >= self.capacity {
                return Err(Error::QueueFull);
            }
            packets.push_back(packet);
        }
        self.not_empty.notify_one();
        Ok(())
    }

    /// Enqueues, parking the caller until space is available
    pub async fn push(&self, packet: CrtpPacket) {
        loop {
            // Register as a waiter before checking, so a pop that lands in
            // between cannot be missed.
            let mut not_full = pin!(self.not_full.notified());
            not_full.as_mut().enable();
            if self.try_push(packet).is_ok() {
                return;
            }
            not_full.await;
        }
    }

    /// Dequeues without blocking
    pub fn try_pop(&self) -> Option<CrtpPacket> {
        let packet = {
            let mut packets = self.packets.lock();
            let packet = packets.pop_front()?;
            if !packets.is_empty() {
                // Hand remaining packets to the next parked consumer
                self.not_empty.notify_one();
            }
            packet
        };
        self.not_full.notify_one();
        Some(packet)
    }

    /// Dequeues, parking the caller until a packet arrives
    pub async fn pop(&self) -> CrtpPacket {
        loop {
            let mut not_empty = pin!(self.not_empty.notified());
            not_empty.as_mut().enable();
            if let Some(packet) = self.try_pop() {
                return packet;
            }
            not_empty.await;
        }
    }

    /// Dequeues, giving up after `wait` if nothing arrives
    pub async fn pop_timeout(&self, wait: Duration) -> Option<CrtpPacket> {
        tokio::time::timeout(wait, self.pop()).await.ok()
    }

    /// Discards every queued packet
    pub fn clear(&self) {
        self.packets.lock().clear();
        self.not_full.notify_waiters();
    }

    /// Returns the number of queued packets
    pub fn len(&self) -> usize {
        self.packets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.lock().is_empty()
    }

    /// Returns how many more packets fit before `try_push` fails
    pub fn free_slots(&self) -> usize {
        self.capacity - self.len()
    }
}
