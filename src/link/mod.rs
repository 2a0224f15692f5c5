//! Link abstraction and the active-link cell
//!
//! A link is the physical transport (radio, wired USB) the stack moves
//! packets over. The stack never talks to a concrete driver; it only uses
//! the [`CrtpLink`] capability, and an inactive stack dispatches into
//! [`NopLink`] so no call site ever has to null-check the link first.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;
use tracing::info;

use crate::core::CrtpPacket;

/// Capability contract every transport implements
///
/// `send_packet` may be refused (link busy or down) and is retried by the
/// transmit pump; `receive_packet` must never block. Implementations use
/// interior mutability since the same link is shared by both pumps.
pub trait CrtpLink: Send + Sync {
    /// Tells the transport to start or stop moving packets
    fn set_enable(&self, enable: bool);

    /// Hands one packet to the transport; returns false if it was refused
    fn send_packet(&self, packet: &CrtpPacket) -> bool;

    /// Polls the transport for one inbound packet, without blocking
    fn receive_packet(&self) -> Option<CrtpPacket>;

    /// Clears any transport-internal buffers; optional
    fn reset(&self) {}

    /// Reports link health; optional, optimistically true when unsupported
    fn is_connected(&self) -> bool {
        true
    }
}

/// The down-link sentinel standing in when no transport is attached
///
/// Sends are always refused and receives never yield, so the pumps can
/// poll it uniformly.
#[derive(Debug, Default)]
pub struct NopLink;

impl CrtpLink for NopLink {
    fn set_enable(&self, _enable: bool) {}

    fn send_packet(&self, _packet: &CrtpPacket) -> bool {
        false
    }

    fn receive_packet(&self) -> Option<CrtpPacket> {
        None
    }
}

/// Shared cell holding the active link
///
/// Swapped only by [`LinkCell::set_link`], read by both pumps once per loop
/// iteration. The swap disables the outgoing transport before the new one
/// is enabled, and the write lock is held across the whole sequence so a
/// pump never observes a transport that has not been enabled yet.
pub struct LinkCell {
    nop: Arc<dyn CrtpLink>,
    active: RwLock<Option<Arc<dyn CrtpLink>>>,
    changed: Notify,
}

impl LinkCell {
    pub fn new() -> Self {
        LinkCell {
            nop: Arc::new(NopLink),
            active: RwLock::new(None),
            changed: Notify::new(),
        }
    }

    /// Returns the attached link, or `None` when the stack is inactive
    pub fn active(&self) -> Option<Arc<dyn CrtpLink>> {
        self.active.read().clone()
    }

    /// Returns the attached link, substituting the no-op sentinel when inactive
    pub fn current(&self) -> Arc<dyn CrtpLink> {
        self.active
            .read()
            .clone()
            .unwrap_or_else(|| self.nop.clone())
    }

    /// Swaps the active link: disable the old, replace, enable the new
    pub fn set_link(&self, link: Option<Arc<dyn CrtpLink>>) {
        let attached = link.is_some();
        {
            let mut slot = self.active.write();
            slot.as_ref().unwrap_or(&self.nop).set_enable(false);
            *slot = link;
            slot.as_ref().unwrap_or(&self.nop).set_enable(true);
        }
        self.changed.notify_waiters();
        info!(attached, "link swapped");
    }

    /// Parks the caller until the link changes, or for `fallback` at most
    ///
    /// The fallback bounds the latency of a swap that races with waiter
    /// registration, so an idle pump always re-checks within `fallback`.
    pub async fn wait_for_change(&self, fallback: Duration) {
        let _ = tokio::time::timeout(fallback, self.changed.notified()).await;
    }
}

impl Default for LinkCell {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{EventLog, MockLink};
    use super::*;

    #[test]
    fn test_nop_link_refuses_traffic() {
        let link = NopLink;
        let packet = CrtpPacket::new(0, 0, &[1]);
        assert!(!link.send_packet(&packet));
        assert!(link.receive_packet().is_none());
    }

    #[test]
    fn test_nop_link_optimistic_connection_default() {
        // The sentinel does not implement the health query, so the stack
        // deliberately reports "connected" while no transport is attached.
        assert!(NopLink.is_connected());
    }

    #[test]
    fn test_cell_starts_inactive() {
        let cell = LinkCell::new();
        assert!(cell.active().is_none());
        // current() falls back to the sentinel, which refuses sends
        let packet = CrtpPacket::new(0, 0, &[]);
        assert!(!cell.current().send_packet(&packet));
    }

    #[test]
    fn test_swap_disables_old_before_enabling_new() {
        let log = EventLog::default();
        let a = Arc::new(MockLink::with_log("a", log.clone()));
        let b = Arc::new(MockLink::with_log("b", log.clone()));

        let cell = LinkCell::new();
        cell.set_link(Some(a.clone()));
        cell.set_link(Some(b.clone()));

        assert_eq!(
            *log.lock(),
            vec!["a:enable", "a:disable", "b:enable"],
            "old link must be told to stop before the new one starts"
        );
    }

    #[test]
    fn test_detach_returns_to_sentinel() {
        let cell = LinkCell::new();
        let link = Arc::new(MockLink::new("m"));
        cell.set_link(Some(link.clone()));
        cell.set_link(None);

        assert!(cell.active().is_none());
        assert_eq!(*link.events(), ["m:enable", "m:disable"]);
    }

    #[tokio::test]
    async fn test_wait_for_change_wakes_on_swap() {
        let cell = Arc::new(LinkCell::new());

        let waiter = {
            let cell = cell.clone();
            tokio::spawn(async move {
                // Fallback far beyond the test timeout: only the swap
                // notification can complete this in time.
                cell.wait_for_change(Duration::from_secs(30)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        cell.set_link(Some(Arc::new(MockLink::new("m"))));

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken by the swap")
            .unwrap();
    }
}
