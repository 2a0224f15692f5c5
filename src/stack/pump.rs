use std::sync::Arc;

use tracing::{debug, trace};

use super::Shared;

/// Transmit pump: drains the shared outbound queue into the active link
///
/// Once a packet has been dequeued it is retried until some link accepts
/// it, re-reading the link cell between attempts so a swapped-in transport
/// picks up the pending packet. Head-of-line blocking is deliberate: a
/// stuck link stalls every later send, preserving ordering.
pub(super) async fn tx_pump(shared: Arc<Shared>) {
    debug!("transmit pump started");
    loop {
        if shared.link.active().is_none() {
            shared
                .link
                .wait_for_change(shared.config.link_idle_delay)
                .await;
            continue;
        }

        let packet = shared.tx_queue.pop().await;
        let mut link = shared.link.current();
        while !link.send_packet(&packet) {
            trace!(port = packet.port(), "link refused packet, retrying");
            tokio::time::sleep(shared.config.send_retry_delay).await;
            link = shared.link.current();
        }
        shared.stats.record_tx();
    }
}

/// Receive pump: polls the active link and fans packets out per port
///
/// Inbound packets are never dropped once the link surfaced them; a full
/// port queue stalls the pump instead.
pub(super) async fn rx_pump(shared: Arc<Shared>) {
    debug!("receive pump started");
    loop {
        let link = match shared.link.active() {
            Some(link) => link,
            None => {
                shared
                    .link
                    .wait_for_change(shared.config.link_idle_delay)
                    .await;
                continue;
            }
        };

        match link.receive_packet() {
            Some(packet) => {
                shared.registry.dispatch(packet).await;
                shared.stats.record_rx();
            }
            None => tokio::time::sleep(shared.config.receive_poll_delay).await,
        }
    }
}
