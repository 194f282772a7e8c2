//! SDP Processor Task
//!
//! Drives an [`SdpClient`] from embassy-sync channels: channel events posted by
//! the L2CAP glue and discovery requests posted through [`SdpChannels`] are
//! applied to the client one at a time, so the client itself needs no locking.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bondybird_sdp::{api::SdpChannels, processor::sdp_client_processor, SdpClient};
//! use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
//!
//! static SDP: SdpChannels<'static, CriticalSectionRawMutex> = SdpChannels::new();
//!
//! #[embassy_executor::task]
//! async fn sdp_task(transport: MyL2cap) -> ! {
//!     let mut client = SdpClient::new(transport);
//!     sdp_client_processor(&mut client, &SDP).await
//! }
//! ```
//!
//! The L2CAP glue reports channel events with [`SdpChannels::post_event`] and
//! applications queue queries with [`SdpChannels::discover`].

use crate::{
    SdpClient, api::SdpChannels, constants::MAX_SDP_PDU_SIZE, l2cap::L2capChannelService,
    sdp::UuidQuery,
};
use bt_hci::param::ConnHandle;
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

/// SDP channel event reported by the L2CAP layer
#[derive(Debug, Clone)]
pub enum SdpEvent {
    /// The SDP channel on the connection opened
    Connected(ConnHandle),
    /// A complete SDP PDU arrived on the connection's channel
    Received(ConnHandle, Vec<u8, MAX_SDP_PDU_SIZE>),
    /// The SDP channel on the connection closed
    Disconnected(ConnHandle),
}

/// Discovery request queued through [`SdpChannels::discover`]
#[derive(Debug, Clone, Copy)]
pub struct DiscoverRequest<'q> {
    /// Connection to the remote device
    pub conn: ConnHandle,
    /// Query to resolve
    pub query: UuidQuery<'q>,
}

/// Wait for one event or request and apply it to `client`
pub async fn process_next<
    'q,
    M: RawMutex,
    T: L2capChannelService,
    const SESSIONS: usize,
    const EVENTS: usize,
    const REQUESTS: usize,
>(
    client: &mut SdpClient<'q, T, SESSIONS>,
    channels: &SdpChannels<'q, M, EVENTS, REQUESTS>,
) {
    match select(channels.events.receive(), channels.requests.receive()).await {
        Either::First(event) => match event {
            SdpEvent::Connected(conn) => {
                debug!("[SDP PROCESSOR] Channel connected: {}", conn.raw());
                client.on_connected(conn);
            }
            SdpEvent::Received(conn, pdu) => {
                debug!(
                    "[SDP PROCESSOR] PDU of {} bytes on {}",
                    pdu.len(),
                    conn.raw()
                );
                client.on_received(conn, &pdu);
            }
            SdpEvent::Disconnected(conn) => {
                debug!("[SDP PROCESSOR] Channel disconnected: {}", conn.raw());
                client.on_disconnected(conn);
            }
        },
        Either::Second(request) => {
            debug!("[SDP PROCESSOR] Discover request on {}", request.conn.raw());
            let result = client.discover(request.conn, request.query);
            if let Err(e) = result {
                warn!("[SDP PROCESSOR] Discover request rejected: {:?}", e);
            }
            channels.responses.send(result).await;
        }
    }
}

/// Run the SDP client forever
pub async fn sdp_client_processor<
    'q,
    M: RawMutex,
    T: L2capChannelService,
    const SESSIONS: usize,
    const EVENTS: usize,
    const REQUESTS: usize,
>(
    client: &mut SdpClient<'q, T, SESSIONS>,
    channels: &SdpChannels<'q, M, EVENTS, REQUESTS>,
) -> ! {
    loop {
        process_next(client, channels).await;
    }
}
