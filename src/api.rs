//! `BondyBird` SDP API Functions
//!
//! [`SdpChannels`] connects application code and the L2CAP glue to the
//! processor task. It is usually placed in a `static` and shared by reference.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bondybird_sdp::sdp::{ServiceClassId, UuidQuery};
//!
//! let query = UuidQuery::new(ServiceClassId::AudioSink.to_uuid(), &HANDLER);
//! SDP.discover(conn, query).await?;
//! ```
//!
//! Results arrive later through the query's handler, called from the
//! processor task. Responses to `discover` are matched to callers in order, so
//! concurrent callers must not share one set of channels.

use crate::{
    SubmitError,
    constants::{EVENT_CHANNEL_DEPTH, REQUEST_CHANNEL_DEPTH},
    l2cap::L2capError,
    processor::{DiscoverRequest, SdpEvent},
    sdp::UuidQuery,
};
use bt_hci::param::ConnHandle;
use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    channel::{Channel, TrySendError},
};
use heapless::Vec;

/// Channels between the SDP processor and the rest of the system
pub struct SdpChannels<
    'q,
    M: RawMutex,
    const EVENTS: usize = EVENT_CHANNEL_DEPTH,
    const REQUESTS: usize = REQUEST_CHANNEL_DEPTH,
> {
    pub(crate) events: Channel<M, SdpEvent, EVENTS>,
    pub(crate) requests: Channel<M, DiscoverRequest<'q>, REQUESTS>,
    pub(crate) responses: Channel<M, Result<(), SubmitError>, REQUESTS>,
}

impl<'q, M: RawMutex, const EVENTS: usize, const REQUESTS: usize>
    SdpChannels<'q, M, EVENTS, REQUESTS>
{
    /// Create empty channels
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events: Channel::new(),
            requests: Channel::new(),
            responses: Channel::new(),
        }
    }

    /// Queue a UUID query for the remote on `conn`.
    ///
    /// Waits until the processor has accepted or rejected the request.
    ///
    /// # Errors
    ///
    /// Returns the error reported by [`SdpClient::discover`](crate::SdpClient::discover).
    pub async fn discover(&self, conn: ConnHandle, query: UuidQuery<'q>) -> Result<(), SubmitError> {
        self.requests.send(DiscoverRequest { conn, query }).await;
        self.responses.receive().await
    }

    /// Post a channel event, waiting for room
    pub async fn post_event(&self, event: SdpEvent) {
        self.events.send(event).await;
    }

    /// Post a channel event without waiting
    ///
    /// # Errors
    ///
    /// Returns the event back if the event channel is full.
    pub fn try_post_event(&self, event: SdpEvent) -> Result<(), SdpEvent> {
        self.events.try_send(event).map_err(|TrySendError::Full(event)| event)
    }

    /// Report that the SDP channel on `conn` opened
    pub async fn connected(&self, conn: ConnHandle) {
        self.post_event(SdpEvent::Connected(conn)).await;
    }

    /// Report a PDU received on the SDP channel of `conn`
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the PDU exceeds the event buffer.
    pub async fn received(&self, conn: ConnHandle, pdu: &[u8]) -> Result<(), L2capError> {
        let pdu = Vec::from_slice(pdu).map_err(|()| L2capError::PayloadTooLarge)?;
        self.post_event(SdpEvent::Received(conn, pdu)).await;
        Ok(())
    }

    /// Report that the SDP channel on `conn` closed
    pub async fn disconnected(&self, conn: ConnHandle) {
        self.post_event(SdpEvent::Disconnected(conn)).await;
    }
}

impl<M: RawMutex, const EVENTS: usize, const REQUESTS: usize> Default
    for SdpChannels<'_, M, EVENTS, REQUESTS>
{
    fn default() -> Self {
        Self::new()
    }
}
