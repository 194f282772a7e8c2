//! SDP client session
//!
//! One session exists per ACL connection with pending discovery work. It owns
//! the L2CAP channel to the remote SDP server, the single outstanding
//! transaction, the continuation state of the current transfer and the
//! reassembly buffer, and resolves queued UUID queries strictly in order.

use super::{
    DiscoverQueue, DiscoverResult, DiscoverStep, QuerySource, ResolveFailure, SdpPduId,
    ServiceRecord, TransactionId, UuidQuery,
    protocol::{
        ContinuationState, SsaResponseFrame, decode_envelope, decode_error_code,
        encode_search_request,
    },
    reassembly::ReassemblyBuffer,
};
use crate::{
    SdpClientOptions, SubmitError,
    l2cap::{L2capChannelService, L2capError, psm},
};
use bt_hci::param::ConnHandle;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// No request outstanding
    Idle,
    /// Channel requested, waiting for it to open
    AwaitingConnect,
    /// First request of a transfer outstanding
    RequestSent,
    /// Continuation request outstanding
    Draining,
    /// Channel gone; terminal
    Closed,
}

/// Client session bound to one connection
pub struct Session<'q> {
    conn: ConnHandle,
    state: SessionState,
    transaction_id: TransactionId,
    continuation: ContinuationState,
    buffer: ReassemblyBuffer,
    queue: DiscoverQueue<'q>,
    channel_open: bool,
    options: SdpClientOptions,
}

impl<'q> Session<'q> {
    /// Create an idle session for `conn`
    #[must_use]
    pub fn new(conn: ConnHandle, options: SdpClientOptions) -> Self {
        Self {
            conn,
            state: SessionState::Idle,
            transaction_id: 0,
            continuation: ContinuationState::EMPTY,
            buffer: ReassemblyBuffer::new(),
            queue: DiscoverQueue::new(),
            channel_open: false,
            options,
        }
    }

    /// Connection this session serves
    #[must_use]
    pub const fn conn(&self) -> ConnHandle {
        self.conn
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Transaction ID of the last request sent
    #[must_use]
    pub const fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Continuation state of the transfer in progress
    #[must_use]
    pub const fn continuation(&self) -> &ContinuationState {
        &self.continuation
    }

    /// Bytes currently held by the reassembly buffer
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Queries waiting, including the active one
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Check if the L2CAP channel is open
    #[must_use]
    pub const fn is_channel_open(&self) -> bool {
        self.channel_open
    }

    /// Queue a query
    ///
    /// Only enqueues. A query added after the queue drained and the channel
    /// was asked to close is discarded with the rest of the session.
    ///
    /// # Errors
    /// Returns `SubmitError::QueueFull` when the queue is at capacity.
    pub fn enqueue(&mut self, query: UuidQuery<'q>) -> Result<(), SubmitError> {
        self.queue.push_back(query)?;
        debug!(
            "[SDP] Queued query on conn {}, {} pending",
            self.conn.raw(),
            self.queue.len()
        );
        Ok(())
    }

    /// Request the SDP channel for this session
    ///
    /// # Errors
    /// Returns the transport error if the channel cannot be requested; the
    /// session is left idle.
    pub fn connect<T: L2capChannelService>(&mut self, transport: &mut T) -> Result<(), L2capError> {
        transport.connect(self.conn, psm::SDP, self.options.rx_mtu)?;
        self.state = SessionState::AwaitingConnect;
        debug!("[SDP] Connecting SDP channel on conn {}", self.conn.raw());
        Ok(())
    }

    /// Channel opened: start resolving the head of the queue
    pub fn on_connected<T: L2capChannelService>(&mut self, transport: &mut T) {
        if self.state != SessionState::AwaitingConnect {
            warn!(
                "[SDP] Unexpected channel connect on conn {} in state {:?}",
                self.conn.raw(),
                self.state
            );
            return;
        }

        debug!("[SDP] Channel connected on conn {}", self.conn.raw());
        self.channel_open = true;
        self.start_next(transport);
    }

    /// Channel closed: drop everything
    pub fn on_disconnected(&mut self) {
        if !self.queue.is_empty() {
            warn!(
                "[SDP] Conn {} disconnected with {} queries pending",
                self.conn.raw(),
                self.queue.len()
            );
        }

        self.queue.clear();
        self.buffer.reset();
        self.continuation.clear();
        self.transaction_id = 0;
        self.channel_open = false;
        self.state = SessionState::Closed;
    }

    /// Handle a PDU received on the channel
    ///
    /// Malformed or unexpected PDUs are logged and dropped without changing
    /// the session.
    pub fn on_received<T: L2capChannelService>(&mut self, transport: &mut T, pdu: &[u8]) {
        self.on_received_from(transport, pdu, &());
    }

    /// Handle a PDU received on the channel, picking up queries for this
    /// connection from `deferred` once the active query has been answered
    pub fn on_received_from<T: L2capChannelService>(
        &mut self,
        transport: &mut T,
        pdu: &[u8],
        deferred: &impl QuerySource<'q>,
    ) {
        if !matches!(
            self.state,
            SessionState::RequestSent | SessionState::Draining
        ) {
            warn!(
                "[SDP] Dropping PDU on conn {} in state {:?}",
                self.conn.raw(),
                self.state
            );
            return;
        }

        let envelope = match decode_envelope(pdu) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("[SDP] Dropping malformed PDU: {:?}", e);
                return;
            }
        };

        if envelope.header.transaction_id != self.transaction_id {
            warn!(
                "[SDP] Transaction ID mismatch ({} != {})",
                envelope.header.transaction_id,
                self.transaction_id
            );
            return;
        }

        match envelope.header.pdu_id {
            SdpPduId::ServiceSearchAttributeResponse => {
                self.on_search_response(transport, envelope.parameters, deferred);
            }
            SdpPduId::ErrorResponse => match decode_error_code(envelope.parameters) {
                Ok(code) => {
                    info!("[SDP] Error response {} on conn {}", code, self.conn.raw());
                    self.fail(transport, ResolveFailure::RemoteError(code), deferred);
                }
                Err(e) => warn!("[SDP] Dropping malformed error response: {:?}", e),
            },
            other => warn!("[SDP] PDU {:?} response not handled", other),
        }
    }

    fn on_search_response<T: L2capChannelService>(
        &mut self,
        transport: &mut T,
        parameters: &[u8],
        deferred: &impl QuerySource<'q>,
    ) {
        let frame = match SsaResponseFrame::parse(parameters) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("[SDP] Dropping invalid search attribute response: {:?}", e);
                return;
            }
        };

        if self.continuation.is_empty() && frame.is_empty_list() {
            debug!("[SDP] No record found on conn {}", self.conn.raw());
            self.fail(transport, ResolveFailure::NotFound, deferred);
            return;
        }

        let (total, consumed) = match self
            .buffer
            .begin_if_fresh(&self.continuation, frame.attribute_bytes)
        {
            Ok(header) => header,
            Err(e) => {
                warn!("[SDP] Dropping response with bad total length: {:?}", e);
                return;
            }
        };

        if total > self.buffer.capacity() - self.buffer.len() {
            warn!(
                "[SDP] Not enough room for {} octets of records ({} available)",
                total,
                self.buffer.capacity()
            );
            self.fail(transport, ResolveFailure::CapacityExceeded, deferred);
            return;
        }

        if let Err(e) = self.buffer.append(&frame.attribute_bytes[consumed..]) {
            warn!("[SDP] Abandoning resolution: {:?}", e);
            self.fail(transport, ResolveFailure::CapacityExceeded, deferred);
            return;
        }

        if !frame.continuation.is_empty() {
            self.continuation = frame.continuation;
            self.search(transport);
            return;
        }

        debug!(
            "[SDP] Resolved {} octets on conn {}",
            self.buffer.len(),
            self.conn.raw()
        );
        self.deliver();
        self.advance(transport, deferred);
    }

    /// Increment the transaction ID and send a request for the active query
    fn search<T: L2capChannelService>(&mut self, transport: &mut T) {
        let Some(query) = self.queue.peek_head() else {
            return;
        };

        self.transaction_id = self.transaction_id.wrapping_add(1);
        let pdu = match encode_search_request(
            self.transaction_id,
            &query.uuid,
            self.options.max_attribute_byte_count,
            &self.continuation,
        ) {
            Ok(pdu) => pdu,
            Err(e) => {
                error!("[SDP] Failed to encode request: {:?}", e);
                self.disconnect(transport);
                return;
            }
        };

        self.state = if self.continuation.is_empty() {
            SessionState::RequestSent
        } else {
            SessionState::Draining
        };

        if let Err(e) = transport.send(self.conn, &pdu) {
            error!("[SDP] Failed to send request on conn {}: {:?}", self.conn.raw(), e);
            self.disconnect(transport);
        }
    }

    /// Hand every buffered record to the active query's handler
    fn deliver(&mut self) {
        let Some(query) = self.queue.remove_head() else {
            return;
        };

        let mut delivered = 0usize;
        while let Some((data, next_record_hint)) = self.buffer.take_record() {
            delivered += 1;
            let result = DiscoverResult::Record {
                record: ServiceRecord::new(data),
                next_record_hint,
            };
            if query.handler.on_result(self.conn, &query.uuid, result) == DiscoverStep::Stop {
                break;
            }
        }

        if delivered == 0 {
            query.handler.on_result(
                self.conn,
                &query.uuid,
                DiscoverResult::NotResolved(ResolveFailure::NotFound),
            );
        }
    }

    /// Resolve the active query with zero records and move on
    fn fail<T: L2capChannelService>(
        &mut self,
        transport: &mut T,
        failure: ResolveFailure,
        deferred: &impl QuerySource<'q>,
    ) {
        if let Some(query) = self.queue.remove_head() {
            query
                .handler
                .on_result(self.conn, &query.uuid, DiscoverResult::NotResolved(failure));
        }
        self.advance(transport, deferred);
    }

    fn advance<T: L2capChannelService>(
        &mut self,
        transport: &mut T,
        deferred: &impl QuerySource<'q>,
    ) {
        self.buffer.reset();
        self.continuation.clear();
        self.state = SessionState::Idle;

        // Queries submitted from a handler join the queue before it is checked
        while !self.queue.is_full() {
            let Some(query) = deferred.take_for(self.conn) else {
                break;
            };
            if self.queue.push_back(query).is_err() {
                break;
            }
        }

        self.start_next(transport);
    }

    fn start_next<T: L2capChannelService>(&mut self, transport: &mut T) {
        match self.queue.peek_head() {
            Some(query) => {
                self.buffer.reset();
                self.buffer.set_capacity(query.buffer_size);
                self.continuation.clear();
                self.search(transport);
            }
            None => {
                self.state = SessionState::Idle;
                self.disconnect(transport);
            }
        }
    }

    /// Ask for the channel to close
    ///
    /// If the request itself fails the channel is treated as gone and the
    /// session closes at once.
    fn disconnect<T: L2capChannelService>(&mut self, transport: &mut T) {
        debug!("[SDP] Disconnecting SDP channel on conn {}", self.conn.raw());
        if let Err(e) = transport.disconnect(self.conn) {
            error!("[SDP] Failed to disconnect conn {}: {:?}", self.conn.raw(), e);
            self.on_disconnected();
        }
    }
}
