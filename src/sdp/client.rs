//! SDP Client Implementation
//!
//! This module provides the session pool: at most one [`Session`] per ACL
//! connection, created on the first discovery request for that connection and
//! released when its SDP channel closes.

use super::{DeferredQueries, QuerySource, Session, SessionState, UuidQuery};
use crate::{
    SdpClientOptions, SubmitError, constants::MAX_SESSIONS, l2cap::L2capChannelService,
};
use bt_hci::param::ConnHandle;
use core::cell::RefCell;
use embassy_sync::blocking_mutex::{Mutex, raw::RawMutex};

/// SDP Client
///
/// Owns the channel service and a fixed table of sessions. Every entry point
/// is non-blocking; protocol progress is driven by the channel events fed in
/// through `on_connected`, `on_received` and `on_disconnected`.
pub struct SdpClient<'q, T: L2capChannelService, const SESSIONS: usize = MAX_SESSIONS> {
    transport: T,
    options: SdpClientOptions,
    sessions: [Option<Session<'q>>; SESSIONS],
}

impl<'q, T: L2capChannelService, const SESSIONS: usize> SdpClient<'q, T, SESSIONS> {
    /// Create new SDP client with default options
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, SdpClientOptions::default())
    }

    /// Create new SDP client
    #[must_use]
    pub fn with_options(transport: T, options: SdpClientOptions) -> Self {
        Self {
            transport,
            options,
            sessions: core::array::from_fn(|_| None),
        }
    }

    /// Queue a UUID query for the remote on `conn`
    ///
    /// The first query for a connection opens its SDP channel; later queries
    /// wait behind the ones already queued.
    ///
    /// # Errors
    /// - `InvalidQuery` if the query cannot be served
    /// - `NoSessionCapacity` if every session slot is taken
    /// - `QueueFull` if the session's queue is full
    /// - `ChannelUnavailable` if the channel could not be requested
    pub fn discover(&mut self, conn: ConnHandle, query: UuidQuery<'q>) -> Result<(), SubmitError> {
        query.validate()?;

        if let Some(session) = self.session_mut(conn) {
            return session.enqueue(query);
        }

        let Some(slot) = self.sessions.iter_mut().find(|slot| slot.is_none()) else {
            warn!("[SDP POOL] No free session for conn {}", conn.raw());
            return Err(SubmitError::NoSessionCapacity);
        };

        let mut session = Session::new(conn, self.options);
        session.enqueue(query)?;
        session.connect(&mut self.transport).map_err(|e| {
            error!("[SDP POOL] Channel request failed on conn {}: {:?}", conn.raw(), e);
            SubmitError::ChannelUnavailable
        })?;

        *slot = Some(session);
        debug!("[SDP POOL] Session created for conn {}", conn.raw());
        Ok(())
    }

    /// SDP channel on `conn` is open
    pub fn on_connected(&mut self, conn: ConnHandle) {
        let Some(session) = Self::find(&mut self.sessions, conn) else {
            warn!("[SDP POOL] Connect for unknown conn {}", conn.raw());
            return;
        };
        session.on_connected(&mut self.transport);
        self.release_closed();
    }

    /// PDU received on the SDP channel of `conn`
    pub fn on_received(&mut self, conn: ConnHandle, pdu: &[u8]) {
        self.on_received_from(conn, pdu, &());
    }

    /// PDU received on the SDP channel of `conn`
    ///
    /// Queries for `conn` found in `deferred` once the active query has been
    /// answered are queued before the session picks its next request.
    pub fn on_received_from(
        &mut self,
        conn: ConnHandle,
        pdu: &[u8],
        deferred: &impl QuerySource<'q>,
    ) {
        let Some(session) = Self::find(&mut self.sessions, conn) else {
            warn!("[SDP POOL] PDU for unknown conn {}", conn.raw());
            return;
        };
        session.on_received_from(&mut self.transport, pdu, deferred);
        self.release_closed();
    }

    /// SDP channel on `conn` closed; its slot is released
    pub fn on_disconnected(&mut self, conn: ConnHandle) {
        let Some(slot) = self
            .sessions
            .iter_mut()
            .find(|slot| matches!(slot, Some(session) if session.conn().raw() == conn.raw()))
        else {
            debug!("[SDP POOL] Disconnect for unknown conn {}", conn.raw());
            return;
        };

        if let Some(session) = slot.as_mut() {
            session.on_disconnected();
        }
        *slot = None;
        debug!("[SDP POOL] Session released for conn {}", conn.raw());
    }

    /// Session serving `conn`
    #[must_use]
    pub fn session(&self, conn: ConnHandle) -> Option<&Session<'q>> {
        self.sessions
            .iter()
            .flatten()
            .find(|session| session.conn().raw() == conn.raw())
    }

    /// Number of live sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.iter().flatten().count()
    }

    /// Client options
    #[must_use]
    pub const fn options(&self) -> &SdpClientOptions {
        &self.options
    }

    /// Channel service
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Channel service, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn release_closed(&mut self) {
        for slot in &mut self.sessions {
            let closed = slot
                .as_ref()
                .filter(|session| session.state() == SessionState::Closed)
                .map(Session::conn);
            if let Some(conn) = closed {
                *slot = None;
                warn!("[SDP POOL] Session dropped for conn {}", conn.raw());
            }
        }
    }

    fn session_mut(&mut self, conn: ConnHandle) -> Option<&mut Session<'q>> {
        Self::find(&mut self.sessions, conn)
    }

    fn find<'s>(
        sessions: &'s mut [Option<Session<'q>>; SESSIONS],
        conn: ConnHandle,
    ) -> Option<&'s mut Session<'q>> {
        sessions
            .iter_mut()
            .flatten()
            .find(|session| session.conn().raw() == conn.raw())
    }
}

/// SDP client shared between tasks
///
/// Each call holds the lock for the whole event. Handlers run under the lock
/// and may call [`discover`](Self::discover): the query is parked and joins
/// its session's queue as soon as the active query has been answered.
///
/// # Panics
/// Calling any other method from inside a handler panics.
pub struct SharedSdpClient<
    'q,
    M: RawMutex,
    T: L2capChannelService,
    const SESSIONS: usize = MAX_SESSIONS,
> {
    inner: Mutex<M, SharedState<'q, T, SESSIONS>>,
}

struct SharedState<'q, T: L2capChannelService, const SESSIONS: usize> {
    client: RefCell<SdpClient<'q, T, SESSIONS>>,
    deferred: RefCell<DeferredQueries<'q>>,
}

impl<'q, M: RawMutex, T: L2capChannelService, const SESSIONS: usize>
    SharedSdpClient<'q, M, T, SESSIONS>
{
    /// Wrap a client
    #[must_use]
    pub const fn new(client: SdpClient<'q, T, SESSIONS>) -> Self {
        Self {
            inner: Mutex::new(SharedState {
                client: RefCell::new(client),
                deferred: RefCell::new(DeferredQueries::new()),
            }),
        }
    }

    /// See [`SdpClient::discover`]
    ///
    /// From inside a handler the query is only validated and parked.
    ///
    /// # Errors
    /// Same as [`SdpClient::discover`]. A parked query reports `QueueFull`
    /// when too many are already waiting.
    pub fn discover(&self, conn: ConnHandle, query: UuidQuery<'q>) -> Result<(), SubmitError> {
        self.inner.lock(|state| {
            if let Ok(mut client) = state.client.try_borrow_mut() {
                return client.discover(conn, query);
            }

            query.validate()?;
            debug!("[SDP POOL] Client busy, parking query for conn {}", conn.raw());
            state.deferred.borrow_mut().push(conn, query)
        })
    }

    /// See [`SdpClient::on_connected`]
    pub fn on_connected(&self, conn: ConnHandle) {
        self.with_client(|client| client.on_connected(conn));
    }

    /// See [`SdpClient::on_received`]
    pub fn on_received(&self, conn: ConnHandle, pdu: &[u8]) {
        self.inner.lock(|state| {
            let mut client = state.client.borrow_mut();
            client.on_received_from(conn, pdu, &state.deferred);
            Self::submit_deferred(&mut client, &state.deferred);
        });
    }

    /// See [`SdpClient::on_disconnected`]
    pub fn on_disconnected(&self, conn: ConnHandle) {
        self.with_client(|client| client.on_disconnected(conn));
    }

    /// Run `f` with exclusive access to the client
    pub fn with_client<R>(&self, f: impl FnOnce(&mut SdpClient<'q, T, SESSIONS>) -> R) -> R {
        self.inner.lock(|state| {
            let mut client = state.client.borrow_mut();
            let result = f(&mut client);
            Self::submit_deferred(&mut client, &state.deferred);
            result
        })
    }

    /// Queries parked but not yet handed to a session
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.inner.lock(|state| state.deferred.borrow().len())
    }

    fn submit_deferred(
        client: &mut SdpClient<'q, T, SESSIONS>,
        deferred: &RefCell<DeferredQueries<'q>>,
    ) {
        loop {
            let next = deferred.borrow_mut().pop();
            let Some((conn, query)) = next else {
                break;
            };
            if let Err(e) = client.discover(conn, query) {
                warn!("[SDP POOL] Parked query for conn {} dropped: {:?}", conn.raw(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    extern crate std;

    use crate::sdp::{
        DiscoverHandler, DiscoverResult, DiscoverStep, ResolveFailure, Uuid,
        testing::{Call, MockTransport, RecordingHandler, Seen, request_tid, ssa_response},
    };
    use core::cell::Cell;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use std::boxed::Box;

    type Shared = SharedSdpClient<'static, NoopRawMutex, MockTransport>;

    const TWO_RECORD_LIST: [u8; 8] = [0x35, 0x06, 0x35, 0x01, 0xA1, 0x35, 0x01, 0xA2];

    /// Records results and queues a follow-up query from inside the callback
    struct Resubmit {
        shared: &'static Shared,
        followup: &'static RecordingHandler,
        seen: RecordingHandler,
        submitted: Cell<Option<Result<(), SubmitError>>>,
    }

    impl DiscoverHandler for Resubmit {
        fn on_result(&self, conn: ConnHandle, uuid: &Uuid, result: DiscoverResult<'_>) -> DiscoverStep {
            let step = self.seen.on_result(conn, uuid, result);
            if self.submitted.get().is_none() {
                let query = UuidQuery::new(Uuid::Uuid16(0x110B), self.followup);
                self.submitted.set(Some(self.shared.discover(conn, query)));
            }
            step
        }
    }

    fn conn(raw: u16) -> ConnHandle {
        ConnHandle::new(raw)
    }

    #[test]
    fn test_discover_creates_session() {
        let handler = RecordingHandler::new();
        let mut client: SdpClient<'_, MockTransport> = SdpClient::new(MockTransport::default());

        client
            .discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x110A), &handler))
            .unwrap();

        assert_eq!(client.session_count(), 1);
        assert_eq!(
            client.session(conn(1)).unwrap().state(),
            SessionState::AwaitingConnect
        );
        assert_eq!(client.transport().calls[0], Call::Connect(1, 0x0001, 64));
    }

    #[test]
    fn test_second_query_only_enqueues() {
        let handler = RecordingHandler::new();
        let mut client: SdpClient<'_, MockTransport> = SdpClient::new(MockTransport::default());
        let query = UuidQuery::new(Uuid::Uuid16(0x110A), &handler);

        client.discover(conn(1), query).unwrap();
        client.on_connected(conn(1));
        client.discover(conn(1), query).unwrap();

        assert_eq!(client.session_count(), 1);
        assert_eq!(client.transport().connect_count(), 1);
        assert_eq!(client.transport().sent_count(), 1);
        assert_eq!(client.session(conn(1)).unwrap().pending(), 2);
    }

    #[test]
    fn test_pool_capacity() {
        let handler = RecordingHandler::new();
        let mut client: SdpClient<'_, MockTransport, 2> = SdpClient::new(MockTransport::default());
        let query = UuidQuery::new(Uuid::Uuid16(0x110A), &handler);

        client.discover(conn(1), query).unwrap();
        client.discover(conn(2), query).unwrap();
        assert_eq!(
            client.discover(conn(3), query),
            Err(SubmitError::NoSessionCapacity)
        );

        // Slot is reusable once a channel closes
        client.on_disconnected(conn(1));
        assert!(client.session(conn(1)).is_none());
        client.discover(conn(3), query).unwrap();
        assert_eq!(client.session_count(), 2);
    }

    #[test]
    fn test_invalid_query_rejected() {
        let handler = RecordingHandler::new();
        let mut client: SdpClient<'_, MockTransport> = SdpClient::new(MockTransport::default());
        let query = UuidQuery::new(Uuid::Uuid16(0x110A), &handler).with_buffer_size(0);

        assert_eq!(client.discover(conn(1), query), Err(SubmitError::InvalidQuery));
        assert_eq!(client.session_count(), 0);
        assert!(client.transport().calls.is_empty());
    }

    #[test]
    fn test_channel_unavailable_frees_slot() {
        let handler = RecordingHandler::new();
        let transport = MockTransport {
            fail_connect: true,
            ..MockTransport::default()
        };
        let mut client: SdpClient<'_, MockTransport> = SdpClient::new(transport);

        assert_eq!(
            client.discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x110A), &handler)),
            Err(SubmitError::ChannelUnavailable)
        );
        assert_eq!(client.session_count(), 0);
    }

    #[test]
    fn test_events_for_unknown_conn_ignored() {
        let mut client: SdpClient<'_, MockTransport> = SdpClient::new(MockTransport::default());

        client.on_connected(conn(9));
        client.on_received(conn(9), &ssa_response(1, &[0x35, 0x00], &[]));
        client.on_disconnected(conn(9));

        assert!(client.transport().calls.is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = RecordingHandler::new();
        let second = RecordingHandler::new();
        let mut client: SdpClient<'_, MockTransport> = SdpClient::new(MockTransport::default());

        client
            .discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x1101), &first))
            .unwrap();
        client
            .discover(conn(2), UuidQuery::new(Uuid::Uuid16(0x1101), &second))
            .unwrap();
        client.on_connected(conn(1));
        client.on_connected(conn(2));

        client.on_received(conn(2), &ssa_response(1, &[0x35, 0x00], &[]));

        assert_eq!(first.len(), 0);
        assert_eq!(second.len(), 1);
        assert_eq!(
            client.session(conn(1)).unwrap().state(),
            SessionState::RequestSent
        );
        assert_eq!(client.transport().disconnect_count(), 1);
    }

    #[test]
    fn test_custom_options() {
        let handler = RecordingHandler::new();
        let options = SdpClientOptions {
            rx_mtu: 128,
            max_attribute_byte_count: 0x0200,
        };
        let mut client: SdpClient<'_, MockTransport> =
            SdpClient::with_options(MockTransport::default(), options);

        client
            .discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x110A), &handler))
            .unwrap();
        client.on_connected(conn(1));

        assert_eq!(client.transport().calls[0], Call::Connect(1, 0x0001, 128));
        let request = client.transport().last_sent().unwrap();
        assert_eq!(&request[10..12], &[0x02, 0x00]);
    }

    #[test]
    fn test_shared_client() {
        let handler = RecordingHandler::new();
        let shared: SharedSdpClient<'_, NoopRawMutex, MockTransport> =
            SharedSdpClient::new(SdpClient::new(MockTransport::default()));

        shared
            .discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x110A), &handler))
            .unwrap();
        shared.on_connected(conn(1));

        let tid = shared.with_client(|client| request_tid(client.transport().last_sent().unwrap()));
        shared.on_received(conn(1), &ssa_response(tid, &[0x35, 0x00], &[]));
        shared.on_disconnected(conn(1));

        assert_eq!(handler.len(), 1);
        assert_eq!(shared.with_client(|client| client.session_count()), 0);
    }

    #[test]
    fn test_handler_resubmits_same_conn() {
        let shared: &'static Shared =
            Box::leak(Box::new(SharedSdpClient::new(SdpClient::new(MockTransport::default()))));
        let followup: &'static RecordingHandler = Box::leak(Box::new(RecordingHandler::new()));
        let first: &'static Resubmit = Box::leak(Box::new(Resubmit {
            shared,
            followup,
            seen: RecordingHandler::new(),
            submitted: Cell::new(None),
        }));

        shared
            .discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x110A), first))
            .unwrap();
        shared.on_connected(conn(1));

        let tid = shared.with_client(|client| request_tid(client.transport().last_sent().unwrap()));
        shared.on_received(conn(1), &ssa_response(tid, &[0x35, 0x00], &[]));

        assert_eq!(
            first.seen.get(0),
            Seen::NotResolved(Uuid::Uuid16(0x110A), ResolveFailure::NotFound)
        );
        assert_eq!(first.submitted.get(), Some(Ok(())));
        assert_eq!(shared.deferred_count(), 0);

        // Follow-up is in flight on the same channel, which stays open
        let next_tid = shared.with_client(|client| {
            assert_eq!(client.transport().disconnect_count(), 0);
            assert_eq!(client.transport().sent_count(), 2);
            let request = client.transport().last_sent().unwrap();
            assert_eq!(&request[8..10], &[0x11, 0x0B]);
            assert_eq!(
                client.session(conn(1)).unwrap().state(),
                SessionState::RequestSent
            );
            request_tid(request)
        });
        assert_eq!(next_tid, tid.wrapping_add(1));

        shared.on_received(conn(1), &ssa_response(next_tid, &[0x35, 0x00], &[]));
        assert_eq!(
            followup.get(0),
            Seen::NotResolved(Uuid::Uuid16(0x110B), ResolveFailure::NotFound)
        );
        assert_eq!(first.seen.len(), 1);
        assert_eq!(shared.with_client(|client| client.transport().disconnect_count()), 1);
    }

    #[test]
    fn test_handler_resubmits_during_batch() {
        let shared: &'static Shared =
            Box::leak(Box::new(SharedSdpClient::new(SdpClient::new(MockTransport::default()))));
        let followup: &'static RecordingHandler = Box::leak(Box::new(RecordingHandler::new()));
        let first: &'static Resubmit = Box::leak(Box::new(Resubmit {
            shared,
            followup,
            seen: RecordingHandler::new(),
            submitted: Cell::new(None),
        }));

        shared
            .discover(conn(1), UuidQuery::new(Uuid::Uuid16(0x110A), first))
            .unwrap();
        shared.on_connected(conn(1));
        shared.on_received(conn(1), &ssa_response(1, &TWO_RECORD_LIST, &[]));

        // Follow-up waits for the whole batch, then goes out on the same channel
        assert_eq!(first.seen.len(), 2);
        assert_eq!(shared.deferred_count(), 0);
        shared.with_client(|client| {
            assert_eq!(client.session(conn(1)).unwrap().pending(), 1);
            assert_eq!(client.transport().sent_count(), 2);
        });
    }

    #[test]
    fn test_disconnect_failure_releases_slot() {
        let handler = RecordingHandler::new();
        let transport = MockTransport {
            fail_disconnect: true,
            ..MockTransport::default()
        };
        let mut client: SdpClient<'_, MockTransport, 1> = SdpClient::new(transport);
        let query = UuidQuery::new(Uuid::Uuid16(0x110A), &handler);

        client.discover(conn(1), query).unwrap();
        client.on_connected(conn(1));
        client.on_received(conn(1), &ssa_response(1, &[0x35, 0x00], &[]));

        assert_eq!(handler.len(), 1);
        assert_eq!(client.session_count(), 0);

        // A new query opens a fresh channel instead of waiting forever
        client.discover(conn(1), query).unwrap();
        assert_eq!(client.transport().connect_count(), 2);
        assert_eq!(
            client.session(conn(1)).unwrap().state(),
            SessionState::AwaitingConnect
        );
    }
}
