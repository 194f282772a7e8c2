//! Discovery queries and their results
//!
//! A [`UuidQuery`] names one service UUID to resolve on a remote device and
//! the [`DiscoverHandler`] that receives the outcome. Queries wait in a
//! per-session [`DiscoverQueue`] and are resolved strictly one at a time.

use super::{Uuid, record::ServiceRecord};
use crate::constants::{MAX_QUEUED_QUERIES, MAX_RECORD_BUFFER_SIZE};
use crate::SubmitError;
use bt_hci::param::ConnHandle;
use core::cell::RefCell;
use heapless::Deque;

/// Handler return value controlling record delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscoverStep {
    /// Deliver the next record of the batch, if any
    Continue,
    /// Discard the rest of the batch
    Stop,
}

/// Why a query resolved without records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResolveFailure {
    /// The remote has no record for the UUID
    NotFound,
    /// The remote answered with an Error Response carrying this code
    RemoteError(u16),
    /// The records did not fit the query's reassembly capacity
    CapacityExceeded,
}

/// Outcome delivered to a [`DiscoverHandler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverResult<'r> {
    /// One service record of a resolved batch
    Record {
        /// The record; valid only for the duration of the call
        record: ServiceRecord<'r>,
        /// More records follow in this batch
        next_record_hint: bool,
    },
    /// The query resolved with zero records
    NotResolved(ResolveFailure),
}

/// Receiver of discovery results
///
/// Called once per record of a resolved batch, or exactly once with
/// [`DiscoverResult::NotResolved`]. The return value is only consulted for
/// records.
pub trait DiscoverHandler {
    /// Handle one result for `uuid` on `conn`
    fn on_result(&self, conn: ConnHandle, uuid: &Uuid, result: DiscoverResult<'_>) -> DiscoverStep;
}

/// A UUID to resolve, with its handler and reassembly capacity
#[derive(Clone, Copy)]
pub struct UuidQuery<'q> {
    /// Service UUID to search for
    pub uuid: Uuid,
    /// Receiver of the results
    pub handler: &'q dyn DiscoverHandler,
    /// Bytes of reassembly buffer to reserve while resolving
    pub buffer_size: usize,
}

impl<'q> UuidQuery<'q> {
    /// Create a query using the full reassembly buffer
    #[must_use]
    pub fn new(uuid: Uuid, handler: &'q dyn DiscoverHandler) -> Self {
        Self {
            uuid,
            handler,
            buffer_size: MAX_RECORD_BUFFER_SIZE,
        }
    }

    /// Limit the reassembly capacity for this query
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Check the query can be served
    ///
    /// # Errors
    /// Returns `SubmitError::InvalidQuery` for a zero buffer size or one
    /// larger than the reassembly storage.
    pub fn validate(&self) -> Result<(), SubmitError> {
        if self.buffer_size == 0 || self.buffer_size > MAX_RECORD_BUFFER_SIZE {
            return Err(SubmitError::InvalidQuery);
        }
        Ok(())
    }
}

impl core::fmt::Debug for UuidQuery<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UuidQuery")
            .field("uuid", &self.uuid)
            .field("buffer_size", &self.buffer_size)
            .finish_non_exhaustive()
    }
}

/// FIFO of queries waiting on one session; the head is the active query
pub struct DiscoverQueue<'q> {
    queries: Deque<UuidQuery<'q>, MAX_QUEUED_QUERIES>,
}

impl<'q> DiscoverQueue<'q> {
    /// Create an empty queue
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queries: Deque::new(),
        }
    }

    /// Append a query
    ///
    /// # Errors
    /// Returns `SubmitError::QueueFull` when the queue is at capacity.
    pub fn push_back(&mut self, query: UuidQuery<'q>) -> Result<(), SubmitError> {
        self.queries
            .push_back(query)
            .map_err(|_| SubmitError::QueueFull)
    }

    /// The active query
    #[must_use]
    pub fn peek_head(&self) -> Option<&UuidQuery<'q>> {
        self.queries.front()
    }

    /// Unlink the active query
    pub fn remove_head(&mut self) -> Option<UuidQuery<'q>> {
        self.queries.pop_front()
    }

    /// Check for pending queries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Number of pending queries
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Check if another query can be queued
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.queries.is_full()
    }

    /// Drop all pending queries without notifying them
    pub fn clear(&mut self) {
        self.queries.clear();
    }
}

impl Default for DiscoverQueue<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of queries submitted while their session was busy
///
/// A session pulls the queries for its connection from here after each
/// result has been handed out and before it picks its next request.
pub trait QuerySource<'q> {
    /// Take the oldest query waiting for `conn`
    fn take_for(&self, conn: ConnHandle) -> Option<UuidQuery<'q>>;
}

impl<'q> QuerySource<'q> for () {
    fn take_for(&self, _conn: ConnHandle) -> Option<UuidQuery<'q>> {
        None
    }
}

/// Queries parked while the client was in use, oldest first
pub struct DeferredQueries<'q> {
    queries: Deque<(ConnHandle, UuidQuery<'q>), MAX_QUEUED_QUERIES>,
}

impl<'q> DeferredQueries<'q> {
    /// Create an empty inbox
    #[must_use]
    pub const fn new() -> Self {
        Self {
            queries: Deque::new(),
        }
    }

    /// Park a query for `conn`
    ///
    /// # Errors
    /// Returns `SubmitError::QueueFull` when the inbox is at capacity.
    pub fn push(&mut self, conn: ConnHandle, query: UuidQuery<'q>) -> Result<(), SubmitError> {
        self.queries
            .push_back((conn, query))
            .map_err(|_| SubmitError::QueueFull)
    }

    /// Take the oldest parked query, whatever its connection
    pub fn pop(&mut self) -> Option<(ConnHandle, UuidQuery<'q>)> {
        self.queries.pop_front()
    }

    /// Take the oldest parked query for `conn`
    pub fn take_for(&mut self, conn: ConnHandle) -> Option<UuidQuery<'q>> {
        let mut taken = None;
        for _ in 0..self.queries.len() {
            let Some(entry) = self.queries.pop_front() else {
                break;
            };
            if taken.is_none() && entry.0.raw() == conn.raw() {
                taken = Some(entry.1);
            } else if self.queries.push_back(entry).is_err() {
                break;
            }
        }
        taken
    }

    /// Number of parked queries
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Check for parked queries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

impl Default for DeferredQueries<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'q> QuerySource<'q> for RefCell<DeferredQueries<'q>> {
    fn take_for(&self, conn: ConnHandle) -> Option<UuidQuery<'q>> {
        self.try_borrow_mut().ok()?.take_for(conn)
    }
}
