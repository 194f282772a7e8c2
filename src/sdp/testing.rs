//! Test doubles shared by the client tests

use super::{DiscoverHandler, DiscoverResult, DiscoverStep, ResolveFailure, Uuid};
use crate::l2cap::{L2capChannelService, L2capError, ProtocolServiceMultiplexer};
use bt_hci::param::ConnHandle;
use core::cell::RefCell;
use heapless::Vec;

/// Transport call captured by [`MockTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(u16, ProtocolServiceMultiplexer, u16),
    Send(u16, Vec<u8, 64>),
    Disconnect(u16),
}

/// Records every transport call
#[derive(Debug, Default)]
pub struct MockTransport {
    pub calls: Vec<Call, 64>,
    pub fail_connect: bool,
    pub fail_send: bool,
    pub fail_disconnect: bool,
}

impl MockTransport {
    pub fn sent(&self) -> impl Iterator<Item = &[u8]> {
        self.calls.iter().filter_map(|call| match call {
            Call::Send(_, pdu) => Some(pdu.as_slice()),
            _ => None,
        })
    }

    pub fn sent_count(&self) -> usize {
        self.sent().count()
    }

    pub fn last_sent(&self) -> Option<&[u8]> {
        self.sent().last()
    }

    pub fn disconnect_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Disconnect(_)))
            .count()
    }

    pub fn connect_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Connect(..)))
            .count()
    }
}

impl L2capChannelService for MockTransport {
    fn connect(
        &mut self,
        conn: ConnHandle,
        psm: ProtocolServiceMultiplexer,
        rx_mtu: u16,
    ) -> Result<(), L2capError> {
        if self.fail_connect {
            return Err(L2capError::ChannelUnavailable);
        }
        self.calls
            .push(Call::Connect(conn.raw(), psm, rx_mtu))
            .map_err(|_| L2capError::PayloadTooLarge)
    }

    fn send(&mut self, conn: ConnHandle, pdu: &[u8]) -> Result<(), L2capError> {
        if self.fail_send {
            return Err(L2capError::NotConnected);
        }
        let pdu = Vec::from_slice(pdu).map_err(|()| L2capError::PayloadTooLarge)?;
        self.calls
            .push(Call::Send(conn.raw(), pdu))
            .map_err(|_| L2capError::PayloadTooLarge)
    }

    fn disconnect(&mut self, conn: ConnHandle) -> Result<(), L2capError> {
        if self.fail_disconnect {
            return Err(L2capError::NotConnected);
        }
        self.calls
            .push(Call::Disconnect(conn.raw()))
            .map_err(|_| L2capError::PayloadTooLarge)
    }
}

/// Result seen by [`RecordingHandler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Record {
        uuid: Uuid,
        data: Vec<u8, 128>,
        next_record_hint: bool,
    },
    NotResolved(Uuid, ResolveFailure),
}

/// Captures every result and answers with a fixed step
pub struct RecordingHandler {
    pub seen: RefCell<Vec<Seen, 16>>,
    pub stop_after: Option<usize>,
}

impl RecordingHandler {
    pub const fn new() -> Self {
        Self {
            seen: RefCell::new(Vec::new()),
            stop_after: None,
        }
    }

    pub const fn stopping_after(records: usize) -> Self {
        Self {
            seen: RefCell::new(Vec::new()),
            stop_after: Some(records),
        }
    }

    pub fn len(&self) -> usize {
        self.seen.borrow().len()
    }

    pub fn get(&self, index: usize) -> Seen {
        self.seen.borrow()[index].clone()
    }

    pub fn record_bytes(&self) -> usize {
        self.seen
            .borrow()
            .iter()
            .map(|seen| match seen {
                Seen::Record { data, .. } => data.len(),
                Seen::NotResolved(..) => 0,
            })
            .sum()
    }
}

impl DiscoverHandler for RecordingHandler {
    fn on_result(&self, _conn: ConnHandle, uuid: &Uuid, result: DiscoverResult<'_>) -> DiscoverStep {
        let mut seen = self.seen.borrow_mut();
        let entry = match result {
            DiscoverResult::Record {
                record,
                next_record_hint,
            } => Seen::Record {
                uuid: *uuid,
                data: Vec::from_slice(record.as_bytes()).unwrap(),
                next_record_hint,
            },
            DiscoverResult::NotResolved(failure) => Seen::NotResolved(*uuid, failure),
        };
        seen.push(entry).unwrap();

        let records = seen
            .iter()
            .filter(|seen| matches!(seen, Seen::Record { .. }))
            .count();
        match self.stop_after {
            Some(limit) if records >= limit => DiscoverStep::Stop,
            _ => DiscoverStep::Continue,
        }
    }
}

/// Build a response PDU around `parameters`
pub fn response(pdu_id: u8, transaction_id: u16, parameters: &[u8]) -> Vec<u8, 256> {
    let mut pdu = Vec::new();
    let [tid_hi, tid_lo] = transaction_id.to_be_bytes();
    let [len_hi, len_lo] = (parameters.len() as u16).to_be_bytes();
    pdu.extend_from_slice(&[pdu_id, tid_hi, tid_lo, len_hi, len_lo])
        .unwrap();
    pdu.extend_from_slice(parameters).unwrap();
    pdu
}

/// Build a Service Search Attribute response frame
pub fn ssa_response(transaction_id: u16, attribute_bytes: &[u8], continuation: &[u8]) -> Vec<u8, 256> {
    let mut params: Vec<u8, 256> = Vec::new();
    params
        .extend_from_slice(&(attribute_bytes.len() as u16).to_be_bytes())
        .unwrap();
    params.extend_from_slice(attribute_bytes).unwrap();
    params.push(continuation.len() as u8).unwrap();
    params.extend_from_slice(continuation).unwrap();
    response(0x07, transaction_id, &params)
}

/// Transaction ID of an encoded request
pub fn request_tid(pdu: &[u8]) -> u16 {
    u16::from_be_bytes([pdu[1], pdu[2]])
}

/// Continuation bytes trailing an encoded request
pub fn request_continuation(pdu: &[u8]) -> &[u8] {
    // Header (5) + pattern + max byte count (2) + attribute list (7)
    let pattern_len = 2 + usize::from(pdu[6]);
    let offset = 5 + pattern_len + 2 + 7;
    let len = usize::from(pdu[offset]);
    &pdu[offset + 1..offset + 1 + len]
}
