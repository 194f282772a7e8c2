//! SDP Protocol Implementation
//!
//! This module implements the SDP PDU codec used by the client: encoding of
//! Service Search Attribute requests and decoding of response envelopes,
//! Service Search Attribute response frames and Error responses.
//!
//! All decode routines copy fixed-size fields out into value types; nothing
//! here holds state between PDUs.

use super::{
    SdpError, SdpPduId, TransactionId, Uuid,
    attribute::AttributeRange,
    record::descriptor,
};
use crate::constants::{MAX_CONTINUATION_STATE_LEN, MAX_SDP_REQUEST_SIZE, SDP_HEADER_SIZE};
use heapless::Vec;

/// Encoded request PDU
pub type RequestPdu = Vec<u8, MAX_SDP_REQUEST_SIZE>;

/// SDP PDU Header
///
/// All SDP messages start with this 5-byte header containing the PDU ID,
/// transaction ID, and parameter length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdpPduHeader {
    /// PDU identifier
    pub pdu_id: SdpPduId,
    /// Transaction identifier
    pub transaction_id: TransactionId,
    /// Length of parameters following the header
    pub parameter_length: u16,
}

/// A received PDU split into header and parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdpEnvelope<'a> {
    /// Decoded header
    pub header: SdpPduHeader,
    /// Parameter bytes, exactly `header.parameter_length` long
    pub parameters: &'a [u8],
}

/// Continuation state returned by the server to resume a truncated response
///
/// Only the first `length` bytes of `data` are meaningful. A zero length means
/// no continuation: the next request starts a fresh transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContinuationState {
    length: u8,
    data: [u8; MAX_CONTINUATION_STATE_LEN],
}

/// Service Search Attribute response parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SsaResponseFrame<'a> {
    /// Attribute list bytes carried in this frame
    pub attribute_bytes: &'a [u8],
    /// Continuation state trailing the attribute bytes
    pub continuation: ContinuationState,
}

impl SdpPduHeader {
    /// Create new PDU header
    #[must_use]
    pub const fn new(
        pdu_id: SdpPduId,
        transaction_id: TransactionId,
        parameter_length: u16,
    ) -> Self {
        Self {
            pdu_id,
            transaction_id,
            parameter_length,
        }
    }

    /// Encode header to bytes
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self) -> [u8; SDP_HEADER_SIZE] {
        [
            self.pdu_id as u8,
            (self.transaction_id >> 8) as u8,
            self.transaction_id as u8,
            (self.parameter_length >> 8) as u8,
            self.parameter_length as u8,
        ]
    }

    /// Decode header from bytes
    ///
    /// # Errors
    /// Returns `TruncatedHeader` if fewer than 5 bytes are available and
    /// `UnexpectedPdu` for an unknown PDU ID.
    pub fn decode(data: &[u8]) -> Result<Self, SdpError> {
        if data.len() < SDP_HEADER_SIZE {
            return Err(SdpError::TruncatedHeader);
        }

        let pdu_id = SdpPduId::from_u8(data[0]).ok_or(SdpError::UnexpectedPdu(data[0]))?;
        let transaction_id = (u16::from(data[1]) << 8) | u16::from(data[2]);
        let parameter_length = (u16::from(data[3]) << 8) | u16::from(data[4]);

        Ok(Self {
            pdu_id,
            transaction_id,
            parameter_length,
        })
    }
}

impl ContinuationState {
    /// No continuation
    pub const EMPTY: Self = Self {
        length: 0,
        data: [0; MAX_CONTINUATION_STATE_LEN],
    };

    /// Copy continuation bytes into a state value
    ///
    /// # Errors
    /// Returns `InvalidContinuationState` if `bytes` is longer than 16.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SdpError> {
        if bytes.len() > MAX_CONTINUATION_STATE_LEN {
            return Err(SdpError::InvalidContinuationState(
                bytes.len().min(usize::from(u8::MAX)) as u8,
            ));
        }

        let mut state = Self::EMPTY;
        state.data[..bytes.len()].copy_from_slice(bytes);
        state.length = bytes.len() as u8;
        Ok(state)
    }

    /// Decode a continuation block (length byte plus data)
    ///
    /// Returns the state and the number of bytes consumed.
    ///
    /// # Errors
    /// Returns `InvalidContinuationState` for a length above 16 and
    /// `FrameOverrun` if the block runs past `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize), SdpError> {
        let (&length, rest) = bytes.split_first().ok_or(SdpError::FrameOverrun)?;
        if usize::from(length) > MAX_CONTINUATION_STATE_LEN {
            return Err(SdpError::InvalidContinuationState(length));
        }

        let data = rest
            .get(..usize::from(length))
            .ok_or(SdpError::FrameOverrun)?;
        Ok((Self::from_slice(data)?, 1 + data.len()))
    }

    /// Check for "no continuation"
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Number of meaningful bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length as usize
    }

    /// Meaningful bytes
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    /// Forget the continuation
    pub fn clear(&mut self) {
        *self = Self::EMPTY;
    }
}

impl<'a> SsaResponseFrame<'a> {
    /// Parse and validate Service Search Attribute response parameters
    ///
    /// # Errors
    /// Returns `InvalidAttributeByteCount` for a count below 2,
    /// `InvalidContinuationState` for continuation data longer than 16 bytes
    /// and `FrameOverrun` if the count or continuation run past the parameters.
    pub fn parse(parameters: &'a [u8]) -> Result<Self, SdpError> {
        let count_bytes = parameters.get(..2).ok_or(SdpError::FrameOverrun)?;
        let count = u16::from_be_bytes([count_bytes[0], count_bytes[1]]);
        if count < 2 {
            return Err(SdpError::InvalidAttributeByteCount(count));
        }

        let count = usize::from(count);
        let attribute_bytes = parameters
            .get(2..2 + count)
            .ok_or(SdpError::FrameOverrun)?;
        let (continuation, _) = ContinuationState::decode(&parameters[2 + count..])?;

        if count + continuation.len() > parameters.len() {
            return Err(SdpError::FrameOverrun);
        }

        Ok(Self {
            attribute_bytes,
            continuation,
        })
    }

    /// Check for the empty attribute list sent when no record matches
    #[must_use]
    pub const fn is_empty_list(&self) -> bool {
        self.attribute_bytes.len() == 2 && self.continuation.is_empty()
    }
}

/// Split a received PDU into header and parameters
///
/// # Errors
/// Returns `TruncatedHeader` for fewer than 5 bytes, `UnexpectedPdu` for an
/// unknown PDU ID and `LengthMismatch` if the declared parameter length is not
/// the number of bytes following the header.
pub fn decode_envelope(pdu: &[u8]) -> Result<SdpEnvelope<'_>, SdpError> {
    let header = SdpPduHeader::decode(pdu)?;
    let parameters = &pdu[SDP_HEADER_SIZE..];

    if usize::from(header.parameter_length) != parameters.len() {
        return Err(SdpError::LengthMismatch {
            declared: header.parameter_length,
            actual: parameters.len(),
        });
    }

    Ok(SdpEnvelope { header, parameters })
}

/// Read a data element sequence header
///
/// Returns the sequence byte length and the bytes consumed. Tags other than
/// `SEQ8` and `SEQ16` consume only the tag and report length 0.
///
/// # Errors
/// Returns `InvalidData` if the header is truncated.
pub fn decode_sequence_header(bytes: &[u8]) -> Result<(usize, usize), SdpError> {
    let (&tag, rest) = bytes.split_first().ok_or(SdpError::InvalidData)?;

    match tag {
        descriptor::SEQ8 => {
            let len = rest.first().ok_or(SdpError::InvalidData)?;
            Ok((usize::from(*len), 2))
        }
        descriptor::SEQ16 => {
            let len = rest.get(..2).ok_or(SdpError::InvalidData)?;
            Ok((usize::from(u16::from_be_bytes([len[0], len[1]])), 3))
        }
        _ => {
            warn!("[SDP] Sequence type {} not handled", tag);
            Ok((0, 1))
        }
    }
}

/// Decode the error code of an Error Response
///
/// # Errors
/// Returns `InvalidData` if the parameters are shorter than 2 bytes.
pub fn decode_error_code(parameters: &[u8]) -> Result<u16, SdpError> {
    let code = parameters.get(..2).ok_or(SdpError::InvalidData)?;
    Ok(u16::from_be_bytes([code[0], code[1]]))
}

fn push_all(pdu: &mut RequestPdu, bytes: &[u8]) -> Result<(), SdpError> {
    pdu.extend_from_slice(bytes)
        .map_err(|()| SdpError::BufferTooSmall)
}

/// Encode a Service Search Attribute request for all attributes of `uuid`
///
/// The search pattern holds the single UUID; the attribute ID list requests
/// the full range `0x0000..=0xFFFF`. An empty `continuation` starts a fresh
/// transfer.
///
/// # Errors
/// Returns `BufferTooSmall` if the request does not fit the PDU buffer.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_search_request(
    transaction_id: TransactionId,
    uuid: &Uuid,
    max_attribute_byte_count: u16,
    continuation: &ContinuationState,
) -> Result<RequestPdu, SdpError> {
    let mut pdu = RequestPdu::new();

    // Parameter length is patched once the body is known
    let header = SdpPduHeader::new(SdpPduId::ServiceSearchAttributeRequest, transaction_id, 0);
    push_all(&mut pdu, &header.encode())?;

    // Service search pattern
    push_all(&mut pdu, &[descriptor::SEQ8, 1 + uuid.width() as u8])?;
    match *uuid {
        Uuid::Uuid16(value) => {
            push_all(&mut pdu, &[descriptor::UUID16])?;
            push_all(&mut pdu, &value.to_be_bytes())?;
        }
        Uuid::Uuid32(value) => {
            push_all(&mut pdu, &[descriptor::UUID32])?;
            push_all(&mut pdu, &value.to_be_bytes())?;
        }
        Uuid::Uuid128(value) => {
            push_all(&mut pdu, &[descriptor::UUID128])?;
            push_all(&mut pdu, &value.to_be_bytes())?;
        }
    }

    push_all(&mut pdu, &max_attribute_byte_count.to_be_bytes())?;

    // Attribute ID list
    push_all(&mut pdu, &[descriptor::SEQ8, 5, descriptor::UINT32])?;
    push_all(&mut pdu, &AttributeRange::FULL.to_u32().to_be_bytes())?;

    push_all(&mut pdu, &[continuation.len() as u8])?;
    push_all(&mut pdu, continuation.as_slice())?;

    let parameter_length = (pdu.len() - SDP_HEADER_SIZE) as u16;
    pdu[3..SDP_HEADER_SIZE].copy_from_slice(&parameter_length.to_be_bytes());

    Ok(pdu)
}
