//! Service Discovery Protocol (SDP) Client
//!
//! This module implements the client side of the Bluetooth Service Discovery Protocol:
//! Service Search Attribute requests are issued per queued UUID, fragmented responses are
//! reassembled across continuation states and each resulting service record is handed to
//! the application one at a time.

/// Transaction ID for SDP requests/responses
pub type TransactionId = u16;

pub mod attribute;
pub mod client;
pub mod discover;
pub mod protocol;
pub mod reassembly;
pub mod record;
pub mod session;
pub mod uuid;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use attribute::{AttributeListParser, AttributeRange, UniversalAttributeId};
pub use client::{SdpClient, SharedSdpClient};
pub use discover::{
    DeferredQueries, DiscoverHandler, DiscoverQueue, DiscoverResult, DiscoverStep, QuerySource,
    ResolveFailure, UuidQuery,
};
pub use protocol::{ContinuationState, SdpEnvelope, SdpPduHeader};
pub use reassembly::ReassemblyBuffer;
pub use record::{AttributeId, DataElement, ServiceClassId, ServiceRecord};
pub use session::{Session, SessionState};
pub use uuid::Uuid;

/// SDP Protocol Data Unit IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SdpPduId {
    /// Reserved PDU ID
    Reserved = 0x00,
    /// Error Response
    ErrorResponse = 0x01,
    /// Service Search Request
    ServiceSearchRequest = 0x02,
    /// Service Search Response
    ServiceSearchResponse = 0x03,
    /// Service Attribute Request
    ServiceAttributeRequest = 0x04,
    /// Service Attribute Response
    ServiceAttributeResponse = 0x05,
    /// Service Search Attribute Request
    ServiceSearchAttributeRequest = 0x06,
    /// Service Search Attribute Response
    ServiceSearchAttributeResponse = 0x07,
}

impl SdpPduId {
    /// Create from the raw PDU ID octet
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Reserved),
            0x01 => Some(Self::ErrorResponse),
            0x02 => Some(Self::ServiceSearchRequest),
            0x03 => Some(Self::ServiceSearchResponse),
            0x04 => Some(Self::ServiceAttributeRequest),
            0x05 => Some(Self::ServiceAttributeResponse),
            0x06 => Some(Self::ServiceSearchAttributeRequest),
            0x07 => Some(Self::ServiceSearchAttributeResponse),
            _ => None,
        }
    }
}

/// SDP Error Codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum SdpErrorCode {
    /// Invalid/unsupported SDP version
    InvalidVersion = 0x0001,
    /// Invalid Service Record Handle
    InvalidServiceRecordHandle = 0x0002,
    /// Invalid request syntax
    InvalidRequestSyntax = 0x0003,
    /// Invalid PDU size
    InvalidPduSize = 0x0004,
    /// Invalid continuation state
    InvalidContinuationState = 0x0005,
    /// Insufficient resources to satisfy request
    InsufficientResources = 0x0006,
}

impl SdpErrorCode {
    /// Create from the raw 16-bit error code carried in an Error Response
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::InvalidVersion),
            0x0002 => Some(Self::InvalidServiceRecordHandle),
            0x0003 => Some(Self::InvalidRequestSyntax),
            0x0004 => Some(Self::InvalidPduSize),
            0x0005 => Some(Self::InvalidContinuationState),
            0x0006 => Some(Self::InsufficientResources),
            _ => None,
        }
    }
}

/// SDP Error Types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SdpError {
    /// Fewer bytes than the 5-byte PDU header
    TruncatedHeader,
    /// Declared parameter length differs from the bytes that follow the header
    LengthMismatch {
        /// Parameter length from the header
        declared: u16,
        /// Bytes actually following the header
        actual: usize,
    },
    /// PDU ID not expected by the client
    UnexpectedPdu(u8),
    /// UUID byte width other than 2, 4 or 16
    UnsupportedUuidWidth(usize),
    /// Attribute list byte count below the minimum of 2
    InvalidAttributeByteCount(u16),
    /// Continuation state information longer than 16 bytes
    InvalidContinuationState(u8),
    /// Attribute bytes and continuation state run past the PDU parameters
    FrameOverrun,
    /// Record data does not fit the reassembly buffer
    CapacityExceeded,
    /// Buffer too small for operation
    BufferTooSmall,
    /// Invalid attribute data
    InvalidData,
}

impl core::fmt::Display for SdpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TruncatedHeader => write!(f, "SDP PDU shorter than its header"),
            Self::LengthMismatch { declared, actual } => write!(
                f,
                "SDP PDU length mismatch ({declared} declared, {actual} present)"
            ),
            Self::UnexpectedPdu(id) => write!(f, "Unexpected SDP PDU 0x{id:02x}"),
            Self::UnsupportedUuidWidth(len) => write!(f, "Unsupported UUID width of {len} bytes"),
            Self::InvalidAttributeByteCount(count) => {
                write!(f, "Invalid attribute list byte count {count}")
            }
            Self::InvalidContinuationState(len) => {
                write!(f, "Invalid continuation state length {len}")
            }
            Self::FrameOverrun => write!(f, "SDP frame payload exceeds parameter length"),
            Self::CapacityExceeded => write!(f, "Record reassembly buffer capacity exceeded"),
            Self::BufferTooSmall => write!(f, "Buffer too small"),
            Self::InvalidData => write!(f, "Invalid SDP data element"),
        }
    }
}
