//! `BondyBird` SDP Constants
//!
//! This module contains all the constants used throughout the SDP client.
//! These constants define protocol values, sizing limits and default
//! configuration used by the implementation.

/// SDP Protocol Service Multiplexer (PSM) for L2CAP
pub const SDP_PSM: u16 = 0x0001;

/// Default L2CAP receive MTU requested for the client channel
pub const SDP_CLIENT_MTU: u16 = 64;

/// Maximum number of concurrent SDP client sessions (one per ACL connection)
pub const MAX_SESSIONS: usize = 4;

/// Maximum number of UUID queries waiting on a single session
pub const MAX_QUEUED_QUERIES: usize = 8;

/// Upper bound of the per-session record reassembly buffer
pub const MAX_RECORD_BUFFER_SIZE: usize = 1024;

/// Maximum size of a received SDP PDU
pub const MAX_SDP_PDU_SIZE: usize = 1024;

/// Maximum size of an encoded Service Search Attribute request
///
/// Header (5) + search pattern (19) + max byte count (2) + attribute list (7)
/// + continuation state (17) fits comfortably.
pub const MAX_SDP_REQUEST_SIZE: usize = 64;

/// SDP PDU header size: PDU ID (1) + transaction ID (2) + parameter length (2)
pub const SDP_HEADER_SIZE: usize = 5;

/// Maximum length of the continuation state information
pub const MAX_CONTINUATION_STATE_LEN: usize = 16;

/// Maximum attribute byte count requested from the server by default
pub const DEFAULT_MAX_ATTRIBUTE_BYTE_COUNT: u16 = 0xFFFF;

/// Bluetooth Base UUID (`00000000-0000-1000-8000-00805F9B34FB`)
pub const BLUETOOTH_BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Depth of the processor's event channel
pub const EVENT_CHANNEL_DEPTH: usize = 4;

/// Depth of the processor's discover request channel
pub const REQUEST_CHANNEL_DEPTH: usize = 4;
