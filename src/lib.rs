#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

#[macro_use]
mod fmt;

pub mod api;
pub mod constants;
pub mod l2cap;
pub mod processor;
pub mod sdp;

use crate::constants::{DEFAULT_MAX_ATTRIBUTE_BYTE_COUNT, SDP_CLIENT_MTU};

pub use api::SdpChannels;
pub use l2cap::{L2capChannelService, L2capError};
pub use processor::{DiscoverRequest, SdpEvent, process_next, sdp_client_processor};
pub use sdp::{
    DiscoverHandler, DiscoverResult, DiscoverStep, ResolveFailure, SdpClient, SdpError,
    ServiceRecord, SharedSdpClient, Uuid, UuidQuery,
};

/// Errors returned when submitting a discovery request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubmitError {
    /// The query cannot be served (e.g., zero or oversized buffer)
    InvalidQuery,
    /// Every session slot is in use
    NoSessionCapacity,
    /// The session's query queue is full
    QueueFull,
    /// The L2CAP layer refused to open the SDP channel
    ChannelUnavailable,
}

impl core::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidQuery => write!(f, "Invalid discovery query"),
            Self::NoSessionCapacity => write!(f, "No SDP session available"),
            Self::QueueFull => write!(f, "Discovery queue full"),
            Self::ChannelUnavailable => write!(f, "SDP channel unavailable"),
        }
    }
}

/// Options for configuring an `SdpClient` instance
///
/// # Examples
///
/// ```rust
/// use bondybird_sdp::SdpClientOptions;
///
/// // Use default options
/// let default_options = SdpClientOptions::default();
///
/// // Larger channel MTU, smaller responses
/// let options = SdpClientOptions {
///     rx_mtu: 672,                      // L2CAP default MTU
///     max_attribute_byte_count: 0x0200, // At most 512 bytes per response
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SdpClientOptions {
    /// Receive MTU requested when opening the SDP channel
    pub rx_mtu: u16,
    /// Maximum attribute byte count asked of the server per response
    ///
    /// Smaller values make the server split its answer over more
    /// continuation frames.
    pub max_attribute_byte_count: u16,
}

impl Default for SdpClientOptions {
    fn default() -> Self {
        Self {
            rx_mtu: SDP_CLIENT_MTU,
            max_attribute_byte_count: DEFAULT_MAX_ATTRIBUTE_BYTE_COUNT,
        }
    }
}
