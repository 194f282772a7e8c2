//! L2CAP (Logical Link Control and Adaptation Protocol) boundary
//!
//! SDP runs on top of a connection-oriented L2CAP channel. Channel
//! establishment, segmentation and MTU negotiation belong to the L2CAP layer;
//! this module only describes the service the SDP client consumes.

pub mod channel;

pub use channel::L2capChannelService;

/// L2CAP channel service errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum L2capError {
    /// Payload exceeds buffer capacity or the channel MTU
    PayloadTooLarge,
    /// No channel could be allocated for the connection
    ChannelUnavailable,
    /// The channel is not connected
    NotConnected,
}

impl core::fmt::Display for L2capError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PayloadTooLarge => write!(f, "L2CAP payload exceeds buffer capacity"),
            Self::ChannelUnavailable => write!(f, "No L2CAP channel available"),
            Self::NotConnected => write!(f, "L2CAP channel not connected"),
        }
    }
}

/// L2CAP Protocol Service Multiplexer (PSM)
///
/// PSMs identify the upper layer protocol or application that should receive the data.
/// SDP is reached on the fixed PSM 0x0001.
pub type ProtocolServiceMultiplexer = u16;

/// Well-known Protocol Service Multiplexers
pub mod psm {
    use super::ProtocolServiceMultiplexer;

    /// Service Discovery Protocol
    pub const SDP: ProtocolServiceMultiplexer = crate::constants::SDP_PSM;
}
