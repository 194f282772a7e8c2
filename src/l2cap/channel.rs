//! L2CAP Channel Service
//!
//! The SDP client never owns an L2CAP implementation. It asks a channel
//! service to open, write to and close one channel per ACL connection, and is
//! told about the outcome through the client's `on_connected`,
//! `on_received` and `on_disconnected` entry points.

use super::{L2capError, ProtocolServiceMultiplexer};
use bt_hci::param::ConnHandle;

/// Connection-oriented channel service consumed by the SDP client
///
/// Every call is non-blocking. `connect` only starts channel establishment;
/// completion is reported later as a connected (or disconnected) event for the
/// same connection handle.
pub trait L2capChannelService {
    /// Start opening a channel to `psm` on the ACL link `conn`
    ///
    /// # Errors
    /// Returns an error if the channel cannot be requested.
    fn connect(
        &mut self,
        conn: ConnHandle,
        psm: ProtocolServiceMultiplexer,
        rx_mtu: u16,
    ) -> Result<(), L2capError>;

    /// Queue one complete SDP PDU on the channel of `conn`
    ///
    /// # Errors
    /// Returns an error if the PDU cannot be sent.
    fn send(&mut self, conn: ConnHandle, pdu: &[u8]) -> Result<(), L2capError>;

    /// Request the channel of `conn` to be closed
    ///
    /// # Errors
    /// Returns an error if no channel exists for `conn`.
    fn disconnect(&mut self, conn: ConnHandle) -> Result<(), L2capError>;
}
