//! SDP UUID values
//!
//! SDP carries UUIDs in three widths. The width selects both the data element
//! descriptor and the number of value bytes written on the wire.

use super::SdpError;
use crate::constants::BLUETOOTH_BASE_UUID;

/// A 16, 32 or 128-bit UUID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uuid {
    /// 16-bit UUID (alias of the Bluetooth Base UUID)
    Uuid16(u16),
    /// 32-bit UUID (alias of the Bluetooth Base UUID)
    Uuid32(u32),
    /// Full 128-bit UUID
    Uuid128(u128),
}

impl Uuid {
    /// Create a UUID from big-endian bytes
    ///
    /// # Errors
    /// Returns `SdpError::UnsupportedUuidWidth` unless `bytes` is 2, 4 or 16 bytes long.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, SdpError> {
        match *bytes {
            [a, b] => Ok(Self::Uuid16(u16::from_be_bytes([a, b]))),
            [a, b, c, d] => Ok(Self::Uuid32(u32::from_be_bytes([a, b, c, d]))),
            _ => {
                let array: [u8; 16] = bytes
                    .try_into()
                    .map_err(|_| SdpError::UnsupportedUuidWidth(bytes.len()))?;
                Ok(Self::Uuid128(u128::from_be_bytes(array)))
            }
        }
    }

    /// Number of value bytes on the wire
    #[must_use]
    pub const fn width(&self) -> usize {
        match self {
            Self::Uuid16(_) => 2,
            Self::Uuid32(_) => 4,
            Self::Uuid128(_) => 16,
        }
    }

    /// Expand to the full 128-bit form over the Bluetooth Base UUID
    #[must_use]
    pub const fn to_u128(&self) -> u128 {
        match *self {
            Self::Uuid16(value) => BLUETOOTH_BASE_UUID | ((value as u128) << 96),
            Self::Uuid32(value) => BLUETOOTH_BASE_UUID | ((value as u128) << 96),
            Self::Uuid128(value) => value,
        }
    }

    /// Compare two UUIDs regardless of their width
    #[must_use]
    pub const fn matches(&self, other: &Self) -> bool {
        self.to_u128() == other.to_u128()
    }
}

impl From<u16> for Uuid {
    fn from(value: u16) -> Self {
        Self::Uuid16(value)
    }
}

impl From<u32> for Uuid {
    fn from(value: u32) -> Self {
        Self::Uuid32(value)
    }
}

impl From<u128> for Uuid {
    fn from(value: u128) -> Self {
        Self::Uuid128(value)
    }
}

impl TryFrom<&[u8]> for Uuid {
    type Error = SdpError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_be_slice(bytes)
    }
}
