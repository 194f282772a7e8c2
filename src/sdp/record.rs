//! SDP Service Record Views
//!
//! This module provides data element decoding and a borrowed view over the
//! service records delivered to discovery handlers. Nothing here copies record
//! data; every value borrows from the reassembled response.

use super::{
    SdpError, Uuid,
    attribute::{AttributeListParser, UniversalAttributeId, english_service_name_id},
};

/// Attribute ID type
pub type AttributeId = u16;

/// Standard Bluetooth Service Classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum ServiceClassId {
    /// SDP Server Service
    ServiceDiscoveryServer = 0x1000,
    /// Browse Group Descriptor
    BrowseGroupDescriptor = 0x1001,
    /// Public Browse Root
    PublicBrowseRoot = 0x1002,
    /// Serial Port Profile
    SerialPort = 0x1101,
    /// LAN Access Using PPP
    LanAccessPpp = 0x1102,
    /// Dialup Networking
    DialupNetworking = 0x1103,
    /// Object Push Profile
    ObjectPush = 0x1105,
    /// File Transfer Profile
    FileTransfer = 0x1106,
    /// Headset Profile
    Headset = 0x1108,
    /// Audio Source
    AudioSource = 0x110A,
    /// Audio Sink
    AudioSink = 0x110B,
    /// A/V Remote Control Target
    AvRemoteControlTarget = 0x110C,
    /// Advanced Audio Distribution Profile
    AdvancedAudioDistribution = 0x110D,
    /// A/V Remote Control
    AvRemoteControl = 0x110E,
    /// Hands-Free Profile
    HandsFree = 0x111E,
    /// Hands-Free Audio Gateway
    HandsFreeAudioGateway = 0x111F,
    /// Human Interface Device
    HumanInterfaceDevice = 0x1124,
}

impl ServiceClassId {
    /// Convert to a 16-bit SDP UUID
    #[must_use]
    pub const fn to_uuid(self) -> Uuid {
        Uuid::Uuid16(self as u16)
    }

    /// Get service name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ServiceDiscoveryServer => "Service Discovery Server",
            Self::BrowseGroupDescriptor => "Browse Group Descriptor",
            Self::PublicBrowseRoot => "Public Browse Root",
            Self::SerialPort => "Serial Port",
            Self::LanAccessPpp => "LAN Access Using PPP",
            Self::DialupNetworking => "Dialup Networking",
            Self::ObjectPush => "Object Push",
            Self::FileTransfer => "File Transfer",
            Self::Headset => "Headset",
            Self::AudioSource => "Audio Source",
            Self::AudioSink => "Audio Sink",
            Self::AvRemoteControlTarget => "A/V Remote Control Target",
            Self::AdvancedAudioDistribution => "Advanced Audio Distribution",
            Self::AvRemoteControl => "A/V Remote Control",
            Self::HandsFree => "Hands-Free",
            Self::HandsFreeAudioGateway => "Hands-Free Audio Gateway",
            Self::HumanInterfaceDevice => "Human Interface Device",
        }
    }
}

impl From<ServiceClassId> for Uuid {
    fn from(class: ServiceClassId) -> Self {
        class.to_uuid()
    }
}

/// Data element type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataElementType {
    /// Nil (null value)
    Nil = 0,
    /// Unsigned integer
    UnsignedInt = 1,
    /// Signed integer
    SignedInt = 2,
    /// UUID
    Uuid = 3,
    /// Text string
    TextString = 4,
    /// Boolean
    Boolean = 5,
    /// Data element sequence
    Sequence = 6,
    /// Data element alternative
    Alternative = 7,
    /// URL
    Url = 8,
}

/// Data element size descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DataElementSize {
    /// 1 byte
    Size1 = 0,
    /// 2 bytes
    Size2 = 1,
    /// 4 bytes
    Size4 = 2,
    /// 8 bytes
    Size8 = 3,
    /// 16 bytes
    Size16 = 4,
    /// Additional 8-bit size descriptor follows
    AdditionalU8 = 5,
    /// Additional 16-bit size descriptor follows
    AdditionalU16 = 6,
    /// Additional 32-bit size descriptor follows
    AdditionalU32 = 7,
}

impl DataElementType {
    /// Build the one-octet data element descriptor for this type and size
    #[must_use]
    pub const fn descriptor(self, size: DataElementSize) -> u8 {
        ((self as u8) << 3) | size as u8
    }
}

/// Data element descriptors used by the client
pub mod descriptor {
    use super::{DataElementSize, DataElementType};

    /// Unsigned 16-bit integer
    pub const UINT16: u8 = DataElementType::UnsignedInt.descriptor(DataElementSize::Size2);
    /// Unsigned 32-bit integer
    pub const UINT32: u8 = DataElementType::UnsignedInt.descriptor(DataElementSize::Size4);
    /// 16-bit UUID
    pub const UUID16: u8 = DataElementType::Uuid.descriptor(DataElementSize::Size2);
    /// 32-bit UUID
    pub const UUID32: u8 = DataElementType::Uuid.descriptor(DataElementSize::Size4);
    /// 128-bit UUID
    pub const UUID128: u8 = DataElementType::Uuid.descriptor(DataElementSize::Size16);
    /// Sequence with an 8-bit length
    pub const SEQ8: u8 = DataElementType::Sequence.descriptor(DataElementSize::AdditionalU8);
    /// Sequence with a 16-bit length
    pub const SEQ16: u8 = DataElementType::Sequence.descriptor(DataElementSize::AdditionalU16);
    /// Sequence with a 32-bit length
    pub const SEQ32: u8 = DataElementType::Sequence.descriptor(DataElementSize::AdditionalU32);
}

/// SDP Data Element
///
/// A decoded data element borrowing its variable-length contents from the
/// record it was read from. Sequences and alternatives keep their raw
/// contents; walk them with [`DataElement::elements`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataElement<'a> {
    /// Nil (null value)
    Nil,
    /// Unsigned 8-bit integer
    UnsignedInt8(u8),
    /// Unsigned 16-bit integer
    UnsignedInt16(u16),
    /// Unsigned 32-bit integer
    UnsignedInt32(u32),
    /// Unsigned 64-bit integer
    UnsignedInt64(u64),
    /// Unsigned 128-bit integer
    UnsignedInt128(u128),
    /// Signed 8-bit integer
    SignedInt8(i8),
    /// Signed 16-bit integer
    SignedInt16(i16),
    /// Signed 32-bit integer
    SignedInt32(i32),
    /// Signed 64-bit integer
    SignedInt64(i64),
    /// Signed 128-bit integer
    SignedInt128(i128),
    /// UUID of any width
    Uuid(Uuid),
    /// Text string (raw bytes, usually UTF-8)
    TextString(&'a [u8]),
    /// Boolean value
    Boolean(bool),
    /// Data element sequence contents
    Sequence(&'a [u8]),
    /// Data element alternative contents
    Alternative(&'a [u8]),
    /// URL string
    Url(&'a [u8]),
}

fn be_array<const N: usize>(value: &[u8]) -> Result<[u8; N], SdpError> {
    value.try_into().map_err(|_| SdpError::InvalidData)
}

impl<'a> DataElement<'a> {
    /// Decode one data element from the front of `data`
    ///
    /// Returns the element and the number of bytes it occupied.
    ///
    /// # Errors
    /// Returns `SdpError::InvalidData` on an unknown type, an invalid size
    /// index for the type, or truncated data.
    pub fn parse(data: &'a [u8]) -> Result<(Self, usize), SdpError> {
        let (&type_descriptor, rest) = data.split_first().ok_or(SdpError::InvalidData)?;

        let data_type = type_descriptor >> 3;
        let size_index = type_descriptor & 0x07;

        // Length prefix bytes and value bytes following the descriptor
        let (prefix_len, value_len): (usize, usize) = match size_index {
            0..=4 if data_type == DataElementType::Nil as u8 => (0, 0),
            0..=4 => (0, 1usize << size_index),
            5 => (1, usize::from(*rest.first().ok_or(SdpError::InvalidData)?)),
            6 => (
                2,
                usize::from(u16::from_be_bytes(be_array(
                    rest.get(..2).ok_or(SdpError::InvalidData)?,
                )?)),
            ),
            _ => (
                4,
                usize::try_from(u32::from_be_bytes(be_array(
                    rest.get(..4).ok_or(SdpError::InvalidData)?,
                )?))
                .map_err(|_| SdpError::InvalidData)?,
            ),
        };

        let end = prefix_len
            .checked_add(value_len)
            .ok_or(SdpError::InvalidData)?;
        let value = rest.get(prefix_len..end).ok_or(SdpError::InvalidData)?;
        let fixed_size = size_index <= 4;

        let element = match data_type {
            0 => Self::Nil,
            1 if fixed_size => match value_len {
                1 => Self::UnsignedInt8(value[0]),
                2 => Self::UnsignedInt16(u16::from_be_bytes(be_array(value)?)),
                4 => Self::UnsignedInt32(u32::from_be_bytes(be_array(value)?)),
                8 => Self::UnsignedInt64(u64::from_be_bytes(be_array(value)?)),
                _ => Self::UnsignedInt128(u128::from_be_bytes(be_array(value)?)),
            },
            2 if fixed_size => match value_len {
                1 => Self::SignedInt8(i8::from_be_bytes([value[0]])),
                2 => Self::SignedInt16(i16::from_be_bytes(be_array(value)?)),
                4 => Self::SignedInt32(i32::from_be_bytes(be_array(value)?)),
                8 => Self::SignedInt64(i64::from_be_bytes(be_array(value)?)),
                _ => Self::SignedInt128(i128::from_be_bytes(be_array(value)?)),
            },
            3 if fixed_size => {
                Self::Uuid(Uuid::from_be_slice(value).map_err(|_| SdpError::InvalidData)?)
            }
            4 if !fixed_size => Self::TextString(value),
            5 if size_index == 0 => Self::Boolean(value[0] != 0),
            6 if !fixed_size => Self::Sequence(value),
            7 if !fixed_size => Self::Alternative(value),
            8 if !fixed_size => Self::Url(value),
            _ => return Err(SdpError::InvalidData),
        };

        Ok((element, 1 + end))
    }

    /// Get the data element type
    #[must_use]
    pub const fn data_type(&self) -> DataElementType {
        match self {
            Self::Nil => DataElementType::Nil,
            Self::UnsignedInt8(_)
            | Self::UnsignedInt16(_)
            | Self::UnsignedInt32(_)
            | Self::UnsignedInt64(_)
            | Self::UnsignedInt128(_) => DataElementType::UnsignedInt,
            Self::SignedInt8(_)
            | Self::SignedInt16(_)
            | Self::SignedInt32(_)
            | Self::SignedInt64(_)
            | Self::SignedInt128(_) => DataElementType::SignedInt,
            Self::Uuid(_) => DataElementType::Uuid,
            Self::TextString(_) => DataElementType::TextString,
            Self::Boolean(_) => DataElementType::Boolean,
            Self::Sequence(_) => DataElementType::Sequence,
            Self::Alternative(_) => DataElementType::Alternative,
            Self::Url(_) => DataElementType::Url,
        }
    }

    /// Iterate the members of a sequence or alternative
    #[must_use]
    pub fn elements(&self) -> Option<DataElementIter<'a>> {
        match *self {
            Self::Sequence(data) | Self::Alternative(data) => Some(DataElementIter::new(data)),
            _ => None,
        }
    }

    /// Get the UUID value, if this is a UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Option<Uuid> {
        match *self {
            Self::Uuid(uuid) => Some(uuid),
            _ => None,
        }
    }

    /// Get an unsigned integer value that fits in 32 bits
    #[must_use]
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Self::UnsignedInt8(value) => Some(u32::from(value)),
            Self::UnsignedInt16(value) => Some(u32::from(value)),
            Self::UnsignedInt32(value) => Some(value),
            Self::UnsignedInt64(value) => u32::try_from(value).ok(),
            Self::UnsignedInt128(value) => u32::try_from(value).ok(),
            _ => None,
        }
    }

    /// Get a text string or URL as UTF-8
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Self::TextString(bytes) | Self::Url(bytes) => {
                // Some servers null-terminate their strings
                let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                core::str::from_utf8(&bytes[..len]).ok()
            }
            _ => None,
        }
    }
}

/// Iterator over the members of a data element sequence or alternative
///
/// Yields an error once and then stops if a member cannot be decoded.
#[derive(Debug, Clone)]
pub struct DataElementIter<'a> {
    remaining: &'a [u8],
}

impl<'a> DataElementIter<'a> {
    /// Create an iterator over raw sequence contents
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { remaining: data }
    }
}

impl<'a> Iterator for DataElementIter<'a> {
    type Item = Result<DataElement<'a>, SdpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        match DataElement::parse(self.remaining) {
            Ok((element, used)) => {
                self.remaining = &self.remaining[used..];
                Some(Ok(element))
            }
            Err(e) => {
                self.remaining = &[];
                Some(Err(e))
            }
        }
    }
}

/// Service Record
///
/// Borrowed view of one service record as returned by a Service Search
/// Attribute transaction: the contents of the record's attribute list
/// sequence, i.e. alternating attribute ID and attribute value elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRecord<'a> {
    data: &'a [u8],
}

impl<'a> ServiceRecord<'a> {
    /// Wrap the attribute list contents of a record
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Raw attribute list bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Length of the raw attribute list in bytes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the record carries no attributes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate the record's attributes in wire order
    #[must_use]
    pub fn attributes(&self) -> AttributeListParser<'a> {
        AttributeListParser::new(self.data)
    }

    /// Get attribute value
    ///
    /// Attributes before the requested one must decode cleanly; a malformed
    /// attribute ends the search.
    #[must_use]
    pub fn attribute(&self, id: AttributeId) -> Option<DataElement<'a>> {
        self.attributes()
            .map_while(Result::ok)
            .find(|entry| entry.id == id)
            .map(|entry| entry.value)
    }

    /// Service record handle assigned by the remote server
    #[must_use]
    pub fn record_handle(&self) -> Option<u32> {
        self.attribute(UniversalAttributeId::ServiceRecordHandle.to_u16())?
            .as_u32()
    }

    /// Iterate the UUIDs of the Service Class ID List
    pub fn service_class_ids(&self) -> impl Iterator<Item = Uuid> + 'a {
        self.attribute(UniversalAttributeId::ServiceClassIdList.to_u16())
            .and_then(|list| list.elements())
            .into_iter()
            .flatten()
            .map_while(Result::ok)
            .filter_map(|element| element.as_uuid())
    }

    /// Check if record lists the given service class
    #[must_use]
    pub fn contains_service_class(&self, class: Uuid) -> bool {
        self.service_class_ids().any(|uuid| uuid.matches(&class))
    }

    /// Service name under the primary (English) language base
    #[must_use]
    pub fn service_name(&self) -> Option<&'a str> {
        self.attribute(english_service_name_id())?.as_str()
    }
}
