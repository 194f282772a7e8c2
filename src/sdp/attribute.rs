//! SDP Attribute Processing
//!
//! This module provides attribute identifiers, the attribute ID range used by
//! search requests and a parser over the attribute lists of received records.

use super::{
    SdpError,
    record::{AttributeId, DataElement},
};

/// Universal SDP Attribute IDs
///
/// These are standardized attribute IDs defined by the Bluetooth SIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum UniversalAttributeId {
    /// Service Record Handle
    ServiceRecordHandle = 0x0000,
    /// Service Class ID List
    ServiceClassIdList = 0x0001,
    /// Service Record State
    ServiceRecordState = 0x0002,
    /// Service ID
    ServiceId = 0x0003,
    /// Protocol Descriptor List
    ProtocolDescriptorList = 0x0004,
    /// Browse Group List
    BrowseGroupList = 0x0005,
    /// Language Based Attribute ID List
    LanguageBaseAttributeIdList = 0x0006,
    /// Service Info Time To Live
    ServiceInfoTimeToLive = 0x0007,
    /// Service Availability
    ServiceAvailability = 0x0008,
    /// Bluetooth Profile Descriptor List
    BluetoothProfileDescriptorList = 0x0009,
    /// Documentation URL
    DocumentationUrl = 0x000A,
    /// Client Executable URL
    ClientExecutableUrl = 0x000B,
    /// Icon URL
    IconUrl = 0x000C,
    /// Additional Protocol Descriptor Lists
    AdditionalProtocolDescriptorLists = 0x000D,
}

/// Language-Based Attribute IDs
///
/// These IDs are offsets added to the language base ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum LanguageAttributeOffset {
    /// Service Name
    ServiceName = 0x0000,
    /// Service Description
    ServiceDescription = 0x0001,
    /// Provider Name
    ProviderName = 0x0002,
}

/// Standard Language Base ID for English
pub const ENGLISH_LANGUAGE_BASE_ID: u16 = 0x0100;

/// Inclusive range of attribute IDs
///
/// Encoded in requests as a 32-bit unsigned integer with the start ID in the
/// upper half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttributeRange {
    /// Start attribute ID (inclusive)
    pub start: AttributeId,
    /// End attribute ID (inclusive)
    pub end: AttributeId,
}

/// Attribute List Entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEntry<'a> {
    /// Attribute ID
    pub id: AttributeId,
    /// Attribute value
    pub value: DataElement<'a>,
}

/// Attribute List Parser
///
/// Walks the contents of an attribute list sequence, where each attribute is
/// an unsigned 16-bit ID element followed by its value element. Yields an
/// error once and then stops on malformed input.
#[derive(Debug, Clone)]
pub struct AttributeListParser<'a> {
    data: &'a [u8],
    position: usize,
}

impl UniversalAttributeId {
    /// Convert to u16 value
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self as u16
    }

    /// Create from u16 value
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::ServiceRecordHandle),
            0x0001 => Some(Self::ServiceClassIdList),
            0x0002 => Some(Self::ServiceRecordState),
            0x0003 => Some(Self::ServiceId),
            0x0004 => Some(Self::ProtocolDescriptorList),
            0x0005 => Some(Self::BrowseGroupList),
            0x0006 => Some(Self::LanguageBaseAttributeIdList),
            0x0007 => Some(Self::ServiceInfoTimeToLive),
            0x0008 => Some(Self::ServiceAvailability),
            0x0009 => Some(Self::BluetoothProfileDescriptorList),
            0x000A => Some(Self::DocumentationUrl),
            0x000B => Some(Self::ClientExecutableUrl),
            0x000C => Some(Self::IconUrl),
            0x000D => Some(Self::AdditionalProtocolDescriptorLists),
            _ => None,
        }
    }

    /// Check if attribute is mandatory for all service records
    #[must_use]
    pub const fn is_mandatory(self) -> bool {
        matches!(self, Self::ServiceRecordHandle | Self::ServiceClassIdList)
    }
}

impl AttributeRange {
    /// Every attribute ID, 0x0000 through 0xFFFF
    pub const FULL: Self = Self::new(0x0000, 0xFFFF);

    /// Create new attribute range
    #[must_use]
    pub const fn new(start: AttributeId, end: AttributeId) -> Self {
        Self { start, end }
    }

    /// Check if attribute ID is in range
    #[must_use]
    pub const fn contains(&self, id: AttributeId) -> bool {
        id >= self.start && id <= self.end
    }

    /// Range as carried on the wire
    #[must_use]
    pub const fn to_u32(&self) -> u32 {
        ((self.start as u32) << 16) | self.end as u32
    }
}

impl AttributeEntry<'_> {
    /// Check if this is a universal attribute
    #[must_use]
    pub const fn is_universal(&self) -> bool {
        UniversalAttributeId::from_u16(self.id).is_some()
    }

    /// Check if this is an English language-based attribute
    #[must_use]
    pub const fn is_language_based(&self) -> bool {
        self.id >= ENGLISH_LANGUAGE_BASE_ID && self.id < (ENGLISH_LANGUAGE_BASE_ID + 0x100)
    }
}

impl<'a> AttributeListParser<'a> {
    /// Create new parser over attribute list contents
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get current position
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Check if parsing is complete
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.position >= self.data.len()
    }

    fn parse_next(&mut self) -> Result<AttributeEntry<'a>, SdpError> {
        let rest = &self.data[self.position..];

        let (id, id_len) = DataElement::parse(rest)?;
        let DataElement::UnsignedInt16(id) = id else {
            return Err(SdpError::InvalidData);
        };
        let (value, value_len) = DataElement::parse(&rest[id_len..])?;

        self.position += id_len + value_len;
        Ok(AttributeEntry { id, value })
    }
}

impl<'a> Iterator for AttributeListParser<'a> {
    type Item = Result<AttributeEntry<'a>, SdpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_complete() {
            return None;
        }

        let entry = self.parse_next();
        if entry.is_err() {
            self.position = self.data.len();
        }
        Some(entry)
    }
}

/// Create language-based attribute ID
#[must_use]
pub const fn language_attribute_id(base_id: u16, offset: LanguageAttributeOffset) -> u16 {
    base_id + offset as u16
}

/// Get English service name attribute ID
#[must_use]
pub const fn english_service_name_id() -> u16 {
    language_attribute_id(
        ENGLISH_LANGUAGE_BASE_ID,
        LanguageAttributeOffset::ServiceName,
    )
}

/// Get English service description attribute ID
#[must_use]
pub const fn english_service_description_id() -> u16 {
    language_attribute_id(
        ENGLISH_LANGUAGE_BASE_ID,
        LanguageAttributeOffset::ServiceDescription,
    )
}

/// Get English provider name attribute ID
#[must_use]
pub const fn english_provider_name_id() -> u16 {
    language_attribute_id(
        ENGLISH_LANGUAGE_BASE_ID,
        LanguageAttributeOffset::ProviderName,
    )
}
