//! Record reassembly across continuation frames
//!
//! Attribute list bytes of a Service Search Attribute transfer are appended
//! frame by frame. Once the transfer completes the buffer is read back one
//! service record at a time.

use super::{SdpError, protocol::ContinuationState, protocol::decode_sequence_header};
use crate::constants::MAX_RECORD_BUFFER_SIZE;
use heapless::Vec;

/// Per-session accumulator of attribute list bytes
///
/// Storage is fixed at `N` bytes; the usable capacity is chosen per query and
/// never exceeds `N`.
#[derive(Debug)]
pub struct ReassemblyBuffer<const N: usize = MAX_RECORD_BUFFER_SIZE> {
    data: Vec<u8, N>,
    capacity: usize,
    total: usize,
    pulled: usize,
}

impl<const N: usize> ReassemblyBuffer<N> {
    /// Create an empty buffer using the full storage size
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            capacity: N,
            total: 0,
            pulled: 0,
        }
    }

    /// Limit the usable capacity, clamped to the storage size
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.min(N);
    }

    /// Usable capacity in bytes
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupied length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Total attribute list length declared by the first frame
    #[must_use]
    pub const fn total(&self) -> usize {
        self.total
    }

    /// Read the total-length header at the start of a first frame
    ///
    /// With an empty `continuation` the frame begins a transfer: its leading
    /// sequence header is decoded and recorded as the total. Otherwise the
    /// frame is a continuation and `(0, 0)` is returned.
    ///
    /// Returns the declared total and the header bytes consumed.
    ///
    /// # Errors
    /// Returns `InvalidData` if the header is truncated.
    pub fn begin_if_fresh(
        &mut self,
        continuation: &ContinuationState,
        frame: &[u8],
    ) -> Result<(usize, usize), SdpError> {
        if !continuation.is_empty() {
            return Ok((0, 0));
        }

        let (total, consumed) = decode_sequence_header(frame)?;
        self.total = total;
        debug!("[SDP] Total {} octets of all attributes", total);
        Ok((total, consumed))
    }

    /// Append attribute bytes from a frame
    ///
    /// Returns the new occupied length. The buffer is left untouched on error.
    ///
    /// # Errors
    /// Returns `CapacityExceeded` if the bytes do not fit the usable capacity.
    pub fn append(&mut self, bytes: &[u8]) -> Result<usize, SdpError> {
        if self.data.len() + bytes.len() > self.capacity {
            return Err(SdpError::CapacityExceeded);
        }

        self.data
            .extend_from_slice(bytes)
            .map_err(|()| SdpError::CapacityExceeded)?;
        Ok(self.data.len())
    }

    /// Take the next buffered record
    ///
    /// Returns the record contents and whether more bytes follow it. Returns
    /// `None` once the buffer is drained, or if a record header or length runs
    /// past the buffered bytes.
    pub fn take_record(&mut self) -> Option<(&[u8], bool)> {
        let remaining = self.data.get(self.pulled..).filter(|r| !r.is_empty())?;

        let Ok((len, consumed)) = decode_sequence_header(remaining) else {
            warn!("[SDP] Truncated record header");
            self.pulled = self.data.len();
            return None;
        };

        let start = self.pulled + consumed;
        let end = start + len;
        if end > self.data.len() {
            warn!(
                "[SDP] Record length {} exceeds buffered data {}",
                len,
                self.data.len() - start
            );
            self.pulled = self.data.len();
            return None;
        }

        self.pulled = end;
        debug!("[SDP] Record len {}", len);
        Some((&self.data[start..end], end < self.data.len()))
    }

    /// Clear data, total and read position
    pub fn reset(&mut self) {
        self.data.clear();
        self.total = 0;
        self.pulled = 0;
    }
}

impl<const N: usize> Default for ReassemblyBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}
