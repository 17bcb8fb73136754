//! The 7-byte SPI turn header.
//!
//! Defined as a `zerocopy`-derived wire struct, deliberately separate from
//! any in-memory representation of "the next turn's parameters". Every
//! multi-byte field is stored as raw little-endian bytes and converted
//! explicitly, so the layout is correct regardless of host endianness or
//! compiler padding decisions.

use zerocopy::{Immutable, IntoBytes, KnownLayout, TryFromBytes, Unaligned};

/// Host-to-module turn: "here is my write request".
pub const SPI_HEADER_TYPE_WRITE: u8 = 0x0A;
/// Module-to-host turn: "here is my read response".
pub const SPI_HEADER_TYPE_READ: u8 = 0x0B;

/// The 7-byte SPI header exchanged full-duplex at the start of every turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C, packed)]
pub struct SpiHeader {
    kind: u8,
    len_le: [u8; 2],
    lenx_le: [u8; 2],
    /// Undefined on the wire; written as zero, never inspected on
    /// receipt (see DESIGN.md for the reasoning).
    pad: [u8; 3],
}

impl SpiHeader {
    pub const WIRE_SIZE: usize = 7;

    /// Builds the header the host sends: `type = 0x0A`, `len` the number
    /// of data bytes the host intends to send this turn (may be 0).
    pub fn for_host_write(len: u16) -> Self {
        Self {
            kind: SPI_HEADER_TYPE_WRITE,
            len_le: len.to_le_bytes(),
            lenx_le: (!len).to_le_bytes(),
            pad: [0; 3],
        }
    }

    pub fn len(&self) -> u16 {
        u16::from_le_bytes(self.len_le)
    }

    pub fn lenx(&self) -> u16 {
        u16::from_le_bytes(self.lenx_le)
    }

    pub fn kind(&self) -> u8 {
        self.kind
    }

    /// Property 1 (header invariant) for an accepted module header:
    /// `type == 0x0B && (len ^ lenx) == 0xFFFF`.
    pub fn is_valid_module_header(&self) -> bool {
        self.kind == SPI_HEADER_TYPE_READ && (self.len() ^ self.lenx()) == 0xFFFF
    }

    pub fn to_wire_bytes(self) -> [u8; Self::WIRE_SIZE] {
        let mut out = [0u8; Self::WIRE_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    pub fn from_wire_bytes(buf: &[u8; Self::WIRE_SIZE]) -> Self {
        Self::try_read_from_bytes(buf).expect("SpiHeader wire size mismatch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_bytes() {
        let h = SpiHeader::for_host_write(42);
        let wire = h.to_wire_bytes();
        let back = SpiHeader::from_wire_bytes(&wire);
        assert_eq!(back.len(), 42);
        assert_eq!(back.kind(), SPI_HEADER_TYPE_WRITE);
    }

    #[test]
    fn validates_module_header_complement() {
        let mut wire = [0u8; SpiHeader::WIRE_SIZE];
        wire[0] = SPI_HEADER_TYPE_READ;
        wire[1..3].copy_from_slice(&100u16.to_le_bytes());
        wire[3..5].copy_from_slice(&(!100u16).to_le_bytes());
        let h = SpiHeader::from_wire_bytes(&wire);
        assert!(h.is_valid_module_header());
    }

    #[test]
    fn rejects_wrong_type_or_broken_complement() {
        let mut wire = [0u8; SpiHeader::WIRE_SIZE];
        wire[0] = SPI_HEADER_TYPE_WRITE; // wrong direction
        wire[1..3].copy_from_slice(&100u16.to_le_bytes());
        wire[3..5].copy_from_slice(&(!100u16).to_le_bytes());
        assert!(!SpiHeader::from_wire_bytes(&wire).is_valid_module_header());

        let mut wire2 = [0u8; SpiHeader::WIRE_SIZE];
        wire2[0] = SPI_HEADER_TYPE_READ;
        wire2[1..3].copy_from_slice(&100u16.to_le_bytes());
        wire2[3..5].copy_from_slice(&200u16.to_le_bytes()); // broken complement
        assert!(!SpiHeader::from_wire_bytes(&wire2).is_valid_module_header());
    }
}
