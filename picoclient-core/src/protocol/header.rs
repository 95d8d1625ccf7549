use crate::error::{ProtocolError, Result};
use crate::network::Transport;
use crate::protocol::packet_type::PacketType;
use crate::protocol::utils::{
    read_byte, read_variable_length, variable_length_length, write_variable_length,
    MAX_REMAINING_LENGTH,
};

/// Fixed header as encoded on the wire: packet type, flag nibble and the
/// remaining-length integer covering everything after the header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixedHeader {
    pub packet_type: PacketType,
    pub flags: u8,
    pub remaining_length: u32,
}

impl FixedHeader {
    /// Header for a packet type with a fixed flag nibble.
    pub const fn new(packet_type: PacketType, remaining_length: u32) -> Self {
        FixedHeader {
            packet_type,
            flags: packet_type.fixed_flags(),
            remaining_length,
        }
    }

    /// PUBLISH header with an explicit flag nibble.
    pub const fn publish(flags: u8, remaining_length: u32) -> Self {
        FixedHeader {
            packet_type: PacketType::Publish,
            flags: flags & 0x0F,
            remaining_length,
        }
    }

    pub const fn first_byte(&self) -> u8 {
        (self.packet_type as u8) << 4 | (self.flags & 0x0F)
    }

    /// Encoded size in bytes (2..5), or 0 when the remaining length cannot
    /// be represented.
    pub const fn size(&self) -> usize {
        if self.remaining_length > MAX_REMAINING_LENGTH {
            return 0;
        }
        1 + variable_length_length(self.remaining_length)
    }

    /// True when this header's packet class carries a 2-octet packet
    /// identifier after the variable header start.
    pub fn has_packet_identifier(&self) -> bool {
        self.packet_type.has_packet_identifier(self.flags)
    }

    /// Write the first byte and remaining length into `buffer`, returning
    /// the number of bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize> {
        if buffer.is_empty() {
            return Err(ProtocolError::BufferTooSmall.into());
        }
        buffer[0] = self.first_byte();
        let len_bytes = write_variable_length(self.remaining_length, &mut buffer[1..])?;
        Ok(1 + len_bytes)
    }

    /// Read and validate a fixed header from the transport.
    ///
    /// Validation order matters: an unknown packet type or a bad flag nibble
    /// is rejected before any further bytes are consumed. Returns the header
    /// and the byte count read. A failure on the very first byte reports 0
    /// bytes consumed so the caller can tell a clean stream end from a
    /// mid-packet loss.
    pub async fn decode<T: Transport>(transport: &mut T) -> (Result<Self>, usize) {
        let first_byte = match read_byte(transport).await {
            Ok(byte) => byte,
            Err(e) => return (Err(e), 0),
        };

        let packet_type = match PacketType::from_first_byte(first_byte) {
            Some(pt) => pt,
            None => {
                return (
                    Err(ProtocolError::BadPacketType {
                        value: first_byte >> 4,
                    }
                    .into()),
                    1,
                )
            }
        };
        let flags = first_byte & 0x0F;
        if let Err(e) = packet_type.validate_flags(flags) {
            return (Err(e.into()), 1);
        }

        match read_variable_length(transport).await {
            Ok((remaining_length, len_bytes)) => (
                Ok(FixedHeader {
                    packet_type,
                    flags,
                    remaining_length,
                }),
                1 + len_bytes,
            ),
            Err(e) => (Err(e), 1),
        }
    }
}

impl core::fmt::Display for FixedHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} (flags {:#06b}, remaining {})",
            self.packet_type, self.flags, self.remaining_length
        )
    }
}
