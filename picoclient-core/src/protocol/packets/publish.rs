use crate::error::{ProtocolError, Result};
use crate::protocol::qos::QoS;
use crate::protocol::utils::{write_string, write_u16};
use crate::topics;

/// PUBLISH flag nibble: DUP (bit 3), QoS (bits 2..1), RETAIN (bit 0).
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct PublishFlags {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
}

impl PublishFlags {
    pub const fn new(qos: QoS, dup: bool, retain: bool) -> Result<Self> {
        if dup && matches!(qos, QoS::AtMostOnce) {
            return Err(crate::Error::Protocol(ProtocolError::DupOnQos0));
        }
        Ok(PublishFlags { dup, qos, retain })
    }

    pub const fn to_nibble(self) -> u8 {
        let dup = if self.dup { 1u8 } else { 0u8 };
        let retain = if self.retain { 1u8 } else { 0u8 };
        (dup << 3) | ((self.qos as u8) << 1) | retain
    }

    /// Parse and validate the low nibble of a PUBLISH first byte.
    /// QoS 3 and DUP-with-QoS0 are malformed per the protocol.
    pub fn from_nibble(nibble: u8) -> Result<Self> {
        let qos = QoS::from_u8((nibble >> 1) & 0b11)?;
        let dup = (nibble & 0b1000) != 0;
        if dup && qos == QoS::AtMostOnce {
            return Err(ProtocolError::DupOnQos0.into());
        }
        Ok(PublishFlags {
            dup,
            qos,
            retain: (nibble & 0b0001) != 0,
        })
    }
}

/// PUBLISH variable header: topic name plus a packet identifier that is
/// present exactly when QoS is above 0. The payload is not part of this
/// structure; it streams through the engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publish<'a> {
    pub topic: &'a str,
    pub packet_id: u16,
}

impl<'a> Publish<'a> {
    pub const fn new(topic: &'a str) -> Self {
        Publish {
            topic,
            packet_id: 0,
        }
    }

    pub const fn with_packet_id(topic: &'a str, packet_id: u16) -> Self {
        Publish { topic, packet_id }
    }

    /// Size of the variable header for the given QoS.
    pub fn encoded_size(&self, qos: QoS) -> usize {
        let mut size = 2 + self.topic.len();
        if qos != QoS::AtMostOnce {
            size += 2;
        }
        size
    }

    /// Topic names must be nonempty, wildcard-free, and the packet
    /// identifier must be nonzero exactly when QoS is above 0.
    pub fn validate(&self, qos: QoS) -> Result<()> {
        if self.topic.is_empty() {
            return Err(ProtocolError::ZeroLengthString.into());
        }
        if topics::is_wildcard(self.topic) {
            return Err(ProtocolError::WildcardInTopic.into());
        }
        if qos != QoS::AtMostOnce && self.packet_id == 0 {
            return Err(ProtocolError::ZeroPacketIdentifier.into());
        }
        Ok(())
    }

    pub fn encode(&self, buffer: &mut [u8], qos: QoS) -> Result<usize> {
        let mut offset = 0;
        write_string(self.topic, buffer, &mut offset)?;
        if qos != QoS::AtMostOnce {
            write_u16(self.packet_id, buffer, &mut offset)?;
        }
        Ok(offset)
    }
}
