use crate::error::{ProtocolError, Result};
use crate::network::Transport;
use crate::protocol::qos::SubackReturnCode;
use crate::protocol::utils::{read_byte, read_u16, write_u16};
use crate::protocol::PacketType;
use heapless::Vec;

/// SUBACK variable header and payload: packet identifier plus one return
/// code per filter of the acknowledged SUBSCRIBE, in order.
/// Fixed-shape on the wire, so decoding never needs the user buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAck<const MAX_FILTERS: usize> {
    pub packet_id: u16,
    pub return_codes: Vec<SubackReturnCode, MAX_FILTERS>,
}

impl<const MAX_FILTERS: usize> SubAck<MAX_FILTERS> {
    pub fn new(packet_id: u16) -> Self {
        SubAck {
            packet_id,
            return_codes: Vec::new(),
        }
    }

    pub fn push(&mut self, code: SubackReturnCode) -> Result<()> {
        self.return_codes
            .push(code)
            .map_err(|_| ProtocolError::UserBufferFull.into())
    }

    pub fn encoded_size(&self) -> usize {
        2 + self.return_codes.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.return_codes.is_empty() {
            return Err(ProtocolError::EmptyFilterList.into());
        }
        Ok(())
    }

    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize> {
        let mut offset = 0;
        write_u16(self.packet_id, buffer, &mut offset)?;
        for code in &self.return_codes {
            if offset >= buffer.len() {
                return Err(ProtocolError::BufferTooSmall.into());
            }
            buffer[offset] = code.to_u8();
            offset += 1;
        }
        Ok(offset)
    }

    /// Decode a SUBACK whose remaining length is already known from the
    /// fixed header. The remaining length must cover the packet identifier.
    pub async fn decode<T: Transport>(
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Self, usize)> {
        if remaining_length < 2 {
            return Err(ProtocolError::BadRemainingLength {
                packet_type: PacketType::SubAck,
                value: remaining_length,
            }
            .into());
        }
        let packet_id = read_u16(transport).await?;
        let mut suback = SubAck::new(packet_id);
        let mut consumed = 2usize;
        while (consumed as u32) < remaining_length {
            let code = SubackReturnCode::from_u8(read_byte(transport).await?)?;
            suback.push(code)?;
            consumed += 1;
        }
        Ok((suback, consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::qos::QoS;
    use crate::testutil::{block_on, MockTransport};

    const MAX_FILTERS: usize = 8;

    fn roundtrip_test(bytes: &[u8]) -> SubAck<MAX_FILTERS> {
        let mut transport = MockTransport::incoming(bytes);
        let (packet, consumed) =
            block_on(SubAck::decode(&mut transport, bytes.len() as u32)).unwrap();
        assert_eq!(consumed, bytes.len());

        let mut buffer = [0u8; 32];
        let encoded = packet.encode(&mut buffer).unwrap();
        assert_eq!(encoded, packet.encoded_size());
        assert_eq!(&buffer[..encoded], bytes, "Encoded bytes mismatch");
        packet
    }

    // ===== ROUNDTRIP TESTS =====

    #[test]
    fn test_two_grants() {
        // QoS 1 and QoS 0 granted for a two-filter request.
        let packet = roundtrip_test(&[0x00, 0x01, 0x01, 0x00]);
        assert_eq!(packet.packet_id, 0x0001);
        assert_eq!(
            packet.return_codes.as_slice(),
            &[
                SubackReturnCode::Granted(QoS::AtLeastOnce),
                SubackReturnCode::Granted(QoS::AtMostOnce),
            ]
        );
    }

    #[test]
    fn test_failure_marker() {
        let packet = roundtrip_test(&[0x12, 0x34, 0x80]);
        assert_eq!(packet.packet_id, 0x1234);
        assert_eq!(packet.return_codes.as_slice(), &[SubackReturnCode::Failure]);
    }

    #[test]
    fn test_mixed_grants_and_failures() {
        let packet = roundtrip_test(&[0x00, 0x05, 0x02, 0x80, 0x00]);
        assert_eq!(packet.return_codes.len(), 3);
        assert!(packet.return_codes[1].is_failure());
        assert_eq!(packet.return_codes[2].granted(), Some(QoS::AtMostOnce));
    }

    #[test]
    fn test_packet_id_only() {
        // Remaining length 2: legal shape, zero return codes decoded.
        let packet = roundtrip_test(&[0x00, 0x07]);
        assert_eq!(packet.packet_id, 7);
        assert!(packet.return_codes.is_empty());
    }

    // ===== VALIDATION TESTS =====

    #[test]
    fn test_rejects_short_remaining_length() {
        for remaining_length in [0u32, 1] {
            let mut transport = MockTransport::incoming(&[0x00, 0x01]);
            let result = block_on(SubAck::<MAX_FILTERS>::decode(
                &mut transport,
                remaining_length,
            ));
            assert_eq!(
                result,
                Err(ProtocolError::BadRemainingLength {
                    packet_type: PacketType::SubAck,
                    value: remaining_length,
                }
                .into())
            );
        }
    }

    #[test]
    fn test_rejects_invalid_return_code() {
        let mut transport = MockTransport::incoming(&[0x00, 0x01, 0x03]);
        let result = block_on(SubAck::<MAX_FILTERS>::decode(&mut transport, 3));
        assert_eq!(result, Err(ProtocolError::BadQos { value: 3 }.into()));
    }

    #[test]
    fn test_code_list_capacity() {
        let mut transport = MockTransport::incoming(&[0x00, 0x01, 0x00, 0x01, 0x02]);
        let result = block_on(SubAck::<2>::decode(&mut transport, 5));
        assert_eq!(result, Err(ProtocolError::UserBufferFull.into()));
    }

    #[test]
    fn test_validate_requires_codes() {
        let suback: SubAck<MAX_FILTERS> = SubAck::new(1);
        assert!(suback.validate().is_err());
    }
}
