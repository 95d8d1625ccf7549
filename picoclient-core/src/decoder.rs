//! Variable-header decoders.
//!
//! The receive engine is generic over [`Decode`], so the choice between the
//! buffer-backed and the growable decoder is made once, at type level, and
//! costs no dispatch per packet. Decoded string fields borrow decoder
//! memory and stay valid only until the next decode call.

use crate::error::{ProtocolError, Result};
use crate::network::{read_full, Transport};
use crate::protocol::packets::{Connect, ConnectFlags, Publish, Subscribe, Unsubscribe};
use crate::protocol::{read_byte, read_u16, QoS};
use core::ops::Range;

/// Decoder capability set: the packet classes whose variable headers carry
/// caller-visible strings. CONNACK and SUBACK are fixed-shape and decode in
/// their packet modules without touching decoder memory.
#[allow(async_fn_in_trait)]
pub trait Decode {
    async fn decode_connect<'s, T: Transport>(
        &'s mut self,
        transport: &mut T,
    ) -> Result<(Connect<'s>, usize)>;

    async fn decode_publish<'s, T: Transport>(
        &'s mut self,
        transport: &mut T,
        qos: QoS,
    ) -> Result<(Publish<'s>, usize)>;

    async fn decode_subscribe<'s, T: Transport, const MAX_FILTERS: usize>(
        &'s mut self,
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Subscribe<'s, MAX_FILTERS>, usize)>;

    async fn decode_unsubscribe<'s, T: Transport, const MAX_FILTERS: usize>(
        &'s mut self,
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Unsubscribe<'s, MAX_FILTERS>, usize)>;
}

/// Backing storage for decoded strings. Successive reservations consume the
/// buffer head-first; `reset` reclaims everything for the next packet.
trait Arena {
    fn reset(&mut self);
    fn reserve(&mut self, len: usize) -> Result<Range<usize>>;
    fn slice_mut(&mut self, range: Range<usize>) -> &mut [u8];
    fn buffer(&self) -> &[u8];
}

fn str_at<'a>(buffer: &'a [u8], range: Range<usize>) -> Result<&'a str> {
    core::str::from_utf8(&buffer[range]).map_err(|_| ProtocolError::MalformedUtf8.into())
}

/// Read a length-prefixed field into arena memory. Returns the byte range
/// and the wire bytes consumed (2 + length).
async fn read_field<A: Arena, T: Transport>(
    arena: &mut A,
    transport: &mut T,
    utf8: bool,
) -> Result<(Range<usize>, usize)> {
    let len = read_u16(transport).await? as usize;
    if len == 0 {
        return Err(ProtocolError::ZeroLengthString.into());
    }
    let range = arena.reserve(len)?;
    read_full(transport, arena.slice_mut(range.clone())).await?;
    if utf8 {
        str_at(arena.buffer(), range.clone())?;
    }
    Ok((range, 2 + len))
}

async fn connect_body<'s, A: Arena, T: Transport>(
    arena: &'s mut A,
    transport: &mut T,
) -> Result<(Connect<'s>, usize)> {
    arena.reset();

    let (protocol_range, mut n) = read_field(arena, transport, true).await?;

    let protocol_level = read_byte(transport).await?;
    let flags = ConnectFlags::from_bits(read_byte(transport).await?);
    n += 2;
    if flags.contains(ConnectFlags::RESERVED) {
        return Err(ProtocolError::ReservedFlagSet.into());
    }
    if flags.contains(ConnectFlags::PASSWORD) && !flags.contains(ConnectFlags::USERNAME) {
        return Err(ProtocolError::PasswordWithoutUsername.into());
    }
    let will_qos = QoS::from_u8(flags.will_qos())?;

    let keep_alive = read_u16(transport).await?;
    n += 2;

    let (client_id_range, id_n) = read_field(arena, transport, true).await?;
    n += id_n;

    let mut will_topic_range = None;
    let mut will_message_range = None;
    if flags.contains(ConnectFlags::WILL_FLAG) {
        let (topic_range, topic_n) = read_field(arena, transport, true).await?;
        n += topic_n;
        will_topic_range = Some(topic_range);
        let (message_range, message_n) = read_field(arena, transport, false).await?;
        n += message_n;
        will_message_range = Some(message_range);
    }

    let mut username_range = None;
    let mut password_range = None;
    if flags.contains(ConnectFlags::USERNAME) {
        let (user_range, user_n) = read_field(arena, transport, true).await?;
        n += user_n;
        username_range = Some(user_range);
        if flags.contains(ConnectFlags::PASSWORD) {
            let (pass_range, pass_n) = read_field(arena, transport, false).await?;
            n += pass_n;
            password_range = Some(pass_range);
        }
    }

    let buffer: &'s [u8] = (*arena).buffer();
    let connect = Connect {
        protocol_name: str_at(buffer, protocol_range)?,
        protocol_level,
        clean_session: flags.contains(ConnectFlags::CLEAN_SESSION),
        keep_alive,
        client_id: str_at(buffer, client_id_range)?,
        will_topic: match will_topic_range {
            Some(range) => Some(str_at(buffer, range)?),
            None => None,
        },
        will_message: will_message_range.map(|range| &buffer[range]),
        will_qos,
        will_retain: flags.contains(ConnectFlags::WILL_RETAIN),
        username: match username_range {
            Some(range) => Some(str_at(buffer, range)?),
            None => None,
        },
        password: password_range.map(|range| &buffer[range]),
    };
    Ok((connect, n))
}

async fn publish_body<'s, A: Arena, T: Transport>(
    arena: &'s mut A,
    transport: &mut T,
    qos: QoS,
) -> Result<(Publish<'s>, usize)> {
    arena.reset();

    let (topic_range, mut n) = read_field(arena, transport, true).await?;

    let mut packet_id = 0;
    if qos != QoS::AtMostOnce {
        packet_id = read_u16(transport).await?;
        n += 2;
        if packet_id == 0 {
            return Err(ProtocolError::ZeroPacketIdentifier.into());
        }
    }

    let buffer: &'s [u8] = (*arena).buffer();
    Ok((
        Publish {
            topic: str_at(buffer, topic_range)?,
            packet_id,
        },
        n,
    ))
}

async fn subscribe_body<'s, A: Arena, T: Transport, const MAX_FILTERS: usize>(
    arena: &'s mut A,
    transport: &mut T,
    remaining_length: u32,
) -> Result<(Subscribe<'s, MAX_FILTERS>, usize)> {
    arena.reset();

    let packet_id = read_u16(transport).await?;
    let mut n = 2usize;

    let mut ranges: heapless::Vec<(Range<usize>, QoS), MAX_FILTERS> = heapless::Vec::new();
    while (n as u32) < remaining_length {
        let (range, field_n) = read_field(arena, transport, true).await?;
        n += field_n;
        let qos = QoS::from_u8(read_byte(transport).await?)?;
        n += 1;
        ranges
            .push((range, qos))
            .map_err(|_| ProtocolError::UserBufferFull)?;
    }
    if n as u32 != remaining_length {
        return Err(ProtocolError::BadRemainingLength {
            packet_type: crate::protocol::PacketType::Subscribe,
            value: remaining_length,
        }
        .into());
    }

    let buffer: &'s [u8] = (*arena).buffer();
    let mut subscribe = Subscribe::new(packet_id);
    for (range, qos) in ranges {
        subscribe.push(str_at(buffer, range)?, qos)?;
    }
    Ok((subscribe, n))
}

async fn unsubscribe_body<'s, A: Arena, T: Transport, const MAX_FILTERS: usize>(
    arena: &'s mut A,
    transport: &mut T,
    remaining_length: u32,
) -> Result<(Unsubscribe<'s, MAX_FILTERS>, usize)> {
    arena.reset();

    let packet_id = read_u16(transport).await?;
    let mut n = 2usize;

    let mut ranges: heapless::Vec<Range<usize>, MAX_FILTERS> = heapless::Vec::new();
    while (n as u32) < remaining_length {
        let (range, field_n) = read_field(arena, transport, true).await?;
        n += field_n;
        ranges
            .push(range)
            .map_err(|_| ProtocolError::UserBufferFull)?;
    }
    if n as u32 != remaining_length {
        return Err(ProtocolError::BadRemainingLength {
            packet_type: crate::protocol::PacketType::Unsubscribe,
            value: remaining_length,
        }
        .into());
    }

    let buffer: &'s [u8] = (*arena).buffer();
    let mut unsubscribe = Unsubscribe::new(packet_id);
    for range in ranges {
        unsubscribe.push(str_at(buffer, range)?)?;
    }
    Ok((unsubscribe, n))
}

/// Decoder backed by a fixed user buffer. Every decoded string is a
/// sub-slice of the buffer, consumed head-first per packet; a packet whose
/// strings do not fit fails with `UserBufferFull`.
pub struct NoAllocDecoder<const N: usize> {
    buffer: [u8; N],
    cursor: usize,
}

impl<const N: usize> NoAllocDecoder<N> {
    pub const fn new() -> Self {
        NoAllocDecoder {
            buffer: [0; N],
            cursor: 0,
        }
    }
}

impl<const N: usize> Default for NoAllocDecoder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Arena for NoAllocDecoder<N> {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn reserve(&mut self, len: usize) -> Result<Range<usize>> {
        if self.cursor + len > N {
            return Err(ProtocolError::UserBufferFull.into());
        }
        let range = self.cursor..self.cursor + len;
        self.cursor += len;
        Ok(range)
    }

    fn slice_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.buffer[range]
    }

    fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

impl<const N: usize> Decode for NoAllocDecoder<N> {
    async fn decode_connect<'s, T: Transport>(
        &'s mut self,
        transport: &mut T,
    ) -> Result<(Connect<'s>, usize)> {
        connect_body(self, transport).await
    }

    async fn decode_publish<'s, T: Transport>(
        &'s mut self,
        transport: &mut T,
        qos: QoS,
    ) -> Result<(Publish<'s>, usize)> {
        publish_body(self, transport, qos).await
    }

    async fn decode_subscribe<'s, T: Transport, const MAX_FILTERS: usize>(
        &'s mut self,
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Subscribe<'s, MAX_FILTERS>, usize)> {
        subscribe_body(self, transport, remaining_length).await
    }

    async fn decode_unsubscribe<'s, T: Transport, const MAX_FILTERS: usize>(
        &'s mut self,
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Unsubscribe<'s, MAX_FILTERS>, usize)> {
        unsubscribe_body(self, transport, remaining_length).await
    }
}

/// Decoder whose backing buffer grows on demand, so decoding never reports
/// `UserBufferFull`. Requires the `alloc` feature.
#[cfg(feature = "alloc")]
pub struct AllocDecoder {
    buffer: alloc::vec::Vec<u8>,
    cursor: usize,
}

#[cfg(feature = "alloc")]
impl AllocDecoder {
    pub const fn new() -> Self {
        AllocDecoder {
            buffer: alloc::vec::Vec::new(),
            cursor: 0,
        }
    }
}

#[cfg(feature = "alloc")]
impl Default for AllocDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "alloc")]
impl Arena for AllocDecoder {
    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn reserve(&mut self, len: usize) -> Result<Range<usize>> {
        if self.buffer.len() < self.cursor + len {
            self.buffer.resize(self.cursor + len, 0);
        }
        let range = self.cursor..self.cursor + len;
        self.cursor += len;
        Ok(range)
    }

    fn slice_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.buffer[range]
    }

    fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(feature = "alloc")]
impl Decode for AllocDecoder {
    async fn decode_connect<'s, T: Transport>(
        &'s mut self,
        transport: &mut T,
    ) -> Result<(Connect<'s>, usize)> {
        connect_body(self, transport).await
    }

    async fn decode_publish<'s, T: Transport>(
        &'s mut self,
        transport: &mut T,
        qos: QoS,
    ) -> Result<(Publish<'s>, usize)> {
        publish_body(self, transport, qos).await
    }

    async fn decode_subscribe<'s, T: Transport, const MAX_FILTERS: usize>(
        &'s mut self,
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Subscribe<'s, MAX_FILTERS>, usize)> {
        subscribe_body(self, transport, remaining_length).await
    }

    async fn decode_unsubscribe<'s, T: Transport, const MAX_FILTERS: usize>(
        &'s mut self,
        transport: &mut T,
        remaining_length: u32,
    ) -> Result<(Unsubscribe<'s, MAX_FILTERS>, usize)> {
        unsubscribe_body(self, transport, remaining_length).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::QoS;
    use crate::testutil::{block_on, MockTransport};

    // ===== CONNECT =====

    // Remaining-length content of a CONNECT: "MQTT" level 4, clean session,
    // keep-alive 60, client id "abc".
    const CONNECT_BASIC: &[u8] = &[
        0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, // Protocol Name "MQTT"
        0x04, // Protocol Level
        0b0000_0010, // Connect Flags (Clean Session)
        0x00, 0x3C, // Keep Alive (60 seconds)
        0x00, 0x03, // Client ID Length
        0x61, 0x62, 0x63, // Client ID "abc"
    ];

    #[test]
    fn test_decode_connect_basic() {
        let mut decoder: NoAllocDecoder<64> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(CONNECT_BASIC);
        let (connect, n) = block_on(decoder.decode_connect(&mut transport)).unwrap();
        assert_eq!(n, CONNECT_BASIC.len());
        assert_eq!(connect.protocol_name, "MQTT");
        assert_eq!(connect.protocol_level, 4);
        assert!(connect.clean_session);
        assert_eq!(connect.keep_alive, 60);
        assert_eq!(connect.client_id, "abc");
        assert!(connect.will_topic.is_none());
        assert!(connect.username.is_none());
    }

    #[test]
    fn test_decode_connect_all_fields() {
        let bytes: &[u8] = &[
            0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, // "MQTT"
            0x04, // Protocol Level
            0b1110_1110, // all flags except reserved, will QoS 1
            0x00, 0x3C, // Keep Alive
            0x00, 0x03, 0x61, 0x62, 0x63, // "abc"
            0x00, 0x06, 0x77, 0x69, 0x6C, 0x6C, 0x74, 0x70, // Will Topic "willtp"
            0x00, 0x07, 0x77, 0x69, 0x6C, 0x6C, 0x6D, 0x73, 0x67, // Will "willmsg"
            0x00, 0x05, 0x75, 0x73, 0x65, 0x72, 0x31, // Username "user1"
            0x00, 0x05, 0x70, 0x61, 0x73, 0x73, 0x31, // Password "pass1"
        ];
        let mut decoder: NoAllocDecoder<128> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let (connect, n) = block_on(decoder.decode_connect(&mut transport)).unwrap();
        assert_eq!(n, bytes.len());
        assert_eq!(connect.will_topic, Some("willtp"));
        assert_eq!(connect.will_message, Some(b"willmsg".as_ref()));
        assert_eq!(connect.will_qos, QoS::AtLeastOnce);
        assert!(connect.will_retain);
        assert_eq!(connect.username, Some("user1"));
        assert_eq!(connect.password, Some(b"pass1".as_ref()));
    }

    #[test]
    fn test_decode_connect_reserved_bit() {
        let mut bytes = CONNECT_BASIC.to_vec();
        bytes[7] |= 0b0000_0001;
        let mut decoder: NoAllocDecoder<64> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&bytes);
        let result = block_on(decoder.decode_connect(&mut transport));
        assert_eq!(result.unwrap_err(), ProtocolError::ReservedFlagSet.into());
    }

    #[test]
    fn test_decode_connect_password_without_username() {
        let mut bytes = CONNECT_BASIC.to_vec();
        bytes[7] = 0b0100_0010;
        let mut decoder: NoAllocDecoder<64> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&bytes);
        let result = block_on(decoder.decode_connect(&mut transport));
        assert_eq!(
            result.unwrap_err(),
            ProtocolError::PasswordWithoutUsername.into()
        );
    }

    #[test]
    fn test_decode_connect_buffer_full() {
        // "MQTT" fits, "abc" does not.
        let mut decoder: NoAllocDecoder<5> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(CONNECT_BASIC);
        let result = block_on(decoder.decode_connect(&mut transport));
        assert_eq!(result.unwrap_err(), ProtocolError::UserBufferFull.into());
    }

    #[test]
    fn test_decode_connect_reserved_will_qos() {
        // Will QoS bits 0b11 are not a valid level.
        let mut bytes = CONNECT_BASIC.to_vec();
        bytes[7] = 0b0001_1110;
        let mut decoder: NoAllocDecoder<64> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&bytes);
        let result = block_on(decoder.decode_connect(&mut transport));
        assert_eq!(
            result.unwrap_err(),
            ProtocolError::BadQos { value: 3 }.into()
        );
    }

    #[test]
    fn test_decode_connect_truncated_mid_string() {
        // Client id length says 3 but the stream ends after 1 byte.
        let truncated = &CONNECT_BASIC[..CONNECT_BASIC.len() - 2];
        let mut decoder: NoAllocDecoder<64> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(truncated);
        let result = block_on(decoder.decode_connect(&mut transport));
        assert_eq!(
            result.unwrap_err(),
            crate::error::NetworkError::ConnectionClosed.into()
        );
    }

    #[test]
    fn test_decode_subscribe_rejects_empty_filter() {
        let bytes: &[u8] = &[0x00, 0x01, 0x00, 0x00, 0x00];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let result =
            block_on(decoder.decode_subscribe::<_, 4>(&mut transport, bytes.len() as u32));
        assert_eq!(result.unwrap_err(), ProtocolError::ZeroLengthString.into());
    }

    #[test]
    fn test_decode_unsubscribe_rejects_bad_utf8() {
        let bytes: &[u8] = &[0x00, 0x01, 0x00, 0x02, 0xC3, 0x28];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let result = block_on(
            decoder.decode_unsubscribe::<_, 4>(&mut transport, bytes.len() as u32),
        );
        assert_eq!(result.unwrap_err(), ProtocolError::MalformedUtf8.into());
    }

    #[test]
    fn test_decoder_reuse_across_packets() {
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        // Two decodes in sequence reuse the buffer from the start.
        for _ in 0..2 {
            let mut transport = MockTransport::incoming(CONNECT_BASIC);
            let (connect, _) = block_on(decoder.decode_connect(&mut transport)).unwrap();
            assert_eq!(connect.client_id, "abc");
        }
    }

    // ===== PUBLISH =====

    #[test]
    fn test_decode_publish_qos0() {
        // Minimal QoS 0 variable header: topic "t" only.
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&[0x00, 0x01, 0x74]);
        let (publish, n) =
            block_on(decoder.decode_publish(&mut transport, QoS::AtMostOnce)).unwrap();
        assert_eq!(n, 3);
        assert_eq!(publish.topic, "t");
        assert_eq!(publish.packet_id, 0);
    }

    #[test]
    fn test_decode_publish_qos1_packet_id() {
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport =
            MockTransport::incoming(&[0x00, 0x03, 0x61, 0x2F, 0x62, 0x12, 0x34]);
        let (publish, n) =
            block_on(decoder.decode_publish(&mut transport, QoS::AtLeastOnce)).unwrap();
        assert_eq!(n, 7);
        assert_eq!(publish.topic, "a/b");
        assert_eq!(publish.packet_id, 0x1234);
    }

    #[test]
    fn test_decode_publish_rejects_zero_packet_id() {
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&[0x00, 0x01, 0x74, 0x00, 0x00]);
        let result = block_on(decoder.decode_publish(&mut transport, QoS::ExactlyOnce));
        assert_eq!(
            result.unwrap_err(),
            ProtocolError::ZeroPacketIdentifier.into()
        );
    }

    #[test]
    fn test_decode_publish_rejects_empty_topic() {
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&[0x00, 0x00]);
        let result = block_on(decoder.decode_publish(&mut transport, QoS::AtMostOnce));
        assert_eq!(result.unwrap_err(), ProtocolError::ZeroLengthString.into());
    }

    #[test]
    fn test_decode_publish_rejects_bad_utf8() {
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(&[0x00, 0x02, 0xFF, 0xFE]);
        let result = block_on(decoder.decode_publish(&mut transport, QoS::AtMostOnce));
        assert_eq!(result.unwrap_err(), ProtocolError::MalformedUtf8.into());
    }

    // ===== SUBSCRIBE =====

    #[test]
    fn test_decode_subscribe_two_filters() {
        let bytes: &[u8] = &[
            0x00, 0x01, // packet identifier
            0x00, 0x01, 0x61, 0x01, // "a" QoS 1
            0x00, 0x01, 0x62, 0x00, // "b" QoS 0
        ];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let (subscribe, n) = block_on(
            decoder.decode_subscribe::<_, 4>(&mut transport, bytes.len() as u32),
        )
        .unwrap();
        assert_eq!(n, bytes.len());
        assert_eq!(subscribe.packet_id, 1);
        assert_eq!(subscribe.filters.len(), 2);
        assert_eq!(subscribe.filters[0].filter, "a");
        assert_eq!(subscribe.filters[0].qos, QoS::AtLeastOnce);
        assert_eq!(subscribe.filters[1].filter, "b");
        assert_eq!(subscribe.filters[1].qos, QoS::AtMostOnce);
    }

    #[test]
    fn test_decode_subscribe_rejects_bad_qos() {
        let bytes: &[u8] = &[0x00, 0x01, 0x00, 0x01, 0x61, 0x03];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let result =
            block_on(decoder.decode_subscribe::<_, 4>(&mut transport, bytes.len() as u32));
        assert_eq!(result.unwrap_err(), ProtocolError::BadQos { value: 3 }.into());
    }

    #[test]
    fn test_decode_subscribe_remaining_length_overrun() {
        // Remaining length cuts through the middle of the first filter entry.
        let bytes: &[u8] = &[0x00, 0x01, 0x00, 0x01, 0x61, 0x01];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let result = block_on(decoder.decode_subscribe::<_, 4>(&mut transport, 4));
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_subscribe_filter_capacity() {
        let bytes: &[u8] = &[
            0x00, 0x01, 0x00, 0x01, 0x61, 0x00, 0x00, 0x01, 0x62, 0x00, 0x00, 0x01, 0x63,
            0x00,
        ];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let result =
            block_on(decoder.decode_subscribe::<_, 2>(&mut transport, bytes.len() as u32));
        assert_eq!(result.unwrap_err(), ProtocolError::UserBufferFull.into());
    }

    // ===== UNSUBSCRIBE =====

    #[test]
    fn test_decode_unsubscribe() {
        let bytes: &[u8] = &[
            0x00, 0x0A, // packet identifier
            0x00, 0x01, 0x61, // "a"
            0x00, 0x03, 0x62, 0x2F, 0x63, // "b/c"
        ];
        let mut decoder: NoAllocDecoder<16> = NoAllocDecoder::new();
        let mut transport = MockTransport::incoming(bytes);
        let (unsubscribe, n) = block_on(
            decoder.decode_unsubscribe::<_, 4>(&mut transport, bytes.len() as u32),
        )
        .unwrap();
        assert_eq!(n, bytes.len());
        assert_eq!(unsubscribe.packet_id, 0x000A);
        assert_eq!(unsubscribe.filters.as_slice(), &["a", "b/c"]);
    }

    // ===== ALLOC DECODER =====

    #[cfg(feature = "alloc")]
    #[test]
    fn test_alloc_decoder_never_fills() {
        let mut decoder = AllocDecoder::new();
        let mut transport = MockTransport::incoming(CONNECT_BASIC);
        let (connect, _) = block_on(decoder.decode_connect(&mut transport)).unwrap();
        assert_eq!(connect.client_id, "abc");

        // A second, larger packet grows the buffer instead of failing.
        let mut transport =
            MockTransport::incoming(&[0x00, 0x08, b'l', b'o', b'n', b'g', b'/', b'o', b'n', b'e']);
        let (publish, _) =
            block_on(decoder.decode_publish(&mut transport, QoS::AtMostOnce)).unwrap();
        assert_eq!(publish.topic, "long/one");
    }
}
