//! Transmit engine.
//!
//! Each `write_*` call validates its input, stages the fixed and variable
//! headers into a fixed buffer and hands the transport a single write
//! (PUBLISH payload bytes stream through as a second write, untouched).
//! A failure after bytes reached the wire leaves the stream unusable, so
//! the transport is closed before the error propagates.

use crate::error::{Error, NetworkError, ProtocolError, Result};
use crate::network::Transport;
use crate::protocol::packets::{ConnAck, Connect, Publish, PublishFlags, SubAck, Subscribe, Unsubscribe};
use crate::protocol::{FixedHeader, PacketType, MAX_REMAINING_LENGTH};

/// Transmit engine with an `N`-byte staging buffer. The buffer only ever
/// holds headers, so a few hundred bytes cover typical CONNECT packets;
/// PUBLISH payloads are caller-owned and never copied in.
pub struct Tx<const N: usize> {
    buffer: [u8; N],
}

impl<const N: usize> Tx<N> {
    pub const fn new() -> Self {
        Tx { buffer: [0; N] }
    }

    /// Write a CONNECT packet. Returns the total bytes put on the wire.
    pub async fn write_connect<T: Transport>(
        &mut self,
        transport: &mut T,
        connect: &Connect<'_>,
    ) -> Result<usize> {
        connect.validate()?;
        let remaining = connect.encoded_size();
        let header = FixedHeader::new(PacketType::Connect, remaining as u32);
        let mut offset = header.encode(&mut self.buffer)?;
        offset += connect.encode(&mut self.buffer[offset..])?;
        send(transport, &self.buffer[..offset], &[]).await
    }

    /// Write a CONNACK packet (server side of the handshake).
    pub async fn write_connack<T: Transport>(
        &mut self,
        transport: &mut T,
        connack: ConnAck,
    ) -> Result<usize> {
        let header = FixedHeader::new(PacketType::ConnAck, ConnAck::SIZE);
        let mut offset = header.encode(&mut self.buffer)?;
        offset += connack.encode(&mut self.buffer[offset..])?;
        send(transport, &self.buffer[..offset], &[]).await
    }

    /// Write a PUBLISH packet, streaming the caller-owned payload through.
    /// The engine frames any QoS; QoS-0-only policy is the client's.
    pub async fn write_publish<T: Transport>(
        &mut self,
        transport: &mut T,
        flags: PublishFlags,
        publish: &Publish<'_>,
        payload: &[u8],
    ) -> Result<usize> {
        publish.validate(flags.qos)?;
        let remaining = publish.encoded_size(flags.qos) + payload.len();
        if remaining as u64 > MAX_REMAINING_LENGTH as u64 {
            return Err(ProtocolError::RemainingLengthTooLarge {
                value: remaining as u32,
            }
            .into());
        }
        let header = FixedHeader::publish(flags.to_nibble(), remaining as u32);
        let mut offset = header.encode(&mut self.buffer)?;
        offset += publish.encode(&mut self.buffer[offset..], flags.qos)?;
        send(transport, &self.buffer[..offset], payload).await
    }

    pub async fn write_subscribe<T: Transport, const MAX_FILTERS: usize>(
        &mut self,
        transport: &mut T,
        subscribe: &Subscribe<'_, MAX_FILTERS>,
    ) -> Result<usize> {
        subscribe.validate()?;
        let header =
            FixedHeader::new(PacketType::Subscribe, subscribe.encoded_size() as u32);
        let mut offset = header.encode(&mut self.buffer)?;
        offset += subscribe.encode(&mut self.buffer[offset..])?;
        send(transport, &self.buffer[..offset], &[]).await
    }

    pub async fn write_suback<T: Transport, const MAX_FILTERS: usize>(
        &mut self,
        transport: &mut T,
        suback: &SubAck<MAX_FILTERS>,
    ) -> Result<usize> {
        suback.validate()?;
        let header = FixedHeader::new(PacketType::SubAck, suback.encoded_size() as u32);
        let mut offset = header.encode(&mut self.buffer)?;
        offset += suback.encode(&mut self.buffer[offset..])?;
        send(transport, &self.buffer[..offset], &[]).await
    }

    pub async fn write_unsubscribe<T: Transport, const MAX_FILTERS: usize>(
        &mut self,
        transport: &mut T,
        unsubscribe: &Unsubscribe<'_, MAX_FILTERS>,
    ) -> Result<usize> {
        unsubscribe.validate()?;
        let header =
            FixedHeader::new(PacketType::Unsubscribe, unsubscribe.encoded_size() as u32);
        let mut offset = header.encode(&mut self.buffer)?;
        offset += unsubscribe.encode(&mut self.buffer[offset..])?;
        send(transport, &self.buffer[..offset], &[]).await
    }

    /// Write one of the identifier-only acknowledgements: PUBACK, PUBREC,
    /// PUBREL, PUBCOMP or UNSUBACK. The remaining length is always 2 and
    /// the identifier must be nonzero.
    pub async fn write_identified<T: Transport>(
        &mut self,
        transport: &mut T,
        packet_type: PacketType,
        packet_id: u16,
    ) -> Result<usize> {
        let is_identified = matches!(
            packet_type,
            PacketType::PubAck
                | PacketType::PubRec
                | PacketType::PubRel
                | PacketType::PubComp
                | PacketType::UnsubAck
        );
        if !is_identified {
            return Err(Error::UnexpectedPacket { packet_type });
        }
        if packet_id == 0 {
            return Err(ProtocolError::ZeroPacketIdentifier.into());
        }
        let header = FixedHeader::new(packet_type, 2);
        let mut offset = header.encode(&mut self.buffer)?;
        if offset + 2 > N {
            return Err(ProtocolError::BufferTooSmall.into());
        }
        self.buffer[offset..offset + 2].copy_from_slice(&packet_id.to_be_bytes());
        offset += 2;
        send(transport, &self.buffer[..offset], &[]).await
    }

    /// Write one of the two-octet packets: DISCONNECT, PINGREQ or PINGRESP.
    pub async fn write_simple<T: Transport>(
        &mut self,
        transport: &mut T,
        packet_type: PacketType,
    ) -> Result<usize> {
        let is_simple = matches!(
            packet_type,
            PacketType::Disconnect | PacketType::PingReq | PacketType::PingResp
        );
        if !is_simple {
            return Err(Error::UnexpectedPacket { packet_type });
        }
        let header = FixedHeader::new(packet_type, 0);
        let offset = header.encode(&mut self.buffer)?;
        send(transport, &self.buffer[..offset], &[]).await
    }
}

impl<const N: usize> Default for Tx<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Put the staged bytes and payload on the wire. A failure after anything
/// was written closes the transport; the stream cannot be resynchronized
/// mid-packet.
async fn send<T: Transport>(transport: &mut T, staged: &[u8], payload: &[u8]) -> Result<usize> {
    let mut written = 0usize;
    let result = write_counting(transport, staged, &mut written).await;
    let result = match result {
        Ok(()) if !payload.is_empty() => {
            write_counting(transport, payload, &mut written).await
        }
        other => other,
    };
    let result = match result {
        Ok(()) => transport.flush().await.map_err(Error::Network),
        err => err,
    };
    match result {
        Ok(()) => Ok(written),
        Err(error) => {
            if written > 0 {
                log::warn!("closing transport after transmit failure: {}", error);
                let _ = transport.close().await;
            }
            Err(error)
        }
    }
}

async fn write_counting<T: Transport>(
    transport: &mut T,
    buf: &[u8],
    written: &mut usize,
) -> Result<()> {
    let mut done = 0;
    while done < buf.len() {
        match transport.write(&buf[done..]).await? {
            0 => return Err(NetworkError::ConnectionClosed.into()),
            n => {
                done += n;
                *written += n;
            }
        }
    }
    Ok(())
}
