//! Receive engine.
//!
//! [`Rx::read_next_packet`] reads and dispatches exactly one MQTT packet
//! from the transport. Hooks are methods on [`PacketHandler`]; the handler
//! typically holds the session state, which keeps callbacks and client
//! state out of each other's way. If decoding fails after the first byte
//! was consumed the stream is unrecoverable: the error hook runs and the
//! transport is closed unless the hook takes over that responsibility.

use crate::decoder::Decode;
use crate::error::{Error, NetworkError, ProtocolError, Result};
use crate::network::Transport;
use crate::protocol::packets::{ConnAck, Connect, Publish, PublishFlags, SubAck, Subscribe, Unsubscribe};
use crate::protocol::{read_u16, FixedHeader, PacketType};

/// Reader handed to the publish hook, bounded to the payload bytes
/// advertised by the fixed header. The hook must consume it fully.
pub struct PayloadReader<'a, T: Transport> {
    transport: &'a mut T,
    remaining: u32,
}

impl<'a, T: Transport> PayloadReader<'a, T> {
    /// Payload bytes not yet read.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Read up to `buf.len()` payload bytes. Returns 0 once the payload is
    /// exhausted; a transport that ends early is an error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(self.remaining as usize);
        match self.transport.read(&mut buf[..want]).await? {
            0 => Err(NetworkError::ConnectionClosed.into()),
            n => {
                self.remaining -= n as u32;
                Ok(n)
            }
        }
    }

    /// Fill `buf` exactly from the payload.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]).await? {
                0 => return Err(NetworkError::ConnectionClosed.into()),
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Consume the rest of the payload and throw it away.
    pub async fn drain(&mut self) -> Result<()> {
        let mut scratch = [0u8; 64];
        while self.remaining > 0 {
            self.read(&mut scratch).await?;
        }
        Ok(())
    }
}

/// Per-packet hooks invoked by the receive engine. All methods default to
/// accepting and ignoring the packet; the publish hook drains the payload.
///
/// Hooks run synchronously inside `read_next_packet` and must not re-enter
/// the engine. A hook error aborts the call and marks the stream dead.
#[allow(async_fn_in_trait)]
pub trait PacketHandler<const MAX_FILTERS: usize> {
    fn on_connect(&mut self, connect: &Connect<'_>) -> Result<()> {
        let _ = connect;
        Ok(())
    }

    fn on_connack(&mut self, connack: ConnAck) -> Result<()> {
        let _ = connack;
        Ok(())
    }

    async fn on_publish<T: Transport>(
        &mut self,
        header: FixedHeader,
        publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()> {
        let _ = (header, publish);
        payload.drain().await
    }

    fn on_subscribe(&mut self, subscribe: &Subscribe<'_, MAX_FILTERS>) -> Result<()> {
        let _ = subscribe;
        Ok(())
    }

    fn on_suback(&mut self, suback: &SubAck<MAX_FILTERS>) -> Result<()> {
        let _ = suback;
        Ok(())
    }

    fn on_unsubscribe(&mut self, unsubscribe: &Unsubscribe<'_, MAX_FILTERS>) -> Result<()> {
        let _ = unsubscribe;
        Ok(())
    }

    /// PUBACK, PUBREC, PUBREL, PUBCOMP and UNSUBACK arrive here with their
    /// packet identifier; DISCONNECT, PINGREQ and PINGRESP with 0.
    fn on_other(&mut self, header: FixedHeader, packet_id: u16) -> Result<()> {
        let _ = (header, packet_id);
        Ok(())
    }

    /// Called when the stream fails mid-packet. Return true to take over
    /// closing the transport; the default leaves that to the engine.
    fn on_rx_error(&mut self, error: &Error) -> bool {
        let _ = error;
        false
    }
}

/// Receive engine: a decoder plus the last correctly read header.
pub struct Rx<D> {
    decoder: D,
    last_header: Option<FixedHeader>,
}

impl<D: Decode> Rx<D> {
    pub fn new(decoder: D) -> Self {
        Rx {
            decoder,
            last_header: None,
        }
    }

    /// Header of the packet currently being dispatched, reset at the start
    /// of every read.
    pub fn last_header(&self) -> Option<FixedHeader> {
        self.last_header
    }

    /// Read and dispatch exactly one packet, returning the bytes consumed.
    ///
    /// A failure before any byte was read is returned untouched - the
    /// stream is still intact. Any later failure (including a hook error)
    /// runs the error hook and, unless the hook claims the job, closes the
    /// transport.
    pub async fn read_next_packet<T, H, const MAX_FILTERS: usize>(
        &mut self,
        transport: &mut T,
        handler: &mut H,
    ) -> Result<usize>
    where
        T: Transport,
        H: PacketHandler<MAX_FILTERS>,
    {
        self.last_header = None;
        let (header, mut n) = FixedHeader::decode(transport).await;
        let header = match header {
            Ok(header) => header,
            Err(error) => {
                if n > 0 {
                    fail(transport, handler, &error).await;
                }
                return Err(error);
            }
        };
        self.last_header = Some(header);

        match self.dispatch(transport, handler, header, &mut n).await {
            Ok(()) => Ok(n),
            Err(error) => {
                fail(transport, handler, &error).await;
                Err(error)
            }
        }
    }

    async fn dispatch<T, H, const MAX_FILTERS: usize>(
        &mut self,
        transport: &mut T,
        handler: &mut H,
        header: FixedHeader,
        n: &mut usize,
    ) -> Result<()>
    where
        T: Transport,
        H: PacketHandler<MAX_FILTERS>,
    {
        match header.packet_type {
            PacketType::Publish => {
                let flags = PublishFlags::from_nibble(header.flags)?;
                let (publish, ngot) =
                    self.decoder.decode_publish(transport, flags.qos).await?;
                *n += ngot;
                let payload_len = header
                    .remaining_length
                    .checked_sub(ngot as u32)
                    .ok_or(ProtocolError::BadRemainingLength {
                        packet_type: PacketType::Publish,
                        value: header.remaining_length,
                    })?;
                let mut reader = PayloadReader {
                    transport,
                    remaining: payload_len,
                };
                let result = handler.on_publish(header, &publish, &mut reader).await;
                let unread = reader.remaining();
                *n += (payload_len - unread) as usize;
                result?;
                if unread != 0 {
                    return Err(Error::PayloadUnderread { missing: unread });
                }
            }

            PacketType::ConnAck => {
                if header.remaining_length != ConnAck::SIZE {
                    return Err(bad_remaining_length(header));
                }
                let (connack, ngot) = ConnAck::decode(transport).await?;
                *n += ngot;
                handler.on_connack(connack)?;
            }

            PacketType::Connect => {
                let (connect, ngot) = self.decoder.decode_connect(transport).await?;
                *n += ngot;
                handler.on_connect(&connect)?;
            }

            PacketType::SubAck => {
                let (suback, ngot) =
                    SubAck::decode(transport, header.remaining_length).await?;
                *n += ngot;
                handler.on_suback(&suback)?;
            }

            PacketType::Subscribe => {
                let (subscribe, ngot) = self
                    .decoder
                    .decode_subscribe(transport, header.remaining_length)
                    .await?;
                *n += ngot;
                handler.on_subscribe(&subscribe)?;
            }

            PacketType::Unsubscribe => {
                let (unsubscribe, ngot) = self
                    .decoder
                    .decode_unsubscribe(transport, header.remaining_length)
                    .await?;
                *n += ngot;
                handler.on_unsubscribe(&unsubscribe)?;
            }

            PacketType::PubAck
            | PacketType::PubRec
            | PacketType::PubRel
            | PacketType::PubComp
            | PacketType::UnsubAck => {
                if header.remaining_length != 2 {
                    return Err(bad_remaining_length(header));
                }
                let packet_id = read_u16(transport).await?;
                *n += 2;
                if packet_id == 0 {
                    return Err(ProtocolError::ZeroPacketIdentifier.into());
                }
                handler.on_other(header, packet_id)?;
            }

            PacketType::Disconnect | PacketType::PingReq | PacketType::PingResp => {
                if header.remaining_length != 0 {
                    return Err(bad_remaining_length(header));
                }
                handler.on_other(header, 0)?;
            }

            // Header decode rejects reserved types before we get here.
            PacketType::Reserved | PacketType::Reserved2 => {
                return Err(ProtocolError::BadPacketType {
                    value: header.packet_type as u8,
                }
                .into());
            }
        }
        Ok(())
    }
}

fn bad_remaining_length(header: FixedHeader) -> Error {
    ProtocolError::BadRemainingLength {
        packet_type: header.packet_type,
        value: header.remaining_length,
    }
    .into()
}

async fn fail<T, H, const MAX_FILTERS: usize>(transport: &mut T, handler: &mut H, error: &Error)
where
    T: Transport,
    H: PacketHandler<MAX_FILTERS>,
{
    if !handler.on_rx_error(error) {
        log::warn!("closing transport after receive failure: {}", error);
        let _ = transport.close().await;
    }
}
