//! Client facade.
//!
//! Composes the receive engine, the transmit engine and the session record
//! behind connect/subscribe/publish/ping/disconnect operations. Blocking
//! variants drive [`Client::handle_next`] under an exponential backoff
//! until the session state satisfies the operation or the deadline fires.
//!
//! The facade is `&mut self`-driven: exclusive borrows are what guarantee
//! a single reader and a single writer, and every session update triggered
//! by a packet happens before the driving call returns. Callers wanting a
//! dedicated read task compose one around `handle_next` and feed outgoing
//! messages through it, runtime permitting.

use crate::decoder::Decode;
use crate::error::{Error, Result};
use crate::network::Transport;
use crate::protocol::packets::{ConnAck, Connect, ConnectReturnCode, Publish, PublishFlags, SubAck, Subscribe};
use crate::protocol::{FixedHeader, PacketType, QoS};
use crate::rx::{PacketHandler, PayloadReader, Rx};
use crate::session::{Session, Subscription};
use crate::time::{Delay, TimeSource};
use crate::tx::Tx;

/// Application hook for received PUBLISH packets. The reader is bounded to
/// the payload and must be fully consumed; copy out anything to keep, the
/// borrowed views die when the hook returns.
#[allow(async_fn_in_trait)]
pub trait PublishHandler {
    async fn on_message<T: Transport>(
        &mut self,
        header: FixedHeader,
        publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()>;
}

/// Default handler: drop every message after draining its payload.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnorePublishes;

impl PublishHandler for IgnorePublishes {
    async fn on_message<T: Transport>(
        &mut self,
        _header: FixedHeader,
        _publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()> {
        payload.drain().await
    }
}

/// Exponential backoff for the blocking waits: sleep, then double, capped.
struct Backoff {
    wait_ms: u64,
    max_wait_ms: u64,
}

impl Backoff {
    fn new() -> Self {
        Backoff {
            wait_ms: 0,
            max_wait_ms: 500,
        }
    }

    async fn miss<D: Delay>(&mut self, delay: &D) {
        delay.sleep_ms(self.wait_ms).await;
        let next = (self.wait_ms | 1) << 1;
        self.wait_ms = next.min(self.max_wait_ms);
    }
}

/// Receive-side hooks wired to the session record. Holding the session by
/// reference here is what lets packet handling update client state without
/// the callbacks ever needing the client itself.
struct SessionEvents<'a, P, C, const MAX_SUBS: usize, const MAX_FILTERS: usize, const FILTER_LEN: usize>
{
    session: &'a mut Session<MAX_SUBS, MAX_FILTERS, FILTER_LEN>,
    clock: &'a C,
    publisher: &'a mut P,
}

impl<P, C, const MAX_SUBS: usize, const MAX_FILTERS: usize, const FILTER_LEN: usize>
    PacketHandler<MAX_FILTERS> for SessionEvents<'_, P, C, MAX_SUBS, MAX_FILTERS, FILTER_LEN>
where
    P: PublishHandler,
    C: TimeSource,
{
    fn on_connack(&mut self, connack: ConnAck) -> Result<()> {
        let now = self.clock.now_millis();
        self.session.record_rx(now);
        if self.session.is_connected() {
            return Err(Error::UnexpectedPacket {
                packet_type: PacketType::ConnAck,
            });
        }
        if connack.return_code != ConnectReturnCode::Accepted {
            return Err(Error::ConnectRejected(connack.return_code));
        }
        self.session.on_connect(now);
        Ok(())
    }

    async fn on_publish<T: Transport>(
        &mut self,
        header: FixedHeader,
        publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()> {
        self.session.record_rx(self.clock.now_millis());
        self.publisher.on_message(header, publish, payload).await
    }

    fn on_suback(&mut self, suback: &SubAck<MAX_FILTERS>) -> Result<()> {
        self.session.record_rx(self.clock.now_millis());
        self.session.apply_suback(suback)
    }

    fn on_other(&mut self, header: FixedHeader, _packet_id: u16) -> Result<()> {
        let now = self.clock.now_millis();
        self.session.record_rx(now);
        match header.packet_type {
            PacketType::Disconnect => {
                self.session.on_disconnect(Error::PeerDisconnected);
                Err(Error::PeerDisconnected)
            }
            PacketType::PingReq => {
                self.session.pingreq_received(now);
                Ok(())
            }
            PacketType::PingResp => {
                self.session.pingresp_received();
                Ok(())
            }
            // PUBACK family: QoS 1/2 delivery tracking is out of scope.
            _ => Ok(()),
        }
    }

    fn on_rx_error(&mut self, error: &Error) -> bool {
        self.session.on_disconnect(*error);
        false
    }
}

/// Asynchronous MQTT 3.1.1 client.
///
/// Generic over the transport, time source, delay, decoder and publish
/// handler, with compile-time capacities for the session (`MAX_SUBS`
/// acknowledged subscriptions, `MAX_FILTERS` filters per SUBSCRIBE,
/// `FILTER_LEN` bytes per stored filter) and the `TX_BUF`-byte transmit
/// staging buffer. Runtime crates provide type aliases with workable
/// defaults.
pub struct Client<
    T,
    C,
    D,
    DE,
    P,
    const MAX_SUBS: usize,
    const MAX_FILTERS: usize,
    const FILTER_LEN: usize,
    const TX_BUF: usize,
> {
    transport: Option<T>,
    clock: C,
    delay: D,
    rx: Rx<DE>,
    tx: Tx<TX_BUF>,
    session: Session<MAX_SUBS, MAX_FILTERS, FILTER_LEN>,
    publisher: P,
}

impl<
        T,
        C,
        D,
        DE,
        P,
        const MAX_SUBS: usize,
        const MAX_FILTERS: usize,
        const FILTER_LEN: usize,
        const TX_BUF: usize,
    > Client<T, C, D, DE, P, MAX_SUBS, MAX_FILTERS, FILTER_LEN, TX_BUF>
where
    T: Transport,
    C: TimeSource,
    D: Delay,
    DE: Decode,
    P: PublishHandler,
{
    pub fn new(decoder: DE, publisher: P, clock: C, delay: D) -> Self {
        Client {
            transport: None,
            clock,
            delay,
            rx: Rx::new(decoder),
            tx: Tx::new(),
            session: Session::new(),
            publisher,
        }
    }

    // ===== DRIVING =====

    /// Read and handle exactly one packet from the transport.
    ///
    /// Errors after the first byte leave the session disconnected with the
    /// cause stored; [`Client::err`] reports it afterwards.
    pub async fn handle_next(&mut self) -> Result<usize> {
        let Self {
            transport,
            clock,
            rx,
            tx,
            session,
            publisher,
            ..
        } = self;
        if !session.is_connected() && session.last_tx() == 0 {
            // Nothing was ever sent, so nothing can be on its way back.
            return Err(Error::Disconnected);
        }
        let Some(transport) = transport.as_mut() else {
            return Err(Error::Disconnected);
        };

        let mut events = SessionEvents {
            session,
            clock,
            publisher,
        };
        match rx.read_next_packet(transport, &mut events).await {
            Ok(consumed) => Ok(consumed),
            Err(error) => {
                // The rx error hook normally records the reason already;
                // this is the remaining path for a clean end-of-stream.
                if session.is_connected() {
                    session.on_disconnect(error);
                    let _ = tx.write_simple(transport, PacketType::Disconnect).await;
                }
                Err(error)
            }
        }
    }

    // ===== CONNECT =====

    /// Take ownership of a fresh transport and send CONNECT without
    /// waiting for the CONNACK.
    pub async fn start_connect(&mut self, transport: T, connect: &Connect<'_>) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }
        self.transport = Some(transport);
        let Self { transport, tx, .. } = self;
        let Some(stream) = transport.as_mut() else {
            return Err(Error::Disconnected);
        };
        let result = tx.write_connect(stream, connect).await;
        self.note_tx(result)
    }

    /// Send CONNECT and wait for the CONNACK, at most `timeout_ms`.
    ///
    /// The client is connected exactly when this returns Ok. A refusal
    /// surfaces as [`Error::ConnectRejected`]; an expired deadline as
    /// [`Error::Cancelled`] with the connection attempt abandoned.
    pub async fn connect(
        &mut self,
        transport: T,
        connect: &Connect<'_>,
        timeout_ms: u64,
    ) -> Result<()> {
        self.start_connect(transport, connect).await?;
        let deadline = self.clock.now_millis().saturating_add(timeout_ms);
        let mut backoff = Backoff::new();
        while !self.is_connected() && self.clock.now_millis() < deadline {
            backoff.miss(&self.delay).await;
            self.handle_next().await?;
        }
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::Cancelled)
        }
    }

    // ===== SUBSCRIBE =====

    /// Send SUBSCRIBE without waiting for the SUBACK. Only one subscribe
    /// may be in flight.
    pub async fn start_subscribe(&mut self, subscribe: &Subscribe<'_, MAX_FILTERS>) -> Result<()> {
        subscribe.validate()?;
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        if self.awaiting_suback() {
            return Err(Error::SubscribePending);
        }
        self.session.set_pending_subscribe(subscribe)?;
        let Self { transport, tx, .. } = self;
        let Some(stream) = transport.as_mut() else {
            return Err(Error::Disconnected);
        };
        let result = tx.write_subscribe(stream, subscribe).await;
        self.note_tx(result)
    }

    /// Subscribe and wait for the acknowledgement, at most `timeout_ms`.
    ///
    /// Losing the session while waiting returns [`Error::Disconnected`];
    /// the pending record then still describes the unacknowledged request.
    pub async fn subscribe(
        &mut self,
        subscribe: &Subscribe<'_, MAX_FILTERS>,
        timeout_ms: u64,
    ) -> Result<()> {
        let session_mark = self.connected_at();
        self.start_subscribe(subscribe).await?;
        let deadline = self.clock.now_millis().saturating_add(timeout_ms);
        let mut backoff = Backoff::new();
        while self.awaiting_suback() && self.clock.now_millis() < deadline {
            if self.connected_at() != session_mark {
                return Err(Error::Disconnected);
            }
            backoff.miss(&self.delay).await;
            // State checks above decide the outcome; read errors surface
            // there as a session change.
            let _ = self.handle_next().await;
        }
        if self.awaiting_suback() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    // ===== PUBLISH =====

    /// Publish a QoS 0 message. The payload is read synchronously and not
    /// retained. QoS 1/2 flags are rejected; the engines frame them only
    /// for peers that speak them.
    pub async fn publish(
        &mut self,
        flags: PublishFlags,
        publish: &Publish<'_>,
        payload: &[u8],
    ) -> Result<()> {
        publish.validate(flags.qos)?;
        if flags.qos != QoS::AtMostOnce {
            return Err(Error::UnsupportedQos);
        }
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        let Self { transport, tx, .. } = self;
        let Some(stream) = transport.as_mut() else {
            return Err(Error::Disconnected);
        };
        let result = tx.write_publish(stream, flags, publish, payload).await;
        self.note_tx(result)
    }

    // ===== PING =====

    /// Send a PINGREQ without waiting for the response. With a ping
    /// already outstanding this is a no-op; only one may be in flight.
    pub async fn start_ping(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        if self.awaiting_pingresp() {
            return Ok(());
        }
        let Self { transport, tx, .. } = self;
        let Some(stream) = transport.as_mut() else {
            return Err(Error::Disconnected);
        };
        let result = tx.write_simple(stream, PacketType::PingReq).await;
        self.note_tx(result)?;
        self.session.start_ping(self.clock.now_millis());
        Ok(())
    }

    /// Ping the server and wait for the PINGRESP, at most `timeout_ms`.
    pub async fn ping(&mut self, timeout_ms: u64) -> Result<()> {
        let session_mark = self.connected_at();
        self.start_ping().await?;
        let deadline = self.clock.now_millis().saturating_add(timeout_ms);
        let mut backoff = Backoff::new();
        while self.awaiting_pingresp() && self.clock.now_millis() < deadline {
            if self.connected_at() != session_mark {
                return Err(Error::Disconnected);
            }
            backoff.miss(&self.delay).await;
            let _ = self.handle_next().await;
        }
        if self.awaiting_pingresp() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Answer a server PINGREQ with a PINGRESP.
    pub async fn pong(&mut self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        let Self { transport, tx, .. } = self;
        let Some(stream) = transport.as_mut() else {
            return Err(Error::Disconnected);
        };
        let result = tx.write_simple(stream, PacketType::PingResp).await;
        self.note_tx(result)?;
        self.session.ping_reply_sent();
        Ok(())
    }

    // ===== DISCONNECT =====

    /// Send DISCONNECT, close the transport and record `reason` as the
    /// session's close cause. The write is best effort; a transport that
    /// is already gone does not fail the disconnect.
    pub async fn disconnect(&mut self, reason: Error) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        self.session.on_disconnect(reason);
        let Self { transport, tx, .. } = self;
        if let Some(stream) = transport.as_mut() {
            let _ = tx.write_simple(stream, PacketType::Disconnect).await;
            let _ = stream.close().await;
        }
        Ok(())
    }

    // ===== QUERIES =====

    /// True while no disconnect event or unrecoverable decode error has
    /// ended the session.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Time the current session connected, 0 when disconnected. A change
    /// in this value is how waiters detect session loss.
    pub fn connected_at(&self) -> u64 {
        self.session.connected_at()
    }

    /// Time the last packet was received, 0 before the first.
    pub fn last_rx(&self) -> u64 {
        self.session.last_rx()
    }

    /// Time the last packet was fully written, 0 before the first.
    pub fn last_tx(&self) -> u64 {
        self.session.last_tx()
    }

    /// True while a SUBSCRIBE has no SUBACK yet.
    pub fn awaiting_suback(&self) -> bool {
        self.session.awaiting_suback()
    }

    /// True while a PINGREQ has no PINGRESP yet.
    pub fn awaiting_pingresp(&self) -> bool {
        self.session.awaiting_pingresp()
    }

    /// True when the server sent a PINGREQ that [`Client::pong`] has not
    /// answered yet.
    pub fn needs_ping_reply(&self) -> bool {
        self.session.ping_reply_needed() != 0
    }

    /// The cause of disconnection; None while connected.
    pub fn err(&self) -> Option<Error> {
        self.session.err()
    }

    /// Acknowledged subscriptions with their granted QoS.
    pub fn subscriptions(&self) -> &[Subscription<FILTER_LEN>] {
        self.session.subscriptions()
    }

    /// The publish handler passed at construction.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    /// Record a completed transmission, or mark the session dead when the
    /// wire failed underneath us (the engine already closed it).
    fn note_tx(&mut self, result: Result<usize>) -> Result<()> {
        match result {
            Ok(_) => {
                self.session.record_tx(self.clock.now_millis());
                Ok(())
            }
            Err(error) => {
                if matches!(error, Error::Network(_)) && self.session.is_connected() {
                    self.session.on_disconnect(error);
                }
                Err(error)
            }
        }
    }
}
