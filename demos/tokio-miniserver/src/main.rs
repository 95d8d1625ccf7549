//! Minimal single-session MQTT peer.
//!
//! Accepts one connection at a time and speaks just enough MQTT 3.1.1 to
//! exercise a client: CONNACK, SUBACK/UNSUBACK, PINGRESP, and echoing
//! QoS 0 publishes back to matching subscriptions. Built directly on the
//! packet engines rather than the client facade; the handler records what
//! each packet asks for and the connection loop writes the replies.

use log::{info, warn};
use picoclient_tokio::{
    topics, ConnAck, Connect, Error, FixedHeader, NoAllocDecoder, PacketHandler, PacketType,
    PayloadReader, Publish, PublishFlags, Result, Rx, SubAck, SubackReturnCode, Subscribe,
    TokioTcpStream, Transport, Tx, Unsubscribe,
};
use tokio::net::TcpListener;

const LISTEN_ADDR: &str = "127.0.0.1:1883";
const MAX_FILTERS: usize = 8;
const MAX_PAYLOAD: usize = 1024;

/// What the connection loop must send once the current packet is handled.
enum Reply {
    ConnAck(ConnAck),
    SubAck(SubAck<MAX_FILTERS>),
    UnsubAck(u16),
    PingResp,
    Echo {
        topic: String,
        payload: Vec<u8>,
    },
}

/// Per-connection state: the subscriptions this session holds and the
/// replies queued by the current packet.
#[derive(Default)]
struct ServerEvents {
    client_id: Option<String>,
    subscriptions: Vec<String>,
    replies: Vec<Reply>,
}

impl PacketHandler<MAX_FILTERS> for ServerEvents {
    fn on_connect(&mut self, connect: &Connect<'_>) -> Result<()> {
        info!(
            "client {:?} connecting (keep-alive {}s, clean session {})",
            connect.client_id, connect.keep_alive, connect.clean_session
        );
        self.client_id = Some(connect.client_id.to_string());
        self.replies.push(Reply::ConnAck(ConnAck::default()));
        Ok(())
    }

    fn on_subscribe(&mut self, subscribe: &Subscribe<'_, MAX_FILTERS>) -> Result<()> {
        let mut suback = SubAck::new(subscribe.packet_id);
        for sub in &subscribe.filters {
            // Grant whatever was asked; delivery here is QoS 0 regardless.
            match topics::validate_filter(sub.filter) {
                Ok(()) => {
                    info!("subscribe {} (QoS {:?})", sub.filter, sub.qos);
                    self.subscriptions.push(sub.filter.to_string());
                    suback.push(SubackReturnCode::Granted(sub.qos))?;
                }
                Err(_) => {
                    warn!("rejecting malformed filter {}", sub.filter);
                    suback.push(SubackReturnCode::Failure)?;
                }
            }
        }
        self.replies.push(Reply::SubAck(suback));
        Ok(())
    }

    fn on_unsubscribe(&mut self, unsubscribe: &Unsubscribe<'_, MAX_FILTERS>) -> Result<()> {
        for filter in &unsubscribe.filters {
            info!("unsubscribe {}", filter);
            self.subscriptions.retain(|existing| existing != filter);
        }
        self.replies.push(Reply::UnsubAck(unsubscribe.packet_id));
        Ok(())
    }

    async fn on_publish<T: Transport>(
        &mut self,
        header: FixedHeader,
        publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()> {
        let mut body = vec![0u8; (payload.remaining() as usize).min(MAX_PAYLOAD)];
        payload.read_exact(&mut body).await?;
        // Anything beyond the cap is dropped on the floor.
        payload.drain().await?;

        info!(
            "publish {} ({} bytes, flags {:#06b})",
            publish.topic,
            body.len(),
            header.flags
        );
        let matched = self
            .subscriptions
            .iter()
            .any(|filter| topics::matches(filter, publish.topic));
        if matched {
            self.replies.push(Reply::Echo {
                topic: publish.topic.to_string(),
                payload: body,
            });
        }
        Ok(())
    }

    fn on_other(&mut self, header: FixedHeader, _packet_id: u16) -> Result<()> {
        match header.packet_type {
            PacketType::PingReq => {
                self.replies.push(Reply::PingResp);
                Ok(())
            }
            PacketType::Disconnect => Err(Error::PeerDisconnected),
            _ => Ok(()),
        }
    }
}

/// Drive one session until its stream ends; returns the terminating error.
async fn serve_session(mut transport: TokioTcpStream) -> Error {
    let mut rx: Rx<NoAllocDecoder<4096>> = Rx::new(NoAllocDecoder::new());
    let mut tx: Tx<1024> = Tx::new();
    let mut events = ServerEvents::default();

    loop {
        if let Err(err) = handle_one(&mut transport, &mut rx, &mut tx, &mut events).await {
            return err;
        }
    }
}

async fn handle_one(
    transport: &mut TokioTcpStream,
    rx: &mut Rx<NoAllocDecoder<4096>>,
    tx: &mut Tx<1024>,
    events: &mut ServerEvents,
) -> Result<()> {
    rx.read_next_packet(transport, events).await?;
    for reply in events.replies.drain(..) {
        match reply {
            Reply::ConnAck(connack) => {
                tx.write_connack(transport, connack).await?;
            }
            Reply::SubAck(suback) => {
                tx.write_suback(transport, &suback).await?;
            }
            Reply::UnsubAck(packet_id) => {
                tx.write_identified(transport, PacketType::UnsubAck, packet_id)
                    .await?;
            }
            Reply::PingResp => {
                tx.write_simple(transport, PacketType::PingResp).await?;
            }
            Reply::Echo { topic, payload } => {
                tx.write_publish(
                    transport,
                    PublishFlags::default(),
                    &Publish::new(&topic),
                    &payload,
                )
                .await?;
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let listener = TcpListener::bind(LISTEN_ADDR).await?;
    info!("listening on {}", LISTEN_ADDR);

    loop {
        let (socket, peer) = listener.accept().await?;
        info!("connection from {}", peer);
        match serve_session(TokioTcpStream::from_tcp_stream(socket)).await {
            Error::PeerDisconnected => info!("client disconnected cleanly"),
            err => warn!("session ended: {}", err),
        }
    }
}
