use log::{error, info, warn};
use picoclient_tokio::{
    default_client, topics, Connect, Error, FixedHeader, PayloadReader, Publish, PublishFlags,
    PublishHandler, QoS, Result, Subscribe, TokioTcpStream, Transport,
};

// Configuration (hardcoded for this demo)
const BROKER_ADDR: &str = "127.0.0.1:1883";
const CLIENT_ID: &str = "pico-pubsub";
const SUBSCRIBE_FILTER: &str = "pico/demo/#";
const PUBLISH_TOPIC: &str = "pico/demo/out";
const MESSAGE: &str = "Hello from picoclient!";
const OP_TIMEOUT_MS: u64 = 4_000;

/// Log every message under the demo filter; anything else is noise from
/// other subscriptions and only counted.
struct PrintMessages;

impl PublishHandler for PrintMessages {
    async fn on_message<T: Transport>(
        &mut self,
        _header: FixedHeader,
        publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()> {
        let mut buf = [0u8; 1024];
        let mut len = 0;
        while len < buf.len() {
            match payload.read(&mut buf[len..]).await? {
                0 => break,
                n => len += n,
            }
        }
        // Oversized payloads are truncated to the buffer; drop the rest.
        payload.drain().await?;

        if topics::matches(SUBSCRIBE_FILTER, publish.topic) {
            info!(
                "{} <- {}",
                publish.topic,
                String::from_utf8_lossy(&buf[..len])
            );
        } else {
            info!("{} <- {} bytes (unmatched topic)", publish.topic, len);
        }
        Ok(())
    }
}

async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut client = default_client(PrintMessages);

    info!("connecting to {}", BROKER_ADDR);
    let transport = TokioTcpStream::connect(BROKER_ADDR).await?;
    client
        .connect(transport, &Connect::new(CLIENT_ID), OP_TIMEOUT_MS)
        .await?;
    info!("connected");

    let mut subscribe = Subscribe::new(1);
    subscribe.push(SUBSCRIBE_FILTER, QoS::AtMostOnce)?;
    client.subscribe(&subscribe, OP_TIMEOUT_MS).await?;
    info!("subscribed to {}", SUBSCRIBE_FILTER);

    client
        .publish(
            PublishFlags::default(),
            &Publish::new(PUBLISH_TOPIC),
            MESSAGE.as_bytes(),
        )
        .await?;
    info!("published to {}", PUBLISH_TOPIC);

    client.ping(OP_TIMEOUT_MS).await?;
    info!("broker answered ping");

    // Watch the subscription for a few packets; the broker echoes our own
    // message back through the wildcard filter.
    for _ in 0..4 {
        if let Err(err) = client.handle_next().await {
            warn!("read failed: {}", err);
            break;
        }
        if client.needs_ping_reply() {
            client.pong().await?;
        }
    }

    if client.is_connected() {
        client.disconnect(Error::DisconnectRequested).await?;
        info!("disconnected");
    } else if let Some(err) = client.err() {
        warn!("session ended: {}", err);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(err) = run().await {
        error!("{}", err);
        std::process::exit(1);
    }
}
