//! End-to-end scenarios over real TCP against a scripted peer.

use picoclient_tokio::{
    default_client, Connect, ConnectReturnCode, Error, FixedHeader, PayloadReader, Publish,
    PublishFlags, PublishHandler, QoS, Result, Subscribe, TokioTcpStream, Transport,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct Collect {
    messages: Vec<(String, Vec<u8>)>,
}

impl PublishHandler for Collect {
    async fn on_message<T: Transport>(
        &mut self,
        _header: FixedHeader,
        publish: &Publish<'_>,
        payload: &mut PayloadReader<'_, T>,
    ) -> Result<()> {
        let mut bytes = Vec::new();
        let mut chunk = [0u8; 32];
        loop {
            match payload.read(&mut chunk).await? {
                0 => break,
                n => bytes.extend_from_slice(&chunk[..n]),
            }
        }
        self.messages.push((publish.topic.to_string(), bytes));
        Ok(())
    }
}

async fn scripted_peer<F, Fut>(script: F) -> std::net::SocketAddr
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        script(socket).await;
    });
    addr
}

async fn expect_connect(socket: &mut TcpStream) {
    // CONNECT for client id "salamanca" is 2 + 0x14 bytes.
    let mut connect = [0u8; 22];
    socket.read_exact(&mut connect).await.unwrap();
    assert_eq!(
        &connect[..14],
        &[
            0x10, 0x14, 0x00, 0x04, 0x4D, 0x51, 0x54, 0x54, 0x04, 0x02, 0x00, 0x3C, 0x00,
            0x09,
        ]
    );
    assert_eq!(&connect[14..], b"salamanca");
}

#[tokio::test]
async fn connect_publish_and_receive() {
    let addr = scripted_peer(|mut socket| async move {
        expect_connect(&mut socket).await;
        socket.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

        // QoS 0 PUBLISH: topic "t", payload "hi".
        let mut publish = [0u8; 7];
        socket.read_exact(&mut publish).await.unwrap();
        assert_eq!(publish, [0x30, 0x05, 0x00, 0x01, 0x74, 0x68, 0x69]);

        // Send one back on topic "loop".
        socket
            .write_all(&[0x30, 0x08, 0x00, 0x04, b'l', b'o', b'o', b'p', b'h', b'i'])
            .await
            .unwrap();
    })
    .await;

    let mut client = default_client(Collect::default());
    let transport = TokioTcpStream::connect(&addr.to_string()).await.unwrap();
    client
        .connect(transport, &Connect::new("salamanca"), 2_000)
        .await
        .unwrap();
    assert!(client.is_connected());
    assert_ne!(client.last_rx(), 0);
    assert_eq!(client.err(), None);

    client
        .publish(PublishFlags::default(), &Publish::new("t"), b"hi")
        .await
        .unwrap();

    client.handle_next().await.unwrap();
    let messages = &client.publisher().messages;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "loop");
    assert_eq!(messages[0].1, b"hi");
}

#[tokio::test]
async fn connect_rejected_by_peer() {
    let addr = scripted_peer(|mut socket| async move {
        expect_connect(&mut socket).await;
        // Refuse: not authorized.
        socket.write_all(&[0x20, 0x02, 0x00, 0x05]).await.unwrap();
    })
    .await;

    let mut client = default_client(Collect::default());
    let transport = TokioTcpStream::connect(&addr.to_string()).await.unwrap();
    let result = client
        .connect(transport, &Connect::new("salamanca"), 2_000)
        .await;
    assert_eq!(
        result,
        Err(Error::ConnectRejected(ConnectReturnCode::NotAuthorized))
    );
    assert!(!client.is_connected());
    assert_eq!(
        client.err(),
        Some(Error::ConnectRejected(ConnectReturnCode::NotAuthorized))
    );
}

#[tokio::test]
async fn subscribe_then_graceful_disconnect() {
    let addr = scripted_peer(|mut socket| async move {
        expect_connect(&mut socket).await;
        socket.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

        // SUBSCRIBE packet id 1: ("a", QoS1), ("b", QoS0).
        let mut subscribe = [0u8; 12];
        socket.read_exact(&mut subscribe).await.unwrap();
        assert_eq!(
            subscribe,
            [0x82, 0x0A, 0x00, 0x01, 0x00, 0x01, 0x61, 0x01, 0x00, 0x01, 0x62, 0x00]
        );
        socket
            .write_all(&[0x90, 0x04, 0x00, 0x01, 0x01, 0x00])
            .await
            .unwrap();

        // The client leaves with DISCONNECT.
        let mut disconnect = [0u8; 2];
        socket.read_exact(&mut disconnect).await.unwrap();
        assert_eq!(disconnect, [0xE0, 0x00]);
    })
    .await;

    let mut client = default_client(Collect::default());
    let transport = TokioTcpStream::connect(&addr.to_string()).await.unwrap();
    client
        .connect(transport, &Connect::new("salamanca"), 2_000)
        .await
        .unwrap();

    let mut subscribe = Subscribe::new(0x0001);
    subscribe.push("a", QoS::AtLeastOnce).unwrap();
    subscribe.push("b", QoS::AtMostOnce).unwrap();
    client.subscribe(&subscribe, 2_000).await.unwrap();

    assert!(!client.awaiting_suback());
    let subs = client.subscriptions();
    assert_eq!(subs.len(), 2);
    assert_eq!(subs[0].filter.as_str(), "a");
    assert_eq!(subs[0].granted_qos, QoS::AtLeastOnce);
    assert_eq!(subs[1].filter.as_str(), "b");
    assert_eq!(subs[1].granted_qos, QoS::AtMostOnce);

    client.disconnect(Error::DisconnectRequested).await.unwrap();
    assert!(!client.is_connected());
    assert_eq!(client.err(), Some(Error::DisconnectRequested));
}
